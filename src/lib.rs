//! Blade Arena - Deterministic Melee Combat Core

pub mod combat;
pub mod core;
pub mod objective;
pub mod sim;
pub mod skills;
pub mod spells;
