//! Summoner spells - two utility slots with their own cooldowns
//!
//! Structurally parallel to the skill runner but instant: no turning,
//! charging or animation events.

pub mod definition;
pub mod runner;

pub use definition::{SpellBook, SpellEffect, SummonerSlot, SummonerSpellDefinition};
pub use runner::{SpellContext, SpellOutcome, SummonerSpellRunner};
