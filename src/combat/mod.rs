//! Damage resolution for a single combatant
//!
//! A hit becomes a `DamageRecord`, the defender's `HealthLedger` resolves it
//! against its `DefenseState`, and the side effects land in the
//! `KnockbackController` and `UltGauge`.

pub mod buffs;
pub mod constants;
pub mod damage;
pub mod defense;
pub mod gauge;
pub mod health;
pub mod knockback;

pub use buffs::{BuffExpiry, BuffState};
pub use damage::{round_damage, AttackerInfo, DamageRecord, GuardBypass, KnockbackOverride};
pub use defense::DefenseState;
pub use gauge::UltGauge;
pub use health::{DamageOutcome, DamageStatus, Defender, HealthLedger, IgnoreReason};
pub use knockback::{KnockbackController, KnockbackStep};
