use thiserror::Error;

use crate::core::types::CombatantId;
use crate::skills::SkillSlot;
use crate::spells::SummonerSlot;

#[derive(Error, Debug)]
pub enum CombatError {
    #[error("Combatant not found: {0:?}")]
    UnknownCombatant(CombatantId),

    #[error("Invalid skill definition for {slot}: {reason}")]
    InvalidSkill { slot: SkillSlot, reason: String },

    #[error("Invalid summoner spell for {slot}: {reason}")]
    InvalidSpell { slot: SummonerSlot, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CombatError>;
