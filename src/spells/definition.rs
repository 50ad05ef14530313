//! Summoner spell definitions and the spell book

use std::fmt;
use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{CombatError, Result};

const STANDARD_SPELLS: &str = include_str!("../../data/spells.toml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummonerSlot {
    D,
    F,
}

impl SummonerSlot {
    pub const ALL: [SummonerSlot; 2] = [SummonerSlot::D, SummonerSlot::F];
}

impl fmt::Display for SummonerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummonerSlot::D => f.write_str("d"),
            SummonerSlot::F => f.write_str("f"),
        }
    }
}

/// What a spell does, with its tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpellEffect {
    /// Teleport towards the aim point
    Flash {
        #[serde(default = "default_flash_multiplier")]
        range_multiplier: f32,
    },
    /// Move speed bonus
    Ghost {
        #[serde(default = "default_ghost_duration")]
        duration: f32,
        /// 0.5 = +50%
        #[serde(default = "default_half")]
        move_speed_bonus: f32,
    },
    /// Slow and weaken the nearest enemy
    Exhaust {
        #[serde(default = "default_exhaust_duration")]
        duration: f32,
        #[serde(default = "default_half")]
        move_speed_multiplier: f32,
        #[serde(default = "default_half")]
        damage_multiplier: f32,
    },
    /// Temporary shield
    Barrier {
        #[serde(default = "default_barrier_duration")]
        duration: f32,
        #[serde(default = "default_barrier_amount")]
        amount: i32,
    },
}

fn default_flash_multiplier() -> f32 {
    1.2
}

fn default_ghost_duration() -> f32 {
    6.0
}

fn default_half() -> f32 {
    0.5
}

fn default_exhaust_duration() -> f32 {
    3.0
}

fn default_barrier_duration() -> f32 {
    3.0
}

fn default_barrier_amount() -> i32 {
    16
}

fn default_spell_cooldown() -> f32 {
    45.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummonerSpellDefinition {
    pub slot: SummonerSlot,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_spell_cooldown")]
    pub cooldown: f32,
    pub effect: SpellEffect,
}

impl SummonerSpellDefinition {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.cooldown < 0.0 {
            return Err(format!("cooldown ({}) must not be negative", self.cooldown));
        }
        match &self.effect {
            SpellEffect::Flash { range_multiplier } if *range_multiplier <= 0.0 => {
                Err("flash range_multiplier must be positive".into())
            }
            SpellEffect::Ghost { duration, move_speed_bonus } if *duration < 0.0 || *move_speed_bonus < 0.0 => {
                Err("ghost duration and bonus must not be negative".into())
            }
            SpellEffect::Exhaust { duration, .. } if *duration < 0.0 => {
                Err("exhaust duration must not be negative".into())
            }
            SpellEffect::Barrier { duration, amount } if *duration < 0.0 || *amount < 0 => {
                Err("barrier duration and amount must not be negative".into())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SpellFile {
    #[serde(default)]
    spells: Vec<SummonerSpellDefinition>,
}

/// The two spells a combatant brought into the match
#[derive(Debug, Clone, Default)]
pub struct SpellBook {
    spells: AHashMap<SummonerSlot, SummonerSpellDefinition>,
}

impl SpellBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flash on D, Ghost on F
    pub fn standard() -> Result<Self> {
        Self::parse_toml(STANDARD_SPELLS)
    }

    pub fn insert(&mut self, def: SummonerSpellDefinition) -> Option<SummonerSpellDefinition> {
        self.spells.insert(def.slot, def)
    }

    pub fn get(&self, slot: SummonerSlot) -> Option<&SummonerSpellDefinition> {
        self.spells.get(&slot)
    }

    pub fn len(&self) -> usize {
        self.spells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        for slot in SummonerSlot::ALL {
            if let Some(def) = self.spells.get(&slot) {
                def.validate().map_err(|reason| {
                    tracing::warn!("summoner spell {} ({}) is invalid: {}", slot, def.name, reason);
                    CombatError::InvalidSpell { slot, reason }
                })?;
            }
        }
        Ok(())
    }

    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    pub fn parse_toml(content: &str) -> Result<Self> {
        let file: SpellFile = toml::from_str(content)?;
        let mut book = Self::new();
        for def in file.spells {
            book.insert(def);
        }
        book.validate()?;
        Ok(book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_book() {
        let book = SpellBook::standard().expect("standard spells should parse");
        assert_eq!(book.len(), 2);
        assert!(matches!(
            book.get(SummonerSlot::D).map(|d| &d.effect),
            Some(SpellEffect::Flash { .. })
        ));
    }

    #[test]
    fn test_effect_defaults() {
        let toml_content = r#"
[[spells]]
slot = "f"
name = "Barrier"

[spells.effect]
kind = "barrier"
"#;
        let book = SpellBook::parse_toml(toml_content).unwrap();
        let def = book.get(SummonerSlot::F).unwrap();
        assert_eq!(def.cooldown, 45.0);
        assert_eq!(
            def.effect,
            SpellEffect::Barrier {
                duration: 3.0,
                amount: 16
            }
        );
    }

    #[test]
    fn test_negative_barrier_rejected() {
        let toml_content = r#"
[[spells]]
slot = "d"

[spells.effect]
kind = "barrier"
amount = -5
"#;
        let err = SpellBook::parse_toml(toml_content).unwrap_err();
        assert!(matches!(err, CombatError::InvalidSpell { slot: SummonerSlot::D, .. }));
    }
}
