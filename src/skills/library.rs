//! Skill library - the per-slot definitions a combatant casts from

use std::path::Path;

use ahash::AHashMap;
use serde::Deserialize;

use crate::core::error::{CombatError, Result};
use crate::skills::definition::{SkillDefinition, SkillSlot};

/// Built-in kit shipped with the crate
const STANDARD_SKILLS: &str = include_str!("../../data/skills.toml");

#[derive(Debug, Deserialize)]
struct SkillFile {
    #[serde(default)]
    skills: Vec<SkillDefinition>,
}

/// One definition per slot, shared read-only by every runner that uses it
#[derive(Debug, Clone, Default)]
pub struct SkillLibrary {
    skills: AHashMap<SkillSlot, SkillDefinition>,
}

impl SkillLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard five-slot kit
    pub fn standard() -> Result<Self> {
        Self::parse_toml(STANDARD_SKILLS)
    }

    /// Add or replace the definition for its slot
    pub fn insert(&mut self, def: SkillDefinition) -> Option<SkillDefinition> {
        self.skills.insert(def.slot, def)
    }

    pub fn get(&self, slot: SkillSlot) -> Option<&SkillDefinition> {
        self.skills.get(&slot)
    }

    /// Slots that have a definition, in slot order
    pub fn slots(&self) -> Vec<SkillSlot> {
        let mut slots: Vec<_> = self.skills.keys().copied().collect();
        slots.sort();
        slots
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Check every definition; the first broken one is reported
    pub fn validate(&self) -> Result<()> {
        for slot in self.slots() {
            if let Some(def) = self.skills.get(&slot) {
                def.validate().map_err(|reason| {
                    tracing::warn!("skill {} ({}) is invalid: {}", slot, def.name, reason);
                    CombatError::InvalidSkill { slot, reason }
                })?;
            }
        }
        Ok(())
    }

    /// Load and validate definitions from a TOML file
    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse and validate definitions from TOML text.
    ///
    /// Later entries for the same slot replace earlier ones.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let file: SkillFile = toml::from_str(content)?;

        let mut library = Self::new();
        for def in file.skills {
            if let Some(old) = library.insert(def) {
                tracing::warn!("skill slot {} defined twice; '{}' replaced", old.slot, old.name);
            }
        }
        library.validate()?;
        tracing::debug!("loaded {} skill definitions", library.len());
        Ok(library)
    }
}
