//! Combat configuration with documented defaults
//!
//! Per-combatant defaults (knockback, invincibility, guard arc) and
//! simulation-wide knobs live here. Everything can be overridden from a
//! TOML file; missing keys fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::core::error::{CombatError, Result};

/// Knockback applied by the ledger when a damage record carries no override
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnockbackDefaults {
    /// Master switch for damage-driven knockback
    pub enabled: bool,
    /// Displacement in world units
    pub distance: f32,
    /// Seconds over which the displacement happens
    pub duration: f32,
    /// Lock movement and skill input while the knockback runs
    pub lock_input: bool,
}

impl Default for KnockbackDefaults {
    fn default() -> Self {
        Self {
            enabled: true,
            distance: 1.2,
            duration: 0.12,
            lock_input: true,
        }
    }
}

/// Fall-zone behaviour (ring-outs)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallConfig {
    /// Only start falling while a knockback lock is held
    pub require_knockback: bool,
    /// Seconds between entering the fall and dying
    pub death_delay: f32,
    /// Respawn at the arena spawn point instead of dying
    pub respawn_instead_of_death: bool,
}

impl Default for FallConfig {
    fn default() -> Self {
        Self {
            require_knockback: false,
            death_delay: 1.0,
            respawn_instead_of_death: false,
        }
    }
}

/// Configuration for the combat simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    // === SCHEDULING ===
    /// Fixed simulation rate. Every tick advances time by 1 / tick_rate_hz.
    pub tick_rate_hz: u32,

    // === HEALTH ===
    /// Max HP given to combatants that do not specify one
    pub default_max_hp: i32,

    /// Seconds of damage immunity after losing HP (0 = none)
    pub invincibility_time: f32,

    /// Ultimate gauge percent gained per percent of max HP lost
    ///
    /// At 1.5, losing a third of your HP fills half the gauge.
    pub ult_gain_per_hp_percent: f32,

    pub knockback: KnockbackDefaults,

    // === DEFENSE ===
    /// Half-angle of the frontal guard arc (60 = 120 degree total arc)
    pub guard_half_angle_deg: f32,

    /// Guarding also makes the defender immune to knockback
    pub knockback_immune_while_guard: bool,

    // === AIM ===
    /// Distance ahead of the combatant used as aim point when input gives none
    pub aim_fallback_distance: f32,

    // === SUMMONER SPELLS ===
    /// Base teleport distance; each Flash definition scales it
    pub flash_distance: f32,

    /// Search radius for the Exhaust target
    pub exhaust_range: f32,

    // === OBJECTIVES ===
    /// Gauge percent granted to whoever destroys an objective
    pub objective_ult_gain: f32,

    pub fall: FallConfig,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            default_max_hp: 100,
            invincibility_time: 0.0,
            ult_gain_per_hp_percent: 1.5,
            knockback: KnockbackDefaults::default(),
            guard_half_angle_deg: 60.0,
            knockback_immune_while_guard: true,
            aim_fallback_distance: 2.0,
            flash_distance: 5.0,
            exhaust_range: 6.0,
            objective_ult_gain: 34.0,
            fall: FallConfig::default(),
        }
    }
}

impl CombatConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds per simulation tick
    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_rate_hz.max(1) as f32
    }

    /// Parse from TOML text and validate
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: CombatConfig = toml::from_str(text)?;
        config.validate().map_err(CombatError::InvalidConfig)?;
        Ok(config)
    }

    /// Load from a TOML file and validate
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.tick_rate_hz == 0 {
            return Err("tick_rate_hz must be positive".into());
        }

        if self.default_max_hp <= 0 {
            return Err(format!(
                "default_max_hp ({}) must be positive",
                self.default_max_hp
            ));
        }

        if self.invincibility_time < 0.0 || self.ult_gain_per_hp_percent < 0.0 {
            return Err("invincibility_time and ult_gain_per_hp_percent must not be negative".into());
        }

        if !(0.0..=180.0).contains(&self.guard_half_angle_deg) {
            return Err(format!(
                "guard_half_angle_deg ({}) must be within [0, 180]",
                self.guard_half_angle_deg
            ));
        }

        if self.knockback.distance < 0.0 || self.knockback.duration < 0.0 {
            return Err("knockback distance and duration must not be negative".into());
        }

        if self.fall.death_delay < 0.0 {
            return Err("fall.death_delay must not be negative".into());
        }

        Ok(())
    }
}

// === GLOBAL CONFIG ACCESS ===

static CONFIG: OnceLock<CombatConfig> = OnceLock::new();

/// Get the global combat config (initializes with defaults if not set)
pub fn config() -> &'static CombatConfig {
    CONFIG.get_or_init(CombatConfig::default)
}

/// Set the global combat config (can only be called once)
///
/// Returns Err if config was already set.
pub fn set_config(config: CombatConfig) -> std::result::Result<(), CombatConfig> {
    CONFIG.set(config)
}
