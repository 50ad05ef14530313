//! Static per-slot skill configuration
//!
//! Definitions are data: loaded once, shared read-only by every combatant
//! that uses them, never mutated at runtime.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::combat::damage::{GuardBypass, KnockbackOverride};
use crate::skills::curve::{lerp, ResponseCurve};
use crate::skills::logic::SkillLogic;

/// Skill input slots. `Ultimate` is the gauge-gated one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillSlot {
    /// Basic attack
    #[default]
    Primary,
    Q,
    W,
    E,
    Ultimate,
}

impl SkillSlot {
    pub const ALL: [SkillSlot; 5] = [
        SkillSlot::Primary,
        SkillSlot::Q,
        SkillSlot::W,
        SkillSlot::E,
        SkillSlot::Ultimate,
    ];
}

impl fmt::Display for SkillSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SkillSlot::Primary => "primary",
            SkillSlot::Q => "q",
            SkillSlot::W => "w",
            SkillSlot::E => "e",
            SkillSlot::Ultimate => "ultimate",
        };
        f.write_str(name)
    }
}

/// When a presentation cue fires during a cast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueTiming {
    #[default]
    OnStart,
    OnHit,
    OnEnd,
}

/// Where a visual effect attaches on the caster
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VfxAttach {
    #[default]
    None,
    Root,
    WeaponTip,
    WeaponBase,
    Socket(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VfxCue {
    pub timing: CueTiming,
    /// Effect asset name, resolved by the presentation layer
    pub effect: String,
    #[serde(default)]
    pub attach: VfxAttach,
    #[serde(default = "default_vfx_life")]
    pub life_time: f32,
    #[serde(default)]
    pub follow: bool,
}

fn default_vfx_life() -> f32 {
    1.5
}

/// Weapon offset held for the duration of a cast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponPose {
    pub position_offset: Vec3,
    pub euler_offset: Vec3,
    /// `OnStart` also applies at charge start
    #[serde(default)]
    pub apply_on: CueTiming,
}

/// Charge-fraction driven multipliers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargeScale {
    pub min_vfx_scale: f32,
    pub max_vfx_scale: f32,
    pub min_hit_scale: f32,
    pub max_hit_scale: f32,
    pub min_damage_scale: f32,
    pub max_damage_scale: f32,
    /// Reshapes elapsed/max charge time into the charge fraction
    pub curve: ResponseCurve,
}

impl Default for ChargeScale {
    fn default() -> Self {
        Self {
            min_vfx_scale: 1.0,
            max_vfx_scale: 2.5,
            min_hit_scale: 1.0,
            max_hit_scale: 2.0,
            min_damage_scale: 1.0,
            max_damage_scale: 1.0,
            curve: ResponseCurve::linear(),
        }
    }
}

impl ChargeScale {
    pub fn vfx_scale(&self, charge: f32) -> f32 {
        lerp(self.min_vfx_scale, self.max_vfx_scale, charge)
    }

    pub fn hit_scale(&self, charge: f32) -> f32 {
        lerp(self.min_hit_scale, self.max_hit_scale, charge)
    }

    pub fn damage_scale(&self, charge: f32) -> f32 {
        lerp(self.min_damage_scale, self.max_damage_scale, charge)
    }
}

/// Hold-to-charge behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargeConfig {
    /// Animation trigger for the charge loop
    pub start_animation: Option<String>,
    pub max_charge_time: f32,
    pub auto_release_on_max: bool,
    pub scale: ChargeScale,
}

impl Default for ChargeConfig {
    fn default() -> Self {
        Self {
            start_animation: None,
            max_charge_time: 3.0,
            auto_release_on_max: true,
            scale: ChargeScale::default(),
        }
    }
}

/// Rotate towards the aim point before the skill proper starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacingConfig {
    pub required: bool,
    pub turn_speed_deg_per_sec: f32,
    pub tolerance_deg: f32,
    pub lock_movement_while_turning: bool,
}

impl Default for FacingConfig {
    fn default() -> Self {
        Self {
            required: true,
            turn_speed_deg_per_sec: 720.0,
            tolerance_deg: 6.0,
            lock_movement_while_turning: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    /// Caster's facing
    #[default]
    Forward,
    /// Towards the current aim point
    Input,
    /// Towards the aim point as a target
    TowardTarget,
}

/// Scripted displacement during the cast animation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CastMoveConfig {
    pub distance: f32,
    pub duration: f32,
    /// Speed weight over normalized move time
    pub speed_curve: ResponseCurve,
    pub direction: MoveDirection,
    /// Re-resolve the direction every tick
    pub allow_steer: bool,
    /// Hold a movement lock while moving
    pub block_normal_move: bool,
    pub stop_on_obstruction: bool,
}

impl Default for CastMoveConfig {
    fn default() -> Self {
        Self {
            distance: 2.0,
            duration: 0.15,
            speed_curve: ResponseCurve::constant(1.0),
            direction: MoveDirection::Forward,
            allow_steer: false,
            block_normal_move: true,
            stop_on_obstruction: true,
        }
    }
}

/// Offsets (seconds from cast start) of animation events, for headless play
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastTimeline {
    #[serde(default)]
    pub start: Option<f32>,
    #[serde(default, rename = "move")]
    pub move_at: Option<f32>,
    #[serde(default)]
    pub guard_start: Option<f32>,
    #[serde(default)]
    pub hit: Option<f32>,
    #[serde(default)]
    pub guard_end: Option<f32>,
    pub end: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillDefinition {
    pub slot: SkillSlot,
    pub name: String,

    pub cooldown: f32,
    pub base_damage: i32,

    pub guard_bypass: GuardBypass,
    /// Only read for `GuardBypass::Partial`
    pub guard_bypass_factor: f32,

    /// Interpolate damage between the min/max below by charge (charge skills only)
    pub use_charge_damage: bool,
    pub min_charge_damage: i32,
    pub max_charge_damage: i32,

    /// Knockback carried by this skill's hits instead of the defender's default
    pub knockback: Option<KnockbackOverride>,

    /// Cast animation trigger. Without one no end event can arrive, so the
    /// cast finishes as soon as it starts.
    pub animation: Option<String>,
    pub lock_movement: bool,

    pub logic: Option<SkillLogic>,

    pub facing: FacingConfig,
    pub weapon_pose: Option<WeaponPose>,
    pub cast_move: Option<CastMoveConfig>,

    /// Present for hold-to-charge skills
    pub charge: Option<ChargeConfig>,

    /// Needs (and spends) a full ultimate gauge
    pub consumes_ultimate: bool,
    pub knockback_immune_while_charging: bool,

    pub vfx: Vec<VfxCue>,
    pub timeline: Option<CastTimeline>,
}

impl Default for SkillDefinition {
    fn default() -> Self {
        Self {
            slot: SkillSlot::Primary,
            name: String::new(),
            cooldown: 1.0,
            base_damage: 10,
            guard_bypass: GuardBypass::None,
            guard_bypass_factor: 0.5,
            use_charge_damage: false,
            min_charge_damage: 10,
            max_charge_damage: 30,
            knockback: None,
            animation: None,
            lock_movement: true,
            logic: None,
            facing: FacingConfig::default(),
            weapon_pose: None,
            cast_move: None,
            charge: None,
            consumes_ultimate: false,
            knockback_immune_while_charging: false,
            vfx: Vec::new(),
            timeline: None,
        }
    }
}

impl SkillDefinition {
    pub fn is_charge_skill(&self) -> bool {
        self.charge.is_some()
    }

    /// Charge-derived hit scale (1 for non-charge skills)
    pub fn hit_scale(&self, charge: f32) -> f32 {
        self.charge.as_ref().map(|c| c.scale.hit_scale(charge)).unwrap_or(1.0)
    }

    pub fn vfx_scale(&self, charge: f32) -> f32 {
        self.charge.as_ref().map(|c| c.scale.vfx_scale(charge)).unwrap_or(1.0)
    }

    pub fn damage_scale(&self, charge: f32) -> f32 {
        self.charge.as_ref().map(|c| c.scale.damage_scale(charge)).unwrap_or(1.0)
    }

    /// Check the definition for problems that would make it uncastable or nonsensical
    pub fn validate(&self) -> Result<(), String> {
        if self.logic.is_none() {
            return Err("no skill logic configured".into());
        }
        if self.cooldown < 0.0 {
            return Err(format!("cooldown ({}) must not be negative", self.cooldown));
        }
        if self.base_damage < 0 {
            return Err(format!("base_damage ({}) must not be negative", self.base_damage));
        }
        if self.use_charge_damage && self.min_charge_damage > self.max_charge_damage {
            return Err(format!(
                "min_charge_damage ({}) exceeds max_charge_damage ({})",
                self.min_charge_damage, self.max_charge_damage
            ));
        }
        if !(0.0..=1.0).contains(&self.guard_bypass_factor) {
            return Err(format!(
                "guard_bypass_factor ({}) must be within [0, 1]",
                self.guard_bypass_factor
            ));
        }
        if self.facing.required && self.facing.turn_speed_deg_per_sec <= 0.0 {
            return Err("facing.turn_speed_deg_per_sec must be positive".into());
        }
        if let Some(charge) = &self.charge {
            if !charge.scale.curve.is_sorted() {
                return Err("charge.scale.curve keyframes must be sorted by x".into());
            }
        }
        if let Some(timeline) = &self.timeline {
            let offsets = [
                timeline.start,
                timeline.move_at,
                timeline.guard_start,
                timeline.hit,
                timeline.guard_end,
            ];
            if offsets.iter().flatten().any(|t| *t < 0.0 || *t > timeline.end) {
                return Err("timeline events must fall within [0, end]".into());
            }
        }
        if let Some(logic) = &self.logic {
            logic.validate()?;
        }
        Ok(())
    }
}
