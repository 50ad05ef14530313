//! Guard arc and knockback immunity flags

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::types::{angle_deg, flat_dir};

/// Per-combatant defensive flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefenseState {
    /// A block-stance skill currently holds the guard up
    pub guard_active: bool,
    /// Half-angle of the frontal arc covered by the guard, in degrees
    pub guard_half_angle: f32,
    pub knockback_immune_while_guard: bool,
    /// Immunity granted by something other than guarding (e.g. ultimate charge)
    pub external_knockback_immune: bool,
}

impl Default for DefenseState {
    fn default() -> Self {
        Self {
            guard_active: false,
            guard_half_angle: 60.0,
            knockback_immune_while_guard: true,
            external_knockback_immune: false,
        }
    }
}

impl DefenseState {
    pub fn new(guard_half_angle: f32, knockback_immune_while_guard: bool) -> Self {
        Self {
            guard_half_angle,
            knockback_immune_while_guard,
            ..Self::default()
        }
    }

    pub fn is_knockback_immune(&self) -> bool {
        (self.guard_active && self.knockback_immune_while_guard) || self.external_knockback_immune
    }

    /// Is a hit coming from `source` inside the frontal arc of a defender at `position`?
    ///
    /// A source on top of the defender counts as frontal.
    pub fn is_from_front(&self, position: Vec3, forward: Vec3, source: Vec3) -> bool {
        let Some(to_source) = flat_dir(source - position) else {
            return true;
        };
        let fwd = flat_dir(forward).unwrap_or(Vec3::Z);
        angle_deg(fwd, to_source) <= self.guard_half_angle
    }

    /// Does an active guard cover a hit from `source`?
    pub fn guards_against(&self, position: Vec3, forward: Vec3, source: Vec3) -> bool {
        self.guard_active && self.is_from_front(position, forward, source)
    }

    /// Drop every transient flag (round reset / respawn)
    pub fn clear(&mut self) {
        self.guard_active = false;
        self.external_knockback_immune = false;
    }
}
