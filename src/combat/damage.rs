//! Damage records - one immutable value per hit, consumed immediately by the target

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::types::CombatIdentity;
use crate::skills::SkillSlot;

/// How much of a frontal-guarded hit still lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardBypass {
    /// Fully blocked by a frontal guard
    #[default]
    None,
    /// Ignores guard entirely
    Full,
    /// Scaled by the record's bypass factor
    Partial,
}

/// Per-hit knockback parameters that replace the defender's defaults
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KnockbackOverride {
    pub distance: f32,
    pub duration: f32,
    pub lock_input: bool,
}

/// Attacker snapshot taken when the record is built
///
/// Hit resolution and damage application happen in the same tick, so the
/// snapshot is exactly the attacker's state at the moment of the hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackerInfo {
    pub identity: CombatIdentity,
    pub position: Vec3,
    /// Outgoing damage multiplier of an active exhaust debuff
    pub exhaust_multiplier: Option<f32>,
}

/// One damage event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageRecord {
    /// `None` for environmental damage
    pub attacker: Option<AttackerInfo>,
    pub amount: i32,
    pub hit_point: Vec3,
    /// Direction from attacker towards the defender
    pub hit_dir: Vec3,
    pub skill: Option<SkillSlot>,
    pub guard_bypass: GuardBypass,
    pub guard_bypass_factor: f32,
    pub knockback: Option<KnockbackOverride>,
}

impl DamageRecord {
    /// Environmental damage with no attacker
    pub fn environmental(amount: i32, hit_point: Vec3, hit_dir: Vec3) -> Self {
        Self {
            attacker: None,
            amount,
            hit_point,
            hit_dir,
            skill: None,
            guard_bypass: GuardBypass::None,
            guard_bypass_factor: 1.0,
            knockback: None,
        }
    }

    /// Damage dealt by a known attacker
    pub fn from_attacker(attacker: AttackerInfo, amount: i32, hit_point: Vec3, hit_dir: Vec3) -> Self {
        Self {
            attacker: Some(attacker),
            ..Self::environmental(amount, hit_point, hit_dir)
        }
    }

    pub fn with_skill(mut self, slot: SkillSlot) -> Self {
        self.skill = Some(slot);
        self
    }

    pub fn with_guard_bypass(mut self, bypass: GuardBypass, factor: f32) -> Self {
        self.guard_bypass = bypass;
        self.guard_bypass_factor = factor;
        self
    }

    pub fn with_knockback(mut self, knockback: KnockbackOverride) -> Self {
        self.knockback = Some(knockback);
        self
    }

    /// Fraction of damage that passes a frontal guard
    pub fn guard_pass_fraction(&self) -> f32 {
        match self.guard_bypass {
            GuardBypass::None => 0.0,
            GuardBypass::Full => 1.0,
            GuardBypass::Partial => {
                // A non-positive factor means "unset" and passes everything
                let f = if self.guard_bypass_factor <= 0.0 {
                    1.0
                } else {
                    self.guard_bypass_factor
                };
                f.clamp(0.0, 1.0)
            }
        }
    }
}

/// Round a scaled damage value to whole points, halves to even
pub fn round_damage(value: f32) -> i32 {
    value.round_ties_even() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_damage_halves_to_even() {
        assert_eq!(round_damage(12.5), 12);
        assert_eq!(round_damage(13.5), 14);
        assert_eq!(round_damage(7.4), 7);
        assert_eq!(round_damage(7.6), 8);
    }

    #[test]
    fn test_guard_pass_fraction() {
        let record = DamageRecord::environmental(10, Vec3::ZERO, Vec3::Z);
        assert_eq!(record.guard_pass_fraction(), 0.0);

        let full = record.clone().with_guard_bypass(GuardBypass::Full, 0.0);
        assert_eq!(full.guard_pass_fraction(), 1.0);

        let half = record.clone().with_guard_bypass(GuardBypass::Partial, 0.5);
        assert_eq!(half.guard_pass_fraction(), 0.5);

        let unset = record.clone().with_guard_bypass(GuardBypass::Partial, 0.0);
        assert_eq!(unset.guard_pass_fraction(), 1.0);

        let over = record.with_guard_bypass(GuardBypass::Partial, 3.0);
        assert_eq!(over.guard_pass_fraction(), 1.0);
    }
}
