//! Destructible objectives (crystals)
//!
//! An objective has its own small HP pool and a team access rule. Whoever
//! lands the final blow earns ultimate gauge; the arena pays that out.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::combat::damage::DamageRecord;
use crate::core::types::{CombatantId, TeamId};
use crate::skills::hit::{Collider, TargetView, LAYER_OBJECTIVE};

/// Which teams may damage an objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessRule {
    #[default]
    OwnerOnly,
    EnemyOnly,
    Anyone,
}

impl AccessRule {
    /// A `None` team on either side never gets through
    pub fn allows(self, owner: TeamId, attacker: TeamId) -> bool {
        if owner == TeamId::None || attacker == TeamId::None {
            return false;
        }
        match self {
            AccessRule::OwnerOnly => attacker == owner,
            AccessRule::EnemyOnly => attacker != owner,
            AccessRule::Anyone => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveHit {
    /// Already destroyed, or nothing to apply
    Ignored,
    /// The access rule turned the attacker away
    Denied,
    Damaged { hp: i32 },
    /// `by` is the attacker that landed the final blow
    Destroyed { by: Option<CombatantId> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objective {
    pub id: CombatantId,
    pub owner_team: TeamId,
    pub access: AccessRule,
    pub position: Vec3,
    pub radius: f32,
    /// Gauge percent paid to the destroyer
    pub ult_gain_on_destroy: f32,
    hp: i32,
    max_hp: i32,
    destroyed: bool,
}

impl Objective {
    pub const DEFAULT_MAX_HP: i32 = 16;

    pub fn new(id: CombatantId, owner_team: TeamId, access: AccessRule, position: Vec3) -> Self {
        Self {
            id,
            owner_team,
            access,
            position,
            radius: 0.6,
            ult_gain_on_destroy: 34.0,
            hp: Self::DEFAULT_MAX_HP,
            max_hp: Self::DEFAULT_MAX_HP,
            destroyed: false,
        }
    }

    pub fn with_max_hp(mut self, max_hp: i32) -> Self {
        self.max_hp = max_hp.max(1);
        self.hp = self.max_hp;
        self
    }

    pub fn with_ult_gain(mut self, percent: f32) -> Self {
        self.ult_gain_on_destroy = percent;
        self
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn max_hp(&self) -> i32 {
        self.max_hp
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn take_damage(&mut self, record: &DamageRecord) -> ObjectiveHit {
        if self.destroyed {
            return ObjectiveHit::Ignored;
        }
        let attacker_team = record.attacker.map(|a| a.identity.team).unwrap_or_default();
        if !self.access.allows(self.owner_team, attacker_team) {
            return ObjectiveHit::Denied;
        }
        let damage = record.amount.max(0);
        if damage == 0 {
            return ObjectiveHit::Ignored;
        }

        self.hp = (self.hp - damage).max(0);
        if self.hp > 0 {
            return ObjectiveHit::Damaged { hp: self.hp };
        }

        self.destroyed = true;
        let by = record.attacker.map(|a| a.identity.entity);
        tracing::info!("objective {:?} destroyed by {:?}", self.id, by);
        ObjectiveHit::Destroyed { by }
    }

    pub fn heal(&mut self, amount: i32) {
        if self.destroyed {
            return;
        }
        self.hp = (self.hp + amount.max(0)).min(self.max_hp);
    }

    pub fn reset(&mut self) {
        self.hp = self.max_hp;
        self.destroyed = false;
    }

    /// How melee sweeps see this objective
    pub fn target_view(&self) -> TargetView {
        TargetView {
            id: self.id,
            root: self.position,
            layer: LAYER_OBJECTIVE,
            colliders: vec![Collider {
                center: self.position,
                radius: self.radius,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::damage::AttackerInfo;
    use crate::core::types::{CombatIdentity, OwnerId};

    fn hit_from(team: TeamId, amount: i32) -> DamageRecord {
        let attacker = AttackerInfo {
            identity: CombatIdentity::new(OwnerId(1), team, CombatantId(7)),
            position: Vec3::ZERO,
            exhaust_multiplier: None,
        };
        DamageRecord::from_attacker(attacker, amount, Vec3::ZERO, Vec3::Z)
    }

    #[test]
    fn test_access_rules() {
        assert!(AccessRule::OwnerOnly.allows(TeamId::Blue, TeamId::Blue));
        assert!(!AccessRule::OwnerOnly.allows(TeamId::Blue, TeamId::Red));
        assert!(AccessRule::EnemyOnly.allows(TeamId::Blue, TeamId::Red));
        assert!(!AccessRule::EnemyOnly.allows(TeamId::Blue, TeamId::Blue));
        assert!(AccessRule::Anyone.allows(TeamId::Red, TeamId::Blue));
        assert!(!AccessRule::Anyone.allows(TeamId::None, TeamId::Blue));
        assert!(!AccessRule::Anyone.allows(TeamId::Red, TeamId::None));
    }

    #[test]
    fn test_destroyed_reports_attacker() {
        let mut crystal = Objective::new(CombatantId(100), TeamId::Blue, AccessRule::EnemyOnly, Vec3::ZERO);
        assert_eq!(crystal.take_damage(&hit_from(TeamId::Blue, 10)), ObjectiveHit::Denied);
        assert_eq!(crystal.take_damage(&hit_from(TeamId::Red, 10)), ObjectiveHit::Damaged { hp: 6 });
        assert_eq!(
            crystal.take_damage(&hit_from(TeamId::Red, 10)),
            ObjectiveHit::Destroyed {
                by: Some(CombatantId(7))
            }
        );
        assert_eq!(crystal.hp(), 0);
        assert_eq!(crystal.take_damage(&hit_from(TeamId::Red, 10)), ObjectiveHit::Ignored);
    }

    #[test]
    fn test_environmental_damage_denied() {
        let mut crystal = Objective::new(CombatantId(100), TeamId::Blue, AccessRule::Anyone, Vec3::ZERO);
        let record = DamageRecord::environmental(50, Vec3::ZERO, Vec3::Z);
        assert_eq!(crystal.take_damage(&record), ObjectiveHit::Denied);
    }

    #[test]
    fn test_max_hp_floor_and_reset() {
        let mut crystal = Objective::new(CombatantId(1), TeamId::Red, AccessRule::Anyone, Vec3::ZERO).with_max_hp(0);
        assert_eq!(crystal.max_hp(), 1);
        crystal.take_damage(&hit_from(TeamId::Blue, 1));
        assert!(crystal.is_destroyed());
        crystal.reset();
        assert_eq!(crystal.hp(), 1);
        assert!(!crystal.is_destroyed());
    }
}
