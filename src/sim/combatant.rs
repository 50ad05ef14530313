//! A combatant - explicit composition of every per-unit component
//!
//! Components never reach into each other. The arena hands the skill and
//! spell runners split borrows of the parts they may touch.

use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::combat::buffs::BuffState;
use crate::combat::constants::{ATTACK_ORIGIN_HEIGHT, BODY_RADIUS, DEFAULT_MOVE_SPEED};
use crate::combat::damage::DamageRecord;
use crate::combat::defense::DefenseState;
use crate::combat::gauge::UltGauge;
use crate::combat::health::{DamageOutcome, Defender, HealthLedger};
use crate::combat::knockback::KnockbackController;
use crate::core::config::CombatConfig;
use crate::core::types::{flat_dir, CombatIdentity, CombatantId, OwnerId, Pose, Seconds, TeamId};
use crate::sim::events::ReplicatedState;
use crate::skills::hit::{Collider, Obstruction, OpenField, TargetView, LAYER_COMBATANT};
use crate::skills::library::SkillLibrary;
use crate::skills::logic::{CastContext, PendingHit};
use crate::skills::runner::{RunnerState, SkillRunner};
use crate::spells::{SpellBook, SpellContext, SummonerSpellRunner};

/// How to spawn a combatant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnParams {
    pub owner: OwnerId,
    pub team: TeamId,
    pub position: Vec3,
    pub forward: Vec3,
    /// Falls back to the config default
    pub max_hp: Option<i32>,
    pub move_speed: f32,
}

impl SpawnParams {
    pub fn new(owner: OwnerId, team: TeamId, position: Vec3) -> Self {
        Self {
            owner,
            team,
            position,
            forward: Vec3::Z,
            max_hp: None,
            move_speed: DEFAULT_MOVE_SPEED,
        }
    }

    pub fn facing(mut self, forward: Vec3) -> Self {
        self.forward = forward;
        self
    }

    pub fn with_max_hp(mut self, max_hp: i32) -> Self {
        self.max_hp = Some(max_hp);
        self
    }

    pub fn with_move_speed(mut self, speed: f32) -> Self {
        self.move_speed = speed.max(0.0);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum FallState {
    #[default]
    Grounded,
    Falling {
        since: Seconds,
    },
}

/// Everything about a combatant an observer may want in one value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatantSnapshot {
    pub identity: CombatIdentity,
    pub position: Vec3,
    pub forward: Vec3,
    pub replicated: ReplicatedState,
    pub knockback_locked: bool,
    pub falling: bool,
}

#[derive(Debug, Clone)]
pub struct Combatant {
    pub identity: CombatIdentity,
    pub pose: Pose,
    pub ledger: HealthLedger,
    pub defense: DefenseState,
    pub knockback: KnockbackController,
    pub gauge: UltGauge,
    pub buffs: BuffState,
    pub skills: SkillRunner,
    pub spells: SummonerSpellRunner,
    pub move_speed: f32,
    /// Walk direction requested by input
    pub move_intent: Option<Vec3>,
    pub fall: FallState,
    spawn_pose: Pose,
}

impl Combatant {
    pub fn new(
        id: CombatantId,
        params: SpawnParams,
        library: Arc<SkillLibrary>,
        book: Arc<SpellBook>,
        config: &CombatConfig,
    ) -> Self {
        let pose = Pose::new(params.position, params.forward);
        Self {
            identity: CombatIdentity::new(params.owner, params.team, id),
            pose,
            ledger: HealthLedger::new(params.max_hp.unwrap_or(config.default_max_hp), config),
            defense: DefenseState::new(config.guard_half_angle_deg, config.knockback_immune_while_guard),
            knockback: KnockbackController::new(),
            gauge: UltGauge::new(),
            buffs: BuffState::default(),
            skills: SkillRunner::new(library, config),
            spells: SummonerSpellRunner::new(book, config),
            move_speed: params.move_speed,
            move_intent: None,
            fall: FallState::Grounded,
            spawn_pose: pose,
        }
    }

    pub fn id(&self) -> CombatantId {
        self.identity.entity
    }

    pub fn spawn_position(&self) -> Vec3 {
        self.spawn_pose.position
    }

    pub fn is_dead(&self) -> bool {
        self.ledger.is_dead()
    }

    pub fn is_falling(&self) -> bool {
        matches!(self.fall, FallState::Falling { .. })
    }

    /// Input-gating lock: knockback and falling both count
    pub fn is_input_locked(&self) -> bool {
        self.knockback.is_locked() || self.is_falling()
    }

    pub fn is_movement_locked(&self) -> bool {
        self.is_dead() || self.is_input_locked() || self.skills.is_movement_locked()
    }

    /// Body sphere centred at chest height
    pub fn target_view(&self) -> TargetView {
        TargetView {
            id: self.id(),
            root: self.pose.position,
            layer: LAYER_COMBATANT,
            colliders: vec![Collider {
                center: self.pose.position + Vec3::Y * ATTACK_ORIGIN_HEIGHT,
                radius: BODY_RADIUS,
            }],
        }
    }

    pub fn replicated(&self) -> ReplicatedState {
        ReplicatedState {
            hp: self.ledger.hp(),
            max_hp: self.ledger.max_hp(),
            shield: self.ledger.shield(),
            gauge: self.gauge.percent(),
            state: self.skills.state(),
            dead: self.is_dead(),
        }
    }

    pub fn snapshot(&self) -> CombatantSnapshot {
        CombatantSnapshot {
            identity: self.identity,
            position: self.pose.position,
            forward: self.pose.forward,
            replicated: self.replicated(),
            knockback_locked: self.knockback.is_locked(),
            falling: self.is_falling(),
        }
    }

    /// Run `f` against the skill runner with a cast context built from this combatant
    pub fn with_cast_context<R>(
        &mut self,
        targets: &[TargetView],
        obstruction: &dyn Obstruction,
        now: Seconds,
        hits: &mut Vec<PendingHit>,
        f: impl FnOnce(&mut SkillRunner, &mut CastContext<'_>) -> R,
    ) -> R {
        let knockback_locked = self.is_input_locked();
        let mut ctx = CastContext {
            identity: self.identity,
            pose: &mut self.pose,
            defense: &mut self.defense,
            gauge: &mut self.gauge,
            exhaust_multiplier: self.buffs.exhaust_multiplier(),
            knockback_locked,
            dead: self.ledger.is_dead(),
            targets,
            obstruction,
            now,
            hits,
        };
        f(&mut self.skills, &mut ctx)
    }

    pub fn with_spell_context<R>(
        &mut self,
        enemies: &[TargetView],
        now: Seconds,
        f: impl FnOnce(&mut SummonerSpellRunner, &mut SpellContext<'_>) -> R,
    ) -> R {
        let knockback_locked = self.is_input_locked();
        let mut ctx = SpellContext {
            identity: self.identity,
            pose: &mut self.pose,
            buffs: &mut self.buffs,
            ledger: &mut self.ledger,
            knockback_locked,
            enemies,
            now,
        };
        f(&mut self.spells, &mut ctx)
    }

    pub fn take_damage(&mut self, record: &DamageRecord, now: Seconds) -> DamageOutcome {
        let defender = Defender {
            position: self.pose.position,
            forward: self.pose.forward,
            defense: &self.defense,
            knockback: &mut self.knockback,
            gauge: &mut self.gauge,
        };
        self.ledger.take_damage(record, defender, now)
    }

    /// Drop whatever the skill runner was doing
    pub fn interrupt(&mut self, now: Seconds) {
        if self.skills.state() == RunnerState::Idle {
            return;
        }
        let mut hits = Vec::new();
        self.with_cast_context(&[], &OpenField, now, &mut hits, |runner, ctx| runner.reset_to_idle(ctx));
    }

    /// One tick of walking. Returns whether the body moved.
    pub fn walk(&mut self, dt: Seconds, obstruction: &dyn Obstruction) -> bool {
        let Some(dir) = self.move_intent.and_then(flat_dir) else {
            return false;
        };
        if self.is_movement_locked() {
            return false;
        }

        let distance = self.move_speed * self.buffs.move_speed_multiplier() * dt;
        if distance <= 0.0 {
            return false;
        }
        let origin = self.pose.position + Vec3::Y * ATTACK_ORIGIN_HEIGHT;
        if obstruction.sweep_blocked(origin, dir, BODY_RADIUS, distance) {
            return false;
        }

        self.pose.position += dir * distance;
        self.pose.forward = dir;
        true
    }

    /// Bring the body back at `position`, alive and grounded
    pub fn respawn_at(&mut self, position: Vec3) {
        self.pose.position = position;
        self.defense.clear();
        self.knockback.reset();
        self.fall = FallState::Grounded;
        self.move_intent = None;
    }

    /// Round reset: full HP, no shield, empty gauge, idle runners, no cooldowns
    pub fn reset(&mut self) {
        self.pose = self.spawn_pose;
        self.ledger.reset();
        self.defense.clear();
        self.knockback.reset();
        self.gauge.set_to_zero();
        self.buffs.clear();
        self.skills.reset();
        self.spells.reset();
        self.move_intent = None;
        self.fall = FallState::Grounded;
    }
}
