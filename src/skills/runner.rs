//! Skill runner - the per-combatant cast state machine
//!
//! ```text
//! Idle --press--> Turning --facing ok--> Charging --release/max--> Casting --End--> Idle
//!                    \                        (charge skills only)       ^
//!                     `--------------------------------------------------'
//! ```
//!
//! Only one skill is current at a time. Cooldowns start when a skill is
//! committed to fire, never at press. A full ultimate gauge is checked at
//! press and spent at commit.

use std::sync::Arc;

use ahash::AHashMap;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::combat::constants::{
    ATTACK_ORIGIN_HEIGHT, CAST_MOVE_PROBE_PADDING, CAST_MOVE_PROBE_RADIUS, MIN_CAST_MOVE_DURATION,
    MIN_CHARGE_TIME,
};
use crate::combat::damage::round_damage;
use crate::core::config::CombatConfig;
use crate::core::types::{flat_dir, Pose, Seconds};
use crate::skills::curve::lerp;
use crate::skills::definition::{
    CastMoveConfig, CueTiming, MoveDirection, SkillDefinition, SkillSlot, VfxCue, WeaponPose,
};
use crate::skills::library::SkillLibrary;
use crate::skills::logic::{CastContext, CastEvent, CastState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerState {
    #[default]
    Idle,
    Turning,
    Charging,
    Casting,
}

/// Notifications for movement, animation and presentation adapters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SkillEvent {
    StateChanged {
        from: RunnerState,
        to: RunnerState,
    },
    /// Halt normal movement right now
    StopMovement,
    AnimationTrigger {
        slot: SkillSlot,
        trigger: String,
    },
    CooldownStarted {
        slot: SkillSlot,
        duration: f32,
    },
    ChargeStarted {
        slot: SkillSlot,
    },
    /// The skill was committed; `serial` identifies this cast
    CastStarted {
        slot: SkillSlot,
        serial: u64,
        charge: f32,
    },
    /// Denied at release (cooldown or gauge); nothing was spent
    CastAborted {
        slot: SkillSlot,
    },
    CastEnded {
        slot: SkillSlot,
    },
    Vfx {
        slot: SkillSlot,
        cue: VfxCue,
        scale: f32,
    },
    WeaponPoseApplied {
        slot: SkillSlot,
        pose: WeaponPose,
    },
    WeaponPoseReset,
    CastMoveStarted {
        slot: SkillSlot,
    },
    CastMoveStopped,
}

/// A skill waiting for the facing gate
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingCast {
    slot: SkillSlot,
    aim: Vec3,
    release_on_start: bool,
}

/// Cast-move in progress
#[derive(Debug, Clone, Copy, PartialEq)]
struct CastMotion {
    direction: Vec3,
    elapsed: f32,
    moved: f32,
    /// Holds the movement lock while running
    blocks_move: bool,
}

#[derive(Debug, Clone)]
pub struct SkillRunner {
    library: Arc<SkillLibrary>,
    aim_fallback_distance: f32,

    state: RunnerState,
    current: Option<SkillSlot>,
    pending: Option<PendingCast>,
    cooldown_end: AHashMap<SkillSlot, Seconds>,

    aim_point: Option<Vec3>,

    charge_start: Seconds,
    charge_aim: Vec3,
    charge: f32,
    released_charge: f32,

    cast: CastState,
    serial: u64,

    cast_move: Option<CastMotion>,
    cast_move_started: bool,

    turn_lock: bool,
    cast_lock: bool,
    weapon_pose_applied: bool,

    events: Vec<SkillEvent>,
}

impl SkillRunner {
    pub fn new(library: Arc<SkillLibrary>, config: &CombatConfig) -> Self {
        Self {
            library,
            aim_fallback_distance: config.aim_fallback_distance,
            state: RunnerState::Idle,
            current: None,
            pending: None,
            cooldown_end: AHashMap::new(),
            aim_point: None,
            charge_start: 0.0,
            charge_aim: Vec3::ZERO,
            charge: 0.0,
            released_charge: 0.0,
            cast: CastState::default(),
            serial: 0,
            cast_move: None,
            cast_move_started: false,
            turn_lock: false,
            cast_lock: false,
            weapon_pose_applied: false,
            events: Vec::new(),
        }
    }

    pub fn library(&self) -> &Arc<SkillLibrary> {
        &self.library
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state != RunnerState::Idle
    }

    pub fn is_casting(&self) -> bool {
        self.state == RunnerState::Casting
    }

    pub fn is_charging(&self) -> bool {
        self.state == RunnerState::Charging
    }

    /// Slot of the skill charging or casting
    pub fn current_slot(&self) -> Option<SkillSlot> {
        self.current
    }

    /// Identifies the most recent committed cast
    pub fn cast_serial(&self) -> u64 {
        self.serial
    }

    /// Live charge while charging, the frozen value afterwards
    pub fn current_charge(&self) -> f32 {
        if self.state == RunnerState::Charging {
            self.charge
        } else {
            self.released_charge
        }
    }

    /// Damage of `def` at the current charge, before the charge damage scale
    pub fn current_damage(&self, def: &SkillDefinition) -> i32 {
        if !def.use_charge_damage || !def.is_charge_skill() {
            return def.base_damage;
        }
        let c = self.current_charge().clamp(0.0, 1.0);
        round_damage(lerp(def.min_charge_damage as f32, def.max_charge_damage as f32, c))
    }

    pub fn current_hit_scale(&self) -> f32 {
        self.current_def().map(|d| d.hit_scale(self.current_charge())).unwrap_or(1.0)
    }

    pub fn current_vfx_scale(&self) -> f32 {
        self.current_def().map(|d| d.vfx_scale(self.current_charge())).unwrap_or(1.0)
    }

    pub fn current_damage_scale(&self) -> f32 {
        self.current_def().map(|d| d.damage_scale(self.current_charge())).unwrap_or(1.0)
    }

    pub fn cooldown_remaining(&self, slot: SkillSlot, now: Seconds) -> f32 {
        self.cooldown_end
            .get(&slot)
            .map(|end| (end - now).max(0.0))
            .unwrap_or(0.0)
    }

    /// Configured cooldown of a slot, for UI fill ratios
    pub fn cooldown_duration(&self, slot: SkillSlot) -> f32 {
        self.library
            .get(slot)
            .map(|d| d.cooldown.max(MIN_CHARGE_TIME))
            .unwrap_or(1.0)
    }

    /// Normal movement must not run while this is set
    pub fn is_movement_locked(&self) -> bool {
        self.turn_lock || self.cast_lock || self.cast_move.is_some_and(|m| m.blocks_move)
    }

    pub fn set_aim_point(&mut self, point: Option<Vec3>) {
        self.aim_point = point;
    }

    pub fn aim_point(&self) -> Option<Vec3> {
        self.aim_point
    }

    /// Aim point, or a point just ahead of the combatant when input gave none
    pub fn resolve_aim(&self, pose: &Pose) -> Vec3 {
        self.aim_point
            .unwrap_or(pose.position + pose.forward * self.aim_fallback_distance)
    }

    /// Take the notifications raised since the last drain
    pub fn drain_events(&mut self) -> Vec<SkillEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================
    // Input
    // =========================================================

    /// Try to start `slot`. Returns false, with no state change, when rejected.
    pub fn press(&mut self, slot: SkillSlot, aim: Option<Vec3>, ctx: &mut CastContext<'_>) -> bool {
        if self.state != RunnerState::Idle || ctx.dead || ctx.knockback_locked {
            return false;
        }

        let library = Arc::clone(&self.library);
        let Some(def) = library.get(slot) else {
            return false;
        };
        if def.logic.is_none() {
            return false;
        }
        if ctx.now < self.cooldown_end.get(&slot).copied().unwrap_or(0.0) {
            return false;
        }
        if def.consumes_ultimate && !ctx.gauge.is_full() {
            return false;
        }

        if aim.is_some() {
            self.aim_point = aim;
        }
        let aim = self.resolve_aim(ctx.pose);

        if def.facing.required && ctx.pose.yaw_angle_to(aim) > def.facing.tolerance_deg {
            self.begin_turning(slot, def, aim);
            return true;
        }

        if def.is_charge_skill() {
            self.begin_charge(slot, def, aim, false, ctx);
        } else {
            self.begin_cast(slot, def, ctx);
        }
        true
    }

    /// Release a held charge skill.
    ///
    /// While still turning, the release is remembered and the skill fires at
    /// charge 0 as soon as it starts charging.
    pub fn release(&mut self, slot: SkillSlot, ctx: &mut CastContext<'_>) -> bool {
        match self.state {
            RunnerState::Charging if self.current == Some(slot) => self.end_charge_and_fire(ctx),
            RunnerState::Turning => match self.pending.as_mut() {
                Some(pending) if pending.slot == slot => {
                    let chargeable = self
                        .library
                        .get(slot)
                        .is_some_and(SkillDefinition::is_charge_skill);
                    if chargeable {
                        pending.release_on_start = true;
                    }
                    chargeable
                }
                _ => false,
            },
            _ => false,
        }
    }

    // =========================================================
    // Per-tick update
    // =========================================================

    pub fn tick(&mut self, dt: Seconds, ctx: &mut CastContext<'_>) {
        match self.state {
            RunnerState::Idle => {}
            RunnerState::Turning => self.tick_turning(dt, ctx),
            RunnerState::Charging => self.tick_charging(dt, ctx),
            RunnerState::Casting => {
                let library = Arc::clone(&self.library);
                if let Some(logic) = self.current.and_then(|s| library.get(s)).and_then(|d| d.logic.as_ref()) {
                    logic.on_tick(&mut self.cast, ctx, dt);
                }
                self.tick_cast_move(dt, ctx);
            }
        }
    }

    // =========================================================
    // Animation events
    // =========================================================

    /// Animation event for the current cast; ignored unless casting
    pub fn anim_event(&mut self, event: CastEvent, ctx: &mut CastContext<'_>) {
        if self.state != RunnerState::Casting {
            return;
        }
        let library = Arc::clone(&self.library);
        let Some(slot) = self.current else {
            return;
        };
        let Some(def) = library.get(slot) else {
            return;
        };
        let Some(logic) = def.logic.as_ref() else {
            return;
        };

        match event {
            CastEvent::Start => self.play_vfx(slot, def, CueTiming::OnStart),
            CastEvent::Move => self.try_start_cast_move(slot, def, ctx),
            CastEvent::GuardStart | CastEvent::GuardEnd => logic.on_custom_event(event, ctx),
            CastEvent::Hit => {
                logic.on_anim_hit(def, &mut self.cast, ctx);
                self.play_vfx(slot, def, CueTiming::OnHit);
            }
            CastEvent::End => {
                logic.on_anim_end(ctx);
                self.play_vfx(slot, def, CueTiming::OnEnd);
                self.events.push(SkillEvent::CastEnded { slot });
                self.reset_to_idle(ctx);
            }
        }
    }

    /// Drop the current skill and return to idle, keeping cooldowns
    pub fn reset_to_idle(&mut self, ctx: &mut CastContext<'_>) {
        // An interrupted guard skill never sees its end event
        let library = Arc::clone(&self.library);
        if let Some(logic) = self.current.and_then(|s| library.get(s)).and_then(|d| d.logic.as_ref()) {
            logic.on_anim_end(ctx);
        }

        self.stop_cast_move();
        self.cast_move_started = false;
        ctx.defense.external_knockback_immune = false;

        if self.weapon_pose_applied {
            self.weapon_pose_applied = false;
            self.events.push(SkillEvent::WeaponPoseReset);
        }

        self.current = None;
        self.pending = None;
        self.charge = 0.0;
        self.released_charge = 0.0;
        self.cast.dash = None;
        self.turn_lock = false;
        self.cast_lock = false;
        self.set_state(RunnerState::Idle);
    }

    /// Forget everything including cooldowns (despawn / round reset)
    pub fn reset(&mut self) {
        let library = Arc::clone(&self.library);
        let fallback = self.aim_fallback_distance;
        *self = Self {
            aim_fallback_distance: fallback,
            serial: self.serial,
            ..Self::new(library, &CombatConfig::default())
        };
    }

    // =========================================================
    // Turning
    // =========================================================

    fn begin_turning(&mut self, slot: SkillSlot, def: &SkillDefinition, aim: Vec3) {
        self.pending = Some(PendingCast {
            slot,
            aim,
            release_on_start: false,
        });
        self.set_state(RunnerState::Turning);

        if def.facing.lock_movement_while_turning {
            self.turn_lock = true;
            self.events.push(SkillEvent::StopMovement);
        }
    }

    fn tick_turning(&mut self, dt: Seconds, ctx: &mut CastContext<'_>) {
        let library = Arc::clone(&self.library);
        let Some(pending) = self.pending else {
            self.set_state(RunnerState::Idle);
            return;
        };
        let Some(def) = library.get(pending.slot) else {
            self.pending = None;
            self.turn_lock = false;
            self.set_state(RunnerState::Idle);
            return;
        };

        ctx.pose
            .face_towards(pending.aim, def.facing.turn_speed_deg_per_sec * dt);
        if ctx.pose.yaw_angle_to(pending.aim) > def.facing.tolerance_deg {
            return;
        }

        self.pending = None;
        self.turn_lock = false;

        if def.is_charge_skill() {
            self.begin_charge(pending.slot, def, pending.aim, pending.release_on_start, ctx);
        } else {
            self.begin_cast(pending.slot, def, ctx);
        }
    }

    // =========================================================
    // Charging
    // =========================================================

    fn begin_charge(
        &mut self,
        slot: SkillSlot,
        def: &SkillDefinition,
        aim: Vec3,
        release_now: bool,
        ctx: &mut CastContext<'_>,
    ) {
        self.stop_cast_move();
        self.cast_move_started = false;

        self.current = Some(slot);
        self.set_state(RunnerState::Charging);

        self.charge_aim = aim;
        self.charge_start = ctx.now;
        self.charge = 0.0;
        self.released_charge = 0.0;

        if def.lock_movement {
            self.cast_lock = true;
            self.events.push(SkillEvent::StopMovement);
        }
        if def.knockback_immune_while_charging {
            ctx.defense.external_knockback_immune = true;
        }

        self.events.push(SkillEvent::ChargeStarted { slot });
        if let Some(trigger) = def.charge.as_ref().and_then(|c| c.start_animation.clone()) {
            self.events.push(SkillEvent::AnimationTrigger { slot, trigger });
        }
        if def.weapon_pose.as_ref().is_some_and(|p| p.apply_on == CueTiming::OnStart) {
            self.apply_weapon_pose(slot, def);
        }

        if release_now {
            self.end_charge_and_fire(ctx);
        }
    }

    fn tick_charging(&mut self, dt: Seconds, ctx: &mut CastContext<'_>) {
        let library = Arc::clone(&self.library);
        let Some(def) = self.current.and_then(|s| library.get(s)) else {
            self.set_state(RunnerState::Idle);
            return;
        };
        let Some(charge) = def.charge.as_ref() else {
            self.set_state(RunnerState::Idle);
            return;
        };

        let max_time = charge.max_charge_time.max(MIN_CHARGE_TIME);
        let raw = ((ctx.now - self.charge_start) / max_time).clamp(0.0, 1.0);
        self.charge = charge.scale.curve.evaluate(raw).clamp(0.0, 1.0);

        if def.facing.required {
            ctx.pose
                .face_towards(self.charge_aim, def.facing.turn_speed_deg_per_sec * dt);
        }

        if charge.auto_release_on_max && raw >= 1.0 {
            self.end_charge_and_fire(ctx);
        }
    }

    /// Freeze the charge and commit. Returns false when denied at release.
    fn end_charge_and_fire(&mut self, ctx: &mut CastContext<'_>) -> bool {
        let library = Arc::clone(&self.library);
        let Some(slot) = self.current else {
            self.set_state(RunnerState::Idle);
            return false;
        };
        let Some(def) = library.get(slot) else {
            self.reset_to_idle(ctx);
            return false;
        };

        self.released_charge = self.charge;

        // Cooldown before gauge: a denied release must not spend the gauge
        let cooldown_ready = ctx.now >= self.cooldown_end.get(&slot).copied().unwrap_or(0.0);
        if !cooldown_ready || (def.consumes_ultimate && !ctx.gauge.try_consume_full()) {
            tracing::debug!("{:?} release of {} denied", ctx.identity.entity, slot);
            self.events.push(SkillEvent::CastAborted { slot });
            self.reset_to_idle(ctx);
            return false;
        }

        if def.knockback_immune_while_charging {
            ctx.defense.external_knockback_immune = false;
        }

        self.commit(slot, def, ctx);
        true
    }

    // =========================================================
    // Casting
    // =========================================================

    fn begin_cast(&mut self, slot: SkillSlot, def: &SkillDefinition, ctx: &mut CastContext<'_>) {
        self.stop_cast_move();
        self.cast_move_started = false;

        self.current = Some(slot);
        self.charge = 0.0;
        self.released_charge = 0.0;

        if def.consumes_ultimate && !ctx.gauge.try_consume_full() {
            self.events.push(SkillEvent::CastAborted { slot });
            self.reset_to_idle(ctx);
            return;
        }

        let block_move = def.cast_move.as_ref().is_some_and(|m| m.block_normal_move);
        if def.lock_movement || block_move {
            self.cast_lock = true;
            self.events.push(SkillEvent::StopMovement);
        }

        self.commit(slot, def, ctx);
    }

    fn commit(&mut self, slot: SkillSlot, def: &SkillDefinition, ctx: &mut CastContext<'_>) {
        self.cooldown_end.insert(slot, ctx.now + def.cooldown);
        self.events.push(SkillEvent::CooldownStarted {
            slot,
            duration: def.cooldown,
        });

        self.set_state(RunnerState::Casting);
        self.serial += 1;

        let aim = if def.is_charge_skill() {
            self.charge_aim
        } else {
            self.resolve_aim(ctx.pose)
        };
        let damage = self.current_damage(def);
        self.cast.begin(aim, self.released_charge, damage);

        tracing::debug!(
            "{:?} casts {} (charge {:.2}, damage {})",
            ctx.identity.entity,
            slot,
            self.released_charge,
            damage
        );

        if let Some(logic) = def.logic.as_ref() {
            logic.on_start(def, &mut self.cast, ctx);
        }
        self.events.push(SkillEvent::CastStarted {
            slot,
            serial: self.serial,
            charge: self.released_charge,
        });

        match def.animation.clone() {
            Some(trigger) => {
                self.events.push(SkillEvent::AnimationTrigger { slot, trigger });
                if def.weapon_pose.is_some() && !self.weapon_pose_applied {
                    self.apply_weapon_pose(slot, def);
                }
            }
            None => {
                // No animation means no End event; finish now
                self.events.push(SkillEvent::CastEnded { slot });
                self.reset_to_idle(ctx);
            }
        }
    }

    // =========================================================
    // Cast move
    // =========================================================

    fn try_start_cast_move(&mut self, slot: SkillSlot, def: &SkillDefinition, ctx: &CastContext<'_>) {
        let Some(config) = def.cast_move.as_ref() else {
            return;
        };
        if self.cast_move_started {
            return;
        }
        self.cast_move_started = true;
        self.cast_move = Some(CastMotion {
            direction: self.move_direction(config, ctx.pose),
            elapsed: 0.0,
            moved: 0.0,
            blocks_move: config.block_normal_move,
        });
        self.events.push(SkillEvent::CastMoveStarted { slot });
    }

    fn move_direction(&self, config: &CastMoveConfig, pose: &Pose) -> Vec3 {
        match config.direction {
            MoveDirection::Forward => pose.forward,
            MoveDirection::Input | MoveDirection::TowardTarget => {
                flat_dir(self.resolve_aim(pose) - pose.position).unwrap_or(pose.forward)
            }
        }
    }

    fn tick_cast_move(&mut self, dt: Seconds, ctx: &mut CastContext<'_>) {
        let Some(mut motion) = self.cast_move else {
            return;
        };
        let library = Arc::clone(&self.library);
        let Some(config) = self
            .current
            .and_then(|s| library.get(s))
            .and_then(|d| d.cast_move.as_ref())
        else {
            self.stop_cast_move();
            return;
        };

        let duration = config.duration.max(MIN_CAST_MOVE_DURATION);
        let distance = config.distance.max(0.0);
        if motion.elapsed >= duration || motion.moved >= distance {
            self.stop_cast_move();
            return;
        }

        motion.elapsed += dt;
        let p = (motion.elapsed / duration).clamp(0.0, 1.0);
        let weight = config.speed_curve.evaluate(p).max(0.0);
        let step = ((distance / duration) * weight * dt).min(distance - motion.moved);

        let mut dir = if config.allow_steer {
            self.move_direction(config, ctx.pose)
        } else {
            motion.direction
        };
        if dir.length_squared() < 0.0001 {
            dir = ctx.pose.forward;
        }

        if config.stop_on_obstruction {
            let origin = ctx.pose.position + Vec3::Y * ATTACK_ORIGIN_HEIGHT;
            if ctx
                .obstruction
                .sweep_blocked(origin, dir, CAST_MOVE_PROBE_RADIUS, step + CAST_MOVE_PROBE_PADDING)
            {
                tracing::debug!("{:?} cast-move obstructed", ctx.identity.entity);
                self.stop_cast_move();
                return;
            }
        }

        ctx.pose.position += dir * step;
        motion.moved += step;
        self.cast_move = Some(motion);
    }

    fn stop_cast_move(&mut self) {
        if self.cast_move.take().is_some() {
            self.events.push(SkillEvent::CastMoveStopped);
        }
    }

    // =========================================================
    // Presentation
    // =========================================================

    fn play_vfx(&mut self, slot: SkillSlot, def: &SkillDefinition, timing: CueTiming) {
        let scale = def.vfx_scale(self.current_charge());
        for cue in def.vfx.iter().filter(|c| c.timing == timing) {
            self.events.push(SkillEvent::Vfx {
                slot,
                cue: cue.clone(),
                scale,
            });
        }
    }

    fn apply_weapon_pose(&mut self, slot: SkillSlot, def: &SkillDefinition) {
        if let Some(pose) = def.weapon_pose.clone() {
            self.weapon_pose_applied = true;
            self.events.push(SkillEvent::WeaponPoseApplied { slot, pose });
        }
    }

    fn current_def(&self) -> Option<&SkillDefinition> {
        self.current.and_then(|s| self.library.get(s))
    }

    fn set_state(&mut self, to: RunnerState) {
        if self.state == to {
            return;
        }
        let from = self.state;
        self.state = to;
        tracing::debug!("skill runner {:?} -> {:?}", from, to);
        self.events.push(SkillEvent::StateChanged { from, to });
    }
}
