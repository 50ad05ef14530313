//! Per-skill behaviour hooks
//!
//! The runner owns the lifecycle; a `SkillLogic` only reacts to the hooks it
//! cares about. Hit hooks never touch a defender directly: they emit
//! `PendingHit`s that the arena resolves later in the same tick.

use ahash::AHashSet;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::combat::constants::MIN_CHARGE_SCALE;
use crate::combat::damage::{round_damage, AttackerInfo, DamageRecord, GuardBypass};
use crate::combat::defense::DefenseState;
use crate::combat::gauge::UltGauge;
use crate::core::types::{flat_dir, CombatIdentity, CombatantId, Pose, Seconds};
use crate::skills::definition::SkillDefinition;
use crate::skills::hit::{sweep_cone, AttackerPose, HitShape, Obstruction, TargetView};

/// Animation events a cast reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastEvent {
    Start,
    Move,
    GuardStart,
    Hit,
    GuardEnd,
    End,
}

/// A damage record waiting to be applied to `target`
#[derive(Debug, Clone, PartialEq)]
pub struct PendingHit {
    pub attacker: CombatantId,
    pub target: CombatantId,
    pub record: DamageRecord,
}

/// Everything a hook may read or write on the caster and its surroundings
pub struct CastContext<'a> {
    pub identity: CombatIdentity,
    pub pose: &'a mut Pose,
    pub defense: &'a mut DefenseState,
    pub gauge: &'a mut UltGauge,
    /// Outgoing damage multiplier of an exhaust on the caster
    pub exhaust_multiplier: Option<f32>,
    pub knockback_locked: bool,
    pub dead: bool,
    pub targets: &'a [TargetView],
    pub obstruction: &'a dyn Obstruction,
    pub now: Seconds,
    pub hits: &'a mut Vec<PendingHit>,
}

impl CastContext<'_> {
    fn attacker_info(&self) -> AttackerInfo {
        AttackerInfo {
            identity: self.identity,
            position: self.pose.position,
            exhaust_multiplier: self.exhaust_multiplier,
        }
    }

    fn attacker_pose(&self) -> AttackerPose {
        AttackerPose {
            id: self.identity.entity,
            position: self.pose.position,
            forward: self.pose.forward,
        }
    }
}

/// Straight-line displacement of a dash
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashMotion {
    pub start: Vec3,
    pub end: Vec3,
    pub elapsed: f32,
    pub duration: f32,
}

/// Transient state of the cast in progress
#[derive(Debug, Clone, Default)]
pub struct CastState {
    /// Aim point captured when the cast was committed
    pub aim: Vec3,
    /// Frozen charge fraction (0 for non-charge skills)
    pub charge: f32,
    /// Damage before charge damage scale
    pub damage: i32,
    pub dash: Option<DashMotion>,
    seen: AHashSet<CombatantId>,
}

impl CastState {
    /// Start a fresh cast, keeping the dedup buffer's allocation
    pub fn begin(&mut self, aim: Vec3, charge: f32, damage: i32) {
        self.aim = aim;
        self.charge = charge;
        self.damage = damage;
        self.dash = None;
        self.seen.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MeleeAttackLogic {
    pub shape: HitShape,
}

/// Block stance toggled by GuardStart/GuardEnd, plus a plain cone hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GuardAndAttackLogic {
    pub shape: HitShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashLogic {
    pub distance: f32,
    pub duration: f32,
    /// Dash away from the aim point instead of towards it
    pub backward: bool,
}

impl Default for DashLogic {
    fn default() -> Self {
        Self {
            distance: 3.0,
            duration: 0.5,
            backward: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkillLogic {
    /// Charge-scaled cone sweep
    MeleeAttack(MeleeAttackLogic),
    GuardAndAttack(GuardAndAttackLogic),
    /// Guard up at start, down at the hit
    GuardStance,
    Dash(DashLogic),
}

fn validate_shape(shape: &HitShape) -> Result<(), String> {
    if shape.range < 0.0 {
        return Err(format!("hit range ({}) must not be negative", shape.range));
    }
    if shape.radius <= 0.0 {
        return Err(format!("hit radius ({}) must be positive", shape.radius));
    }
    if shape.angle_deg <= 0.0 || shape.angle_deg > 360.0 {
        return Err(format!("hit angle ({}) must be within (0, 360]", shape.angle_deg));
    }
    Ok(())
}

impl SkillLogic {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            SkillLogic::MeleeAttack(m) => validate_shape(&m.shape),
            SkillLogic::GuardAndAttack(g) => validate_shape(&g.shape),
            SkillLogic::GuardStance => Ok(()),
            SkillLogic::Dash(d) => {
                if d.distance < 0.0 {
                    return Err(format!("dash distance ({}) must not be negative", d.distance));
                }
                if d.duration <= 0.0 {
                    return Err(format!("dash duration ({}) must be positive", d.duration));
                }
                Ok(())
            }
        }
    }

    /// Called once when the cast is committed
    pub fn on_start(&self, _def: &SkillDefinition, cast: &mut CastState, ctx: &mut CastContext<'_>) {
        match self {
            SkillLogic::GuardStance => ctx.defense.guard_active = true,
            SkillLogic::Dash(dash) => {
                let start = ctx.pose.position;
                let mut dir = flat_dir(cast.aim - start).unwrap_or(ctx.pose.forward);
                if dash.backward {
                    dir = -dir;
                }
                // Face away from the dash
                ctx.pose.forward = -dir;
                cast.dash = Some(DashMotion {
                    start,
                    end: start + dir * dash.distance,
                    elapsed: 0.0,
                    duration: dash.duration,
                });
            }
            SkillLogic::MeleeAttack(_) | SkillLogic::GuardAndAttack(_) => {}
        }
    }

    /// Called every tick while casting
    pub fn on_tick(&self, cast: &mut CastState, ctx: &mut CastContext<'_>, dt: Seconds) {
        if let (SkillLogic::Dash(_), Some(motion)) = (self, cast.dash.as_mut()) {
            motion.elapsed += dt;
            let a = (motion.elapsed / motion.duration.max(0.0001)).clamp(0.0, 1.0);
            let mut p = motion.start.lerp(motion.end, a);
            p.y = ctx.pose.position.y;
            ctx.pose.position = p;
        }
    }

    /// Guard toggles
    pub fn on_custom_event(&self, event: CastEvent, ctx: &mut CastContext<'_>) {
        if let SkillLogic::GuardAndAttack(_) = self {
            match event {
                CastEvent::GuardStart => ctx.defense.guard_active = true,
                CastEvent::GuardEnd => ctx.defense.guard_active = false,
                _ => {}
            }
        }
    }

    pub fn on_anim_hit(&self, def: &SkillDefinition, cast: &mut CastState, ctx: &mut CastContext<'_>) {
        match self {
            SkillLogic::MeleeAttack(melee) => {
                let hit_scale = def.hit_scale(cast.charge).max(MIN_CHARGE_SCALE);
                let damage_scale = def.damage_scale(cast.charge).max(MIN_CHARGE_SCALE);
                let amount = round_damage(cast.damage as f32 * damage_scale);
                emit_cone_hits(
                    &melee.shape,
                    hit_scale,
                    amount,
                    def,
                    def.guard_bypass,
                    def.guard_bypass_factor,
                    cast,
                    ctx,
                );
            }
            SkillLogic::GuardAndAttack(guard) => {
                let shape = HitShape {
                    radius: guard.shape.radius.max(MIN_CHARGE_SCALE),
                    ..guard.shape.clone()
                };
                emit_cone_hits(&shape, 1.0, def.base_damage, def, GuardBypass::None, 1.0, cast, ctx);
            }
            SkillLogic::GuardStance => ctx.defense.guard_active = false,
            SkillLogic::Dash(_) => {}
        }
    }

    pub fn on_anim_end(&self, ctx: &mut CastContext<'_>) {
        if matches!(self, SkillLogic::GuardAndAttack(_) | SkillLogic::GuardStance) {
            ctx.defense.guard_active = false;
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn emit_cone_hits(
    shape: &HitShape,
    hit_scale: f32,
    amount: i32,
    def: &SkillDefinition,
    bypass: GuardBypass,
    bypass_factor: f32,
    cast: &mut CastState,
    ctx: &mut CastContext<'_>,
) {
    let pose = ctx.attacker_pose();
    let hits = sweep_cone(&pose, shape, hit_scale, ctx.targets, ctx.obstruction, &mut cast.seen);
    if hits.is_empty() {
        tracing::debug!("{:?} {} hit nothing", ctx.identity.entity, def.slot);
        return;
    }

    let attacker = ctx.attacker_info();
    for hit in hits {
        let mut record = DamageRecord::from_attacker(attacker, amount, hit.hit_point, hit.hit_dir)
            .with_skill(def.slot)
            .with_guard_bypass(bypass, bypass_factor);
        if let Some(knockback) = def.knockback {
            record = record.with_knockback(knockback);
        }
        tracing::debug!(
            "{:?} {} hits {:?} for {}",
            ctx.identity.entity,
            def.slot,
            hit.target,
            amount
        );
        ctx.hits.push(PendingHit {
            attacker: ctx.identity.entity,
            target: hit.target,
            record,
        });
    }
}
