//! Summoner spell runner - instant, cooldown-gated utility casts

use std::sync::Arc;

use ahash::AHashMap;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::combat::buffs::BuffState;
use crate::combat::constants::FLASH_MIN_DISTANCE_SQ;
use crate::combat::health::HealthLedger;
use crate::core::config::CombatConfig;
use crate::core::types::{flat, CombatIdentity, CombatantId, Pose, Seconds};
use crate::skills::hit::{TargetView, LAYER_COMBATANT};
use crate::spells::definition::{SpellBook, SpellEffect, SummonerSlot};

/// The caster's parts a spell may touch
pub struct SpellContext<'a> {
    pub identity: CombatIdentity,
    pub pose: &'a mut Pose,
    pub buffs: &'a mut BuffState,
    pub ledger: &'a mut HealthLedger,
    pub knockback_locked: bool,
    /// Hostile units Exhaust may pick from
    pub enemies: &'a [TargetView],
    pub now: Seconds,
}

/// What a successful cast did
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpellOutcome {
    Flashed {
        from: Vec3,
        to: Vec3,
    },
    Ghosted {
        until: Seconds,
    },
    /// The debuff lands on another unit; the caller applies it
    Exhausted {
        target: CombatantId,
        duration: f32,
        damage_multiplier: f32,
        move_speed_multiplier: f32,
    },
    Barrier {
        amount: i32,
        until: Seconds,
    },
}

#[derive(Debug, Clone)]
pub struct SummonerSpellRunner {
    book: Arc<SpellBook>,
    cooldown_end: AHashMap<SummonerSlot, Seconds>,
    aim_point: Option<Vec3>,
    flash_distance: f32,
    exhaust_range: f32,
}

impl SummonerSpellRunner {
    pub fn new(book: Arc<SpellBook>, config: &CombatConfig) -> Self {
        Self {
            book,
            cooldown_end: AHashMap::new(),
            aim_point: None,
            flash_distance: config.flash_distance,
            exhaust_range: config.exhaust_range,
        }
    }

    pub fn book(&self) -> &Arc<SpellBook> {
        &self.book
    }

    pub fn set_aim_point(&mut self, point: Option<Vec3>) {
        self.aim_point = point;
    }

    pub fn cooldown_remaining(&self, slot: SummonerSlot, now: Seconds) -> f32 {
        self.cooldown_end
            .get(&slot)
            .map(|end| (end - now).max(0.0))
            .unwrap_or(0.0)
    }

    pub fn cooldown_duration(&self, slot: SummonerSlot) -> f32 {
        self.book.get(slot).map(|d| d.cooldown.max(0.01)).unwrap_or(1.0)
    }

    /// Cast the spell in `slot`. The cooldown starts only when it succeeds.
    pub fn cast(&mut self, slot: SummonerSlot, ctx: &mut SpellContext<'_>) -> Option<SpellOutcome> {
        if ctx.knockback_locked || ctx.ledger.is_dead() {
            return None;
        }
        let book = Arc::clone(&self.book);
        let def = book.get(slot)?;
        if ctx.now < self.cooldown_end.get(&slot).copied().unwrap_or(0.0) {
            return None;
        }

        let outcome = match def.effect {
            SpellEffect::Flash { range_multiplier } => self.flash(range_multiplier, ctx),
            SpellEffect::Ghost {
                duration,
                move_speed_bonus,
            } => {
                ctx.buffs.apply_ghost(ctx.now, duration, move_speed_bonus);
                Some(SpellOutcome::Ghosted {
                    until: ctx.now + duration.max(0.0),
                })
            }
            SpellEffect::Exhaust {
                duration,
                move_speed_multiplier,
                damage_multiplier,
            } => self.nearest_enemy(ctx).map(|target| SpellOutcome::Exhausted {
                target,
                duration,
                damage_multiplier: damage_multiplier.clamp(0.01, 1.0),
                move_speed_multiplier: move_speed_multiplier.clamp(0.01, 1.0),
            }),
            SpellEffect::Barrier { duration, amount } => {
                let (previous, added) = ctx.buffs.apply_barrier(ctx.now, duration, amount);
                ctx.ledger.remove_shield(previous);
                ctx.ledger.add_shield(added);
                Some(SpellOutcome::Barrier {
                    amount: added,
                    until: ctx.now + duration.max(0.0),
                })
            }
        };

        match outcome {
            Some(outcome) => {
                self.cooldown_end.insert(slot, ctx.now + def.cooldown);
                tracing::debug!("{:?} cast {} ({}): {:?}", ctx.identity.entity, slot, def.name, outcome);
                Some(outcome)
            }
            None => {
                tracing::debug!("{:?} cast {} ({}) failed", ctx.identity.entity, slot, def.name);
                None
            }
        }
    }

    /// Forget cooldowns and aim (round reset)
    pub fn reset(&mut self) {
        self.cooldown_end.clear();
        self.aim_point = None;
    }

    fn flash(&self, range_multiplier: f32, ctx: &mut SpellContext<'_>) -> Option<SpellOutcome> {
        let aim = self.aim_point?;
        let from = ctx.pose.position;
        let delta = flat(aim - from);
        if delta.length_squared() < FLASH_MIN_DISTANCE_SQ {
            return None;
        }

        let max_range = self.flash_distance * range_multiplier;
        let offset = if delta.length() > max_range {
            delta.normalize() * max_range
        } else {
            delta
        };
        let to = from + offset;
        ctx.pose.position = to;
        Some(SpellOutcome::Flashed { from, to })
    }

    fn nearest_enemy(&self, ctx: &SpellContext<'_>) -> Option<CombatantId> {
        let origin = ctx.pose.position;
        ctx.enemies
            .iter()
            .filter(|t| t.id != ctx.identity.entity && t.layer & LAYER_COMBATANT != 0)
            .map(|t| (t.id, t.root.distance(origin)))
            .filter(|(_, d)| *d <= self.exhaust_range)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }
}
