//! Arena - the fixed-tick combat loop
//!
//! Each tick: input -> state machines -> animation events -> damage -> publish
//!
//! Damage records emitted by hit hooks are held until the damage phase and
//! applied in emission order, so every hit of a tick sees the same world.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::combat::buffs::BuffExpiry;
use crate::combat::damage::DamageRecord;
use crate::combat::health::{DamageOutcome, DamageStatus};
use crate::combat::knockback::KnockbackStep;
use crate::core::config::{config, CombatConfig};
use crate::core::error::{CombatError, Result};
use crate::core::types::{flat, CombatantId, Seconds, TeamId, Tick};
use crate::objective::{AccessRule, Objective, ObjectiveHit};
use crate::sim::combatant::{Combatant, CombatantSnapshot, FallState, SpawnParams};
use crate::sim::command::{CommandLog, InputCommand};
use crate::sim::events::{CombatEventKind, EventLog, EventSink, ReplicatedState};
use crate::sim::schedule::AnimScheduler;
use crate::skills::hit::{Obstacles, TargetView};
use crate::skills::library::SkillLibrary;
use crate::skills::logic::{CastContext, CastEvent, PendingHit};
use crate::skills::runner::{SkillEvent, SkillRunner};
use crate::skills::SkillSlot;
use crate::spells::{SpellBook, SpellOutcome, SummonerSlot};

/// Ring-out area: beyond `radius` from `center` the floor ends
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallZone {
    pub center: Vec3,
    pub radius: f32,
    /// Where to respawn when respawning is enabled; the spawn point otherwise
    pub respawn_point: Option<Vec3>,
}

impl FallZone {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius,
            respawn_point: None,
        }
    }

    pub fn with_respawn_point(mut self, point: Vec3) -> Self {
        self.respawn_point = Some(point);
        self
    }

    /// Horizontal distance only
    pub fn is_outside(&self, position: Vec3) -> bool {
        flat(position - self.center).length() > self.radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveSnapshot {
    pub id: CombatantId,
    pub owner_team: TeamId,
    pub hp: i32,
    pub max_hp: i32,
    pub destroyed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaSnapshot {
    pub tick: Tick,
    pub time: Seconds,
    pub round: u32,
    pub combatants: Vec<CombatantSnapshot>,
    pub objectives: Vec<ObjectiveSnapshot>,
}

impl ArenaSnapshot {
    /// Teams with at least one living combatant
    pub fn living_teams(&self) -> Vec<TeamId> {
        let mut teams: Vec<TeamId> = Vec::new();
        for c in self.combatants.iter().filter(|c| !c.replicated.dead) {
            if !teams.contains(&c.identity.team) {
                teams.push(c.identity.team);
            }
        }
        teams
    }
}

pub struct Arena {
    config: CombatConfig,
    library: Arc<SkillLibrary>,
    spells: Arc<SpellBook>,

    combatants: BTreeMap<CombatantId, Combatant>,
    objectives: BTreeMap<CombatantId, Objective>,
    obstacles: Obstacles,
    fall_zone: Option<FallZone>,

    commands: CommandLog,
    scheduler: AnimScheduler,
    pending: Vec<PendingHit>,

    tick: Tick,
    round: u32,
    next_id: u32,

    log: EventLog,
    published: BTreeMap<CombatantId, ReplicatedState>,
    sinks: Vec<Box<dyn EventSink>>,
}

impl Arena {
    pub fn new(config: CombatConfig, library: Arc<SkillLibrary>, spells: Arc<SpellBook>) -> Result<Self> {
        config.validate().map_err(CombatError::InvalidConfig)?;
        library.validate()?;
        spells.validate()?;

        Ok(Self {
            config,
            library,
            spells,
            combatants: BTreeMap::new(),
            objectives: BTreeMap::new(),
            obstacles: Obstacles::default(),
            fall_zone: None,
            commands: CommandLog::new(),
            scheduler: AnimScheduler::new(),
            pending: Vec::new(),
            tick: 0,
            round: 0,
            next_id: 1,
            log: EventLog::new(),
            published: BTreeMap::new(),
            sinks: Vec::new(),
        })
    }

    /// Global config with the built-in skill kit and spells
    pub fn standard() -> Result<Self> {
        Self::new(
            config().clone(),
            Arc::new(SkillLibrary::standard()?),
            Arc::new(SpellBook::standard()?),
        )
    }

    // =========================================================
    // Accessors
    // =========================================================

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    pub fn library(&self) -> &Arc<SkillLibrary> {
        &self.library
    }

    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Simulation time of the current tick
    pub fn time(&self) -> Seconds {
        (self.tick as f64 / f64::from(self.config.tick_rate_hz.max(1))) as f32
    }

    pub fn combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    pub fn combatant_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.get_mut(&id)
    }

    pub fn combatants(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.values()
    }

    pub fn objective(&self, id: CombatantId) -> Option<&Objective> {
        self.objectives.get(&id)
    }

    pub fn objective_mut(&mut self, id: CombatantId) -> Option<&mut Objective> {
        self.objectives.get_mut(&id)
    }

    pub fn commands_mut(&mut self) -> &mut CommandLog {
        &mut self.commands
    }

    /// Queue `command` for `tick`
    pub fn queue(&mut self, tick: Tick, id: CombatantId, command: InputCommand) {
        self.commands.push(tick, id, command);
    }

    pub fn set_obstacles(&mut self, obstacles: Obstacles) {
        self.obstacles = obstacles;
    }

    pub fn set_fall_zone(&mut self, zone: Option<FallZone>) {
        self.fall_zone = zone;
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    // =========================================================
    // Population
    // =========================================================

    pub fn spawn(&mut self, params: SpawnParams) -> CombatantId {
        let id = self.allocate_id();
        let combatant = Combatant::new(
            id,
            params,
            Arc::clone(&self.library),
            Arc::clone(&self.spells),
            &self.config,
        );
        tracing::debug!("spawned {:?} for {:?} at {:?}", id, params.team, params.position);
        self.combatants.insert(id, combatant);
        self.record(CombatEventKind::Spawned { id });
        id
    }

    /// Place a crystal; its destroyer earns the configured gauge reward
    pub fn add_objective(&mut self, owner_team: TeamId, access: AccessRule, position: Vec3) -> CombatantId {
        let id = self.allocate_id();
        let objective =
            Objective::new(id, owner_team, access, position).with_ult_gain(self.config.objective_ult_gain);
        self.objectives.insert(id, objective);
        self.record(CombatEventKind::Spawned { id });
        id
    }

    pub fn despawn(&mut self, id: CombatantId) -> Result<()> {
        let removed = self.combatants.remove(&id).is_some() || self.objectives.remove(&id).is_some();
        if !removed {
            return Err(CombatError::UnknownCombatant(id));
        }
        self.scheduler.cancel(id);
        self.commands.forget(id);
        self.published.remove(&id);
        self.pending.retain(|h| h.attacker != id && h.target != id);
        self.record(CombatEventKind::Despawned { id });
        Ok(())
    }

    /// Start a new round: full HP, no shield, empty gauges, idle runners, no cooldowns
    pub fn reset_round(&mut self) {
        self.round += 1;
        for combatant in self.combatants.values_mut() {
            combatant.reset();
        }
        for objective in self.objectives.values_mut() {
            objective.reset();
        }
        self.scheduler.clear();
        self.pending.clear();
        tracing::info!("round {} begins at tick {}", self.round, self.tick);
        self.record(CombatEventKind::RoundReset { round: self.round });
    }

    pub fn snapshot(&self) -> ArenaSnapshot {
        ArenaSnapshot {
            tick: self.tick,
            time: self.time(),
            round: self.round,
            combatants: self.combatants.values().map(Combatant::snapshot).collect(),
            objectives: self
                .objectives
                .values()
                .map(|o| ObjectiveSnapshot {
                    id: o.id,
                    owner_team: o.owner_team,
                    hp: o.hp(),
                    max_hp: o.max_hp(),
                    destroyed: o.is_destroyed(),
                })
                .collect(),
        }
    }

    // =========================================================
    // Direct input (engine-driven; applied at the current time)
    // =========================================================

    pub fn press(&mut self, id: CombatantId, slot: SkillSlot, aim: Option<Vec3>) -> Result<bool> {
        let now = self.time();
        self.apply_command(id, InputCommand::Press { slot, aim }, now)
    }

    pub fn release(&mut self, id: CombatantId, slot: SkillSlot) -> Result<bool> {
        let now = self.time();
        self.apply_command(id, InputCommand::Release { slot }, now)
    }

    pub fn set_aim(&mut self, id: CombatantId, point: Option<Vec3>) -> Result<()> {
        let now = self.time();
        self.apply_command(id, InputCommand::SetAim { point }, now).map(|_| ())
    }

    pub fn cast_spell(&mut self, id: CombatantId, slot: SummonerSlot) -> Result<bool> {
        let now = self.time();
        self.apply_command(id, InputCommand::CastSpell { slot }, now)
    }

    /// Deliver an animation event now and resolve its hits immediately
    pub fn anim_event(&mut self, id: CombatantId, event: CastEvent) -> Result<EventLog> {
        let now = self.time();
        self.drive(id, now, |runner, ctx| runner.anim_event(event, ctx))?;
        self.phase_damage(now);
        Ok(self.publish())
    }

    /// Apply a record from outside any skill (hazards, scripted damage)
    pub fn apply_damage(&mut self, target: CombatantId, record: DamageRecord) -> Result<DamageOutcome> {
        let now = self.time();
        self.resolve_on_combatant(target, &record, now)
            .ok_or(CombatError::UnknownCombatant(target))
    }

    // =========================================================
    // Tick
    // =========================================================

    /// Run one fixed tick and return what happened
    pub fn tick(&mut self) -> EventLog {
        self.tick += 1;
        let now = self.time();
        let dt = self.config.tick_seconds();

        // ===== PHASE 1: INPUT =====
        self.phase_input(now);

        // ===== PHASE 2: STATE MACHINES =====
        self.phase_advance(dt, now);

        // ===== PHASE 3: ANIMATION EVENTS =====
        self.phase_animation(now);

        // ===== PHASE 4: DAMAGE =====
        self.phase_damage(now);

        // ===== PHASE 5: PUBLISH =====
        self.publish()
    }

    /// Run `ticks` ticks, collecting every event
    pub fn run(&mut self, ticks: u64) -> EventLog {
        let mut all = EventLog::new();
        for _ in 0..ticks {
            all.extend(self.tick());
        }
        all
    }

    fn phase_input(&mut self, now: Seconds) {
        for entry in self.commands.drain_due(self.tick) {
            if let Err(err) = self.apply_command(entry.combatant, entry.command, now) {
                tracing::debug!("dropping {:?}: {}", entry.command, err);
            }
        }
    }

    fn phase_advance(&mut self, dt: Seconds, now: Seconds) {
        let ids: Vec<CombatantId> = self.combatants.keys().copied().collect();
        for id in ids {
            self.advance_timers(id, dt, now);

            let alive = self.combatants.get(&id).is_some_and(|c| !c.is_dead());
            if alive {
                if let Err(err) = self.drive(id, now, |runner, ctx| runner.tick(dt, ctx)) {
                    tracing::debug!("skipping runner tick for {:?}: {}", id, err);
                }
            }

            if let Some(combatant) = self.combatants.get_mut(&id) {
                combatant.walk(dt, &self.obstacles);
            }
            self.update_fall(id, now);
        }
    }

    fn advance_timers(&mut self, id: CombatantId, dt: Seconds, now: Seconds) {
        let Some(combatant) = self.combatants.get_mut(&id) else {
            return;
        };

        let expired = combatant.buffs.tick(now);
        for expiry in &expired {
            if let BuffExpiry::Barrier(amount) = expiry {
                combatant.ledger.remove_shield(*amount);
            }
        }

        let step = combatant.knockback.tick(&mut combatant.pose.position, dt, now);

        for expiry in expired {
            self.record(CombatEventKind::BuffExpired { id, expiry });
        }
        if let KnockbackStep::Ended { reattach } = step {
            self.record(CombatEventKind::KnockbackEnded { id, reattach });
        }
    }

    fn phase_animation(&mut self, now: Seconds) {
        for due in self.scheduler.pop_due(now) {
            let current = self
                .combatants
                .get(&due.combatant)
                .is_some_and(|c| c.skills.is_casting() && c.skills.cast_serial() == due.serial);
            if !current {
                continue;
            }
            if let Err(err) = self.drive(due.combatant, now, |runner, ctx| runner.anim_event(due.event, ctx)) {
                tracing::debug!("dropping {:?}: {}", due.event, err);
            }
        }
    }

    fn phase_damage(&mut self, now: Seconds) {
        let hits = std::mem::take(&mut self.pending);
        for hit in hits {
            if self.combatants.contains_key(&hit.target) {
                self.resolve_on_combatant(hit.target, &hit.record, now);
            } else if self.objectives.contains_key(&hit.target) {
                self.resolve_on_objective(hit.target, &hit.record);
            }
        }
    }

    fn publish(&mut self) -> EventLog {
        let now = self.time();
        for combatant in self.combatants.values() {
            let state = combatant.replicated();
            if self.published.get(&combatant.id()) != Some(&state) {
                self.published.insert(combatant.id(), state);
                self.log
                    .push(CombatEventKind::Replicated { id: combatant.id(), state }, self.tick, now);
            }
        }

        let log = std::mem::take(&mut self.log);
        for sink in &mut self.sinks {
            for event in log.iter() {
                sink.on_event(event);
            }
        }
        log
    }

    // =========================================================
    // Helpers
    // =========================================================

    fn allocate_id(&mut self) -> CombatantId {
        let id = CombatantId(self.next_id);
        self.next_id += 1;
        id
    }

    fn record(&mut self, kind: CombatEventKind) {
        let now = self.time();
        self.log.push(kind, self.tick, now);
    }

    fn apply_command(&mut self, id: CombatantId, command: InputCommand, now: Seconds) -> Result<bool> {
        match command {
            InputCommand::Press { slot, aim } => self.drive(id, now, |runner, ctx| runner.press(slot, aim, ctx)),
            InputCommand::Release { slot } => self.drive(id, now, |runner, ctx| runner.release(slot, ctx)),
            InputCommand::SetAim { point } => {
                let combatant = self.get_mut(id)?;
                combatant.skills.set_aim_point(point);
                combatant.spells.set_aim_point(point);
                Ok(true)
            }
            InputCommand::CastSpell { slot } => self.cast_spell_at(id, slot, now),
            InputCommand::Move { direction } => {
                self.get_mut(id)?.move_intent = direction;
                Ok(true)
            }
        }
    }

    fn get_mut(&mut self, id: CombatantId) -> Result<&mut Combatant> {
        self.combatants.get_mut(&id).ok_or(CombatError::UnknownCombatant(id))
    }

    /// Hittable things: living combatants and standing objectives
    fn target_views(&self) -> Vec<TargetView> {
        self.combatants
            .values()
            .filter(|c| !c.is_dead())
            .map(Combatant::target_view)
            .chain(
                self.objectives
                    .values()
                    .filter(|o| !o.is_destroyed())
                    .map(Objective::target_view),
            )
            .collect()
    }

    /// Run `f` on a combatant's skill runner, then collect its notifications
    fn drive<R>(
        &mut self,
        id: CombatantId,
        now: Seconds,
        f: impl FnOnce(&mut SkillRunner, &mut CastContext<'_>) -> R,
    ) -> Result<R> {
        let targets = self.target_views();
        let combatant = self
            .combatants
            .get_mut(&id)
            .ok_or(CombatError::UnknownCombatant(id))?;
        let result = combatant.with_cast_context(&targets, &self.obstacles, now, &mut self.pending, f);
        let events = combatant.skills.drain_events();
        self.absorb_skill_events(id, events, now);
        Ok(result)
    }

    fn absorb_skill_events(&mut self, id: CombatantId, events: Vec<SkillEvent>, now: Seconds) {
        for event in events {
            if let SkillEvent::CastStarted { slot, serial, .. } = event {
                self.schedule_cast(id, slot, serial, now);
            }
            self.record(CombatEventKind::Skill { id, event });
        }
    }

    /// Casts without a timeline wait for `anim_event` from the engine
    fn schedule_cast(&mut self, id: CombatantId, slot: SkillSlot, serial: u64, now: Seconds) {
        let still_casting = self
            .combatants
            .get(&id)
            .is_some_and(|c| c.skills.is_casting() && c.skills.cast_serial() == serial);
        if !still_casting {
            return;
        }
        if let Some(timeline) = self.library.get(slot).and_then(|d| d.timeline.as_ref()) {
            self.scheduler.schedule_cast(id, serial, now, timeline);
        }
    }

    fn cast_spell_at(&mut self, id: CombatantId, slot: SummonerSlot, now: Seconds) -> Result<bool> {
        let caster = self.get_mut(id)?.identity;
        let enemies: Vec<TargetView> = self
            .combatants
            .values()
            .filter(|c| c.id() != id && !c.is_dead() && !c.identity.is_same_team(&caster))
            .map(Combatant::target_view)
            .collect();

        let combatant = self.get_mut(id)?;
        let outcome = combatant.with_spell_context(&enemies, now, |runner, ctx| runner.cast(slot, ctx));

        let Some(outcome) = outcome else {
            self.record(CombatEventKind::SpellFailed { id, slot });
            return Ok(false);
        };
        if let SpellOutcome::Exhausted {
            target,
            duration,
            damage_multiplier,
            move_speed_multiplier,
        } = outcome
        {
            if let Some(victim) = self.combatants.get_mut(&target) {
                victim
                    .buffs
                    .apply_exhaust(now, duration, damage_multiplier, move_speed_multiplier);
            }
        }
        self.record(CombatEventKind::SpellCast { id, slot, outcome });
        Ok(true)
    }

    fn resolve_on_combatant(
        &mut self,
        target: CombatantId,
        record: &DamageRecord,
        now: Seconds,
    ) -> Option<DamageOutcome> {
        let combatant = self.combatants.get_mut(&target)?;
        let outcome = combatant.take_damage(record, now);
        let attacker = record.attacker.map(|a| a.identity.entity);
        self.record(CombatEventKind::Damaged {
            attacker,
            target,
            outcome,
        });
        if outcome.status == DamageStatus::Killed {
            self.handle_death(target, now);
        }
        Some(outcome)
    }

    fn resolve_on_objective(&mut self, target: CombatantId, record: &DamageRecord) {
        let Some(objective) = self.objectives.get_mut(&target) else {
            return;
        };
        let result = objective.take_damage(record);
        let reward = objective.ult_gain_on_destroy;
        let attacker = record.attacker.map(|a| a.identity.entity);
        self.record(CombatEventKind::ObjectiveHit {
            objective: target,
            attacker,
            result,
        });

        if let ObjectiveHit::Destroyed { by } = result {
            let gauge_awarded = by
                .and_then(|a| self.combatants.get_mut(&a))
                .map(|c| c.gauge.add_percent(reward))
                .unwrap_or(0.0);
            self.record(CombatEventKind::ObjectiveDestroyed {
                objective: target,
                by,
                gauge_awarded,
            });
        }
    }

    fn handle_death(&mut self, id: CombatantId, now: Seconds) {
        let Some(combatant) = self.combatants.get_mut(&id) else {
            return;
        };
        combatant.interrupt(now);
        combatant.knockback.force_stop_no_reattach();
        combatant.move_intent = None;
        let events = combatant.skills.drain_events();

        self.scheduler.cancel(id);
        self.absorb_skill_events(id, events, now);
        tracing::info!("{:?} died at tick {}", id, self.tick);
        self.record(CombatEventKind::Died { id });
    }

    fn update_fall(&mut self, id: CombatantId, now: Seconds) {
        let Some(zone) = self.fall_zone else {
            return;
        };
        let require_knockback = self.config.fall.require_knockback;
        let death_delay = self.config.fall.death_delay;
        let respawn = self.config.fall.respawn_instead_of_death;

        let Some(combatant) = self.combatants.get_mut(&id) else {
            return;
        };
        if combatant.is_dead() {
            return;
        }

        match combatant.fall {
            FallState::Grounded => {
                if !zone.is_outside(combatant.pose.position) {
                    return;
                }
                if require_knockback && !combatant.knockback.is_locked() {
                    return;
                }
                combatant.knockback.force_stop_no_reattach();
                combatant.move_intent = None;
                combatant.fall = FallState::Falling { since: now };
                combatant.interrupt(now);
                let events = combatant.skills.drain_events();

                self.scheduler.cancel(id);
                self.absorb_skill_events(id, events, now);
                tracing::debug!("{:?} fell out of the arena", id);
                self.record(CombatEventKind::FallStarted { id });
            }
            FallState::Falling { since } => {
                if now - since < death_delay {
                    return;
                }
                if respawn {
                    let position = zone.respawn_point.unwrap_or(combatant.spawn_position());
                    combatant.respawn_at(position);
                    self.record(CombatEventKind::Respawned { id, position });
                } else if combatant.ledger.kill() {
                    self.handle_death(id, now);
                }
            }
        }
    }
}
