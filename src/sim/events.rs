//! Notifications published by the arena after every tick
//!
//! Presentation, replication and logging layers subscribe through
//! `EventSink`; the arena never waits on them.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::combat::buffs::BuffExpiry;
use crate::combat::health::DamageOutcome;
use crate::core::types::{CombatantId, Seconds, Tick};
use crate::objective::ObjectiveHit;
use crate::skills::runner::{RunnerState, SkillEvent};
use crate::spells::{SpellOutcome, SummonerSlot};

/// Values mirrored to remote observers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplicatedState {
    pub hp: i32,
    pub max_hp: i32,
    pub shield: i32,
    pub gauge: f32,
    pub state: RunnerState,
    pub dead: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEventKind {
    Spawned {
        id: CombatantId,
    },
    Despawned {
        id: CombatantId,
    },
    Skill {
        id: CombatantId,
        event: SkillEvent,
    },
    Damaged {
        attacker: Option<CombatantId>,
        target: CombatantId,
        outcome: DamageOutcome,
    },
    KnockbackEnded {
        id: CombatantId,
        reattach: bool,
    },
    SpellCast {
        id: CombatantId,
        slot: SummonerSlot,
        outcome: SpellOutcome,
    },
    SpellFailed {
        id: CombatantId,
        slot: SummonerSlot,
    },
    BuffExpired {
        id: CombatantId,
        expiry: BuffExpiry,
    },
    FallStarted {
        id: CombatantId,
    },
    Respawned {
        id: CombatantId,
        position: Vec3,
    },
    Died {
        id: CombatantId,
    },
    ObjectiveHit {
        objective: CombatantId,
        attacker: Option<CombatantId>,
        result: ObjectiveHit,
    },
    ObjectiveDestroyed {
        objective: CombatantId,
        by: Option<CombatantId>,
        gauge_awarded: f32,
    },
    /// A replicated value changed since the last publish
    Replicated {
        id: CombatantId,
        state: ReplicatedState,
    },
    RoundReset {
        round: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatEvent {
    pub tick: Tick,
    pub time: Seconds,
    pub kind: CombatEventKind,
}

/// Observer of arena events
pub trait EventSink {
    fn on_event(&mut self, event: &CombatEvent);
}

impl<S: EventSink> EventSink for Rc<RefCell<S>> {
    fn on_event(&mut self, event: &CombatEvent) {
        self.borrow_mut().on_event(event);
    }
}

/// Events accumulated over one tick (or a whole run when used as a sink)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    pub events: Vec<CombatEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: CombatEventKind, tick: Tick, time: Seconds) {
        self.events.push(CombatEvent { tick, time, kind });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CombatEvent> {
        self.events.iter()
    }

    /// Damage outcomes that took HP, in order
    pub fn wounds(&self) -> impl Iterator<Item = (Option<CombatantId>, CombatantId, &DamageOutcome)> {
        self.events.iter().filter_map(|e| match &e.kind {
            CombatEventKind::Damaged {
                attacker,
                target,
                outcome,
            } if outcome.landed() => Some((*attacker, *target, outcome)),
            _ => None,
        })
    }

    pub fn deaths(&self) -> Vec<CombatantId> {
        self.events
            .iter()
            .filter_map(|e| match e.kind {
                CombatEventKind::Died { id } => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn extend(&mut self, other: EventLog) {
        self.events.extend(other.events);
    }
}

impl EventSink for EventLog {
    fn on_event(&mut self, event: &CombatEvent) {
        self.events.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_log_as_sink() {
        let log = Rc::new(RefCell::new(EventLog::new()));
        let mut sink: Box<dyn EventSink> = Box::new(Rc::clone(&log));
        sink.on_event(&CombatEvent {
            tick: 3,
            time: 0.05,
            kind: CombatEventKind::Died { id: CombatantId(2) },
        });
        assert_eq!(log.borrow().deaths(), vec![CombatantId(2)]);
    }
}
