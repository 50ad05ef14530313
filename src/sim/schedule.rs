//! Animation-event scheduler for headless play
//!
//! Without an animation engine, a cast's events come from its definition's
//! timeline. Each scheduled event carries the cast serial it belongs to;
//! the arena drops events whose cast is no longer current.

use serde::{Deserialize, Serialize};

use crate::core::types::{CombatantId, Seconds};
use crate::skills::definition::CastTimeline;
use crate::skills::logic::CastEvent;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimEvent {
    pub at: Seconds,
    pub combatant: CombatantId,
    pub serial: u64,
    pub event: CastEvent,
}

#[derive(Debug, Clone, Default)]
pub struct AnimScheduler {
    queue: Vec<AnimEvent>,
}

impl AnimScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue every event of `timeline`, offset from `now`
    pub fn schedule_cast(&mut self, combatant: CombatantId, serial: u64, now: Seconds, timeline: &CastTimeline) {
        let offsets = [
            (CastEvent::Start, timeline.start),
            (CastEvent::Move, timeline.move_at),
            (CastEvent::GuardStart, timeline.guard_start),
            (CastEvent::Hit, timeline.hit),
            (CastEvent::GuardEnd, timeline.guard_end),
            (CastEvent::End, Some(timeline.end)),
        ];
        for (event, offset) in offsets {
            if let Some(offset) = offset {
                self.push(AnimEvent {
                    at: now + offset.max(0.0),
                    combatant,
                    serial,
                    event,
                });
            }
        }
    }

    /// Insert after anything due at the same time
    pub fn push(&mut self, event: AnimEvent) {
        let at = self.queue.partition_point(|e| e.at <= event.at);
        self.queue.insert(at, event);
    }

    /// Remove and return everything due by `now`, earliest first
    pub fn pop_due(&mut self, now: Seconds) -> Vec<AnimEvent> {
        // Tolerate float drift between `now` and the scheduled offset
        let due = self.queue.partition_point(|e| e.at <= now + 1e-4);
        self.queue.drain(..due).collect()
    }

    pub fn cancel(&mut self, combatant: CombatantId) {
        self.queue.retain(|e| e.combatant != combatant);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
