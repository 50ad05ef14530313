//! Tick-stamped input commands
//!
//! Input adapters (network, AI, scripts) queue commands ahead of time; the
//! arena drains the ones due at the start of each tick, in queue order.

use std::collections::VecDeque;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::types::{CombatantId, Tick};
use crate::skills::SkillSlot;
use crate::spells::SummonerSlot;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputCommand {
    Press { slot: SkillSlot, aim: Option<Vec3> },
    Release { slot: SkillSlot },
    /// Per-tick aim update; `None` clears it
    SetAim { point: Option<Vec3> },
    CastSpell { slot: SummonerSlot },
    /// Walk intent; `None` stops
    Move { direction: Option<Vec3> },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedCommand {
    pub tick: Tick,
    pub combatant: CombatantId,
    pub command: InputCommand,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandLog {
    queue: VecDeque<TimedCommand>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command. Commands for the same tick keep their push order.
    pub fn push(&mut self, tick: Tick, combatant: CombatantId, command: InputCommand) {
        let entry = TimedCommand {
            tick,
            combatant,
            command,
        };
        let at = self.queue.partition_point(|c| c.tick <= tick);
        self.queue.insert(at, entry);
    }

    /// Remove and return everything due at or before `tick`
    pub fn drain_due(&mut self, tick: Tick) -> Vec<TimedCommand> {
        let due = self.queue.partition_point(|c| c.tick <= tick);
        self.queue.drain(..due).collect()
    }

    /// Drop queued commands for a combatant that left
    pub fn forget(&mut self, combatant: CombatantId) {
        self.queue.retain(|c| c.combatant != combatant);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_keeps_tick_then_push_order() {
        let mut log = CommandLog::new();
        let a = CombatantId(1);
        let b = CombatantId(2);
        log.push(5, a, InputCommand::Release { slot: SkillSlot::Q });
        log.push(2, b, InputCommand::Press { slot: SkillSlot::Q, aim: None });
        log.push(2, a, InputCommand::CastSpell { slot: SummonerSlot::D });

        let due = log.drain_due(3);
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].combatant, b);
        assert_eq!(due[1].combatant, a);
        assert_eq!(log.len(), 1);
        assert!(log.drain_due(4).is_empty());
        assert_eq!(log.drain_due(5).len(), 1);
    }

    #[test]
    fn test_forget_combatant() {
        let mut log = CommandLog::new();
        log.push(1, CombatantId(1), InputCommand::Move { direction: None });
        log.push(1, CombatantId(2), InputCommand::Move { direction: None });
        log.forget(CombatantId(1));
        assert_eq!(log.len(), 1);
    }
}
