//! Timed modifiers applied by summoner spells
//!
//! Re-applying a buff refreshes it rather than stacking.

use serde::{Deserialize, Serialize};

use crate::core::types::Seconds;

/// Reduced outgoing damage and move speed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExhaustDebuff {
    pub until: Seconds,
    pub damage_multiplier: f32,
    pub move_speed_multiplier: f32,
}

/// Move speed bonus
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GhostBuff {
    pub until: Seconds,
    /// 0.5 = +50%
    pub bonus: f32,
}

/// Temporary shield; the amount is removed from the pool on expiry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarrierBuff {
    pub until: Seconds,
    pub amount: i32,
}

/// Something that ran out this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuffExpiry {
    Exhaust,
    Ghost,
    /// Carries the shield amount to take back
    Barrier(i32),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuffState {
    pub exhaust: Option<ExhaustDebuff>,
    pub ghost: Option<GhostBuff>,
    pub barrier: Option<BarrierBuff>,
}

impl BuffState {
    pub fn apply_exhaust(&mut self, now: Seconds, duration: f32, damage_multiplier: f32, move_speed_multiplier: f32) {
        self.exhaust = Some(ExhaustDebuff {
            until: now + duration.max(0.0),
            damage_multiplier: damage_multiplier.clamp(0.01, 1.0),
            move_speed_multiplier: move_speed_multiplier.clamp(0.01, 1.0),
        });
    }

    pub fn apply_ghost(&mut self, now: Seconds, duration: f32, bonus: f32) {
        self.ghost = Some(GhostBuff {
            until: now + duration.max(0.0),
            bonus: bonus.max(0.0),
        });
    }

    /// Start (or refresh) a barrier.
    ///
    /// Returns the amount of shield the caller must add to the pool. A refresh
    /// hands back the old amount first, so the pool never holds two barriers.
    pub fn apply_barrier(&mut self, now: Seconds, duration: f32, amount: i32) -> (i32, i32) {
        let previous = self.barrier.map(|b| b.amount).unwrap_or(0);
        let amount = amount.max(0);
        self.barrier = Some(BarrierBuff {
            until: now + duration.max(0.0),
            amount,
        });
        (previous, amount)
    }

    /// Outgoing damage multiplier of an active exhaust
    pub fn exhaust_multiplier(&self) -> Option<f32> {
        self.exhaust.map(|e| e.damage_multiplier)
    }

    pub fn move_speed_multiplier(&self) -> f32 {
        let ghost = self.ghost.map(|g| 1.0 + g.bonus).unwrap_or(1.0);
        let exhaust = self.exhaust.map(|e| e.move_speed_multiplier).unwrap_or(1.0);
        ghost * exhaust
    }

    /// Drop everything that has run out
    pub fn tick(&mut self, now: Seconds) -> Vec<BuffExpiry> {
        let mut expired = Vec::new();
        if self.exhaust.is_some_and(|e| now >= e.until) {
            self.exhaust = None;
            expired.push(BuffExpiry::Exhaust);
        }
        if self.ghost.is_some_and(|g| now >= g.until) {
            self.ghost = None;
            expired.push(BuffExpiry::Ghost);
        }
        if let Some(barrier) = self.barrier {
            if now >= barrier.until {
                self.barrier = None;
                expired.push(BuffExpiry::Barrier(barrier.amount));
            }
        }
        expired
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
