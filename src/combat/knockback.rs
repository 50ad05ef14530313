//! Knockback - forced displacement over time, with an optional input lock

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::combat::constants::{KNOCKBACK_VELOCITY_DECAY, MIN_KNOCKBACK_DURATION};
use crate::core::types::{flat_dir, Seconds};

/// What a knockback tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnockbackStep {
    /// No knockback running
    Idle,
    /// Still being pushed
    Moving,
    /// Finished this tick. `reattach` is false after a forced stop.
    Ended { reattach: bool },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnockbackController {
    locked: bool,
    active: bool,
    end_time: Seconds,
    velocity: Vec3,
    suppress_reattach: bool,
}

impl KnockbackController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Movement and skill input are gated while this is set
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn end_time(&self) -> Seconds {
        self.end_time
    }

    /// Push the defender at `position` away from `from`.
    ///
    /// When `from` coincides with the defender, the push goes backwards.
    #[allow(clippy::too_many_arguments)]
    pub fn apply(
        &mut self,
        position: Vec3,
        forward: Vec3,
        from: Vec3,
        distance: f32,
        duration: f32,
        lock_input: bool,
        now: Seconds,
    ) {
        let duration = duration.max(MIN_KNOCKBACK_DURATION);
        let dir = flat_dir(position - from)
            .or_else(|| flat_dir(-forward))
            .unwrap_or(-Vec3::Z);

        self.velocity = dir * (distance / duration);
        self.end_time = now + duration;
        self.locked = lock_input;
        self.active = true;

        tracing::debug!(
            "knockback applied: dir={:?} distance={:.2} duration={:.3} lock={}",
            dir,
            distance,
            duration,
            lock_input
        );
    }

    /// Integrate one tick of motion into `position`
    pub fn tick(&mut self, position: &mut Vec3, dt: Seconds, now: Seconds) -> KnockbackStep {
        if !self.active {
            return KnockbackStep::Idle;
        }

        *position += self.velocity * dt;

        let t = (KNOCKBACK_VELOCITY_DECAY * dt).clamp(0.0, 1.0);
        self.velocity = self.velocity.lerp(Vec3::ZERO, t);

        if now >= self.end_time {
            self.finish();
            return KnockbackStep::Ended {
                reattach: !self.suppress_reattach,
            };
        }

        KnockbackStep::Moving
    }

    /// End the knockback immediately and keep the movement agent detached.
    ///
    /// Used when the combatant starts falling or dies.
    pub fn force_stop_no_reattach(&mut self) {
        self.finish();
        self.suppress_reattach = true;
    }

    /// Clear everything, including a suppressed reattach (respawn / round reset)
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn finish(&mut self) {
        self.active = false;
        self.locked = false;
        self.velocity = Vec3::ZERO;
    }
}
