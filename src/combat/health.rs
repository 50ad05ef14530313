//! Health/shield ledger - resolves one damage record at a time
//!
//! Order of resolution:
//! invincibility -> guard -> attacker exhaust -> shield -> HP -> knockback -> gauge -> death.
//! Any step can end the resolution early.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::combat::damage::{round_damage, DamageRecord, GuardBypass};
use crate::combat::defense::DefenseState;
use crate::combat::gauge::UltGauge;
use crate::combat::knockback::KnockbackController;
use crate::core::config::{CombatConfig, KnockbackDefaults};
use crate::core::types::{flat_dir, Seconds};

/// Why a record had no effect at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IgnoreReason {
    Dead,
    Invincible,
}

/// How far a record got through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageStatus {
    /// Nothing happened
    Ignored(IgnoreReason),
    /// Guard, exhaust and/or shield soaked everything; HP untouched
    Absorbed,
    /// HP went down
    Wounded,
    /// HP reached zero
    Killed,
}

/// Full account of one `take_damage` call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageOutcome {
    pub status: DamageStatus,
    pub raw_amount: i32,
    /// A frontal guard covered this hit
    pub guarded: bool,
    pub shield_absorbed: i32,
    pub hp_lost: i32,
    pub knockback_applied: bool,
    pub gauge_gained: f32,
}

impl DamageOutcome {
    fn new(raw_amount: i32, status: DamageStatus) -> Self {
        Self {
            status,
            raw_amount,
            guarded: false,
            shield_absorbed: 0,
            hp_lost: 0,
            knockback_applied: false,
            gauge_gained: 0.0,
        }
    }

    pub fn landed(&self) -> bool {
        matches!(self.status, DamageStatus::Wounded | DamageStatus::Killed)
    }
}

/// The defender's other parts the ledger needs while resolving a hit
pub struct Defender<'a> {
    pub position: Vec3,
    pub forward: Vec3,
    pub defense: &'a DefenseState,
    pub knockback: &'a mut KnockbackController,
    pub gauge: &'a mut UltGauge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthLedger {
    hp: i32,
    max_hp: i32,
    shield: i32,
    invincible_until: Seconds,
    invincibility_time: f32,
    dead: bool,
    knockback: KnockbackDefaults,
    ult_gain_per_hp_percent: f32,
}

impl HealthLedger {
    pub fn new(max_hp: i32, config: &CombatConfig) -> Self {
        let max_hp = max_hp.max(1);
        Self {
            hp: max_hp,
            max_hp,
            shield: 0,
            invincible_until: 0.0,
            invincibility_time: config.invincibility_time,
            dead: false,
            knockback: config.knockback.clone(),
            ult_gain_per_hp_percent: config.ult_gain_per_hp_percent,
        }
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn max_hp(&self) -> i32 {
        self.max_hp
    }

    pub fn shield(&self) -> i32 {
        self.shield
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_invincible(&self, now: Seconds) -> bool {
        now < self.invincible_until
    }

    pub fn knockback_defaults(&self) -> &KnockbackDefaults {
        &self.knockback
    }

    pub fn set_knockback_defaults(&mut self, defaults: KnockbackDefaults) {
        self.knockback = defaults;
    }

    pub fn add_shield(&mut self, amount: i32) {
        self.shield += amount.max(0);
    }

    pub fn remove_shield(&mut self, amount: i32) {
        self.shield = (self.shield - amount.max(0)).max(0);
    }

    /// Kill outright (fall death). Returns false if already dead.
    pub fn kill(&mut self) -> bool {
        if self.dead {
            return false;
        }
        self.hp = 0;
        self.dead = true;
        true
    }

    /// Back to full HP, no shield, alive
    pub fn reset(&mut self) {
        self.hp = self.max_hp;
        self.shield = 0;
        self.invincible_until = 0.0;
        self.dead = false;
    }

    /// Resolve one damage record against this ledger
    pub fn take_damage(&mut self, record: &DamageRecord, defender: Defender<'_>, now: Seconds) -> DamageOutcome {
        if self.dead {
            return DamageOutcome::new(record.amount, DamageStatus::Ignored(IgnoreReason::Dead));
        }
        if self.is_invincible(now) {
            return DamageOutcome::new(record.amount, DamageStatus::Ignored(IgnoreReason::Invincible));
        }

        let mut outcome = DamageOutcome::new(record.amount, DamageStatus::Absorbed);
        let mut dmg = record.amount;

        // Guard: judged from the attacker's position, or from the hit direction for environmental hits
        let source = match &record.attacker {
            Some(attacker) => attacker.position,
            None => defender.position - flat_dir(record.hit_dir).unwrap_or(-defender.forward),
        };
        if defender.defense.guards_against(defender.position, defender.forward, source) {
            outcome.guarded = true;
            dmg = match record.guard_bypass {
                GuardBypass::None => 0,
                GuardBypass::Full => dmg,
                GuardBypass::Partial => round_damage(dmg as f32 * record.guard_pass_fraction()),
            };
        }

        if let Some(multiplier) = record.attacker.and_then(|a| a.exhaust_multiplier) {
            dmg = round_damage(dmg as f32 * multiplier);
        }

        dmg = dmg.max(0);
        if self.shield > 0 {
            let used = self.shield.min(dmg);
            self.shield -= used;
            dmg -= used;
            outcome.shield_absorbed = used;
        }
        if dmg <= 0 {
            tracing::debug!(
                "damage absorbed: raw={} guarded={} shield_used={}",
                record.amount,
                outcome.guarded,
                outcome.shield_absorbed
            );
            return outcome;
        }

        let prev_hp = self.hp;
        self.hp = (self.hp - dmg).max(0);
        self.invincible_until = now + self.invincibility_time;
        outcome.hp_lost = prev_hp - self.hp;
        outcome.status = DamageStatus::Wounded;

        if self.knockback.enabled && !defender.defense.is_knockback_immune() {
            let from = match &record.attacker {
                Some(attacker) => attacker.position,
                None => {
                    let dir = flat_dir(record.hit_dir)
                        .or_else(|| flat_dir(-defender.forward))
                        .unwrap_or(-Vec3::Z);
                    defender.position - dir
                }
            };
            let (distance, duration, lock_input) = match record.knockback {
                Some(k) => (k.distance, k.duration, k.lock_input),
                None => (self.knockback.distance, self.knockback.duration, self.knockback.lock_input),
            };
            defender.knockback.apply(
                defender.position,
                defender.forward,
                from,
                distance,
                duration,
                lock_input,
                now,
            );
            outcome.knockback_applied = true;
        }

        if outcome.hp_lost > 0 && self.max_hp > 0 {
            let lost_percent = outcome.hp_lost as f32 / self.max_hp as f32 * 100.0;
            outcome.gauge_gained = defender.gauge.add_percent(lost_percent * self.ult_gain_per_hp_percent);
        }

        if self.hp <= 0 {
            self.hp = 0;
            self.dead = true;
            outcome.status = DamageStatus::Killed;
        }

        tracing::debug!(
            "damage resolved: raw={} hp_lost={} hp={}/{} shield={} knockback={} gauge+{:.1}",
            record.amount,
            outcome.hp_lost,
            self.hp,
            self.max_hp,
            self.shield,
            outcome.knockback_applied,
            outcome.gauge_gained
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::damage::{AttackerInfo, KnockbackOverride};
    use crate::core::types::{CombatIdentity, CombatantId, OwnerId, TeamId};

    struct Parts {
        defense: DefenseState,
        knockback: KnockbackController,
        gauge: UltGauge,
    }

    impl Parts {
        fn new() -> Self {
            Self {
                defense: DefenseState::default(),
                knockback: KnockbackController::new(),
                gauge: UltGauge::new(),
            }
        }

        fn defender(&mut self) -> Defender<'_> {
            Defender {
                position: Vec3::ZERO,
                forward: Vec3::Z,
                defense: &self.defense,
                knockback: &mut self.knockback,
                gauge: &mut self.gauge,
            }
        }
    }

    fn attacker_at(position: Vec3) -> AttackerInfo {
        AttackerInfo {
            identity: CombatIdentity::new(OwnerId(9), TeamId::Red, CombatantId(9)),
            position,
            exhaust_multiplier: None,
        }
    }

    fn hit_from_front(amount: i32) -> DamageRecord {
        DamageRecord::from_attacker(attacker_at(Vec3::new(0.0, 0.0, 2.0)), amount, Vec3::ZERO, -Vec3::Z)
    }

    fn no_knockback_config() -> CombatConfig {
        let mut config = CombatConfig::default();
        config.knockback.enabled = false;
        config
    }

    #[test]
    fn test_plain_hit_reduces_hp_and_fills_gauge() {
        let mut ledger = HealthLedger::new(100, &no_knockback_config());
        let mut parts = Parts::new();

        let outcome = ledger.take_damage(&hit_from_front(30), parts.defender(), 0.0);

        assert_eq!(ledger.hp(), 70);
        assert_eq!(outcome.hp_lost, 30);
        assert_eq!(outcome.status, DamageStatus::Wounded);
        assert!(!outcome.knockback_applied);
        assert!((parts.gauge.percent() - 45.0).abs() < 1e-4);
    }

    #[test]
    fn test_shield_absorbs_first() {
        let mut ledger = HealthLedger::new(100, &CombatConfig::default());
        ledger.add_shield(10);
        let mut parts = Parts::new();

        let outcome = ledger.take_damage(&hit_from_front(30), parts.defender(), 0.0);

        assert_eq!(ledger.shield(), 0);
        assert_eq!(ledger.hp(), 80);
        assert_eq!(outcome.shield_absorbed, 10);
        assert!(outcome.knockback_applied);
        assert!((parts.gauge.percent() - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_fully_absorbed_hit_has_no_side_effects() {
        let mut ledger = HealthLedger::new(100, &CombatConfig::default());
        ledger.add_shield(50);
        let mut parts = Parts::new();

        let outcome = ledger.take_damage(&hit_from_front(30), parts.defender(), 0.0);

        assert_eq!(outcome.status, DamageStatus::Absorbed);
        assert_eq!(ledger.shield(), 20);
        assert_eq!(ledger.hp(), 100);
        assert!(!parts.knockback.is_active());
        assert_eq!(parts.gauge.percent(), 0.0);
    }

    #[test]
    fn test_frontal_guard_blocks_unbypassed_hit() {
        let mut ledger = HealthLedger::new(100, &CombatConfig::default());
        ledger.add_shield(5);
        let mut parts = Parts::new();
        parts.defense.guard_active = true;

        let outcome = ledger.take_damage(&hit_from_front(30), parts.defender(), 0.0);

        assert!(outcome.guarded);
        assert_eq!(outcome.status, DamageStatus::Absorbed);
        assert_eq!(ledger.hp(), 100);
        assert_eq!(ledger.shield(), 5);
        assert!(!parts.knockback.is_active());
    }

    #[test]
    fn test_guard_does_not_cover_back() {
        let mut ledger = HealthLedger::new(100, &no_knockback_config());
        let mut parts = Parts::new();
        parts.defense.guard_active = true;

        let record = DamageRecord::from_attacker(attacker_at(Vec3::new(0.0, 0.0, -2.0)), 30, Vec3::ZERO, Vec3::Z);
        let outcome = ledger.take_damage(&record, parts.defender(), 0.0);

        assert!(!outcome.guarded);
        assert_eq!(ledger.hp(), 70);
    }

    #[test]
    fn test_partial_bypass_halves() {
        let mut ledger = HealthLedger::new(100, &no_knockback_config());
        let mut parts = Parts::new();
        parts.defense.guard_active = true;

        let record = hit_from_front(30).with_guard_bypass(GuardBypass::Partial, 0.5);
        ledger.take_damage(&record, parts.defender(), 0.0);
        assert_eq!(ledger.hp(), 85);

        // 25 * 0.5 = 12.5 rounds to even
        let record = hit_from_front(25).with_guard_bypass(GuardBypass::Partial, 0.5);
        ledger.take_damage(&record, parts.defender(), 0.0);
        assert_eq!(ledger.hp(), 73);
    }

    #[test]
    fn test_full_bypass_ignores_guard() {
        let mut ledger = HealthLedger::new(100, &no_knockback_config());
        let mut parts = Parts::new();
        parts.defense.guard_active = true;

        let record = hit_from_front(30).with_guard_bypass(GuardBypass::Full, 0.0);
        let outcome = ledger.take_damage(&record, parts.defender(), 0.0);
        assert!(outcome.guarded);
        assert_eq!(ledger.hp(), 70);
    }

    #[test]
    fn test_exhausted_attacker_deals_less() {
        let mut ledger = HealthLedger::new(100, &no_knockback_config());
        let mut parts = Parts::new();
        let mut attacker = attacker_at(Vec3::new(0.0, 0.0, 2.0));
        attacker.exhaust_multiplier = Some(0.5);

        let record = DamageRecord::from_attacker(attacker, 30, Vec3::ZERO, -Vec3::Z);
        ledger.take_damage(&record, parts.defender(), 0.0);
        assert_eq!(ledger.hp(), 85);
    }

    #[test]
    fn test_invincibility_window() {
        let mut config = no_knockback_config();
        config.invincibility_time = 0.5;
        let mut ledger = HealthLedger::new(100, &config);
        let mut parts = Parts::new();

        ledger.take_damage(&hit_from_front(10), parts.defender(), 1.0);
        let outcome = ledger.take_damage(&hit_from_front(10), parts.defender(), 1.2);
        assert_eq!(outcome.status, DamageStatus::Ignored(IgnoreReason::Invincible));
        assert_eq!(ledger.hp(), 90);

        ledger.take_damage(&hit_from_front(10), parts.defender(), 1.5);
        assert_eq!(ledger.hp(), 80);
    }

    #[test]
    fn test_death_is_terminal() {
        let mut ledger = HealthLedger::new(50, &no_knockback_config());
        let mut parts = Parts::new();

        let outcome = ledger.take_damage(&hit_from_front(80), parts.defender(), 0.0);
        assert_eq!(outcome.status, DamageStatus::Killed);
        assert_eq!(outcome.hp_lost, 50);
        assert_eq!(ledger.hp(), 0);
        assert!(ledger.is_dead());

        let outcome = ledger.take_damage(&hit_from_front(10), parts.defender(), 1.0);
        assert_eq!(outcome.status, DamageStatus::Ignored(IgnoreReason::Dead));

        ledger.reset();
        assert_eq!(ledger.hp(), 50);
        assert!(!ledger.is_dead());
    }

    #[test]
    fn test_environmental_hit_knocks_back_along_hit_dir() {
        let mut ledger = HealthLedger::new(100, &CombatConfig::default());
        let mut parts = Parts::new();

        let record = DamageRecord::environmental(10, Vec3::ZERO, Vec3::X);
        let outcome = ledger.take_damage(&record, parts.defender(), 0.0);

        assert!(outcome.knockback_applied);
        assert!(parts.knockback.velocity().x > 0.0);
    }

    #[test]
    fn test_knockback_override_is_used() {
        let mut ledger = HealthLedger::new(100, &CombatConfig::default());
        let mut parts = Parts::new();

        let record = hit_from_front(10).with_knockback(KnockbackOverride {
            distance: 4.0,
            duration: 0.5,
            lock_input: false,
        });
        ledger.take_damage(&record, parts.defender(), 0.0);

        assert!((parts.knockback.velocity().length() - 8.0).abs() < 1e-4);
        assert!(!parts.knockback.is_locked());
        assert!((parts.knockback.end_time() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_immune_defender_not_knocked_back() {
        let mut ledger = HealthLedger::new(100, &CombatConfig::default());
        let mut parts = Parts::new();
        parts.defense.external_knockback_immune = true;

        let outcome = ledger.take_damage(&hit_from_front(10), parts.defender(), 0.0);
        assert_eq!(ledger.hp(), 90);
        assert!(!outcome.knockback_applied);
        assert!(!parts.knockback.is_active());
    }

    #[test]
    fn test_remove_shield_clamps() {
        let mut ledger = HealthLedger::new(100, &CombatConfig::default());
        ledger.add_shield(10);
        ledger.add_shield(-5);
        assert_eq!(ledger.shield(), 10);
        ledger.remove_shield(16);
        assert_eq!(ledger.shield(), 0);
    }
}
