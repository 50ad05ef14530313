//! Damage pipeline integration tests
//!
//! Drives hits through the arena and checks the ledger, guard, shield,
//! knockback and gauge side effects end-to-end.

use std::sync::Arc;

use blade_arena::combat::{DamageRecord, DamageStatus};
use blade_arena::core::config::CombatConfig;
use blade_arena::core::types::{CombatantId, OwnerId, TeamId};
use blade_arena::objective::AccessRule;
use blade_arena::sim::{Arena, CombatEventKind, EventLog, FallZone, SpawnParams};
use blade_arena::skills::{SkillLibrary, SkillSlot};
use blade_arena::spells::{SpellBook, SpellEffect, SummonerSlot, SummonerSpellDefinition};
use glam::Vec3;

/// Blue at the origin facing +Z, red 1.5 m ahead facing back
fn duel(config: CombatConfig) -> (Arena, CombatantId, CombatantId) {
    let mut arena = Arena::new(
        config,
        Arc::new(SkillLibrary::standard().unwrap()),
        Arc::new(SpellBook::standard().unwrap()),
    )
    .unwrap();
    let blue = arena.spawn(SpawnParams::new(OwnerId(1), TeamId::Blue, Vec3::ZERO).facing(Vec3::Z));
    let red = arena.spawn(SpawnParams::new(OwnerId(2), TeamId::Red, Vec3::new(0.0, 0.0, 1.5)).facing(-Vec3::Z));
    (arena, blue, red)
}

fn damage_to(log: &EventLog, target: CombatantId) -> Vec<blade_arena::combat::DamageOutcome> {
    log.iter()
        .filter_map(|e| match &e.kind {
            CombatEventKind::Damaged { target: t, outcome, .. } if *t == target => Some(*outcome),
            _ => None,
        })
        .collect()
}

#[test]
fn test_primary_hit_wounds_and_fills_gauge() {
    let (mut arena, blue, red) = duel(CombatConfig::default());
    assert!(arena.press(blue, SkillSlot::Primary, None).unwrap());

    let log = arena.run(20);
    let outcomes = damage_to(&log, red);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].hp_lost, 8);
    assert!(outcomes[0].knockback_applied);

    let red = arena.combatant(red).unwrap();
    assert_eq!(red.ledger.hp(), 92);
    // 8% of max HP lost at 1.5 gauge per percent
    assert!((red.gauge.percent() - 12.0).abs() < 1e-3);
}

#[test]
fn test_scenario_thirty_damage_no_knockback() {
    let mut config = CombatConfig::default();
    config.knockback.enabled = false;
    let (mut arena, _, red) = duel(config);

    let record = DamageRecord::environmental(30, Vec3::new(0.0, 1.0, 1.5), Vec3::Z);
    let outcome = arena.apply_damage(red, record).unwrap();
    assert_eq!(outcome.status, DamageStatus::Wounded);
    assert!(!outcome.knockback_applied);

    let red = arena.combatant(red).unwrap();
    assert_eq!(red.ledger.hp(), 70);
    assert!((red.gauge.percent() - 45.0).abs() < 1e-3);
}

#[test]
fn test_scenario_shield_soaks_first() {
    let (mut arena, _, red) = duel(CombatConfig::default());
    arena.combatant_mut(red).unwrap().ledger.add_shield(10);

    let record = DamageRecord::environmental(30, Vec3::ZERO, Vec3::Z);
    let outcome = arena.apply_damage(red, record).unwrap();
    assert_eq!(outcome.shield_absorbed, 10);
    assert_eq!(outcome.hp_lost, 20);

    let red = arena.combatant(red).unwrap();
    assert_eq!(red.ledger.shield(), 0);
    assert_eq!(red.ledger.hp(), 80);
}

#[test]
fn test_frontal_guard_blocks_primary() {
    let (mut arena, blue, red) = duel(CombatConfig::default());
    // Parry Strike raises its guard 0.05 s in; the slash lands at 0.2 s
    assert!(arena.press(red, SkillSlot::W, None).unwrap());
    assert!(arena.press(blue, SkillSlot::Primary, None).unwrap());

    let log = arena.run(20);
    let outcomes = damage_to(&log, red);
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].guarded);
    assert_eq!(outcomes[0].status, DamageStatus::Absorbed);
    assert!(!outcomes[0].knockback_applied);

    let red_state = arena.combatant(red).unwrap();
    assert_eq!(red_state.ledger.hp(), 100);
    assert_eq!(red_state.gauge.percent(), 0.0);
    assert!(!red_state.knockback.is_locked());
}

#[test]
fn test_uncharged_ultimate_fires_at_minimum_damage() {
    let (mut arena, blue, red) = duel(CombatConfig::default());
    arena.combatant_mut(blue).unwrap().gauge.add_percent(100.0);

    assert!(arena.press(blue, SkillSlot::Ultimate, None).unwrap());
    assert!(arena.release(blue, SkillSlot::Ultimate).unwrap());
    assert_eq!(arena.combatant(blue).unwrap().gauge.percent(), 0.0);

    let log = arena.run(30);
    let outcomes = damage_to(&log, red);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].hp_lost, 20);
    assert!(outcomes[0].knockback_applied);
    assert!(arena.combatant(red).unwrap().pose.position.z > 1.5);
}

#[test]
fn test_ultimate_partially_bypasses_guard() {
    let (mut arena, blue, red) = duel(CombatConfig::default());
    arena.combatant_mut(blue).unwrap().gauge.add_percent(100.0);
    arena.combatant_mut(red).unwrap().defense.guard_active = true;

    arena.press(blue, SkillSlot::Ultimate, None).unwrap();
    arena.release(blue, SkillSlot::Ultimate).unwrap();

    let log = arena.run(30);
    let outcomes = damage_to(&log, red);
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].guarded);
    assert_eq!(outcomes[0].hp_lost, 10);
}

#[test]
fn test_exhausted_attacker_deals_half() {
    let mut book = SpellBook::new();
    book.insert(SummonerSpellDefinition {
        slot: SummonerSlot::F,
        name: "Exhaust".into(),
        cooldown: 30.0,
        effect: SpellEffect::Exhaust {
            duration: 3.0,
            move_speed_multiplier: 0.5,
            damage_multiplier: 0.5,
        },
    });
    let mut arena = Arena::new(
        CombatConfig::default(),
        Arc::new(SkillLibrary::standard().unwrap()),
        Arc::new(book),
    )
    .unwrap();
    let blue = arena.spawn(SpawnParams::new(OwnerId(1), TeamId::Blue, Vec3::ZERO));
    let red = arena.spawn(SpawnParams::new(OwnerId(2), TeamId::Red, Vec3::new(0.0, 0.0, 1.5)).facing(-Vec3::Z));

    assert!(arena.cast_spell(blue, SummonerSlot::F).unwrap());
    assert!(arena.combatant(red).unwrap().buffs.exhaust.is_some());

    arena.press(red, SkillSlot::Primary, None).unwrap();
    let log = arena.run(20);
    let outcomes = damage_to(&log, blue);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].hp_lost, 4);
}

#[test]
fn test_destroying_objective_pays_gauge() {
    let (mut arena, blue, red) = duel(CombatConfig::default());
    arena.despawn(red).unwrap();
    let crystal = arena.add_objective(TeamId::Red, AccessRule::EnemyOnly, Vec3::new(0.0, 0.0, 1.5));

    arena.press(blue, SkillSlot::Primary, None).unwrap();
    arena.run(40);
    assert_eq!(arena.objective(crystal).unwrap().hp(), 8);

    arena.press(blue, SkillSlot::Primary, None).unwrap();
    let log = arena.run(20);
    assert!(log.iter().any(|e| matches!(
        e.kind,
        CombatEventKind::ObjectiveDestroyed { objective, by: Some(by), .. } if objective == crystal && by == blue
    )));
    assert!(arena.objective(crystal).unwrap().is_destroyed());
    assert!((arena.combatant(blue).unwrap().gauge.percent() - 34.0).abs() < 1e-3);
}

#[test]
fn test_knockback_ring_out() {
    let mut config = CombatConfig::default();
    config.fall.require_knockback = true;
    let (mut arena, blue, red) = duel(config);
    arena.set_fall_zone(Some(FallZone::new(Vec3::ZERO, 1.8)));

    arena.press(blue, SkillSlot::Primary, None).unwrap();
    let log = arena.run(20);
    assert!(log
        .iter()
        .any(|e| matches!(e.kind, CombatEventKind::FallStarted { id } if id == red)));

    let log = arena.run(70);
    assert_eq!(log.deaths(), vec![red]);
    assert!(!arena.combatant(blue).unwrap().is_dead());
}

#[test]
fn test_dead_combatant_ignores_damage() {
    let (mut arena, _, red) = duel(CombatConfig::default());
    let kill = DamageRecord::environmental(500, Vec3::ZERO, Vec3::Z);
    assert_eq!(arena.apply_damage(red, kill.clone()).unwrap().status, DamageStatus::Killed);

    let again = arena.apply_damage(red, kill).unwrap();
    assert!(matches!(again.status, DamageStatus::Ignored(_)));
    assert_eq!(arena.combatant(red).unwrap().ledger.hp(), 0);
}
