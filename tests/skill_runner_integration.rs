//! Skill runner integration tests
//!
//! Exercise the cast state machine through the arena: gating, cooldowns,
//! charging, dashes, cast-moves and engine-driven animation events.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use blade_arena::core::config::CombatConfig;
use blade_arena::core::types::{CombatantId, OwnerId, TeamId};
use blade_arena::sim::{Arena, CombatEventKind, EventLog, InputCommand, SpawnParams};
use blade_arena::skills::{CastEvent, RunnerState, SkillEvent, SkillLibrary, SkillSlot};
use blade_arena::spells::SpellBook;
use glam::Vec3;

fn arena_with(library: SkillLibrary) -> Arena {
    Arena::new(
        CombatConfig::default(),
        Arc::new(library),
        Arc::new(SpellBook::standard().unwrap()),
    )
    .unwrap()
}

fn fighter(arena: &mut Arena, team: TeamId, position: Vec3, forward: Vec3) -> CombatantId {
    arena.spawn(SpawnParams::new(OwnerId(team as u64), team, position).facing(forward))
}

#[test]
fn test_press_while_busy_is_rejected() {
    let mut arena = arena_with(SkillLibrary::standard().unwrap());
    let blue = fighter(&mut arena, TeamId::Blue, Vec3::ZERO, Vec3::Z);

    assert!(arena.press(blue, SkillSlot::Primary, None).unwrap());
    assert_eq!(arena.combatant(blue).unwrap().skills.state(), RunnerState::Casting);
    assert!(!arena.press(blue, SkillSlot::E, None).unwrap());
    assert_eq!(
        arena.combatant(blue).unwrap().skills.current_slot(),
        Some(SkillSlot::Primary)
    );
}

#[test]
fn test_cooldown_starts_on_commit_and_gates_press() {
    let mut arena = arena_with(SkillLibrary::standard().unwrap());
    let blue = fighter(&mut arena, TeamId::Blue, Vec3::ZERO, Vec3::Z);

    arena.press(blue, SkillSlot::Primary, None).unwrap();
    // Cast ends at 0.45 s, cooldown is 0.5 s
    arena.run(28);
    assert_eq!(arena.combatant(blue).unwrap().skills.state(), RunnerState::Idle);
    assert!(!arena.press(blue, SkillSlot::Primary, None).unwrap());

    arena.run(5);
    assert!(arena.press(blue, SkillSlot::Primary, None).unwrap());
}

#[test]
fn test_ultimate_needs_full_gauge() {
    let mut arena = arena_with(SkillLibrary::standard().unwrap());
    let blue = fighter(&mut arena, TeamId::Blue, Vec3::ZERO, Vec3::Z);

    assert!(!arena.press(blue, SkillSlot::Ultimate, None).unwrap());
    arena.combatant_mut(blue).unwrap().gauge.add_percent(100.0);
    assert!(arena.press(blue, SkillSlot::Ultimate, None).unwrap());

    let c = arena.combatant(blue).unwrap();
    assert_eq!(c.skills.state(), RunnerState::Charging);
    assert!(c.defense.external_knockback_immune);
    // Spent at commit, not at press
    assert!(c.gauge.is_full());
}

#[test]
fn test_charge_grows_and_auto_releases() {
    let mut arena = arena_with(SkillLibrary::standard().unwrap());
    let blue = fighter(&mut arena, TeamId::Blue, Vec3::ZERO, Vec3::Z);
    arena.combatant_mut(blue).unwrap().gauge.add_percent(100.0);
    arena.press(blue, SkillSlot::Ultimate, None).unwrap();

    arena.run(30);
    let charge = arena.combatant(blue).unwrap().skills.current_charge();
    assert!(charge > 0.3 && charge < 1.0, "charge {charge}");

    // max_charge_time is 2 s
    let log = arena.run(100);
    let started: Vec<f32> = log
        .iter()
        .filter_map(|e| match &e.kind {
            CombatEventKind::Skill {
                event: SkillEvent::CastStarted { charge, .. },
                ..
            } => Some(*charge),
            _ => None,
        })
        .collect();
    assert_eq!(started.len(), 1);
    assert!((started[0] - 1.0).abs() < 1e-4);
    assert_eq!(arena.combatant(blue).unwrap().gauge.percent(), 0.0);
}

#[test]
fn test_turning_before_cast() {
    let mut arena = arena_with(SkillLibrary::standard().unwrap());
    let blue = fighter(&mut arena, TeamId::Blue, Vec3::ZERO, Vec3::Z);

    // Aim behind: 180 degrees at 720 deg/s needs a quarter second
    assert!(arena
        .press(blue, SkillSlot::Primary, Some(Vec3::new(0.0, 0.0, -3.0)))
        .unwrap());
    assert_eq!(arena.combatant(blue).unwrap().skills.state(), RunnerState::Turning);
    assert!(arena.combatant(blue).unwrap().is_movement_locked());

    arena.run(20);
    let c = arena.combatant(blue).unwrap();
    assert_ne!(c.skills.state(), RunnerState::Turning);
    assert!(c.pose.forward.z < -0.99);
}

#[test]
fn test_backward_dash_keeps_facing() {
    let mut arena = arena_with(SkillLibrary::standard().unwrap());
    let blue = fighter(&mut arena, TeamId::Blue, Vec3::ZERO, Vec3::Z);

    arena
        .press(blue, SkillSlot::Q, Some(Vec3::new(0.0, 0.0, 5.0)))
        .unwrap();
    arena.run(30);

    let c = arena.combatant(blue).unwrap();
    assert!((c.pose.position.z + 3.0).abs() < 0.01, "z = {}", c.pose.position.z);
    assert!(c.pose.forward.z > 0.99);
    assert_eq!(c.skills.state(), RunnerState::Idle);
}

#[test]
fn test_cast_move_lunges_forward() {
    let mut arena = arena_with(SkillLibrary::standard().unwrap());
    let blue = fighter(&mut arena, TeamId::Blue, Vec3::ZERO, Vec3::Z);

    arena.press(blue, SkillSlot::E, None).unwrap();
    let log = arena.run(40);

    let z = arena.combatant(blue).unwrap().pose.position.z;
    assert!(z > 1.5 && z <= 2.01, "z = {z}");
    assert!(log.iter().any(|e| matches!(
        e.kind,
        CombatEventKind::Skill {
            event: SkillEvent::CastMoveStarted { .. },
            ..
        }
    )));
}

#[test]
fn test_queued_commands_run_on_their_tick() {
    let mut arena = arena_with(SkillLibrary::standard().unwrap());
    let blue = fighter(&mut arena, TeamId::Blue, Vec3::ZERO, Vec3::Z);

    arena.queue(3, blue, InputCommand::Press { slot: SkillSlot::Primary, aim: None });
    arena.run(2);
    assert_eq!(arena.combatant(blue).unwrap().skills.state(), RunnerState::Idle);
    arena.tick();
    assert_eq!(arena.combatant(blue).unwrap().skills.state(), RunnerState::Casting);
}

#[test]
fn test_walk_blocked_while_casting() {
    let mut arena = arena_with(SkillLibrary::standard().unwrap());
    let blue = fighter(&mut arena, TeamId::Blue, Vec3::ZERO, Vec3::Z);

    arena.queue(1, blue, InputCommand::Move { direction: Some(Vec3::X) });
    arena.queue(1, blue, InputCommand::Press { slot: SkillSlot::Primary, aim: None });
    arena.run(10);
    assert_eq!(arena.combatant(blue).unwrap().pose.position.x, 0.0);

    arena.run(30);
    assert!(arena.combatant(blue).unwrap().pose.position.x > 0.0);
}

#[test]
fn test_engine_driven_events_resolve_immediately() {
    let toml_content = r#"
[[skills]]
slot = "primary"
name = "Jab"
cooldown = 0.2
base_damage = 5
animation = "Jab"

[skills.logic]
kind = "melee_attack"
"#;
    let mut arena = arena_with(SkillLibrary::parse_toml(toml_content).unwrap());
    let blue = fighter(&mut arena, TeamId::Blue, Vec3::ZERO, Vec3::Z);
    let red = fighter(&mut arena, TeamId::Red, Vec3::new(0.0, 0.0, 1.5), -Vec3::Z);

    arena.press(blue, SkillSlot::Primary, None).unwrap();
    // No timeline: nothing happens until the engine says so
    arena.run(60);
    assert_eq!(arena.combatant(red).unwrap().ledger.hp(), 100);
    assert!(arena.combatant(blue).unwrap().skills.is_casting());

    let log = arena.anim_event(blue, CastEvent::Hit).unwrap();
    assert_eq!(log.wounds().count(), 1);
    assert_eq!(arena.combatant(red).unwrap().ledger.hp(), 95);

    arena.anim_event(blue, CastEvent::End).unwrap();
    assert_eq!(arena.combatant(blue).unwrap().skills.state(), RunnerState::Idle);
}

#[test]
fn test_sinks_see_every_published_event() {
    let mut arena = arena_with(SkillLibrary::standard().unwrap());
    let shared = Rc::new(RefCell::new(EventLog::new()));
    arena.add_sink(Box::new(Rc::clone(&shared)));

    let blue = fighter(&mut arena, TeamId::Blue, Vec3::ZERO, Vec3::Z);
    arena.press(blue, SkillSlot::Primary, None).unwrap();
    let returned = arena.run(30);

    assert_eq!(shared.borrow().len(), returned.len());
    assert!(shared.borrow().iter().any(|e| matches!(
        e.kind,
        CombatEventKind::Skill {
            event: SkillEvent::CastEnded { slot: SkillSlot::Primary },
            ..
        }
    )));
}
