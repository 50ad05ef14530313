//! Headless Duel Simulator
//!
//! Plays seeded-random duels between two combatants and prints a JSON or
//! text summary. Same seed, same data, same result.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use blade_arena::core::config::CombatConfig;
use blade_arena::core::error::Result;
use blade_arena::core::types::{CombatantId, OwnerId, TeamId, Tick};
use blade_arena::sim::{Arena, CombatEvent, CombatEventKind, FallZone, InputCommand, SpawnParams};
use blade_arena::skills::{RunnerState, SkillEvent, SkillLibrary, SkillSlot};
use blade_arena::spells::{SpellBook, SummonerSlot};
use clap::Parser;
use glam::Vec3;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// Headless Duel Simulator - scripted 1v1 fights for balance checks
#[derive(Parser, Debug)]
#[command(name = "duel_sim")]
#[command(about = "Run seeded 1v1 duels and print a summary")]
struct Args {
    /// Directory holding combat.toml, skills.toml and spells.toml
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Maximum ticks per round before calling a draw
    #[arg(long, default_value_t = 3600)]
    ticks: u64,

    /// Rounds to play
    #[arg(long, default_value_t = 1)]
    rounds: u32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Arena radius; beyond it combatants fall (0 = no edge)
    #[arg(long, default_value_t = 0.0)]
    fall_radius: f32,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Write every event as JSON to this file
    #[arg(long)]
    events: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Debug, Default, Serialize)]
struct FighterStats {
    team: String,
    damage_dealt: i32,
    damage_taken: i32,
    hits_landed: u32,
    casts: BTreeMap<String, u32>,
    spells_cast: u32,
    deaths: u32,
    rounds_won: u32,
}

#[derive(Debug, Serialize)]
struct RoundResult {
    round: u32,
    winner: String,
    ticks: Tick,
}

#[derive(Debug, Serialize)]
struct DuelSummary {
    seed: u64,
    rounds: Vec<RoundResult>,
    fighters: BTreeMap<String, FighterStats>,
}

/// One side's random controller
struct Brain {
    id: CombatantId,
    opponent: CombatantId,
    /// Tick at which a held charge is released
    release_at: Option<Tick>,
}

impl Brain {
    fn decide(&mut self, arena: &Arena, rng: &mut ChaCha8Rng, tick: Tick) -> Vec<InputCommand> {
        let (Some(me), Some(foe)) = (arena.combatant(self.id), arena.combatant(self.opponent)) else {
            return Vec::new();
        };
        if me.is_dead() {
            return Vec::new();
        }

        let target = foe.pose.position;
        let mut commands = vec![InputCommand::SetAim { point: Some(target) }];

        if me.skills.state() == RunnerState::Charging {
            if let (Some(slot), Some(at)) = (me.skills.current_slot(), self.release_at) {
                if tick >= at {
                    self.release_at = None;
                    commands.push(InputCommand::Release { slot });
                }
            }
            return commands;
        }
        if me.skills.is_busy() {
            return commands;
        }

        let to_foe = target - me.pose.position;
        let distance = to_foe.length();
        if distance > 2.2 {
            commands.push(InputCommand::Move { direction: Some(to_foe) });
            if distance > 6.0 && rng.gen_bool(0.02) {
                commands.push(InputCommand::CastSpell { slot: SummonerSlot::D });
            }
            return commands;
        }
        commands.push(InputCommand::Move { direction: None });

        let now = arena.time();
        if me.gauge.is_full() {
            self.release_at = Some(tick + rng.gen_range(10..90));
            commands.push(InputCommand::Press {
                slot: SkillSlot::Ultimate,
                aim: Some(target),
            });
            return commands;
        }

        if rng.gen_bool(0.15) {
            let ready: Vec<SkillSlot> = [SkillSlot::Primary, SkillSlot::Q, SkillSlot::W, SkillSlot::E]
                .into_iter()
                .filter(|slot| me.skills.cooldown_remaining(*slot, now) <= 0.0)
                .collect();
            if !ready.is_empty() {
                let slot = ready[rng.gen_range(0..ready.len())];
                commands.push(InputCommand::Press {
                    slot,
                    aim: Some(target),
                });
            }
        }
        if rng.gen_bool(0.005) {
            commands.push(InputCommand::CastSpell { slot: SummonerSlot::F });
        }
        commands
    }
}

fn load_config(dir: &Path) -> Result<CombatConfig> {
    let path = dir.join("combat.toml");
    if path.exists() {
        CombatConfig::load(&path)
    } else {
        Ok(CombatConfig::default())
    }
}

fn load_library(dir: &Path) -> Result<SkillLibrary> {
    let path = dir.join("skills.toml");
    if path.exists() {
        SkillLibrary::load_from_toml(&path)
    } else {
        SkillLibrary::standard()
    }
}

fn load_spells(dir: &Path) -> Result<SpellBook> {
    let path = dir.join("spells.toml");
    if path.exists() {
        SpellBook::load_from_toml(&path)
    } else {
        SpellBook::standard()
    }
}

fn team_name(team: TeamId) -> String {
    format!("{:?}", team).to_lowercase()
}

fn tally(stats: &mut BTreeMap<CombatantId, FighterStats>, event: &CombatEvent) {
    match &event.kind {
        CombatEventKind::Damaged {
            attacker,
            target,
            outcome,
        } => {
            if let Some(s) = stats.get_mut(target) {
                s.damage_taken += outcome.hp_lost;
            }
            if let Some(s) = attacker.and_then(|a| stats.get_mut(&a)) {
                s.damage_dealt += outcome.hp_lost;
                if outcome.landed() {
                    s.hits_landed += 1;
                }
            }
        }
        CombatEventKind::Skill {
            id,
            event: SkillEvent::CastStarted { slot, .. },
        } => {
            if let Some(s) = stats.get_mut(id) {
                *s.casts.entry(slot.to_string()).or_default() += 1;
            }
        }
        CombatEventKind::SpellCast { id, .. } => {
            if let Some(s) = stats.get_mut(id) {
                s.spells_cast += 1;
            }
        }
        CombatEventKind::Died { id } => {
            if let Some(s) = stats.get_mut(id) {
                s.deaths += 1;
            }
        }
        _ => {}
    }
}

fn run(args: &Args, seed: u64) -> Result<DuelSummary> {
    let config = load_config(&args.data_dir)?;
    let library = Arc::new(load_library(&args.data_dir)?);
    let spells = Arc::new(load_spells(&args.data_dir)?);
    let mut arena = Arena::new(config, library, spells)?;
    if args.fall_radius > 0.0 {
        arena.set_fall_zone(Some(FallZone::new(Vec3::ZERO, args.fall_radius)));
    }

    let blue = arena.spawn(SpawnParams::new(OwnerId(1), TeamId::Blue, Vec3::new(0.0, 0.0, -3.0)).facing(Vec3::Z));
    let red = arena.spawn(SpawnParams::new(OwnerId(2), TeamId::Red, Vec3::new(0.0, 0.0, 3.0)).facing(-Vec3::Z));

    let mut brains = [
        Brain {
            id: blue,
            opponent: red,
            release_at: None,
        },
        Brain {
            id: red,
            opponent: blue,
            release_at: None,
        },
    ];
    let mut stats: BTreeMap<CombatantId, FighterStats> = BTreeMap::new();
    for (id, team) in [(blue, TeamId::Blue), (red, TeamId::Red)] {
        stats.insert(
            id,
            FighterStats {
                team: team_name(team),
                ..Default::default()
            },
        );
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rounds = Vec::new();
    let mut all_events: Vec<CombatEvent> = Vec::new();

    for round in 1..=args.rounds.max(1) {
        if round > 1 {
            arena.reset_round();
        }
        let round_start = arena.current_tick();
        let mut winner = None;

        while arena.current_tick() - round_start < args.ticks {
            let next = arena.current_tick() + 1;
            for brain in brains.iter_mut() {
                for command in brain.decide(&arena, &mut rng, next) {
                    arena.queue(next, brain.id, command);
                }
            }

            let log = arena.tick();
            for event in log.iter() {
                tally(&mut stats, event);
            }
            if args.events.is_some() {
                all_events.extend(log.events);
            }

            let teams = arena.snapshot().living_teams();
            if teams.len() < 2 {
                winner = teams.first().copied();
                break;
            }
        }

        let winner_name = winner.map(team_name).unwrap_or_else(|| "draw".to_string());
        tracing::info!("round {} won by {}", round, winner_name);
        if let Some(team) = winner {
            for s in stats.values_mut().filter(|s| s.team == team_name(team)) {
                s.rounds_won += 1;
            }
        }
        rounds.push(RoundResult {
            round,
            winner: winner_name,
            ticks: arena.current_tick() - round_start,
        });
    }

    if let Some(path) = &args.events {
        std::fs::write(path, serde_json::to_string_pretty(&all_events)?)?;
    }

    Ok(DuelSummary {
        seed,
        rounds,
        fighters: stats.into_values().map(|s| (s.team.clone(), s)).collect(),
    })
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("blade_arena={}", default_level))),
        )
        .with_writer(std::io::stderr)
        .init();

    let seed = args.seed.unwrap_or_else(rand::random);

    let summary = match run(&args, seed) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match args.format.as_str() {
        "text" => {
            println!("Duel Result (seed {})", summary.seed);
            println!("==========");
            for round in &summary.rounds {
                println!("Round {}: {} after {} ticks", round.round, round.winner, round.ticks);
            }
            for (name, s) in &summary.fighters {
                println!(
                    "{}: dealt {} taken {} hits {} deaths {} rounds won {}",
                    name, s.damage_dealt, s.damage_taken, s.hits_landed, s.deaths, s.rounds_won
                );
            }
        }
        _ => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    }
}
