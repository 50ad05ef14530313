//! Simulation - combatants, the arena tick loop and its inputs/outputs

pub mod arena;
pub mod combatant;
pub mod command;
pub mod events;
pub mod schedule;

pub use arena::{Arena, ArenaSnapshot, FallZone, ObjectiveSnapshot};
pub use combatant::{Combatant, CombatantSnapshot, FallState, SpawnParams};
pub use command::{CommandLog, InputCommand, TimedCommand};
pub use events::{CombatEvent, CombatEventKind, EventLog, EventSink, ReplicatedState};
pub use schedule::{AnimEvent, AnimScheduler};
