//! Combat system constants - all fixed numeric rules in one place
//!
//! Tunable per-match values live in `core::config`; these are the rules themselves.

// Ultimate gauge
pub const ULT_GAUGE_MAX: f32 = 100.0;

// Knockback
/// Durations below this are raised to it so velocity stays finite
pub const MIN_KNOCKBACK_DURATION: f32 = 0.01;
/// Exponential decay rate of knockback velocity, per second
pub const KNOCKBACK_VELOCITY_DECAY: f32 = 10.0;

// Skill runner
/// Floor for max charge time and for reported cooldown durations
pub const MIN_CHARGE_TIME: f32 = 0.01;
/// Charge-derived hit and damage scales never drop below this
pub const MIN_CHARGE_SCALE: f32 = 0.01;
/// Turn rate used when a skill snaps instantly
pub const INSTANT_TURN_DEG_PER_SEC: f32 = 99_999.0;

// Hit resolution
/// Maximum collider candidates considered by one overlap query
pub const MAX_HIT_CANDIDATES: usize = 32;
/// Height of the attack origin above the attacker's feet
pub const ATTACK_ORIGIN_HEIGHT: f32 = 1.0;

// Cast move
pub const MIN_CAST_MOVE_DURATION: f32 = 0.01;
/// Extra probe length when checking a cast-move step for obstructions
pub const CAST_MOVE_PROBE_PADDING: f32 = 0.05;
/// Body radius used for the cast-move obstruction sweep
pub const CAST_MOVE_PROBE_RADIUS: f32 = 0.45;

// Bodies
/// Radius of a combatant's hittable body sphere
pub const BODY_RADIUS: f32 = 0.5;
/// Walk speed of combatants that do not specify one, units per second
pub const DEFAULT_MOVE_SPEED: f32 = 4.0;

// Summoner spells
/// Flash fails when the aim point is closer than this (squared distance)
pub const FLASH_MIN_DISTANCE_SQ: f32 = 0.01;
