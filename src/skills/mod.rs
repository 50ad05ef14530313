//! Skills - definitions, hit resolution and the cast state machine
//!
//! A combatant presses a slot, turns to face its aim, optionally charges,
//! then casts. Animation events drive the cast; hit events sweep a cone and
//! emit damage records for the arena to resolve.

pub mod curve;
pub mod definition;
pub mod hit;
pub mod library;
pub mod logic;
pub mod runner;

pub use curve::{lerp, ResponseCurve};
pub use definition::{
    CastMoveConfig, CastTimeline, ChargeConfig, ChargeScale, CueTiming, FacingConfig, MoveDirection,
    SkillDefinition, SkillSlot, VfxAttach, VfxCue, WeaponPose,
};
pub use hit::{
    sweep_cone, Aabb, AttackerPose, Collider, ConeHit, HitShape, Obstacles, Obstruction, OpenField,
    TargetView, LAYER_ALL, LAYER_COMBATANT, LAYER_OBJECTIVE,
};
pub use library::SkillLibrary;
pub use logic::{
    CastContext, CastEvent, CastState, DashLogic, GuardAndAttackLogic, MeleeAttackLogic, PendingHit,
    SkillLogic,
};
pub use runner::{RunnerState, SkillEvent, SkillRunner};
