//! Core type definitions used throughout the codebase

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Unique identifier for a spawned unit (combatant or objective)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CombatantId(pub u32);

/// Identifier of the player/client controlling a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OwnerId(pub u64);

/// Simulation tick counter
pub type Tick = u64;

/// Simulation time in seconds
pub type Seconds = f32;

/// Team membership. `None` never matches any team, including itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TeamId {
    #[default]
    None,
    Blue,
    Red,
}

/// Who controls a unit, which team it fights for, and its entity id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatIdentity {
    pub owner: OwnerId,
    pub team: TeamId,
    pub entity: CombatantId,
}

impl CombatIdentity {
    pub fn new(owner: OwnerId, team: TeamId, entity: CombatantId) -> Self {
        Self { owner, team, entity }
    }

    pub fn is_same_owner(&self, other: &CombatIdentity) -> bool {
        self.owner == other.owner
    }

    pub fn is_same_team(&self, other: &CombatIdentity) -> bool {
        self.team == other.team && self.team != TeamId::None
    }
}

/// Where a unit stands and which way it faces (horizontal forward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub forward: Vec3,
}

impl Pose {
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self {
            position,
            forward: flat_dir(forward).unwrap_or(Vec3::Z),
        }
    }

    /// Turn towards `point` by at most `max_deg`
    pub fn face_towards(&mut self, point: Vec3, max_deg: f32) {
        if flat_dir(point - self.position).is_none() {
            return;
        }
        self.forward = rotate_towards(self.forward, point - self.position, max_deg);
    }

    /// Horizontal angle between forward and the direction to `point`; 0 when on top of it
    pub fn yaw_angle_to(&self, point: Vec3) -> f32 {
        match flat_dir(point - self.position) {
            Some(dir) => angle_deg(flat(self.forward), dir),
            None => 0.0,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::Z,
        }
    }
}

/// Squared length below which a horizontal vector counts as degenerate
pub const DIRECTION_EPSILON_SQ: f32 = 0.0001;

/// Project onto the horizontal (XZ) plane
pub fn flat(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Horizontal unit direction, or `None` when the vector is (nearly) vertical or zero
pub fn flat_dir(v: Vec3) -> Option<Vec3> {
    let f = flat(v);
    if f.length_squared() < DIRECTION_EPSILON_SQ {
        None
    } else {
        Some(f.normalize())
    }
}

/// Unsigned angle between two vectors in degrees, in [0, 180]
pub fn angle_deg(a: Vec3, b: Vec3) -> f32 {
    if a.length_squared() < 1e-15 || b.length_squared() < 1e-15 {
        return 0.0;
    }
    a.cross(b).length().atan2(a.dot(b)).to_degrees()
}

/// Yaw (degrees) of a horizontal direction, measured from +Z towards +X
pub fn yaw_of(dir: Vec3) -> f32 {
    dir.x.atan2(dir.z).to_degrees()
}

/// Horizontal unit forward vector for a yaw in degrees
pub fn forward_from_yaw(yaw_deg: f32) -> Vec3 {
    let r = yaw_deg.to_radians();
    Vec3::new(r.sin(), 0.0, r.cos())
}

/// Rotate `forward` towards `target` by at most `max_deg`, staying on the horizontal plane
pub fn rotate_towards(forward: Vec3, target: Vec3, max_deg: f32) -> Vec3 {
    let (Some(from), Some(to)) = (flat_dir(forward), flat_dir(target)) else {
        return forward;
    };
    let current = yaw_of(from);
    let wanted = yaw_of(to);
    let mut delta = (wanted - current) % 360.0;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta < -180.0 {
        delta += 360.0;
    }
    if delta.abs() <= max_deg.max(0.0) {
        return to;
    }
    forward_from_yaw(current + max_deg.max(0.0) * delta.signum())
}
