//! Melee cone sweep
//!
//! An overlap sphere in front of the attacker collects candidate colliders;
//! each owning target is then accepted at most once if it lies inside the
//! cone and reach, and optionally only with a clear line of sight.

use ahash::AHashSet;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::combat::constants::{ATTACK_ORIGIN_HEIGHT, MAX_HIT_CANDIDATES};
use crate::core::types::{angle_deg, flat, flat_dir, CombatantId};

/// Layer bit for combatants
pub const LAYER_COMBATANT: u32 = 1 << 0;
/// Layer bit for destructible objectives
pub const LAYER_OBJECTIVE: u32 = 1 << 1;
pub const LAYER_ALL: u32 = u32::MAX;

/// Sphere collider attached to a target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub center: Vec3,
    pub radius: f32,
}

impl Collider {
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        let offset = p - self.center;
        let len = offset.length();
        if len <= self.radius || len < 1e-6 {
            p
        } else {
            self.center + offset * (self.radius / len)
        }
    }

    fn overlaps_sphere(&self, center: Vec3, radius: f32) -> bool {
        let reach = self.radius + radius;
        self.center.distance_squared(center) <= reach * reach
    }
}

/// A hittable thing as seen by the sweep
#[derive(Debug, Clone, PartialEq)]
pub struct TargetView {
    pub id: CombatantId,
    /// Root (feet) position used for the cone and reach tests
    pub root: Vec3,
    pub layer: u32,
    pub colliders: Vec<Collider>,
}

/// Cone geometry of a melee hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitShape {
    pub range: f32,
    pub radius: f32,
    /// Full cone width; a target is accepted within half of it
    pub angle_deg: f32,
    pub target_mask: u32,
    pub check_line_of_sight: bool,
}

impl Default for HitShape {
    fn default() -> Self {
        Self {
            range: 2.0,
            radius: 1.2,
            angle_deg: 90.0,
            target_mask: LAYER_COMBATANT | LAYER_OBJECTIVE,
            check_line_of_sight: false,
        }
    }
}

/// Static geometry that can block sight lines and cast-moves
pub trait Obstruction {
    /// Does anything lie on the segment between the two points?
    fn segment_blocked(&self, from: Vec3, to: Vec3) -> bool;

    /// Would a sphere of `radius` moving `distance` along `dir` hit anything?
    fn sweep_blocked(&self, from: Vec3, dir: Vec3, radius: f32, distance: f32) -> bool {
        let _ = radius;
        self.segment_blocked(from, from + dir * distance)
    }
}

/// An empty world
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenField;

impl Obstruction for OpenField {
    fn segment_blocked(&self, _from: Vec3, _to: Vec3) -> bool {
        false
    }

    fn sweep_blocked(&self, _from: Vec3, _dir: Vec3, _radius: f32, _distance: f32) -> bool {
        false
    }
}

/// Axis-aligned box obstacle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn inflated(&self, by: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(by),
            max: self.max + Vec3::splat(by),
        }
    }

    /// Slab test of the segment `from -> to`
    pub fn intersects_segment(&self, from: Vec3, to: Vec3) -> bool {
        let d = to - from;
        let mut t_min = 0.0_f32;
        let mut t_max = 1.0_f32;
        for axis in 0..3 {
            let (o, dir, lo, hi) = (from[axis], d[axis], self.min[axis], self.max[axis]);
            if dir.abs() < 1e-8 {
                if o < lo || o > hi {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / dir;
            let (mut t0, mut t1) = ((lo - o) * inv, (hi - o) * inv);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return false;
            }
        }
        true
    }
}

/// A set of box obstacles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Obstacles {
    pub boxes: Vec<Aabb>,
}

impl Obstacles {
    pub fn new(boxes: Vec<Aabb>) -> Self {
        Self { boxes }
    }
}

impl Obstruction for Obstacles {
    fn segment_blocked(&self, from: Vec3, to: Vec3) -> bool {
        self.boxes.iter().any(|b| b.intersects_segment(from, to))
    }

    fn sweep_blocked(&self, from: Vec3, dir: Vec3, radius: f32, distance: f32) -> bool {
        let to = from + dir * distance;
        self.boxes
            .iter()
            .any(|b| b.inflated(radius.max(0.0)).intersects_segment(from, to))
    }
}

/// Attacker pose at the moment of the hit event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackerPose {
    pub id: CombatantId,
    pub position: Vec3,
    pub forward: Vec3,
}

/// One accepted target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeHit {
    pub target: CombatantId,
    pub hit_point: Vec3,
    /// Horizontal unit direction attacker -> target
    pub hit_dir: Vec3,
}

/// Run one cone sweep.
///
/// `seen` is the caller's per-hit dedup buffer; it is cleared on entry.
/// The order of the returned hits is not meaningful.
pub fn sweep_cone(
    attacker: &AttackerPose,
    shape: &HitShape,
    hit_scale: f32,
    targets: &[TargetView],
    obstruction: &dyn Obstruction,
    seen: &mut AHashSet<CombatantId>,
) -> Vec<ConeHit> {
    seen.clear();

    let origin = attacker.position + Vec3::Y * ATTACK_ORIGIN_HEIGHT;
    let forward = flat_dir(attacker.forward).unwrap_or(Vec3::Z);
    let scaled_radius = shape.radius * hit_scale;
    let center = origin + forward * (shape.range * 0.5);
    let half_angle = shape.angle_deg * 0.5;
    let reach = shape.range + scaled_radius;

    // Overlap query: colliders touching the sphere, capped like a fixed physics buffer
    let candidates = targets
        .iter()
        .filter(|t| t.layer & shape.target_mask != 0)
        .flat_map(|t| t.colliders.iter().map(move |c| (t, c)))
        .filter(|(_, c)| c.overlaps_sphere(center, scaled_radius))
        .take(MAX_HIT_CANDIDATES);

    let mut hits = Vec::new();
    for (target, collider) in candidates {
        if target.id == attacker.id {
            continue;
        }
        if !seen.insert(target.id) {
            continue;
        }

        let to = flat(target.root - attacker.position);
        let Some(to_dir) = flat_dir(to) else {
            continue;
        };
        if angle_deg(forward, to_dir) > half_angle {
            continue;
        }
        if to.length() > reach {
            continue;
        }

        let hit_point = collider.closest_point(origin);
        if shape.check_line_of_sight {
            let dist = origin.distance(hit_point);
            if dist > 0.001 && obstruction.segment_blocked(origin, hit_point) {
                continue;
            }
        }

        hits.push(ConeHit {
            target: target.id,
            hit_point,
            hit_dir: to_dir,
        });
    }

    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(id: u32, x: f32, z: f32) -> TargetView {
        TargetView {
            id: CombatantId(id),
            root: Vec3::new(x, 0.0, z),
            layer: LAYER_COMBATANT,
            colliders: vec![Collider {
                center: Vec3::new(x, 1.0, z),
                radius: 0.5,
            }],
        }
    }

    fn attacker() -> AttackerPose {
        AttackerPose {
            id: CombatantId(0),
            position: Vec3::ZERO,
            forward: Vec3::Z,
        }
    }

    fn ids(hits: &[ConeHit]) -> AHashSet<CombatantId> {
        hits.iter().map(|h| h.target).collect()
    }

    #[test]
    fn test_target_in_front_is_hit() {
        let mut seen = AHashSet::new();
        let targets = vec![target(1, 0.0, 1.5)];
        let hits = sweep_cone(&attacker(), &HitShape::default(), 1.0, &targets, &OpenField, &mut seen);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, CombatantId(1));
        assert!((hits[0].hit_dir - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_angle_field_is_full_width() {
        // 46 degrees off forward with a 90 degree cone: outside the 45 degree half-angle
        let mut seen = AHashSet::new();
        let a = 46.0_f32.to_radians();
        let targets = vec![target(1, 1.5 * a.sin(), 1.5 * a.cos())];
        let hits = sweep_cone(&attacker(), &HitShape::default(), 1.0, &targets, &OpenField, &mut seen);
        assert!(hits.is_empty());

        let a = 44.0_f32.to_radians();
        let targets = vec![target(1, 1.5 * a.sin(), 1.5 * a.cos())];
        let hits = sweep_cone(&attacker(), &HitShape::default(), 1.0, &targets, &OpenField, &mut seen);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_self_and_behind_are_skipped() {
        let mut seen = AHashSet::new();
        let mut me = target(0, 0.0, 0.5);
        me.colliders.push(Collider {
            center: Vec3::new(0.0, 1.0, 1.0),
            radius: 0.5,
        });
        let targets = vec![me, target(2, 0.0, -1.0)];
        let hits = sweep_cone(&attacker(), &HitShape::default(), 1.0, &targets, &OpenField, &mut seen);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_one_hit_per_target_with_many_colliders() {
        let mut seen = AHashSet::new();
        let mut big = target(1, 0.0, 1.5);
        big.colliders.push(Collider {
            center: Vec3::new(0.0, 0.5, 1.5),
            radius: 0.4,
        });
        big.colliders.push(Collider {
            center: Vec3::new(0.0, 1.5, 1.5),
            radius: 0.4,
        });
        let targets = vec![big, target(2, 0.3, 1.2)];
        let hits = sweep_cone(&attacker(), &HitShape::default(), 1.0, &targets, &OpenField, &mut seen);
        assert_eq!(hits.len(), 2);
        let expected: AHashSet<_> = [CombatantId(1), CombatantId(2)].into_iter().collect();
        assert_eq!(ids(&hits), expected);
    }

    #[test]
    fn test_hit_scale_extends_reach() {
        let mut seen = AHashSet::new();
        let shape = HitShape::default();
        // Root 4.0 ahead: reach at scale 1 is 3.2, at scale 2 it is 4.4
        let targets = vec![target(1, 0.0, 4.0)];
        assert!(sweep_cone(&attacker(), &shape, 1.0, &targets, &OpenField, &mut seen).is_empty());
        assert_eq!(sweep_cone(&attacker(), &shape, 2.0, &targets, &OpenField, &mut seen).len(), 1);
    }

    #[test]
    fn test_layer_mask_filters() {
        let mut seen = AHashSet::new();
        let mut crystal = target(1, 0.0, 1.5);
        crystal.layer = LAYER_OBJECTIVE;
        let shape = HitShape {
            target_mask: LAYER_COMBATANT,
            ..HitShape::default()
        };
        let hits = sweep_cone(&attacker(), &shape, 1.0, &[crystal], &OpenField, &mut seen);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_line_of_sight_blocks() {
        let mut seen = AHashSet::new();
        let wall = Obstacles::new(vec![Aabb::new(Vec3::new(-2.0, 0.0, 0.6), Vec3::new(2.0, 3.0, 0.7))]);
        let targets = vec![target(1, 0.0, 1.5)];

        let shape = HitShape {
            check_line_of_sight: true,
            ..HitShape::default()
        };
        assert!(sweep_cone(&attacker(), &shape, 1.0, &targets, &wall, &mut seen).is_empty());

        let shape = HitShape::default();
        assert_eq!(sweep_cone(&attacker(), &shape, 1.0, &targets, &wall, &mut seen).len(), 1);
    }

    #[test]
    fn test_aabb_segment() {
        let b = Aabb::new(Vec3::new(1.0, -1.0, -1.0), Vec3::new(2.0, 1.0, 1.0));
        assert!(b.intersects_segment(Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0)));
        assert!(!b.intersects_segment(Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0)));
        assert!(!b.intersects_segment(Vec3::new(0.0, 2.0, 0.0), Vec3::new(3.0, 2.0, 0.0)));
    }
}
