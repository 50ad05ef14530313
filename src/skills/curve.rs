//! Piecewise-linear response curves
//!
//! Used to reshape a normalized charge fraction and to weight cast-move speed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseCurve {
    /// (x, y) keyframes sorted by x
    pub points: Vec<(f32, f32)>,
}

impl ResponseCurve {
    /// y = x on [0, 1]
    pub fn linear() -> Self {
        Self {
            points: vec![(0.0, 0.0), (1.0, 1.0)],
        }
    }

    /// y = value everywhere
    pub fn constant(value: f32) -> Self {
        Self {
            points: vec![(0.0, value), (1.0, value)],
        }
    }

    pub fn from_points(mut points: Vec<(f32, f32)>) -> Self {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { points }
    }

    /// Evaluate at `x`, holding the end values outside the keyed range.
    ///
    /// An empty curve is the identity.
    pub fn evaluate(&self, x: f32) -> f32 {
        let Some(first) = self.points.first() else {
            return x;
        };
        if x <= first.0 {
            return first.1;
        }
        for pair in self.points.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if x <= x1 {
                let span = x1 - x0;
                if span <= f32::EPSILON {
                    return y1;
                }
                let t = (x - x0) / span;
                return y0 + (y1 - y0) * t;
            }
        }
        self.points[self.points.len() - 1].1
    }

    pub fn is_sorted(&self) -> bool {
        self.points.windows(2).all(|p| p[0].0 <= p[1].0)
    }
}

impl Default for ResponseCurve {
    fn default() -> Self {
        Self::linear()
    }
}

/// Linear interpolation with `t` clamped to [0, 1]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}
