//! Ultimate gauge - a 0..=100 resource consumed whole

use serde::{Deserialize, Serialize};

use crate::combat::constants::ULT_GAUGE_MAX;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UltGauge {
    percent: f32,
}

impl UltGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn percent(&self) -> f32 {
        self.percent
    }

    /// Gauge as a 0..=1 fraction
    pub fn fraction(&self) -> f32 {
        self.percent / ULT_GAUGE_MAX
    }

    pub fn is_full(&self) -> bool {
        self.percent >= ULT_GAUGE_MAX
    }

    /// Add gauge; overflow is discarded and a full gauge ignores gains.
    ///
    /// Returns the amount actually added.
    pub fn add_percent(&mut self, percent: f32) -> f32 {
        if percent <= 0.0 || percent.is_nan() || self.is_full() {
            return 0.0;
        }
        let before = self.percent;
        self.percent = (self.percent + percent).min(ULT_GAUGE_MAX);
        self.percent - before
    }

    /// Spend a full gauge. Succeeds at most once per fill.
    pub fn try_consume_full(&mut self) -> bool {
        if !self.is_full() {
            return false;
        }
        self.percent = 0.0;
        true
    }

    pub fn set_to_zero(&mut self) {
        self.percent = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_clamps_at_max() {
        let mut gauge = UltGauge::new();
        gauge.add_percent(80.0);
        assert_eq!(gauge.add_percent(30.0), 20.0);
        assert_eq!(gauge.percent(), 100.0);
        assert!(gauge.is_full());
    }

    #[test]
    fn test_full_gauge_ignores_gain() {
        let mut gauge = UltGauge::new();
        gauge.add_percent(150.0);
        assert_eq!(gauge.add_percent(10.0), 0.0);
        assert_eq!(gauge.percent(), 100.0);
    }

    #[test]
    fn test_non_positive_gain_ignored() {
        let mut gauge = UltGauge::new();
        gauge.add_percent(40.0);
        gauge.add_percent(-10.0);
        gauge.add_percent(0.0);
        gauge.add_percent(f32::NAN);
        assert_eq!(gauge.percent(), 40.0);
    }

    #[test]
    fn test_consume_once_per_fill() {
        let mut gauge = UltGauge::new();
        assert!(!gauge.try_consume_full());

        gauge.add_percent(80.0);
        gauge.add_percent(30.0);
        assert!(gauge.try_consume_full());
        assert_eq!(gauge.percent(), 0.0);
        assert!(!gauge.try_consume_full());
        assert_eq!(gauge.percent(), 0.0);
    }

    #[test]
    fn test_partial_gauge_not_consumed() {
        let mut gauge = UltGauge::new();
        gauge.add_percent(99.9);
        assert!(!gauge.try_consume_full());
        assert!((gauge.percent() - 99.9).abs() < 1e-4);
    }
}
