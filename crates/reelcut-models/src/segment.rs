//! Time ranges produced by audio and shot analysis.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A stretch of source audio below the noise floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SilenceInterval {
    pub start: f64,
    pub end: f64,
}

impl SilenceInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// One shot between two scene cuts, as reported by the shot detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShotBoundary {
    #[serde(alias = "start_time")]
    pub start_time: f64,
    #[serde(alias = "end_time")]
    pub end_time: f64,
}

impl ShotBoundary {
    /// Scene-change timestamps (shot starts after the first), sorted and deduplicated.
    pub fn cut_points(shots: &[ShotBoundary]) -> Vec<f64> {
        let mut points: Vec<f64> = shots
            .iter()
            .map(|s| s.start_time)
            .filter(|t| t.is_finite() && *t > 0.0)
            .collect();
        points.sort_by(|a, b| a.total_cmp(b));
        points.dedup_by(|a, b| (*a - *b).abs() < 1e-3);
        points
    }
}
