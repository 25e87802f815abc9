//! Turning selected boundaries into final cut times.

use reelcut_models::{ClipSpan, SilenceInterval, Transcript};

use crate::error::{WorkerError, WorkerResult};
use crate::selector::{ClipBoundary, SelectedClip};

/// Move `t` to the closest silence edge no further than `tolerance` away.
///
/// Both edges of every interval are candidates. Without a candidate in range
/// the raw value comes back unchanged.
pub fn snap(t: f64, silences: &[SilenceInterval], tolerance: f64) -> f64 {
    silences
        .iter()
        .flat_map(|s| [s.start, s.end])
        .filter(|edge| edge.is_finite() && (edge - t).abs() <= tolerance)
        .min_by(|a, b| (a - t).abs().total_cmp(&(b - t).abs()))
        .unwrap_or(t)
}

/// A selected clip with its final time span.
#[derive(Debug, Clone)]
pub struct PlannedClip {
    pub selected: SelectedClip,
    pub span: ClipSpan,
}

#[derive(Debug, Clone, Copy)]
pub struct BoundaryMapper<'a> {
    pub transcript: Option<&'a Transcript>,
    pub silences: &'a [SilenceInterval],
    pub tolerance: f64,
    pub duration: f64,
}

impl BoundaryMapper<'_> {
    fn raw_times(&self, boundary: &ClipBoundary) -> WorkerResult<(f64, f64)> {
        match *boundary {
            ClipBoundary::Seconds { start, end } => Ok((start, end)),
            ClipBoundary::WordIndex { start, end } => self
                .transcript
                .and_then(|t| t.time_span(start, end))
                .ok_or_else(|| {
                    WorkerError::validation(format!("word range {}..={} has no transcript timing", start, end))
                }),
        }
    }

    fn clamp(&self, t: f64) -> f64 {
        t.clamp(0.0, self.duration)
    }

    /// Resolve and snap every clip. Output keeps the input order.
    ///
    /// A snap that would invert a span or push a clip into the previous one
    /// is dropped in favour of the raw boundary.
    pub fn map(&self, clips: &[SelectedClip]) -> WorkerResult<Vec<PlannedClip>> {
        let mut resolved = Vec::with_capacity(clips.len());
        for (i, clip) in clips.iter().enumerate() {
            let (raw_start, raw_end) = self.raw_times(&clip.boundary)?;
            let (raw_start, raw_end) = (self.clamp(raw_start), self.clamp(raw_end));

            let mut start = self.clamp(snap(raw_start, self.silences, self.tolerance));
            let mut end = self.clamp(snap(raw_end, self.silences, self.tolerance));
            if end <= start {
                start = raw_start;
                end = raw_end;
            }
            resolved.push((i, raw_start, start, end));
        }

        let mut order: Vec<usize> = (0..resolved.len()).collect();
        order.sort_by(|&a, &b| resolved[a].1.total_cmp(&resolved[b].1));

        let mut prev_end: Option<f64> = None;
        for &idx in &order {
            let (_, raw_start, start, end) = &mut resolved[idx];
            if let Some(limit) = prev_end {
                if *start < limit {
                    *start = raw_start.max(limit);
                }
            }
            prev_end = Some(*end);
        }

        resolved
            .into_iter()
            .map(|(i, _, start, end)| {
                let span = ClipSpan::new(start, end).map_err(|e| {
                    WorkerError::validation(format!("clip \"{}\" has no usable span: {}", clips[i].title, e))
                })?;
                Ok(PlannedClip {
                    selected: clips[i].clone(),
                    span,
                })
            })
            .collect()
    }
}
