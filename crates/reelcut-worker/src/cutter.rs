//! Sequential clip cutting.

use std::path::PathBuf;
use tracing::{info, warn};

use reelcut_media::{MediaToolkit, ScratchDir};

use crate::boundary::PlannedClip;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

/// A planned clip with its encoded file on local disk.
#[derive(Debug, Clone)]
pub struct CutClip {
    pub planned: PlannedClip,
    pub file: PathBuf,
}

/// Cut every planned clip from `source`, one after another.
///
/// A failed cut does not stop the remaining ones. If any cut failed the whole
/// batch fails with [`WorkerError::CutsFailed`] naming each failure, so
/// nothing partial is ever published.
pub async fn cut_all(
    media: &dyn MediaToolkit,
    source: &std::path::Path,
    scratch: &ScratchDir,
    planned: Vec<PlannedClip>,
    logger: &JobLogger,
) -> WorkerResult<Vec<CutClip>> {
    let total = planned.len();
    let mut cut = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for (i, clip) in planned.into_iter().enumerate() {
        let file = scratch.join(format!("clip-{:02}.mp4", i + 1));
        let (start, duration) = (clip.span.start(), clip.span.duration());

        match media.cut_clip(source, &file, start, duration).await {
            Ok(()) => {
                info!(
                    clip = i + 1,
                    total,
                    start,
                    duration,
                    title = %clip.selected.title,
                    "Cut clip"
                );
                cut.push(CutClip { planned: clip, file });
            }
            Err(e) => {
                warn!(clip = i + 1, total, start, duration, "Clip cut failed: {}", e);
                failures.push(format!("\"{}\" at {:.2}s: {}", clip.selected.title, start, e));
            }
        }
    }

    if !failures.is_empty() {
        metrics::counter!("reelcut_cut_failures_total").increment(failures.len() as u64);
        return Err(WorkerError::CutsFailed {
            failed: failures.len(),
            total,
            details: failures.join("; "),
        });
    }

    logger.log_stage("cutting", &format!("Cut {} clips", total));
    Ok(cut)
}
