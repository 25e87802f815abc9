//! Structured job logging.
//!
//! Every job run gets one logger carrying the job id, the job kind and the
//! subject (video or clip) it works on, so log lines from one run can be
//! filtered together.

use tracing::{error, info, warn, Span};

use reelcut_models::JobId;

#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: &'static str,
    subject: String,
}

impl JobLogger {
    /// `operation` is the job kind (`process_video`, `reanalyze`, `sound`),
    /// `subject` the video or clip id.
    pub fn new(job_id: &JobId, operation: &'static str, subject: impl Into<String>) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation,
            subject: subject.into(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            subject = %self.subject,
            "Job started: {}", message
        );
        metrics::counter!("reelcut_jobs_started_total", "operation" => self.operation).increment(1);
    }

    /// Progress within a named pipeline stage.
    pub fn log_stage(&self, stage: &str, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            subject = %self.subject,
            stage,
            "{}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = self.operation,
            subject = %self.subject,
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = self.operation,
            subject = %self.subject,
            "Job error: {}", message
        );
        metrics::counter!("reelcut_jobs_failed_total", "operation" => self.operation).increment(1);
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            subject = %self.subject,
            "Job completed: {}", message
        );
        metrics::counter!("reelcut_jobs_completed_total", "operation" => self.operation).increment(1);
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Span to instrument the job future with.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = self.operation,
            subject = %self.subject
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_creation() {
        let job_id = JobId::from_string("job-123");
        let logger = JobLogger::new(&job_id, "reanalyze", "video-1");

        assert_eq!(logger.job_id(), "job-123");
        assert_eq!(logger.operation(), "reanalyze");
    }
}
