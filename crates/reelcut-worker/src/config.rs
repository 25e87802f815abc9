//! Worker configuration.

use std::time::Duration;

use reelcut_media::SilenceConfig;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Work directory for downloads, cuts and mixes
    pub work_dir: String,
    /// Watchdog for one clip-selection model call
    pub selection_timeout: Duration,
    /// Model calls per selection request, including the first
    pub selection_max_attempts: u32,
    /// Max distance a boundary may move to reach a silence edge
    pub snap_tolerance: f64,
    pub silence: SilenceConfig,
    /// Generate sound effects for every published clip
    pub auto_sfx: bool,
    /// Cap on moments proposed by automatic SFX generation
    pub max_auto_sfx: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: "/tmp/reelcut".to_string(),
            selection_timeout: Duration::from_secs(120),
            selection_max_attempts: 2,
            snap_tolerance: 2.0,
            silence: SilenceConfig::default(),
            auto_sfx: false,
            max_auto_sfx: 5,
        }
    }
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> WorkerResult<T> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| WorkerError::config_error(format!("{} has an invalid value: {}", name, raw))),
        _ => Ok(default),
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let defaults = Self::default();

        let config = Self {
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or(defaults.work_dir),
            selection_timeout: Duration::from_secs(parsed("SELECTION_TIMEOUT_SECS", 120u64)?),
            selection_max_attempts: parsed("SELECTION_MAX_ATTEMPTS", defaults.selection_max_attempts)?,
            snap_tolerance: parsed("SNAP_TOLERANCE_SECS", defaults.snap_tolerance)?,
            silence: SilenceConfig {
                noise_db: parsed("SILENCE_NOISE_DB", defaults.silence.noise_db)?,
                min_duration: parsed("SILENCE_MIN_DURATION_SECS", defaults.silence.min_duration)?,
            },
            auto_sfx: parsed("AUTO_SFX", defaults.auto_sfx)?,
            max_auto_sfx: parsed("MAX_AUTO_SFX", defaults.max_auto_sfx)?,
        };

        if config.selection_max_attempts == 0 {
            return Err(WorkerError::config_error("SELECTION_MAX_ATTEMPTS must be at least 1"));
        }
        if config.snap_tolerance < 0.0 {
            return Err(WorkerError::config_error("SNAP_TOLERANCE_SECS must not be negative"));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 6] = [
        "WORKER_WORK_DIR",
        "SELECTION_TIMEOUT_SECS",
        "SELECTION_MAX_ATTEMPTS",
        "SNAP_TOLERANCE_SECS",
        "SILENCE_NOISE_DB",
        "AUTO_SFX",
    ];

    fn clear() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();
        let config = WorkerConfig::from_env().unwrap();
        assert_eq!(config.work_dir, "/tmp/reelcut");
        assert_eq!(config.selection_timeout, Duration::from_secs(120));
        assert_eq!(config.selection_max_attempts, 2);
        assert_eq!(config.snap_tolerance, 2.0);
        assert_eq!(config.silence.noise_db, -30.0);
        assert!(!config.auto_sfx);
    }

    #[test]
    #[serial]
    fn test_overrides_and_validation() {
        clear();
        std::env::set_var("SNAP_TOLERANCE_SECS", "1.5");
        std::env::set_var("AUTO_SFX", "true");
        std::env::set_var("SILENCE_NOISE_DB", "-35");
        let config = WorkerConfig::from_env().unwrap();
        assert_eq!(config.snap_tolerance, 1.5);
        assert!(config.auto_sfx);
        assert_eq!(config.silence.noise_db, -35.0);

        std::env::set_var("SELECTION_MAX_ATTEMPTS", "0");
        assert!(WorkerConfig::from_env().is_err());
        std::env::set_var("SELECTION_MAX_ATTEMPTS", "two");
        assert!(WorkerConfig::from_env().is_err());
        clear();
    }
}
