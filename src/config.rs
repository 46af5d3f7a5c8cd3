//! Engine configuration
//!
//! Loaded from a YAML file; any missing or unparseable file falls back to
//! defaults. Invalid duration values are recovered by clamping at poll
//! creation, never surfaced as errors.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Default voting window: one hour.
pub const DEFAULT_POLL_DURATION_SECS: i64 = 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Voting window in seconds; clamped into the allowed range when used
    pub poll_duration_seconds: i64,
    /// Restrict vote commands to chat administrators
    pub admins_only: bool,
    /// Backing file for the poll store
    pub storage_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_duration_seconds: DEFAULT_POLL_DURATION_SECS,
            admins_only: false,
            storage_path: PathBuf::from("data/polls.yaml"),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file, falling back to defaults when
    /// the file is missing or unparseable.
    pub async fn load(path: impl AsRef<std::path::Path>) -> Self {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(content) => match serde_yaml::from_str(&content) {
                Ok(config) => config,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "unparseable config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// The configured voting window. Non-positive values fall back to the
    /// default; range clamping happens at poll creation.
    #[must_use]
    pub fn poll_duration(&self) -> Duration {
        if self.poll_duration_seconds <= 0 {
            warn!(
                configured = self.poll_duration_seconds,
                "invalid poll duration, using default"
            );
            return Duration::seconds(DEFAULT_POLL_DURATION_SECS);
        }
        Duration::seconds(self.poll_duration_seconds)
    }
}
