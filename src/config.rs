//! # Configuration Management
//!
//! Loads application configuration from, in priority order:
//! 1. Environment variables prefixed with `APP_`, with `__` between key
//!    segments (e.g. `APP_SERVER__PORT`), plus bare `HOST` and `PORT`
//!    for deployment platforms
//! 2. A `config.toml` file next to the binary (optional)
//! 3. Built-in defaults
//!
//! The `[meeting]` section tunes the live engine: how often summary
//! deltas may be recomputed per meeting, and how aggressive the
//! near-duplicate detection is.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub meeting: MeetingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Live-engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingConfig {
    /// Minimum seconds between summary recomputes (and delta emissions)
    /// for one meeting. Transcript appends are never throttled. Zero
    /// means every segment emits a delta.
    pub min_update_interval_secs: u64,

    /// Similarity ratio in (0, 1] at or above which an insight counts as
    /// a near duplicate of an earlier one.
    pub dedup_similarity_threshold: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            meeting: MeetingConfig {
                min_update_interval_secs: 5,
                dedup_similarity_threshold: crate::live::dedup::DEFAULT_SIMILARITY_THRESHOLD,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, `config.toml`, and environment.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            // Double-underscore key separator so section keys that
            // themselves contain underscores stay addressable, e.g.
            // APP_MEETING__MIN_UPDATE_INTERVAL_SECS.
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        // Deployment platforms commonly inject bare HOST/PORT.
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }
        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Reject configurations that cannot work at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        let threshold = self.meeting.dedup_similarity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(anyhow::anyhow!(
                "Dedup similarity threshold must be in (0, 1], got {}",
                threshold
            ));
        }

        Ok(())
    }
}
