//! Engine configuration model.
//!
//! Stored as TOML (`~/.config/restyle/config.toml`). Every field has a default so
//! a partial or missing file yields a working configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits applied while building a context snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotLimits {
    /// Element depth below the target kept in the markup excerpt.
    pub markup_depth: usize,
    /// Maximum excerpt length in characters before truncation.
    pub markup_char_cap: usize,
    /// Maximum number of matching style rules collected.
    pub rule_cap: usize,
}

impl Default for SnapshotLimits {
    fn default() -> Self {
        Self {
            markup_depth: 3,
            markup_char_cap: 5000,
            rule_cap: 20,
        }
    }
}

/// Timeout budgets, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Budget for fast shell operations (selection toggles, status queries).
    pub fast_secs: u64,
    /// Budget for an instruction submission, including the external round trip.
    pub submit_secs: u64,
    /// Transport-level timeout of the HTTP client.
    pub transport_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            fast_secs: 5,
            submit_secs: 60,
            transport_secs: 45,
        }
    }
}

impl TimeoutConfig {
    pub fn fast(&self) -> Duration {
        Duration::from_secs(self.fast_secs)
    }

    pub fn submit(&self) -> Duration {
        Duration::from_secs(self.submit_secs)
    }

    pub fn transport(&self) -> Duration {
        Duration::from_secs(self.transport_secs)
    }
}

/// Generative service endpoint settings. The credential lives elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            model: "claude-sonnet-4-5".to_string(),
            max_tokens: 4096,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chat records kept per origin.
    pub history_cap: usize,
    pub snapshot: SnapshotLimits,
    pub timeouts: TimeoutConfig,
    pub service: ServiceConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_cap: 100,
            snapshot: SnapshotLimits::default(),
            timeouts: TimeoutConfig::default(),
            service: ServiceConfig::default(),
        }
    }
}
