//! Runner configuration.
//!
//! Settings come from environment variables prefixed with `AGENTFLOW`,
//! with `__` separating nested keys:
//!
//! - `AGENTFLOW__BACKEND__ORIGIN`: backend base URL
//! - `AGENTFLOW__ENGINE__NODE_TIMEOUT_SECS`: per-node dispatch bound
//!
//! Command-line flags override both.

use crate::error::RunnerError;
use agentflow_agents::DEFAULT_ORIGIN;
use agentflow_flow::EngineConfig;
use serde::Deserialize;
use std::time::Duration;

/// Runner configuration composed from the backend and engine sections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub engine: EngineSettings,
}

/// Where agent calls are sent.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_origin")]
    pub origin: String,
}

/// Engine limits.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// Upper bound on one agent call, in seconds.
    #[serde(default = "default_node_timeout_secs")]
    pub node_timeout_secs: u64,
}

fn default_origin() -> String {
    DEFAULT_ORIGIN.to_string()
}

fn default_node_timeout_secs() -> u64 {
    120
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            node_timeout_secs: default_node_timeout_secs(),
        }
    }
}

impl RunnerConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(environment())
    }

    fn load(source: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    /// Applies command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, origin: Option<String>, node_timeout_secs: Option<u64>) -> Self {
        if let Some(origin) = origin {
            self.backend.origin = origin;
        }
        if let Some(secs) = node_timeout_secs {
            self.engine.node_timeout_secs = secs;
        }
        self
    }

    /// Builds the engine settings.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::Config` for a zero node timeout.
    pub fn engine_config(&self) -> Result<EngineConfig, RunnerError> {
        if self.engine.node_timeout_secs == 0 {
            return Err(RunnerError::Config {
                reason: "engine.node_timeout_secs must be at least 1".to_string(),
            });
        }
        Ok(EngineConfig {
            node_timeout: Duration::from_secs(self.engine.node_timeout_secs),
        })
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("AGENTFLOW")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
