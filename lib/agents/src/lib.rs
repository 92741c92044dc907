//! Agent capabilities for agentflow.
//!
//! This crate owns everything about a single agent node in isolation:
//!
//! - **Configuration**: the typed per-agent config union and backend model
//!   profiles, plus the factory that builds defaults for both
//! - **Dispatch**: the [`AgentDispatcher`] boundary and its HTTP
//!   implementation that talks to the agent backend service

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod model;

pub use config::{
    AgentConfig, AgentSettings, AgentType, DisplayFormat, ResultSettings, WebSearcherSettings,
    YoutubeSummarizerSettings, create_default_config, create_default_config_from_tags,
};
pub use dispatcher::{AgentDispatcher, ScriptedDispatcher};
pub use error::{ConfigurationError, ExecutionError};
pub use http::{DEFAULT_ORIGIN, HttpDispatcher};
pub use model::{ModelConfig, ModelType, ProviderOptions};
