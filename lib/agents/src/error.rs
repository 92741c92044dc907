//! Error types for the agents crate.
//!
//! - `ConfigurationError`: building or validating an agent config
//! - `ExecutionError`: a single dispatch against the backend failed

use crate::config::AgentType;
use std::fmt;
use std::time::Duration;

/// Errors raised while creating or validating agent configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The agent tag is not one of the known agent types.
    UnknownAgentType { tag: String },
    /// The model tag is not one of the known backend model profiles.
    UnknownModelType { tag: String },
    /// A field holds a value outside its allowed range.
    Invalid { field: &'static str, reason: String },
    /// A replacement config targets a different agent type than the node.
    AgentTypeMismatch {
        expected: AgentType,
        actual: AgentType,
    },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAgentType { tag } => write!(f, "unknown agent type '{tag}'"),
            Self::UnknownModelType { tag } => write!(f, "unknown model type '{tag}'"),
            Self::Invalid { field, reason } => {
                write!(f, "invalid configuration field '{field}': {reason}")
            }
            Self::AgentTypeMismatch { expected, actual } => {
                write!(
                    f,
                    "config for agent type '{actual}' cannot replace a '{expected}' config"
                )
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Errors from dispatching one agent node.
///
/// The engine records `to_string()` of this error on the failing node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The request never produced a response (connect, DNS, TLS...).
    RequestFailed { reason: String },
    /// The backend answered with a non-success status.
    BadStatus { status: u16, body: String },
    /// The response body could not be decoded.
    ResponseParseFailed { reason: String },
    /// The config is missing something the backend call needs.
    InvalidInput { reason: String },
    /// The dispatch did not settle within the per-node timeout.
    Timeout { after: Duration },
    /// No backend call exists for this agent type yet.
    Unsupported { agent_type: AgentType },
    /// Result nodes display output; they never dispatch.
    NotExecutable { agent_type: AgentType },
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { reason } => write!(f, "backend request failed: {reason}"),
            Self::BadStatus { status, body } => {
                if body.is_empty() {
                    write!(f, "backend returned status {status}")
                } else {
                    write!(f, "backend returned status {status}: {body}")
                }
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse backend response: {reason}")
            }
            Self::InvalidInput { reason } => write!(f, "invalid agent input: {reason}"),
            Self::Timeout { after } => {
                write!(f, "agent call timed out after {}s", after.as_secs_f64())
            }
            Self::Unsupported { agent_type } => {
                write!(f, "agent type '{agent_type}' has no backend call")
            }
            Self::NotExecutable { agent_type } => {
                write!(f, "agent type '{agent_type}' is not executable")
            }
        }
    }
}

impl std::error::Error for ExecutionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_display() {
        let err = ConfigurationError::UnknownAgentType {
            tag: "teleporter".to_string(),
        };
        assert!(err.to_string().contains("teleporter"));

        let err = ConfigurationError::AgentTypeMismatch {
            expected: AgentType::WebSearcher,
            actual: AgentType::Translator,
        };
        assert!(err.to_string().contains("web_searcher"));
        assert!(err.to_string().contains("translator"));
    }

    #[test]
    fn bad_status_omits_empty_body() {
        let err = ExecutionError::BadStatus {
            status: 502,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "backend returned status 502");
    }

    #[test]
    fn timeout_mentions_duration() {
        let err = ExecutionError::Timeout {
            after: Duration::from_millis(1500),
        };
        assert!(err.to_string().contains("1.5s"));
    }
}
