//! The dispatch boundary between the execution engine and agent backends.

use crate::config::AgentConfig;
use crate::error::ExecutionError;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Performs the external call for one agent node.
///
/// Implementations never retry and never touch flow state; the engine
/// records whatever they return.
#[async_trait]
pub trait AgentDispatcher: Send + Sync {
    /// Executes the agent described by `config` and returns its output.
    ///
    /// # Errors
    ///
    /// Returns an `ExecutionError` describing why the call failed.
    async fn execute(&self, config: &AgentConfig) -> Result<JsonValue, ExecutionError>;
}

#[async_trait]
impl<D: AgentDispatcher + ?Sized> AgentDispatcher for Arc<D> {
    async fn execute(&self, config: &AgentConfig) -> Result<JsonValue, ExecutionError> {
        (**self).execute(config).await
    }
}

/// A dispatcher that answers from a script keyed by config name.
///
/// Every call is logged, so tests can assert dispatch order and count.
#[derive(Clone, Default)]
pub struct ScriptedDispatcher {
    responses: Arc<Mutex<HashMap<String, Result<JsonValue, ExecutionError>>>>,
    fallback: Option<JsonValue>,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedDispatcher {
    /// Creates a dispatcher with an empty script.
    ///
    /// Unscripted configs fail with `ExecutionError::Unsupported`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers configs named `name` with `response`.
    #[must_use]
    pub fn respond(self, name: impl Into<String>, response: Result<JsonValue, ExecutionError>) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(name.into(), response);
        }
        self
    }

    /// Answers every unscripted config with `output`.
    #[must_use]
    pub fn with_fallback(mut self, output: JsonValue) -> Self {
        self.fallback = Some(output);
        self
    }

    /// Sleeps for `delay` before answering each call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the config names dispatched so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AgentDispatcher for ScriptedDispatcher {
    async fn execute(&self, config: &AgentConfig) -> Result<JsonValue, ExecutionError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(config.name.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .responses
            .lock()
            .ok()
            .and_then(|r| r.get(&config.name).cloned());
        match (scripted, &self.fallback) {
            (Some(response), _) => response,
            (None, Some(output)) => Ok(output.clone()),
            (None, None) => Err(ExecutionError::Unsupported {
                agent_type: config.agent_type(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentType, create_default_config};
    use crate::model::ModelType;
    use serde_json::json;

    fn named(name: &str) -> AgentConfig {
        let mut config = create_default_config(AgentType::TextGenerator, ModelType::OpenAi);
        config.name = name.to_string();
        config
    }

    #[tokio::test]
    async fn scripted_responses_are_returned_by_name() {
        let dispatcher = ScriptedDispatcher::new()
            .respond("ok", Ok(json!({"text": "hi"})))
            .respond(
                "bad",
                Err(ExecutionError::RequestFailed {
                    reason: "refused".to_string(),
                }),
            );

        assert_eq!(dispatcher.execute(&named("ok")).await, Ok(json!({"text": "hi"})));
        assert!(dispatcher.execute(&named("bad")).await.is_err());
        assert_eq!(dispatcher.calls(), vec!["ok", "bad"]);
    }

    #[tokio::test]
    async fn unscripted_calls_use_fallback_or_fail() {
        let strict = ScriptedDispatcher::new();
        assert!(matches!(
            strict.execute(&named("x")).await,
            Err(ExecutionError::Unsupported { .. })
        ));

        let lenient = ScriptedDispatcher::new().with_fallback(json!(1));
        assert_eq!(lenient.execute(&named("x")).await, Ok(json!(1)));
    }

    #[tokio::test]
    async fn arc_wrapped_dispatcher_shares_call_log() {
        let dispatcher = ScriptedDispatcher::new().with_fallback(json!(null));
        let shared: Arc<dyn AgentDispatcher> = Arc::new(dispatcher.clone());
        shared.execute(&named("a")).await.expect("fallback");
        assert_eq!(dispatcher.calls(), vec!["a"]);
    }
}
