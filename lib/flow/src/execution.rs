//! Execution records, run events and run reports.

use crate::node::NodeId;
use agentflow_core::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::time::Duration;

/// Status of a node's most recent execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Error,
}

impl ExecutionStatus {
    /// Returns true for `completed` and `error`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Per-node outcome of the most recent run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExecutionRecord {
    /// Merges `update` into this record.
    pub fn apply(&mut self, update: ExecutionUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(output) = update.output {
            self.output = output;
        }
        if let Some(error) = update.error {
            self.error = error;
        }
        if let Some(ms) = update.execution_time_ms {
            self.execution_time_ms = ms;
        }
        if let Some(at) = update.finished_at {
            self.finished_at = at;
        }
    }
}

/// A partial execution record.
///
/// Outer `None` keeps the current value, `Some(None)` clears it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionUpdate {
    pub status: Option<ExecutionStatus>,
    pub output: Option<Option<JsonValue>>,
    pub error: Option<Option<String>>,
    pub execution_time_ms: Option<Option<u64>>,
    pub finished_at: Option<Option<DateTime<Utc>>>,
}

impl ExecutionUpdate {
    /// Marks a node as running and clears everything left by the last run.
    #[must_use]
    pub fn running() -> Self {
        Self {
            status: Some(ExecutionStatus::Running),
            output: Some(None),
            error: Some(None),
            execution_time_ms: Some(None),
            finished_at: Some(None),
        }
    }

    #[must_use]
    pub fn completed(output: JsonValue, elapsed: Duration) -> Self {
        Self {
            status: Some(ExecutionStatus::Completed),
            output: Some(Some(output)),
            error: Some(None),
            execution_time_ms: Some(Some(millis(elapsed))),
            finished_at: Some(Some(Utc::now())),
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            status: Some(ExecutionStatus::Error),
            output: Some(None),
            error: Some(Some(message.into())),
            execution_time_ms: Some(Some(millis(elapsed))),
            finished_at: Some(Some(Utc::now())),
        }
    }

    /// Output copied into a result node from an upstream agent.
    #[must_use]
    pub fn propagated(output: JsonValue) -> Self {
        Self {
            status: Some(ExecutionStatus::Completed),
            output: Some(Some(output)),
            error: Some(None),
            execution_time_ms: Some(None),
            finished_at: Some(Some(Utc::now())),
        }
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// A node whose dispatch failed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFailure {
    pub node_id: NodeId,
    pub error: String,
}

/// Progress notifications published while a run executes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        run_id: RunId,
        order: Vec<NodeId>,
    },
    NodeStarted {
        run_id: RunId,
        node_id: NodeId,
    },
    NodeCompleted {
        run_id: RunId,
        node_id: NodeId,
        execution_time_ms: u64,
    },
    NodeFailed {
        run_id: RunId,
        node_id: NodeId,
        error: String,
    },
    OutputPropagated {
        run_id: RunId,
        source: NodeId,
        target: NodeId,
    },
    RunFinished {
        run_id: RunId,
        completed: usize,
        failed: usize,
    },
    RunCancelled {
        run_id: RunId,
        not_run: Vec<NodeId>,
    },
}

impl RunEvent {
    #[must_use]
    pub fn run_id(&self) -> RunId {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::NodeStarted { run_id, .. }
            | Self::NodeCompleted { run_id, .. }
            | Self::NodeFailed { run_id, .. }
            | Self::OutputPropagated { run_id, .. }
            | Self::RunFinished { run_id, .. }
            | Self::RunCancelled { run_id, .. } => *run_id,
        }
    }
}

/// Summary of a finished or cancelled run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    /// Agent nodes that completed, in dispatch order.
    pub completed: Vec<NodeId>,
    /// Agent nodes whose dispatch failed, in dispatch order.
    pub failed: Vec<NodeFailure>,
    /// Agent nodes that were never dispatched, in run order.
    pub not_run: Vec<NodeId>,
    pub cancelled: bool,
}

impl RunReport {
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.failed.len()
    }

    /// Returns true if every agent node ran and completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.failed.is_empty()
    }
}

fn counted(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors = counted(self.error_count(), "error");
        if self.cancelled {
            write!(
                f,
                "run {} cancelled with {errors}, {} not run",
                self.run_id,
                counted(self.not_run.len(), "node")
            )
        } else {
            write!(f, "run {} completed with {errors}", self.run_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn running_clears_previous_outcome() {
        let mut record = ExecutionRecord::default();
        record.apply(ExecutionUpdate::failed("boom", Duration::from_millis(12)));
        assert_eq!(record.status, ExecutionStatus::Error);
        assert_eq!(record.execution_time_ms, Some(12));

        record.apply(ExecutionUpdate::running());
        assert_eq!(
            record,
            ExecutionRecord {
                status: ExecutionStatus::Running,
                ..ExecutionRecord::default()
            }
        );
    }

    #[test]
    fn partial_update_keeps_untouched_fields() {
        let mut record = ExecutionRecord::default();
        record.apply(ExecutionUpdate::completed(json!({"a": 1}), Duration::from_millis(5)));

        record.apply(ExecutionUpdate {
            error: Some(Some("note".to_string())),
            ..ExecutionUpdate::default()
        });

        assert_eq!(record.status, ExecutionStatus::Completed);
        assert_eq!(record.output, Some(json!({"a": 1})));
        assert_eq!(record.error.as_deref(), Some("note"));
    }

    #[test]
    fn record_serializes_camel_case() {
        let mut record = ExecutionRecord::default();
        record.apply(ExecutionUpdate::completed(json!("x"), Duration::from_millis(7)));
        let value = serde_json::to_value(&record).expect("serialize");

        assert_eq!(value["status"], "completed");
        assert_eq!(value["executionTimeMs"], 7);
        assert!(value.get("error").is_none());
        assert!(value.get("finishedAt").is_some());
    }

    #[test]
    fn report_summary() {
        let report = RunReport {
            run_id: RunId::new(),
            completed: vec![NodeId::from("a")],
            failed: vec![NodeFailure {
                node_id: NodeId::from("b"),
                error: "down".to_string(),
            }],
            not_run: vec![],
            cancelled: false,
        };
        assert!(report.to_string().ends_with("completed with 1 error"));
        assert!(!report.is_success());

        let cancelled = RunReport {
            failed: vec![],
            not_run: vec![NodeId::from("c"), NodeId::from("d")],
            cancelled: true,
            ..report
        };
        assert!(cancelled.to_string().ends_with("cancelled with 0 errors, 2 nodes not run"));
    }

    #[test]
    fn terminal_statuses() {
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Error.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(!ExecutionStatus::Idle.is_terminal());
    }
}
