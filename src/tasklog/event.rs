use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Terminal status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Success,
    Failure,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Failure => write!(f, "failure"),
        }
    }
}

/// One entry of the hierarchical task log.
///
/// A well-formed task emits exactly one `Start`, any number of `Info` and
/// `Warning` entries, and exactly one `End`. Consumers reconstruct the task
/// tree from `task_id`/`parent_id` alone; no ordering beyond per-task
/// emission order is assumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum TaskEvent {
    Start {
        task_id: Uuid,
        #[serde(skip_serializing_if = "Option::is_none")]
        parent_id: Option<Uuid>,
        timestamp: DateTime<Utc>,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    Info {
        task_id: Uuid,
        timestamp: DateTime<Utc>,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    Warning {
        task_id: Uuid,
        timestamp: DateTime<Utc>,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    End {
        task_id: Uuid,
        timestamp: DateTime<Utc>,
        status: TaskStatus,
        result: Value,
    },
}

impl TaskEvent {
    pub fn task_id(&self) -> Uuid {
        match self {
            TaskEvent::Start { task_id, .. }
            | TaskEvent::Info { task_id, .. }
            | TaskEvent::Warning { task_id, .. }
            | TaskEvent::End { task_id, .. } => *task_id,
        }
    }
}

/// Destination for task events. Accepts one event at a time, in emission
/// order; the logger makes no further assumptions about the transport.
#[async_trait]
pub trait TaskSink: Send + Sync {
    async fn emit(&self, event: TaskEvent);
}

/// Sink backed by a tokio mpsc channel.
///
/// A dropped receiver is not an error for the emitting side: the run keeps
/// going and the event is discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: tokio::sync::mpsc::Sender<TaskEvent>,
}

impl ChannelSink {
    pub fn new(tx: tokio::sync::mpsc::Sender<TaskEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl TaskSink for ChannelSink {
    async fn emit(&self, event: TaskEvent) {
        if self.tx.send(event).await.is_err() {
            tracing::debug!("task event receiver dropped, event discarded");
        }
    }
}
