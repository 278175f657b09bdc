use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{BackupError, Result};
use crate::tasklog::event::{TaskEvent, TaskSink, TaskStatus};

#[derive(Debug, Clone, Copy)]
enum State {
    Created,
    Started(Uuid),
    Ended(Uuid),
}

struct Inner {
    sink: Arc<dyn TaskSink>,
    parent_id: Option<Uuid>,
    state: Mutex<State>,
}

/// One node of the task tree: the job itself, or a forked per-unit subtask.
///
/// Lifecycle is strict: exactly one [`start`](Self::start), then any number
/// of [`info`](Self::info)/[`warning`](Self::warning)/[`fork`](Self::fork),
/// then exactly one [`success`](Self::success) or
/// [`failure`](Self::failure). Any call out of order fails with a protocol
/// error and emits nothing.
///
/// Cloning yields another handle to the same task node; the lifecycle guard
/// is shared, so a terminal event fired through one handle disables them
/// all.
#[derive(Clone)]
pub struct TaskLogger {
    inner: Arc<Inner>,
}

impl TaskLogger {
    /// Root task: no parent.
    pub fn new(sink: Arc<dyn TaskSink>) -> Self {
        Self::with_parent(sink, None)
    }

    fn with_parent(sink: Arc<dyn TaskSink>, parent_id: Option<Uuid>) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink,
                parent_id,
                state: Mutex::new(State::Created),
            }),
        }
    }

    /// The task's id, assigned by [`start`](Self::start).
    pub fn task_id(&self) -> Result<Uuid> {
        match *self.lock_state() {
            State::Created => Err(BackupError::TaskNotStarted),
            State::Started(id) | State::Ended(id) => Ok(id),
        }
    }

    /// Begin the task: assigns a fresh task id and emits the start event.
    pub async fn start(&self, message: impl Into<String>, data: Option<Value>) -> Result<Uuid> {
        let task_id = {
            let mut state = self.lock_state();
            match *state {
                State::Created => {
                    let id = Uuid::new_v4();
                    *state = State::Started(id);
                    id
                }
                State::Started(_) | State::Ended(_) => {
                    return Err(BackupError::TaskAlreadyStarted)
                }
            }
        };

        self.emit(TaskEvent::Start {
            task_id,
            parent_id: self.inner.parent_id,
            timestamp: Utc::now(),
            message: message.into(),
            data,
        })
        .await;
        Ok(task_id)
    }

    pub async fn info(&self, message: impl Into<String>, data: Option<Value>) -> Result<()> {
        let task_id = self.live_task_id()?;
        self.emit(TaskEvent::Info {
            task_id,
            timestamp: Utc::now(),
            message: message.into(),
            data,
        })
        .await;
        Ok(())
    }

    pub async fn warning(&self, message: impl Into<String>, data: Option<Value>) -> Result<()> {
        let task_id = self.live_task_id()?;
        self.emit(TaskEvent::Warning {
            task_id,
            timestamp: Utc::now(),
            message: message.into(),
            data,
        })
        .await;
        Ok(())
    }

    /// End the task successfully. One-shot: a second terminal call, or any
    /// emission afterwards, fails.
    pub async fn success(&self, result: Value) -> Result<()> {
        self.end(TaskStatus::Success, result).await
    }

    /// End the task as failed. Same one-shot guard as
    /// [`success`](Self::success).
    pub async fn failure(&self, error: Value) -> Result<()> {
        self.end(TaskStatus::Failure, error).await
    }

    /// Create a subtask logger: shares this task's sink, carries this
    /// task's id as its `parent_id`. Does not touch this task's own
    /// lifecycle.
    pub fn fork(&self) -> Result<TaskLogger> {
        let parent_id = self.task_id()?;
        Ok(Self::with_parent(self.inner.sink.clone(), Some(parent_id)))
    }

    /// Run `op` inside this task: emits start, awaits the operation, then
    /// emits the matching terminal event. The operation's own outcome is
    /// returned unchanged.
    pub async fn wrap<T, F, Fut>(
        &self,
        message: impl Into<String>,
        data: Option<Value>,
        op: F,
    ) -> Result<T>
    where
        T: Serialize,
        F: FnOnce(TaskLogger) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.start(message, data).await?;
        match op(self.clone()).await {
            Ok(value) => {
                let result = serde_json::to_value(&value).unwrap_or(Value::Null);
                self.success(result).await?;
                Ok(value)
            }
            Err(error) => {
                // The guard cannot trip here (we just started), so a
                // terminal-emission error never shadows the real one.
                let _ = self.failure(Value::String(error.to_string())).await;
                Err(error)
            }
        }
    }

    async fn end(&self, status: TaskStatus, result: Value) -> Result<()> {
        let task_id = {
            let mut state = self.lock_state();
            match *state {
                State::Created => return Err(BackupError::TaskNotStarted),
                State::Ended(_) => return Err(BackupError::TaskAlreadyEnded),
                State::Started(id) => {
                    *state = State::Ended(id);
                    id
                }
            }
        };

        self.emit(TaskEvent::End {
            task_id,
            timestamp: Utc::now(),
            status,
            result,
        })
        .await;
        Ok(())
    }

    fn live_task_id(&self) -> Result<Uuid> {
        match *self.lock_state() {
            State::Created => Err(BackupError::TaskNotStarted),
            State::Ended(_) => Err(BackupError::TaskAlreadyEnded),
            State::Started(id) => Ok(id),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        // Held only to read or flip the state, never across an await.
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn emit(&self, event: TaskEvent) {
        self.inner.sink.emit(event).await;
    }
}
