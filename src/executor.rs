use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::job::{BackupJob, Schedule};
use crate::remote::RemoteHandler;
use crate::resolve::{SrRecord, VmRecord};
use crate::settings::Settings;
use crate::tasklog::TaskLogger;
use crate::template::SnapshotNameTemplate;

/// Everything one per-VM backup invocation gets to work with.
///
/// `task` is the forked subtask for this VM, already started; the
/// orchestrator finalizes it, so the executor only adds `info`/`warning`
/// entries or forks deeper subtasks. Remote handlers are shared read-only;
/// forgetting them is the orchestrator's job.
pub struct VmBackupContext {
    pub snapshot_name_template: SnapshotNameTemplate,
    pub job: Arc<BackupJob>,
    pub remote_handlers: Arc<HashMap<String, Arc<dyn RemoteHandler>>>,
    pub schedule: Arc<Schedule>,
    pub settings: Settings,
    pub srs: Arc<Vec<SrRecord>>,
    pub task: TaskLogger,
    pub vm: VmRecord,
}

/// Performs the actual backup of one VM (snapshot, transfer, retention).
/// External to this crate's kernel; only the invocation contract is fixed
/// here.
#[async_trait]
pub trait VmBackupExecutor: Send + Sync {
    async fn run(&self, ctx: VmBackupContext) -> Result<Value>;
}
