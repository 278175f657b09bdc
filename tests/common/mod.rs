//! Mock collaborators shared by the integration suites.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;

use vmbackup::error::{BackupError, Result};
use vmbackup::executor::{VmBackupContext, VmBackupExecutor};
use vmbackup::job::{BackupJob, IdPattern, Schedule};
use vmbackup::remote::{RemoteConfig, RemoteHandler, RemoteHandlerPool, RemoteProvider};
use vmbackup::resolve::{PatternResolver, RecordResolver, SrRecord, VmRecord};
use vmbackup::settings::Settings;
use vmbackup::tasklog::{ChannelSink, TaskEvent, TaskLogger};
use vmbackup::{Backup, BackupConfig};

/// Opt-in test logging: `RUST_LOG=debug cargo test -- --nocapture`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Resolves a pattern of the form `["id", ...]`; `{"error": "..."}` fails.
pub struct ListPatterns;

#[async_trait]
impl PatternResolver for ListPatterns {
    async fn resolve(&self, pattern: &IdPattern) -> Result<Vec<String>> {
        if let Some(message) = pattern.0.get("error").and_then(Value::as_str) {
            return Err(BackupError::PatternResolution(message.to_string()));
        }
        Ok(pattern
            .0
            .as_array()
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// In-memory uuid-to-record mapping; unknown uuids report no backend.
#[derive(Default)]
pub struct MapRecords {
    pub vms: HashMap<String, VmRecord>,
    pub srs: HashMap<String, SrRecord>,
}

impl MapRecords {
    pub fn with_vms(uuids: &[&str]) -> Self {
        let mut records = Self::default();
        for uuid in uuids {
            records.vms.insert(
                uuid.to_string(),
                VmRecord {
                    uuid: uuid.to_string(),
                    name_label: format!("vm {uuid}"),
                    extra: Map::new(),
                },
            );
        }
        records
    }

    pub fn with_sr(mut self, uuid: &str) -> Self {
        self.srs.insert(
            uuid.to_string(),
            SrRecord {
                uuid: uuid.to_string(),
                name_label: format!("sr {uuid}"),
                extra: Map::new(),
            },
        );
        self
    }
}

#[async_trait]
impl RecordResolver for MapRecords {
    async fn resolve_vm(&self, uuid: &str) -> Result<VmRecord> {
        self.vms
            .get(uuid)
            .cloned()
            .ok_or_else(|| BackupError::NoBackend(uuid.to_string()))
    }

    async fn resolve_sr(&self, uuid: &str) -> Result<SrRecord> {
        self.srs
            .get(uuid)
            .cloned()
            .ok_or_else(|| BackupError::NoBackend(uuid.to_string()))
    }
}

/// Counts sync/forget calls; sync fails for ids listed in `fail_sync`.
#[derive(Default)]
pub struct CountingRemotes {
    pub fail_sync: HashSet<String>,
    pub syncs: Arc<AtomicUsize>,
    pub forgets: Arc<AtomicUsize>,
}

pub struct CountingHandler {
    id: String,
    fail_sync: bool,
    syncs: Arc<AtomicUsize>,
    forgets: Arc<AtomicUsize>,
}

#[async_trait]
impl RemoteHandler for CountingHandler {
    async fn sync(&self) -> Result<()> {
        self.syncs.fetch_add(1, Ordering::SeqCst);
        if self.fail_sync {
            Err(BackupError::Internal(format!("mount failed: {}", self.id)))
        } else {
            Ok(())
        }
    }

    async fn forget(&self) -> Result<()> {
        self.forgets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl RemoteProvider for CountingRemotes {
    async fn get_handler(&self, config: &RemoteConfig) -> Result<Arc<dyn RemoteHandler>> {
        let id = config
            .0
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(Arc::new(CountingHandler {
            fail_sync: self.fail_sync.contains(&id),
            syncs: self.syncs.clone(),
            forgets: self.forgets.clone(),
            id,
        }))
    }
}

/// Records what each invocation saw; fails for uuids in `fail_vms`.
#[derive(Default)]
pub struct RecordingExecutor {
    pub fail_vms: HashSet<String>,
    pub in_flight: Arc<AtomicUsize>,
    pub peak_in_flight: Arc<AtomicUsize>,
    pub invocations: Arc<AtomicUsize>,
    /// When set, every invocation waits here before returning; sized to the
    /// VM count this proves all units run simultaneously.
    pub rendezvous: Option<Arc<tokio::sync::Barrier>>,
    /// Hold each invocation open briefly so overlap is observable.
    pub hold: Option<std::time::Duration>,
}

#[async_trait]
impl VmBackupExecutor for RecordingExecutor {
    async fn run(&self, ctx: VmBackupContext) -> Result<Value> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(barrier) = &self.rendezvous {
            barrier.wait().await;
        }
        if let Some(hold) = self.hold {
            tokio::time::sleep(hold).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_vms.contains(&ctx.vm.uuid) {
            return Err(BackupError::VmBackup {
                id: ctx.vm.uuid.clone(),
                reason: "snapshot failed".to_string(),
            });
        }

        ctx.task.info("transfer done", None).await?;
        Ok(json!({
            "vm": ctx.vm.uuid,
            "snapshotName": ctx.snapshot_name_template.render(&ctx.vm),
            "concurrency": ctx.settings.concurrency(),
        }))
    }
}

pub struct Harness {
    pub backup: Backup,
    pub events: mpsc::Receiver<TaskEvent>,
    pub remotes: Arc<CountingRemotes>,
    pub executor: Arc<RecordingExecutor>,
}

/// Wire an orchestrator over the mocks. `vm_ids`/`remote_ids` feed the list
/// patterns; settings scopes come in through `job_settings`.
pub fn harness(
    vm_ids: &[&str],
    remote_ids: &[&str],
    job_settings: HashMap<String, Settings>,
    remotes: CountingRemotes,
    executor: RecordingExecutor,
) -> Harness {
    let (tx, events) = mpsc::channel(1024);
    let task = TaskLogger::new(Arc::new(ChannelSink::new(tx)));

    let job = BackupJob {
        id: "job-1".to_string(),
        name: "nightly".to_string(),
        srs: IdPattern::new(json!(["sr-1"])),
        remotes: IdPattern::new(json!(remote_ids)),
        vms: IdPattern::new(json!(vm_ids)),
        settings: job_settings,
    };

    let remote_configs = remote_ids
        .iter()
        .map(|id| (id.to_string(), RemoteConfig::new(json!({ "id": id }))))
        .collect();

    let remotes = Arc::new(remotes);
    let executor = Arc::new(executor);

    let backup = Backup {
        config: BackupConfig::default(),
        job: Arc::new(job),
        schedule: Arc::new(Schedule::new("sched-1")),
        remotes: remote_configs,
        patterns: Arc::new(ListPatterns),
        records: Arc::new(MapRecords::with_vms(vm_ids).with_sr("sr-1")),
        pool: RemoteHandlerPool::new(remotes.clone()),
        executor: executor.clone(),
        task,
    };

    Harness {
        backup,
        events,
        remotes,
        executor,
    }
}

/// Drain all buffered task events after the run has finished.
pub async fn drain(mut events: mpsc::Receiver<TaskEvent>) -> Vec<TaskEvent> {
    events.close();
    let mut all = Vec::new();
    while let Some(event) = events.recv().await {
        all.push(event);
    }
    all
}
