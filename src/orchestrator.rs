use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::task::JoinSet;

use crate::config::BackupConfig;
use crate::error::Result;
use crate::executor::{VmBackupContext, VmBackupExecutor};
use crate::job::{BackupJob, Schedule};
use crate::limit::ConcurrencyGate;
use crate::remote::{RemoteConfig, RemoteHandler, RemoteHandlerPool};
use crate::resolve::{PatternResolver, RecordResolver, SrRecord};
use crate::settings::{resolve_schedule_settings, resolve_vm_settings, Settings};
use crate::tasklog::TaskLogger;
use crate::template::SnapshotNameTemplate;

/// One scheduled backup run over a dynamically resolved set of VMs.
///
/// `run` drives the whole lifecycle: membership resolution, remote handler
/// acquisition, bounded per-VM fan-out with contained failures, guaranteed
/// remote release, and the root task's start/terminal events.
///
/// A setup failure (pattern resolution, record lookup, remote sync) ends
/// the root task with a failure event and yields no per-VM work; a per-VM
/// failure is logged on its subtask and never fails the job. `run` itself
/// only returns an error on task-protocol misuse of a root logger that was
/// already driven by the caller.
pub struct Backup {
    pub config: BackupConfig,
    pub job: Arc<BackupJob>,
    pub schedule: Arc<Schedule>,
    pub remotes: HashMap<String, RemoteConfig>,
    pub patterns: Arc<dyn PatternResolver>,
    pub records: Arc<dyn RecordResolver>,
    pub pool: RemoteHandlerPool,
    pub executor: Arc<dyn VmBackupExecutor>,
    pub task: TaskLogger,
}

impl Backup {
    /// Execute the run. Single use: consumes the orchestrator.
    ///
    /// Returns the per-VM results in submission order, `None` where a VM's
    /// unit failed. On setup failure the vec is empty and the root task
    /// carries the error.
    pub async fn run(self) -> Result<Vec<Option<Value>>> {
        let task = self.task.clone();
        task.start(
            "backup run",
            Some(json!({ "jobId": self.job.id, "scheduleId": self.schedule.id })),
        )
        .await?;

        match self.execute(&task).await {
            Ok(results) => {
                let summary = results
                    .iter()
                    .map(|slot| slot.clone().unwrap_or(Value::Null))
                    .collect();
                task.success(Value::Array(summary)).await?;
                Ok(results)
            }
            Err(error) => {
                task.failure(Value::String(error.to_string())).await?;
                Ok(Vec::new())
            }
        }
    }

    async fn execute(&self, task: &TaskLogger) -> Result<Vec<Option<Value>>> {
        let schedule_settings = resolve_schedule_settings(
            &self.config.default_settings,
            &self.job.settings,
            &self.schedule.id,
        );
        let template =
            SnapshotNameTemplate::compile(&self.config.snapshot_name_label_tpl, &self.job.name);

        let srs = Arc::new(self.resolve_srs().await?);

        let remote_ids = self.patterns.resolve(&self.job.remotes).await?;
        let handlers = Arc::new(self.pool.acquire_all(&self.remotes, &remote_ids).await?);

        let outcome = self
            .fan_out(task, &schedule_settings, template, handlers.clone(), srs)
            .await;

        // Runs on every exit path of fan-out; forget errors never surface.
        RemoteHandlerPool::release_all(&handlers).await;

        outcome
    }

    async fn resolve_srs(&self) -> Result<Vec<SrRecord>> {
        let sr_ids = self.patterns.resolve(&self.job.srs).await?;
        let mut srs = Vec::with_capacity(sr_ids.len());
        for uuid in &sr_ids {
            srs.push(self.records.resolve_sr(uuid).await?);
        }
        Ok(srs)
    }

    async fn fan_out(
        &self,
        task: &TaskLogger,
        schedule_settings: &Settings,
        template: SnapshotNameTemplate,
        handlers: Arc<HashMap<String, Arc<dyn RemoteHandler>>>,
        srs: Arc<Vec<SrRecord>>,
    ) -> Result<Vec<Option<Value>>> {
        let vm_ids = self.patterns.resolve(&self.job.vms).await?;
        let gate = ConcurrencyGate::new(schedule_settings.concurrency());

        let mut units = JoinSet::new();
        for (slot, vm_uuid) in vm_ids.iter().cloned().enumerate() {
            let subtask = task.fork()?;
            let gate = gate.clone();
            let records = self.records.clone();
            let executor = self.executor.clone();
            let job = self.job.clone();
            let schedule = self.schedule.clone();
            let schedule_settings = schedule_settings.clone();
            let template = template.clone();
            let handlers = handlers.clone();
            let srs = srs.clone();

            units.spawn(async move {
                let _permit = gate.acquire().await;
                let uuid = vm_uuid.clone();
                let outcome = subtask
                    .wrap("backup VM", Some(json!({ "id": vm_uuid })), |logger| {
                        let uuid = uuid.clone();
                        async move {
                            let vm = records.resolve_vm(&uuid).await?;
                            let settings =
                                resolve_vm_settings(&schedule_settings, &job.settings, &uuid);
                            executor
                                .run(VmBackupContext {
                                    snapshot_name_template: template,
                                    job,
                                    remote_handlers: handlers,
                                    schedule,
                                    settings,
                                    srs,
                                    task: logger,
                                    vm,
                                })
                                .await
                        }
                    })
                    .await;

                // Contained: a failed unit never aborts siblings or the job.
                let value = match outcome {
                    Ok(value) => Some(value),
                    Err(error) => {
                        tracing::warn!(vm = %uuid, error = %error, "VM backup failure");
                        None
                    }
                };
                (slot, value)
            });
        }

        let mut results: Vec<Option<Value>> = vec![None; vm_ids.len()];
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok((slot, value)) => results[slot] = value,
                Err(error) => {
                    tracing::warn!(error = %error, "VM backup unit aborted");
                }
            }
        }
        Ok(results)
    }
}
