use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::job::IdPattern;

/// Resolves an opaque membership pattern to an ordered id list.
///
/// Must be deterministic for a given pattern snapshot. Errors here are
/// setup failures and abort the whole run.
#[async_trait]
pub trait PatternResolver: Send + Sync {
    async fn resolve(&self, pattern: &IdPattern) -> Result<Vec<String>>;
}

/// A resolved VM record. `name_label` is pulled out because the snapshot
/// name template needs it; everything else the backend returned rides along
/// untyped for the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmRecord {
    pub uuid: String,
    pub name_label: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A resolved storage-repository record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SrRecord {
    pub uuid: String,
    pub name_label: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Looks up concrete records behind resolved uuids.
///
/// Fails with [`crate::error::BackupError::NoBackend`] when the uuid is
/// unknown to the run's id-to-backend mapping.
#[async_trait]
pub trait RecordResolver: Send + Sync {
    async fn resolve_vm(&self, uuid: &str) -> Result<VmRecord>;

    async fn resolve_sr(&self, uuid: &str) -> Result<SrRecord>;
}
