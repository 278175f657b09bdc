use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Opaque configuration for one remote storage destination. Interpreted
/// only by the [`RemoteProvider`] that turns it into a handler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteConfig(pub Value);

impl RemoteConfig {
    pub fn new(value: Value) -> Self {
        Self(value)
    }
}

/// A session bound to one remote id.
///
/// Lifecycle: `sync` must complete before any use, then exactly one
/// `forget` ends the session. During a run, handlers are shared read-only
/// across every per-VM unit; `forget` is called exclusively by the
/// orchestrator.
#[async_trait]
pub trait RemoteHandler: Send + Sync {
    async fn sync(&self) -> Result<()>;

    async fn forget(&self) -> Result<()>;
}

/// Produces handlers from remote configurations.
#[async_trait]
pub trait RemoteProvider: Send + Sync {
    async fn get_handler(&self, config: &RemoteConfig) -> Result<Arc<dyn RemoteHandler>>;
}
