use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{BackupError, Result};
use crate::remote::handler::{RemoteConfig, RemoteHandler, RemoteProvider};

/// Acquires and releases remote handler sessions for one job run.
///
/// Acquisition is all-or-nothing: every resolved remote must sync before
/// any VM work starts, and a single sync failure fails the whole setup.
/// Release is unconditional and swallows individual forget errors, so a
/// cleanup problem can never mask the run's true outcome.
pub struct RemoteHandlerPool {
    provider: Arc<dyn RemoteProvider>,
}

impl RemoteHandlerPool {
    pub fn new(provider: Arc<dyn RemoteProvider>) -> Self {
        Self { provider }
    }

    /// Obtain and sync one handler per id, keyed by remote id.
    ///
    /// On failure, handlers already synced are forgotten best-effort before
    /// the error is returned, so a failed acquisition never leaks sessions.
    pub async fn acquire_all(
        &self,
        remotes: &HashMap<String, RemoteConfig>,
        remote_ids: &[String],
    ) -> Result<HashMap<String, Arc<dyn RemoteHandler>>> {
        let mut handlers: HashMap<String, Arc<dyn RemoteHandler>> = HashMap::new();

        for id in remote_ids {
            let acquired = self.acquire_one(remotes, id).await;
            match acquired {
                Ok(handler) => {
                    handlers.insert(id.clone(), handler);
                }
                Err(error) => {
                    Self::release_all(&handlers).await;
                    return Err(error);
                }
            }
        }

        Ok(handlers)
    }

    /// Forget every handler in the mapping. Forget errors are logged and
    /// swallowed.
    pub async fn release_all(handlers: &HashMap<String, Arc<dyn RemoteHandler>>) {
        for (id, handler) in handlers {
            if let Err(error) = handler.forget().await {
                tracing::warn!(remote = %id, error = %error, "remote forget failure");
            }
        }
    }

    async fn acquire_one(
        &self,
        remotes: &HashMap<String, RemoteConfig>,
        id: &str,
    ) -> Result<Arc<dyn RemoteHandler>> {
        let config = remotes
            .get(id)
            .ok_or_else(|| BackupError::UnknownRemote(id.to_string()))?;
        let handler = self.provider.get_handler(config).await?;
        handler.sync().await.map_err(|error| BackupError::RemoteSync {
            id: id.to_string(),
            reason: error.to_string(),
        })?;
        Ok(handler)
    }
}
