pub mod config;
pub mod error;
pub mod executor;
pub mod job;
pub mod limit;
pub mod orchestrator;
pub mod remote;
pub mod resolve;
pub mod settings;
pub mod tasklog;
pub mod template;

pub use config::BackupConfig;
pub use error::{BackupError, Result};
pub use orchestrator::Backup;
