use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("task has already started")]
    TaskAlreadyStarted,

    #[error("task has already ended")]
    TaskAlreadyEnded,

    #[error("start the task first")]
    TaskNotStarted,

    #[error("no backend associated to {0}")]
    NoBackend(String),

    #[error("unknown remote: {0}")]
    UnknownRemote(String),

    #[error("remote sync failed for {id}: {reason}")]
    RemoteSync { id: String, reason: String },

    #[error("pattern resolution failed: {0}")]
    PatternResolution(String),

    #[error("VM backup failed for {id}: {reason}")]
    VmBackup { id: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, BackupError>;
