pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("target is not available: {0}")]
    TargetUnavailable(#[from] crate::Error),

    #[error("target health probe returned status {0}")]
    TargetUnhealthy(u16),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("`concurrency` must be a positive integer")]
    InvalidConcurrency,

    #[error("`interval` must be a positive duration")]
    InvalidInterval,
}
