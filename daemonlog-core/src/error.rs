use thiserror::Error;

/// Errors raised while starting or stopping a logging [`Engine`](crate::Engine).
#[derive(Error, Debug)]
pub enum EngineError {
    /// The sink refused to open its destination. Nothing was started.
    #[error("Unable to open log destination {destination}: {source}")]
    OpenDestination {
        destination: String,
        #[source]
        source: std::io::Error,
    },

    /// No per-user documents or home directory could be resolved.
    #[error("Unable to locate a per-user directory for log files")]
    NoUserDirectory,

    #[error("Unable to spawn logging worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Logging worker thread panicked")]
    WorkerPanicked,

    #[error("Unable to close log destination: {0}")]
    Close(#[source] std::io::Error),
}
