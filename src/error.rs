use thiserror::Error;

/// Library errors using thiserror for structured error handling.
///
/// Missing command targets and missing subscribers have no variant. The
/// mediator skips and logs them.

#[derive(Error, Debug)]
pub enum MediatorError {
    #[error("Unsupported module kind: {0}")]
    UnsupportedModuleKind(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Command queue is closed")]
    QueueClosed,
}

#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Unsupported strategy: {0}")]
    UnsupportedStrategy(String),

    #[error("No strategy configured for module {0}")]
    StrategyNotConfigured(String),

    #[error("Module {0} does not accept a strategy")]
    NotSpecialized(String),

    #[error("Failed to encode payload")]
    EncodeFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// External fetch failures. These never reach callers of the mediator; a
/// module that sees one moves itself to the Error state.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("External fetch failed: request error: {0}")]
    Request(String),

    #[error("External fetch failed: server returned status {0}")]
    Status(u16),

    #[error("External fetch failed: could not decode response")]
    Decode(#[source] std::io::Error),

    #[error("External fetch failed: response contained no values")]
    Empty,

    #[error("External fetch failed: {0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to create config directory: {path}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
