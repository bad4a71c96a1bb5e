/// Value sources
///
/// A module's background task pulls one integer per tick from its source and
/// publishes it. Any error, whatever the cause, puts the module in Error.

pub mod http;
pub mod local;
pub mod scripted;

use std::sync::Arc;

use crate::config::{SourceConfig, SourceKind};
use crate::error::FetchError;

pub use http::HttpRandomSource;
pub use local::LocalRandomSource;
pub use scripted::ScriptedSource;

/// Something that can produce the next value for a module to publish
pub trait ValueSource: Send + Sync {
    fn fetch(&self) -> Result<i64, FetchError>;

    /// Get source name (for logging)
    fn name(&self) -> &'static str;
}

/// Build the source described by the configuration
pub fn from_config(config: &SourceConfig) -> Arc<dyn ValueSource> {
    match config.kind {
        SourceKind::Http => Arc::new(HttpRandomSource::new(
            config.url.clone(),
            std::time::Duration::from_millis(config.timeout_ms),
        )),
        SourceKind::Local => Arc::new(LocalRandomSource::new(config.min, config.max)),
    }
}
