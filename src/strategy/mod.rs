/// Payload strategies
///
/// Strategies are pure transforms a specialized module applies to its
/// payload. They are selected by identifier through a family factory:
///
/// ```rust,ignore
/// let factory = CompressorFactory;
/// let strategy = factory.create_strategy("v3")?;
/// module.set_strategy(strategy)?;
/// let output = module.execute()?;
/// ```

pub mod compressor;
pub mod dispenser;

use std::sync::Arc;

use serde_json::Value;

use crate::error::StrategyError;

pub use compressor::CompressorFactory;
pub use dispenser::DispenserFactory;

/// Result of running a strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutput {
    Bytes(Vec<u8>),
    Text(String),
}

impl StrategyOutput {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            StrategyOutput::Bytes(bytes) => bytes,
            StrategyOutput::Text(text) => text.as_bytes(),
        }
    }
}

pub trait Strategy: Send + Sync {
    fn execute(&self, value: &Value) -> Result<StrategyOutput, StrategyError>;

    /// Identifier this strategy was created from
    fn identifier(&self) -> &'static str;
}

pub trait StrategyFactory {
    fn create_strategy(&self, identifier: &str) -> Result<Arc<dyn Strategy>, StrategyError>;
}

/// Plain textual form of a value: strings unquoted, everything else as JSON
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
