use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use crate::error::MediatorError;
use crate::strategy::Strategy;

/// The closed set of module variants the mediator understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Base,
    Compressor,
    Dispenser,
}

impl ModuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Base => "base",
            ModuleKind::Compressor => "compressor",
            ModuleKind::Dispenser => "dispenser",
        }
    }

    /// Whether modules of this kind carry a payload and strategy slot
    pub fn is_specialized(&self) -> bool {
        !matches!(self, ModuleKind::Base)
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleKind {
    type Err = MediatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base" | "module" => Ok(ModuleKind::Base),
            "compressor" => Ok(ModuleKind::Compressor),
            "dispenser" => Ok(ModuleKind::Dispenser),
            _ => Err(MediatorError::UnsupportedModuleKind(s.to_string())),
        }
    }
}

/// Payload slot plus strategy slot carried by specialized modules
#[derive(Clone)]
pub struct Specialization {
    pub payload: Value,
    pub strategy: Option<Arc<dyn Strategy>>,
}

impl Specialization {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            strategy: None,
        }
    }
}

impl fmt::Debug for Specialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specialization")
            .field("payload", &self.payload)
            .field("strategy", &self.strategy.as_ref().map(|s| s.identifier()))
            .finish()
    }
}
