use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde_json::Value;
use sha2::{Digest, Sha256, Sha512};

use crate::error::StrategyError;

use super::{value_text, Strategy, StrategyFactory, StrategyOutput};

/// Base64 text
pub struct DispenserV1;

/// SHA-256 hex digest
pub struct DispenserV2;

/// SHA-512 hex digest
pub struct DispenserV3;

/// Uppercase text
pub struct DispenserV4;

impl Strategy for DispenserV1 {
    fn execute(&self, value: &Value) -> Result<StrategyOutput, StrategyError> {
        Ok(StrategyOutput::Text(BASE64_STANDARD.encode(value_text(value))))
    }

    fn identifier(&self) -> &'static str {
        "v1"
    }
}

impl Strategy for DispenserV2 {
    fn execute(&self, value: &Value) -> Result<StrategyOutput, StrategyError> {
        let digest = Sha256::digest(value_text(value).as_bytes());
        Ok(StrategyOutput::Text(hex::encode(digest)))
    }

    fn identifier(&self) -> &'static str {
        "v2"
    }
}

impl Strategy for DispenserV3 {
    fn execute(&self, value: &Value) -> Result<StrategyOutput, StrategyError> {
        let digest = Sha512::digest(value_text(value).as_bytes());
        Ok(StrategyOutput::Text(hex::encode(digest)))
    }

    fn identifier(&self) -> &'static str {
        "v3"
    }
}

impl Strategy for DispenserV4 {
    fn execute(&self, value: &Value) -> Result<StrategyOutput, StrategyError> {
        Ok(StrategyOutput::Text(value_text(value).to_uppercase()))
    }

    fn identifier(&self) -> &'static str {
        "v4"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DispenserFactory;

impl StrategyFactory for DispenserFactory {
    fn create_strategy(&self, identifier: &str) -> Result<Arc<dyn Strategy>, StrategyError> {
        match identifier {
            "v1" => Ok(Arc::new(DispenserV1)),
            "v2" => Ok(Arc::new(DispenserV2)),
            "v3" => Ok(Arc::new(DispenserV3)),
            "v4" => Ok(Arc::new(DispenserV4)),
            other => Err(StrategyError::UnsupportedStrategy(other.to_string())),
        }
    }
}
