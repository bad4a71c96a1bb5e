use std::io::Write;
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;

use crate::error::StrategyError;

use super::{value_text, Strategy, StrategyFactory, StrategyOutput};

/// Binary serialization
pub struct CompressorV1;

/// JSON bytes
pub struct CompressorV2;

/// Gzip-compressed JSON
pub struct CompressorV3;

/// Reversed text
pub struct CompressorV4;

impl Strategy for CompressorV1 {
    fn execute(&self, value: &Value) -> Result<StrategyOutput, StrategyError> {
        let bytes =
            bincode::serialize(value).map_err(|e| StrategyError::EncodeFailed(Box::new(e)))?;
        Ok(StrategyOutput::Bytes(bytes))
    }

    fn identifier(&self) -> &'static str {
        "v1"
    }
}

impl Strategy for CompressorV2 {
    fn execute(&self, value: &Value) -> Result<StrategyOutput, StrategyError> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| StrategyError::EncodeFailed(Box::new(e)))?;
        Ok(StrategyOutput::Bytes(bytes))
    }

    fn identifier(&self) -> &'static str {
        "v2"
    }
}

impl Strategy for CompressorV3 {
    fn execute(&self, value: &Value) -> Result<StrategyOutput, StrategyError> {
        let data =
            serde_json::to_vec(value).map_err(|e| StrategyError::EncodeFailed(Box::new(e)))?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&data)
            .map_err(|e| StrategyError::EncodeFailed(Box::new(e)))?;
        let compressed = encoder
            .finish()
            .map_err(|e| StrategyError::EncodeFailed(Box::new(e)))?;

        Ok(StrategyOutput::Bytes(compressed))
    }

    fn identifier(&self) -> &'static str {
        "v3"
    }
}

impl Strategy for CompressorV4 {
    fn execute(&self, value: &Value) -> Result<StrategyOutput, StrategyError> {
        let reversed: String = value_text(value).chars().rev().collect();
        Ok(StrategyOutput::Bytes(reversed.into_bytes()))
    }

    fn identifier(&self) -> &'static str {
        "v4"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CompressorFactory;

impl StrategyFactory for CompressorFactory {
    fn create_strategy(&self, identifier: &str) -> Result<Arc<dyn Strategy>, StrategyError> {
        match identifier {
            "v1" => Ok(Arc::new(CompressorV1)),
            "v2" => Ok(Arc::new(CompressorV2)),
            "v3" => Ok(Arc::new(CompressorV3)),
            "v4" => Ok(Arc::new(CompressorV4)),
            other => Err(StrategyError::UnsupportedStrategy(other.to_string())),
        }
    }
}
