//! Payload codecs.
//!
//! The engine never assumes a wire format: everything that crosses the
//! worker process boundary (and every HTTP response body) goes through an
//! injected encode/decode pair. Two implementations are provided — plain
//! JSON and MessagePack.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Encode/decode pair for task payloads and results.
pub trait PayloadCodec: Send + Sync {
    /// Codec name, also used as a config value.
    fn name(&self) -> &'static str;

    /// MIME type for HTTP responses encoded with this codec.
    fn content_type(&self) -> &'static str;

    fn encode(&self, value: &serde_json::Value) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, bytes: &[u8]) -> Result<serde_json::Value, CodecError>;
}

/// Codec selection in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CodecKind {
    #[default]
    Json,
    Msgpack,
}

impl CodecKind {
    /// Build the codec this kind names.
    pub fn build(self) -> Arc<dyn PayloadCodec> {
        match self {
            CodecKind::Json => Arc::new(JsonCodec),
            CodecKind::Msgpack => Arc::new(MsgpackCodec),
        }
    }
}

/// UTF-8 JSON, the interoperable default.
pub struct JsonCodec;

impl PayloadCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode(&self, value: &serde_json::Value) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<serde_json::Value, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// MessagePack, the compact binary option.
pub struct MsgpackCodec;

impl PayloadCodec for MsgpackCodec {
    fn name(&self) -> &'static str {
        "msgpack"
    }

    fn content_type(&self) -> &'static str {
        "application/msgpack"
    }

    fn encode(&self, value: &serde_json::Value) -> Result<Vec<u8>, CodecError> {
        Ok(rmp_serde::to_vec(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<serde_json::Value, CodecError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
