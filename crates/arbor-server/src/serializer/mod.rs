//! Response serializers.
//!
//! A connection negotiates a serializer at handshake time; the processor
//! picks the binary or text encoding per the channel's `use_binary`
//! attribute.

mod json;
mod msgpack;

use arbor_core::ResponseMessage;
use thiserror::Error;

pub use json::JsonSerializer;
pub use msgpack::MessagePackSerializer;

/// Errors raised while encoding a response.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// JSON encoding failed.
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// MessagePack encoding failed.
    #[error("MessagePack encoding failed: {0}")]
    MessagePack(#[from] rmp_serde::encode::Error),

    /// The serializer cannot produce the requested encoding.
    #[error("{0}")]
    Unsupported(String),
}

impl SerializationError {
    /// Create an unsupported-encoding error.
    #[must_use]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }
}

/// Encodes [`ResponseMessage`]s into wire payloads.
pub trait MessageSerializer: Send + Sync {
    /// Encode a response as binary bytes.
    fn serialize_binary(&self, response: &ResponseMessage) -> Result<Vec<u8>, SerializationError>;

    /// Encode a response as text.
    fn serialize_text(&self, response: &ResponseMessage) -> Result<String, SerializationError>;
}
