//! JSON text serializer.

use arbor_core::ResponseMessage;

use super::{MessageSerializer, SerializationError};

/// Serializes responses as JSON.
///
/// The default text serializer; also serves binary connections by emitting
/// the UTF-8 bytes of the JSON document.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl MessageSerializer for JsonSerializer {
    fn serialize_binary(&self, response: &ResponseMessage) -> Result<Vec<u8>, SerializationError> {
        Ok(serde_json::to_vec(response)?)
    }

    fn serialize_text(&self, response: &ResponseMessage) -> Result<String, SerializationError> {
        Ok(serde_json::to_string(response)?)
    }
}
