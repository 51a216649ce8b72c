//! MessagePack binary serializer.

use arbor_core::ResponseMessage;

use super::{MessageSerializer, SerializationError};

/// Serializes responses as MessagePack.
///
/// Binary-only: a connection that negotiated this serializer but asks for
/// text frames gets a serialization error, which the framing path reports
/// to the client.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessagePackSerializer;

impl MessageSerializer for MessagePackSerializer {
    fn serialize_binary(&self, response: &ResponseMessage) -> Result<Vec<u8>, SerializationError> {
        Ok(rmp_serde::to_vec_named(response)?)
    }

    fn serialize_text(&self, _response: &ResponseMessage) -> Result<String, SerializationError> {
        Err(SerializationError::unsupported(
            "the MessagePack serializer does not produce text frames",
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use arbor_core::{ResponseStatusCode, Value};

    use super::*;

    #[test]
    fn test_binary_round_trip() {
        let response = ResponseMessage::build_for("r-2")
            .code(ResponseStatusCode::PartialContent)
            .result(vec![Value::Bool(true), Value::Null])
            .create();

        let bytes = MessagePackSerializer.serialize_binary(&response).unwrap();
        let back: ResponseMessage = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(back, response);
    }

    #[test]
    fn test_text_is_unsupported() {
        let response = ResponseMessage::build_for("r-2").create();
        let err = MessagePackSerializer.serialize_text(&response).unwrap_err();
        assert!(matches!(err, SerializationError::Unsupported(_)));
    }
}
