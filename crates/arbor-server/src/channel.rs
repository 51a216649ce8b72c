//! The outbound channel surface consumed by the processor.

use std::sync::Arc;

use arbor_core::ResponseMessage;

use crate::serializer::MessageSerializer;

/// An opaque serialized response ready for the channel's write path.
///
/// Ownership of the underlying buffer transfers to the channel on
/// submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A binary-encoded response.
    Binary(Vec<u8>),
    /// A text-encoded response.
    Text(String),
}

impl Frame {
    /// Length of the serialized payload in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Binary(bytes) => bytes.len(),
            Self::Text(text) => text.len(),
        }
    }

    /// Returns `true` if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if this is a binary frame.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }
}

/// Per-connection channel handle.
///
/// Implemented by the transport layer. Submitted frames and responses are
/// written asynchronously; the transport must preserve submission order for
/// a given channel (FIFO per channel). Neither write method blocks the
/// caller.
pub trait Channel: Send + Sync {
    /// Whether the channel's outbound buffer is below its high-water mark.
    ///
    /// The streamer polls this before emitting a frame and pauses while it
    /// returns `false`.
    fn is_writable(&self) -> bool;

    /// Submit a serialized frame for asynchronous write.
    fn write_frame(&self, frame: Frame);

    /// Submit a structured response for asynchronous write.
    ///
    /// Used for responses produced outside the framing path: dispatch
    /// failures, no-content results, and serialization-error reports.
    fn write_response(&self, response: ResponseMessage);

    /// The serializer negotiated for this connection.
    fn serializer(&self) -> Arc<dyn MessageSerializer>;

    /// Whether this connection carries binary frames.
    fn use_binary(&self) -> bool;
}
