//! Response status codes of the wire protocol.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Status code carried by every response message.
///
/// Codes below 300 indicate success; `PartialContent` is the only
/// non-terminal code and marks a chunk of a streamed result. Codes in the
/// 4xx range are request faults detected before evaluation, 5xx codes are
/// server-side failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatusCode {
    /// Terminal success with a payload.
    Success,
    /// Terminal success with no payload.
    NoContent,
    /// Non-terminal chunk of a streamed result.
    PartialContent,
    /// The request could not be parsed or its op code is not recognized.
    MalformedRequest,
    /// The request was parseable but its arguments are invalid.
    InvalidRequestArguments,
    /// A server-side failure with no more specific code.
    ServerError,
    /// The script failed to evaluate.
    ServerScriptEvaluationError,
    /// Evaluation or response streaming exceeded its time budget.
    ServerTimeoutError,
    /// A response could not be serialized.
    ServerSerializationError,
}

impl ResponseStatusCode {
    /// The numeric wire value of this code.
    #[must_use]
    pub const fn value(self) -> u16 {
        match self {
            Self::Success => 200,
            Self::NoContent => 204,
            Self::PartialContent => 206,
            Self::MalformedRequest => 498,
            Self::InvalidRequestArguments => 499,
            Self::ServerError => 500,
            Self::ServerScriptEvaluationError => 597,
            Self::ServerTimeoutError => 598,
            Self::ServerSerializationError => 599,
        }
    }

    /// Resolves a numeric wire value back to a code.
    #[must_use]
    pub const fn from_value(value: u16) -> Option<Self> {
        match value {
            200 => Some(Self::Success),
            204 => Some(Self::NoContent),
            206 => Some(Self::PartialContent),
            498 => Some(Self::MalformedRequest),
            499 => Some(Self::InvalidRequestArguments),
            500 => Some(Self::ServerError),
            597 => Some(Self::ServerScriptEvaluationError),
            598 => Some(Self::ServerTimeoutError),
            599 => Some(Self::ServerSerializationError),
            _ => None,
        }
    }

    /// Returns `true` if this code ends the response stream for a request.
    ///
    /// Every code except `PartialContent` is terminal; a request sees
    /// exactly one terminal code on its channel.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::PartialContent)
    }

    /// Returns `true` if this code reports a fault.
    #[must_use]
    pub const fn is_error(self) -> bool {
        self.value() >= 400
    }
}

impl fmt::Display for ResponseStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl Serialize for ResponseStatusCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.value())
    }
}

impl<'de> Deserialize<'de> for ResponseStatusCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u16::deserialize(deserializer)?;
        Self::from_value(value)
            .ok_or_else(|| D::Error::custom(format!("unknown response status code: {value}")))
    }
}
