//! Decoded client requests.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tokens;
use crate::types::Value;

/// A decoded client request.
///
/// Produced by the transport's decoder and handed to an operation
/// processor. `request_id` is an opaque unique identifier echoed on every
/// response for the request; `op` selects the operation; `args` carries the
/// operation's arguments keyed by the tokens in [`crate::tokens`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage {
    /// Opaque unique identifier for the request.
    pub request_id: String,
    /// The requested operation.
    pub op: String,
    /// Operation arguments.
    #[serde(default)]
    pub args: HashMap<String, Value>,
}

impl RequestMessage {
    /// Create a request with no arguments.
    #[must_use]
    pub fn new(request_id: impl Into<String>, op: impl Into<String>) -> Self {
        Self { request_id: request_id.into(), op: op.into(), args: HashMap::new() }
    }

    /// Add an argument, consuming and returning the message.
    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Look up an argument by key.
    #[must_use]
    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.args.get(key)
    }

    /// Look up an argument and return it as a string slice.
    #[must_use]
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }

    /// The request's `batchSize` override, if present and positive.
    #[must_use]
    pub fn batch_size(&self) -> Option<usize> {
        match self.arg(tokens::ARGS_BATCH_SIZE).and_then(Value::as_int) {
            Some(n) if n > 0 => usize::try_from(n).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for RequestMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestMessage{{requestId={}, op={}}}", self.request_id, self.op)
    }
}
