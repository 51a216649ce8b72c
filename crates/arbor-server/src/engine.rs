//! The scripting-engine seam and result-iterator adaptor.

use std::fmt;
use std::iter;

use arbor_core::Value;
use futures_util::future::BoxFuture;
use thiserror::Error;

/// Variables pre-bound into a script evaluation, in request order.
pub type Bindings = Vec<(String, Value)>;

/// What a script evaluation produced.
pub enum EvalOutcome {
    /// A materialized value: a scalar, an array, or null.
    Value(Value),
    /// A streaming result, e.g. a graph cursor. `next` may block while the
    /// cursor fetches from storage.
    Stream(Box<dyn Iterator<Item = Value> + Send>),
}

impl fmt::Debug for EvalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Stream(_) => f.debug_tuple("Stream").field(&"..").finish(),
        }
    }
}

/// Errors reported by the scripting engine.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The engine's evaluation timeout elapsed before the script finished.
    #[error("evaluation timed out: {0}")]
    Timeout(String),

    /// The script itself failed: compilation or a runtime error raised by
    /// user code.
    #[error("{0}")]
    Script(String),

    /// The engine failed for a reason unrelated to the script.
    #[error("scripting engine failure: {0}")]
    Engine(String),
}

impl EvalError {
    /// Returns `true` if this is an evaluation timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// A pluggable scripting engine.
///
/// Evaluations run on the engine's own worker pool; the returned future
/// completes when the script finishes or fails. Enforcement of the
/// evaluation timeout is the engine's responsibility and surfaces as
/// [`EvalError::Timeout`].
pub trait ScriptEngine: Send + Sync {
    /// Evaluate a script with the given bindings.
    ///
    /// `language` selects the engine dialect; `None` means the engine's
    /// configured default.
    fn eval(
        &self,
        script: &str,
        language: Option<&str>,
        bindings: Bindings,
    ) -> BoxFuture<'static, Result<EvalOutcome, EvalError>>;
}

/// Normalized iteration over an evaluation outcome.
///
/// Scalars become one-element iterators, arrays iterate in element order,
/// null is empty, and streaming outcomes iterate as-is. Exposes explicit
/// `has_next`/`next` with single-slot lookahead: the streaming loop needs
/// to ask "is there more?" without consuming, and must be able to stop
/// asking once it has committed (some graph implementations open a new
/// transaction on the lookahead).
pub struct ResultIterator {
    inner: Box<dyn Iterator<Item = Value> + Send>,
    peeked: Option<Value>,
}

impl ResultIterator {
    /// An iterator over no results.
    #[must_use]
    pub fn empty() -> Self {
        Self { inner: Box::new(iter::empty()), peeked: None }
    }

    /// Adapt an evaluation outcome.
    #[must_use]
    pub fn from_outcome(outcome: EvalOutcome) -> Self {
        match outcome {
            EvalOutcome::Value(value) => Self::from_value(value),
            EvalOutcome::Stream(inner) => Self { inner, peeked: None },
        }
    }

    /// Adapt a materialized value.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let inner: Box<dyn Iterator<Item = Value> + Send> = match value {
            Value::Null => Box::new(iter::empty()),
            Value::Array(items) => Box::new(items.into_iter()),
            other => Box::new(iter::once(other)),
        };
        Self { inner, peeked: None }
    }

    /// Whether another result is available, without consuming it.
    pub fn has_next(&mut self) -> bool {
        if self.peeked.is_none() {
            self.peeked = self.inner.next();
        }
        self.peeked.is_some()
    }

    /// The next result, if any.
    pub fn next(&mut self) -> Option<Value> {
        if let Some(value) = self.peeked.take() {
            return Some(value);
        }
        self.inner.next()
    }
}

impl fmt::Debug for ResultIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultIterator").field("peeked", &self.peeked).finish()
    }
}
