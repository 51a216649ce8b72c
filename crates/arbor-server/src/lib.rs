//! Script-evaluation operation processor for the ArborDB remote query
//! server.
//!
//! Clients submit requests carrying a graph-traversal script; this crate
//! evaluates the script against a pluggable [`ScriptEngine`], streams the
//! resulting object sequence back to the client's [`Channel`] in batched
//! frames, and coordinates transaction commit/rollback around the
//! evaluation through a [`GraphManager`].
//!
//! # Modules
//!
//! - [`op`] - request dispatch, script evaluation, and result streaming
//! - [`channel`] - the outbound channel surface consumed by the processor
//! - [`serializer`] - response serializers (JSON text, MessagePack binary)
//! - [`engine`] - the scripting-engine seam and result-iterator adaptor
//! - [`graph`] - the graph-manager seam and transaction coordination
//! - [`context`] - per-request execution state
//! - [`settings`] - server settings consumed by the processor

#![deny(clippy::unwrap_used)]

pub mod channel;
pub mod context;
pub mod engine;
pub mod graph;
pub mod metrics;
pub mod op;
pub mod serializer;
pub mod settings;

pub use channel::{Channel, Frame};
pub use context::Context;
pub use engine::{Bindings, EvalError, EvalOutcome, ResultIterator, ScriptEngine};
pub use graph::GraphManager;
pub use op::{EvalOpProcessor, EvalPreCheck, OpError, OpHandler, OpRegistry, StreamError};
pub use serializer::{JsonSerializer, MessagePackSerializer, MessageSerializer, SerializationError};
pub use settings::Settings;
