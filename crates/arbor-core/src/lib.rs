//! Core wire-protocol types for the ArborDB remote query server.
//!
//! This crate defines the data model shared between the server's operation
//! processors and its transport layer: the heterogeneous [`Value`] type,
//! decoded [`RequestMessage`]s, outbound [`ResponseMessage`]s, and the
//! response status codes of the protocol. The transport decodes inbound
//! bytes into these types and encodes outbound responses from them; the
//! processors in `arbor-server` operate on them exclusively.

pub mod message;
pub mod status;
pub mod tokens;
pub mod types;

pub use message::{RequestMessage, ResponseMessage, ResponseMessageBuilder, ResponseStatus};
pub use status::ResponseStatusCode;
pub use types::Value;
