//! String tokens of the request protocol.
//!
//! Op codes and argument keys are string tokens on the wire; this module is
//! the single place they are spelled out.

/// Op code for evaluating a script.
pub const OPS_EVAL: &str = "eval";

/// Sentinel op code produced by the decoder for unparseable messages.
pub const OPS_INVALID: &str = "invalid";

/// The script source to evaluate.
pub const ARGS_GREMLIN: &str = "gremlin";

/// Scripting-engine language identifier.
pub const ARGS_LANGUAGE: &str = "language";

/// Pre-bound variables for the evaluation.
pub const ARGS_BINDINGS: &str = "bindings";

/// Number of results per outbound frame.
pub const ARGS_BATCH_SIZE: &str = "batchSize";

/// Logical-name to graph-name rewrites.
pub const ARGS_ALIASES: &str = "aliases";

/// Historical alias for [`ARGS_ALIASES`].
pub const ARGS_REBINDINGS: &str = "rebindings";
