//! The `eval` operation: script evaluation and result streaming.

use std::sync::Arc;
use std::time::Duration;

use arbor_core::{tokens, RequestMessage, ResponseMessage, ResponseStatusCode, Value};
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::{EvalPreCheck, OpError, OpHandler, OpRegistry};
use crate::channel::Frame;
use crate::context::Context;
use crate::engine::{Bindings, ResultIterator, ScriptEngine};
use crate::graph::{attempt_commit, attempt_rollback};
use crate::metrics;
use crate::serializer::{MessageSerializer, SerializationError};

/// How long the streaming worker pauses when the channel is not writable.
const BACKPRESSURE_PAUSE: Duration = Duration::from_millis(10);

/// Binding keys that collide with the scripting engine's standard static
/// imports. Compared case-insensitively.
const RESERVED_BINDING_KEYS: [&str; 4] = ["id", "key", "label", "value"];

/// Errors raised while streaming a result iterator to the channel.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The serialization budget elapsed before the response was fully
    /// written.
    #[error(
        "Serialization of the entire response exceeded the serializedResponseTimeout setting{}",
        timeout_suffix(.backpressured)
    )]
    Timeout {
        /// Whether backpressure was observed before the budget elapsed;
        /// distinguishes a slow client from a slow server.
        backpressured: bool,
    },

    /// The worker was cancelled cooperatively.
    #[error("result iteration was interrupted")]
    Interrupted,
}

fn timeout_suffix(backpressured: &bool) -> &'static str {
    if *backpressured {
        " [server paused writes to the client as messages were not being consumed quickly enough]"
    } else {
        ""
    }
}

/// Processor for script-evaluation requests.
///
/// Owns the op-code registry, seeded with the `eval` handler; embedding
/// servers register additional handlers with [`EvalOpProcessor::register`].
/// When constructed with `manage_transactions`, the processor commits at
/// successful terminal boundaries and rolls back on every failure path.
pub struct EvalOpProcessor {
    manage_transactions: bool,
    registry: OpRegistry,
    precheck: EvalPreCheck,
}

impl EvalOpProcessor {
    /// Create a processor evaluating scripts on the given engine.
    #[must_use]
    pub fn new(engine: Arc<dyn ScriptEngine>, manage_transactions: bool) -> Self {
        let mut registry = OpRegistry::new();
        let handler: OpHandler = Arc::new(move |ctx: Arc<Context>| {
            let engine = Arc::clone(&engine);
            Box::pin(eval_op(ctx, engine, manage_transactions))
        });
        registry.register(tokens::OPS_EVAL, handler);

        let precheck: EvalPreCheck = Arc::new(validate_eval_message);
        Self { manage_transactions, registry, precheck }
    }

    /// Whether this processor manages transactions around evaluations.
    #[must_use]
    pub const fn manages_transactions(&self) -> bool {
        self.manage_transactions
    }

    /// Replace the pre-check run against `eval` requests during selection.
    #[must_use]
    pub fn with_eval_precheck(mut self, precheck: EvalPreCheck) -> Self {
        self.precheck = precheck;
        self
    }

    /// Register a handler for an additional op code.
    pub fn register(&mut self, op: impl Into<String>, handler: OpHandler) {
        self.registry.register(op, handler);
    }

    /// Select the handler for a request.
    ///
    /// `eval` requests are validated first; the `invalid` sentinel and
    /// unrecognized op codes fail with a malformed-request error. The
    /// processor never writes to the channel here; the caller converts the
    /// error into a response.
    pub fn select(&self, ctx: &Context) -> Result<OpHandler, OpError> {
        let msg = ctx.message();
        debug!(request_id = %msg.request_id, op = %msg.op, "selecting handler for request");

        match msg.op.as_str() {
            tokens::OPS_EVAL => {
                (self.precheck)(msg)?;
                self.registry.get(tokens::OPS_EVAL).cloned().ok_or_else(|| {
                    OpError::malformed_request(msg, "no handler registered for the eval op")
                })
            }
            tokens::OPS_INVALID => Err(OpError::malformed_request(
                msg,
                format!("Message could not be parsed. Check the format of the request. [{msg}]"),
            )),
            op => self.registry.get(op).cloned().ok_or_else(|| {
                OpError::malformed_request(msg, format!("Message with op code [{op}] is not recognized."))
            }),
        }
    }

    /// Select and invoke the handler for a request, converting a dispatch
    /// or handler failure into its error response.
    pub async fn process(&self, ctx: Arc<Context>) {
        let handler = match self.select(&ctx) {
            Ok(handler) => handler,
            Err(err) => {
                warn!(request_id = %ctx.message().request_id, "{err}");
                ctx.write_terminal(err.response);
                return;
            }
        };

        if let Err(err) = handler(Arc::clone(&ctx)).await {
            warn!(request_id = %ctx.message().request_id, "{err}");
            ctx.write_terminal(err.response);
        }
    }
}

/// Validate an `eval` request.
///
/// Fails with invalid-arguments when the `gremlin` argument is missing,
/// when a binding key is not a string, or when a binding key collides with
/// the reserved tokens.
pub fn validate_eval_message(msg: &RequestMessage) -> Result<(), OpError> {
    if msg.arg(tokens::ARGS_GREMLIN).is_none() {
        return Err(OpError::invalid_arguments(
            msg,
            format!(
                "A message with an [{}] op code requires a [{}] argument.",
                tokens::OPS_EVAL,
                tokens::ARGS_GREMLIN
            ),
        ));
    }

    if let Some(bindings) = msg.arg(tokens::ARGS_BINDINGS) {
        let Some(entries) = bindings.as_map() else {
            return Err(OpError::invalid_arguments(
                msg,
                format!("The [{}] argument must be a map.", tokens::ARGS_BINDINGS),
            ));
        };

        for (key, _) in entries {
            let Some(name) = key.as_str() else {
                return Err(OpError::invalid_arguments(
                    msg,
                    format!(
                        "The [{}] message is using one or more invalid binding keys - they must be of type String and cannot be null.",
                        tokens::OPS_EVAL
                    ),
                ));
            };
            if is_reserved_binding_key(name) {
                return Err(OpError::invalid_arguments(
                    msg,
                    format!(
                        "The [{}] message is using at least one of the invalid binding keys of [{}]. It conflicts with standard static imports to the scripting engine.",
                        tokens::OPS_EVAL,
                        reserved_binding_keys_joined()
                    ),
                ));
            }
        }
    }

    Ok(())
}

fn is_reserved_binding_key(name: &str) -> bool {
    RESERVED_BINDING_KEYS.iter().any(|key| name.eq_ignore_ascii_case(key))
}

fn reserved_binding_keys_joined() -> String {
    let upper: Vec<String> =
        RESERVED_BINDING_KEYS.iter().map(|key| key.to_uppercase()).collect();
    format!("{},{}", RESERVED_BINDING_KEYS.join(","), upper.join(","))
}

/// Whether a binding key is a valid script variable name:
/// `[A-Za-z$_][A-Za-z0-9$_]*`.
fn is_valid_binding_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '$' || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '$' || c == '_')
}

/// Build the evaluation bindings from the request.
///
/// This is the bindings-supplier step: it can fail with invalid-arguments
/// before evaluation begins.
fn build_bindings(msg: &RequestMessage) -> Result<Bindings, OpError> {
    let Some(raw) = msg.arg(tokens::ARGS_BINDINGS) else {
        return Ok(Bindings::new());
    };
    let entries = raw.as_map().ok_or_else(|| {
        OpError::invalid_arguments(
            msg,
            format!("The [{}] argument must be a map.", tokens::ARGS_BINDINGS),
        )
    })?;

    let mut bindings = Bindings::with_capacity(entries.len());
    for (key, value) in entries {
        let Some(name) = key.as_str() else {
            return Err(OpError::invalid_arguments(
                msg,
                format!(
                    "The [{}] message is using one or more invalid binding keys - they must be of type String and cannot be null.",
                    tokens::OPS_EVAL
                ),
            ));
        };
        if is_reserved_binding_key(name) {
            return Err(OpError::invalid_arguments(
                msg,
                format!(
                    "The [{}] message is using at least one of the invalid binding keys of [{}]. It conflicts with standard static imports to the scripting engine.",
                    tokens::OPS_EVAL,
                    reserved_binding_keys_joined()
                ),
            ));
        }
        if !is_valid_binding_name(name) {
            return Err(OpError::invalid_arguments(
                msg,
                format!(
                    "The [{}] argument contains a key [{name}] that is not a valid variable name.",
                    tokens::ARGS_BINDINGS
                ),
            ));
        }
        bindings.push((name.to_owned(), value.clone()));
    }
    Ok(bindings)
}

/// Validate the alias mapping shape for strict transaction management.
///
/// Run before evaluation so the transaction coordinator can assume a
/// string-to-string mapping at commit/rollback time.
fn validate_alias_mapping(msg: &RequestMessage) -> Result<(), OpError> {
    let Some(mapping) =
        msg.arg(tokens::ARGS_ALIASES).or_else(|| msg.arg(tokens::ARGS_REBINDINGS))
    else {
        return Err(OpError::invalid_arguments(
            msg,
            format!(
                "A message with an [{}] op code requires an [{}] argument when strict transaction management is enabled.",
                tokens::OPS_EVAL,
                tokens::ARGS_ALIASES
            ),
        ));
    };

    let entries = mapping.as_map().ok_or_else(|| {
        OpError::invalid_arguments(
            msg,
            format!(
                "The [{}] argument must be a map of logical names to graph names.",
                tokens::ARGS_ALIASES
            ),
        )
    })?;

    for (alias, graph) in entries {
        if alias.as_str().is_none() || graph.as_str().is_none() {
            return Err(OpError::invalid_arguments(
                msg,
                format!(
                    "The [{}] argument must map logical names to graph names as strings.",
                    tokens::ARGS_ALIASES
                ),
            ));
        }
    }
    Ok(())
}

/// The generalized `eval` operation.
///
/// Builds bindings, submits the script to the engine, and hands the result
/// iterator to [`handle_iterator`]. Failures of the evaluation future and
/// of streaming are each converted into exactly one terminal response,
/// with a rollback when transactions are managed.
async fn eval_op(
    ctx: Arc<Context>,
    engine: Arc<dyn ScriptEngine>,
    manage_transactions: bool,
) -> Result<(), OpError> {
    let msg = ctx.message();
    let strict = ctx.settings().strict_transaction_management;

    if manage_transactions && strict {
        validate_alias_mapping(msg)?;
    }
    let bindings = build_bindings(msg)?;

    let script = msg.arg_str(tokens::ARGS_GREMLIN).ok_or_else(|| {
        OpError::invalid_arguments(
            msg,
            format!(
                "A message with an [{}] op code requires a [{}] argument.",
                tokens::OPS_EVAL,
                tokens::ARGS_GREMLIN
            ),
        )
    })?;
    let language = msg.arg_str(tokens::ARGS_LANGUAGE);

    debug!(request_id = %msg.request_id, "submitting script for evaluation");
    let eval_started = std::time::Instant::now();
    let outcome = engine.eval(script, language, bindings).await;
    metrics::record_eval_duration(eval_started.elapsed());

    match outcome {
        Ok(result) => {
            debug!(request_id = %msg.request_id, "preparing to iterate results");
            let itty = ResultIterator::from_outcome(result);
            match handle_iterator(&ctx, itty, manage_transactions).await {
                Ok(()) => {}
                Err(err @ StreamError::Timeout { .. }) => {
                    let error_message = format!(
                        "Response iteration exceeded the configured threshold for request [{msg}] - {err}"
                    );
                    warn!("{error_message}");
                    metrics::record_eval_error();
                    ctx.write_terminal(
                        ResponseMessage::build(msg)
                            .code(ResponseStatusCode::ServerTimeoutError)
                            .status_message(error_message)
                            .create(),
                    );
                    if manage_transactions {
                        attempt_rollback(msg, ctx.graph_manager().as_ref(), strict);
                    }
                }
                Err(err) => {
                    warn!("Exception processing a script on request [{msg}]: {err}");
                    metrics::record_eval_error();
                    ctx.write_terminal(
                        ResponseMessage::build(msg)
                            .code(ResponseStatusCode::ServerError)
                            .status_message(err.to_string())
                            .create(),
                    );
                    if manage_transactions {
                        attempt_rollback(msg, ctx.graph_manager().as_ref(), strict);
                    }
                }
            }
        }
        Err(err) if err.is_timeout() => {
            warn!(
                "Response evaluation exceeded the configured threshold for request [{msg}] - {err}"
            );
            metrics::record_eval_error();
            ctx.write_terminal(
                ResponseMessage::build(msg)
                    .code(ResponseStatusCode::ServerTimeoutError)
                    .status_message(err.to_string())
                    .create(),
            );
            if manage_transactions {
                attempt_rollback(msg, ctx.graph_manager().as_ref(), strict);
            }
        }
        Err(err) => {
            warn!("Exception processing a script on request [{msg}]: {err}");
            metrics::record_eval_error();
            ctx.write_terminal(
                ResponseMessage::build(msg)
                    .code(ResponseStatusCode::ServerScriptEvaluationError)
                    .status_message(err.to_string())
                    .create(),
            );
            if manage_transactions {
                attempt_rollback(msg, ctx.graph_manager().as_ref(), strict);
            }
        }
    }

    Ok(())
}

/// Stream a result iterator to the channel in batched frames.
///
/// Results are pulled one at a time into an aggregate capped at the batch
/// size, and a frame is emitted when the batch fills or the iterator
/// drains. Pulling is gated on room in the aggregate so a paused channel
/// cannot grow it, and emission is gated on channel writability; while the
/// channel is paused the worker sleeps in short intervals. The terminal
/// frame is committed before it is flushed, so a client that sees success
/// sees a durable transaction.
async fn handle_iterator(
    ctx: &Context,
    mut itty: ResultIterator,
    manage_transactions: bool,
) -> Result<(), StreamError> {
    let msg = ctx.message();
    let settings = ctx.settings();
    let strict = settings.strict_transaction_management;
    let channel = ctx.channel();
    let serializer = channel.serializer();
    let use_binary = channel.use_binary();
    let mut warned_backpressure = false;

    // an empty iterator happens on things like g.V().iterate(): nothing is
    // left to iterate, so commit (which implies the success about to be
    // reported) and answer with no content
    if !itty.has_next() {
        if manage_transactions {
            attempt_commit(msg, ctx.graph_manager().as_ref(), strict);
        }
        ctx.write_terminal(
            ResponseMessage::build(msg).code(ResponseStatusCode::NoContent).create(),
        );
        return Ok(());
    }

    let started = Instant::now();
    let batch_size = msg.batch_size().unwrap_or(settings.result_iteration_batch_size);
    let mut aggregate: Vec<Value> = Vec::with_capacity(batch_size);

    // external loop control instead of re-checking has_next() in the guard:
    // some graph implementations open a new transaction on the lookahead,
    // which would resurrect the transaction committed below
    let mut has_more = itty.has_next();

    while has_more {
        if ctx.is_interrupted() {
            return Err(StreamError::Interrupted);
        }

        // pull only when there is room: while the channel is paused below,
        // iterating next() would grow the aggregate past the batch size
        if aggregate.len() < batch_size {
            if let Some(item) = itty.next() {
                aggregate.push(item);
            }
        }

        if channel.is_writable() {
            if aggregate.len() == batch_size || !itty.has_next() {
                let code = if itty.has_next() {
                    ResponseStatusCode::PartialContent
                } else {
                    ResponseStatusCode::Success
                };

                let batch = std::mem::take(&mut aggregate);
                let frame = match make_frame(ctx, serializer.as_ref(), use_binary, batch, code) {
                    Ok(frame) => frame,
                    Err(_) => {
                        // the serialization error was already reported to
                        // the client inside make_frame
                        metrics::record_eval_error();
                        if manage_transactions {
                            attempt_rollback(msg, ctx.graph_manager().as_ref(), strict);
                        }
                        break;
                    }
                };

                if itty.has_next() {
                    aggregate = Vec::with_capacity(batch_size);
                    channel.write_frame(frame);
                } else {
                    // commit before the flush: if a commit is required it
                    // is complete before the client can observe success
                    if manage_transactions {
                        attempt_commit(msg, ctx.graph_manager().as_ref(), strict);
                    }
                    has_more = false;
                    ctx.write_terminal_frame(frame);
                }
            }
        } else {
            if !warned_backpressure {
                warn!(
                    request_id = %msg.request_id,
                    "pausing response writing as the outbound buffer is full - writing will resume once the client catches up"
                );
                warned_backpressure = true;
            }
            // the client is lagging; hold here for a moment so it can
            // catch up. this is a pooled worker, not the I/O task.
            sleep(BACKPRESSURE_PAUSE).await;
        }

        // the budget no longer applies once the terminal frame is on the
        // wire; timing out then would roll back a committed transaction
        if has_more && started.elapsed() > settings.response_budget() {
            return Err(StreamError::Timeout { backpressured: warned_backpressure });
        }
    }

    Ok(())
}

/// Serialize a batch into a frame for the channel.
///
/// On failure the error response is written to the channel here and the
/// error is re-signaled so the streaming loop aborts.
fn make_frame(
    ctx: &Context,
    serializer: &dyn MessageSerializer,
    use_binary: bool,
    batch: Vec<Value>,
    code: ResponseStatusCode,
) -> Result<Frame, SerializationError> {
    let msg = ctx.message();
    let response = ResponseMessage::build(msg).code(code).result(batch).create();

    let frame = if use_binary {
        serializer.serialize_binary(&response).map(Frame::Binary)
    } else {
        serializer.serialize_text(&response).map(Frame::Text)
    };

    match frame {
        Ok(frame) => Ok(frame),
        Err(err) => {
            warn!(
                request_id = %msg.request_id,
                "a result in the request could not be serialized and returned: {err}"
            );
            let error = ResponseMessage::build_for(&msg.request_id)
                .code(ResponseStatusCode::ServerSerializationError)
                .status_message(format!("Error during serialization: {err}"))
                .create();
            ctx.write_terminal(error);
            Err(err)
        }
    }
}
