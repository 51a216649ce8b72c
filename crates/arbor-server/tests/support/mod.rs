//! Shared test doubles: a recording channel, a stub engine, and a
//! recording graph manager.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use arbor_core::{tokens, RequestMessage, ResponseMessage, Value};
use arbor_server::{
    Bindings, Channel, Context, EvalError, EvalOutcome, Frame, GraphManager, JsonSerializer,
    MessageSerializer, ScriptEngine, SerializationError, Settings,
};
use futures_util::future::BoxFuture;

/// A single submission observed on the channel, in order.
#[derive(Debug, Clone)]
pub enum Written {
    Frame(Frame),
    Response(ResponseMessage),
}

/// Channel double that records everything submitted to it.
pub struct RecordingChannel {
    writable: AtomicBool,
    use_binary: bool,
    serializer: Arc<dyn MessageSerializer>,
    writes: Mutex<Vec<Written>>,
    events: Option<EventLog>,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Self::with_serializer(Arc::new(JsonSerializer), false)
    }

    pub fn with_serializer(
        serializer: Arc<dyn MessageSerializer>,
        use_binary: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            writable: AtomicBool::new(true),
            use_binary,
            serializer,
            writes: Mutex::new(Vec::new()),
            events: None,
        })
    }

    pub fn with_events(events: EventLog) -> Arc<Self> {
        Arc::new(Self {
            writable: AtomicBool::new(true),
            use_binary: false,
            serializer: Arc::new(JsonSerializer),
            writes: Mutex::new(Vec::new()),
            events: Some(events),
        })
    }

    pub fn set_writable(&self, writable: bool) {
        self.writable.store(writable, Ordering::SeqCst);
    }

    /// Everything written, decoded back into response messages, in
    /// submission order.
    pub fn decoded(&self) -> Vec<ResponseMessage> {
        self.writes
            .lock()
            .expect("lock")
            .iter()
            .map(|written| match written {
                Written::Frame(Frame::Text(text)) => {
                    serde_json::from_str(text).expect("decode text frame")
                }
                Written::Frame(Frame::Binary(bytes)) => {
                    rmp_serde::from_slice(bytes).expect("decode binary frame")
                }
                Written::Response(response) => response.clone(),
            })
            .collect()
    }

    /// Frames only (excludes structured responses), decoded.
    pub fn decoded_frames(&self) -> Vec<ResponseMessage> {
        self.writes
            .lock()
            .expect("lock")
            .iter()
            .filter_map(|written| match written {
                Written::Frame(Frame::Text(text)) => {
                    Some(serde_json::from_str(text).expect("decode text frame"))
                }
                Written::Frame(Frame::Binary(bytes)) => {
                    Some(rmp_serde::from_slice(bytes).expect("decode binary frame"))
                }
                Written::Response(_) => None,
            })
            .collect()
    }

    pub fn raw_writes(&self) -> Vec<Written> {
        self.writes.lock().expect("lock").clone()
    }
}

impl Channel for RecordingChannel {
    fn is_writable(&self) -> bool {
        self.writable.load(Ordering::SeqCst)
    }

    fn write_frame(&self, frame: Frame) {
        if let Some(events) = &self.events {
            events.push("frame");
        }
        self.writes.lock().expect("lock").push(Written::Frame(frame));
    }

    fn write_response(&self, response: ResponseMessage) {
        if let Some(events) = &self.events {
            events.push(format!("response:{}", response.status.code));
        }
        self.writes.lock().expect("lock").push(Written::Response(response));
    }

    fn serializer(&self) -> Arc<dyn MessageSerializer> {
        Arc::clone(&self.serializer)
    }

    fn use_binary(&self) -> bool {
        self.use_binary
    }
}

/// Serializer double that always fails.
pub struct FailingSerializer;

impl MessageSerializer for FailingSerializer {
    fn serialize_binary(
        &self,
        _response: &ResponseMessage,
    ) -> Result<Vec<u8>, SerializationError> {
        Err(SerializationError::unsupported("refusing to serialize"))
    }

    fn serialize_text(&self, _response: &ResponseMessage) -> Result<String, SerializationError> {
        Err(SerializationError::unsupported("refusing to serialize"))
    }
}

/// Engine double returning a prepared outcome and recording what it was
/// asked to evaluate.
pub struct StubEngine {
    outcome: Mutex<Option<Result<EvalOutcome, EvalError>>>,
    pub last_script: Mutex<Option<String>>,
    pub last_language: Mutex<Option<String>>,
    pub last_bindings: Mutex<Bindings>,
}

impl StubEngine {
    pub fn returning(outcome: Result<EvalOutcome, EvalError>) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(Some(outcome)),
            last_script: Mutex::new(None),
            last_language: Mutex::new(None),
            last_bindings: Mutex::new(Vec::new()),
        })
    }

    /// An engine whose script evaluates to the given values.
    pub fn values(values: Vec<Value>) -> Arc<Self> {
        Self::returning(Ok(EvalOutcome::Value(Value::Array(values))))
    }

    pub fn was_called(&self) -> bool {
        self.last_script.lock().expect("lock").is_some()
    }
}

impl ScriptEngine for StubEngine {
    fn eval(
        &self,
        script: &str,
        language: Option<&str>,
        bindings: Bindings,
    ) -> BoxFuture<'static, Result<EvalOutcome, EvalError>> {
        *self.last_script.lock().expect("lock") = Some(script.to_owned());
        *self.last_language.lock().expect("lock") = language.map(ToOwned::to_owned);
        *self.last_bindings.lock().expect("lock") = bindings;
        let outcome = self
            .outcome
            .lock()
            .expect("lock")
            .take()
            .unwrap_or(Ok(EvalOutcome::Value(Value::Null)));
        Box::pin(async move { outcome })
    }
}

/// Graph-manager double counting commit/rollback invocations.
#[derive(Default)]
pub struct RecordingGraphManager {
    pub commit_all_calls: Mutex<usize>,
    pub rollback_all_calls: Mutex<usize>,
    pub scoped_commits: Mutex<Vec<HashSet<String>>>,
    pub scoped_rollbacks: Mutex<Vec<HashSet<String>>>,
    events: Option<EventLog>,
}

impl RecordingGraphManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_events(events: EventLog) -> Arc<Self> {
        Arc::new(Self { events: Some(events), ..Self::default() })
    }

    pub fn commits(&self) -> usize {
        *self.commit_all_calls.lock().expect("lock")
            + self.scoped_commits.lock().expect("lock").len()
    }

    pub fn rollbacks(&self) -> usize {
        *self.rollback_all_calls.lock().expect("lock")
            + self.scoped_rollbacks.lock().expect("lock").len()
    }
}

impl GraphManager for RecordingGraphManager {
    fn commit_all(&self) {
        if let Some(events) = &self.events {
            events.push("commit");
        }
        *self.commit_all_calls.lock().expect("lock") += 1;
    }

    fn rollback_all(&self) {
        if let Some(events) = &self.events {
            events.push("rollback");
        }
        *self.rollback_all_calls.lock().expect("lock") += 1;
    }

    fn commit(&self, graphs: &HashSet<String>) {
        if let Some(events) = &self.events {
            events.push("commit");
        }
        self.scoped_commits.lock().expect("lock").push(graphs.clone());
    }

    fn rollback(&self, graphs: &HashSet<String>) {
        if let Some(events) = &self.events {
            events.push("rollback");
        }
        self.scoped_rollbacks.lock().expect("lock").push(graphs.clone());
    }
}

/// Shared, ordered log of channel and transaction events for asserting
/// commit-before-flush ordering.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().expect("lock").push(event.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().expect("lock").clone()
    }
}

/// An eval request for the given script.
pub fn eval_request(script: &str) -> RequestMessage {
    RequestMessage::new("r-test", tokens::OPS_EVAL).with_arg(tokens::ARGS_GREMLIN, script)
}

/// Per-request context over the given doubles.
pub fn context_for(
    channel: &Arc<RecordingChannel>,
    msg: RequestMessage,
    settings: Settings,
    graphs: &Arc<RecordingGraphManager>,
) -> Arc<Context> {
    Arc::new(Context::new(
        Arc::clone(channel) as Arc<dyn Channel>,
        msg,
        Arc::new(settings),
        Arc::clone(graphs) as Arc<dyn GraphManager>,
    ))
}

/// Settings with a small batch size and the given timeout budget.
pub fn settings(batch: usize, timeout_ms: u64, strict: bool) -> Settings {
    Settings {
        result_iteration_batch_size: batch,
        serialized_response_timeout: timeout_ms,
        strict_transaction_management: strict,
    }
}
