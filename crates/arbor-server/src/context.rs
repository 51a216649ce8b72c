//! Per-request execution state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arbor_core::{RequestMessage, ResponseMessage};
use tracing::debug;

use crate::channel::{Channel, Frame};
use crate::graph::GraphManager;
use crate::settings::Settings;

/// Execution state owned for the lifetime of one request.
///
/// Created when the decoded request enters the processor and released when
/// the response stream terminates. Carries the channel handle, the request,
/// the server settings, and the graph manager, plus two request-scoped
/// flags:
///
/// - the *interrupt* flag, set by session teardown to request cooperative
///   cancellation; the streaming loop checks it once per iteration;
/// - the *terminal-written* flag, which guarantees at most one terminal
///   response reaches the channel for this request. All terminal writes
///   funnel through [`Context::write_terminal`] or
///   [`Context::write_terminal_frame`]; the loser of the race is dropped.
pub struct Context {
    channel: Arc<dyn Channel>,
    message: RequestMessage,
    settings: Arc<Settings>,
    graph_manager: Arc<dyn GraphManager>,
    interrupted: AtomicBool,
    terminal_written: AtomicBool,
}

impl Context {
    /// Create the state for one request.
    #[must_use]
    pub fn new(
        channel: Arc<dyn Channel>,
        message: RequestMessage,
        settings: Arc<Settings>,
        graph_manager: Arc<dyn GraphManager>,
    ) -> Self {
        Self {
            channel,
            message,
            settings,
            graph_manager,
            interrupted: AtomicBool::new(false),
            terminal_written: AtomicBool::new(false),
        }
    }

    /// The channel this request arrived on.
    #[must_use]
    pub fn channel(&self) -> &Arc<dyn Channel> {
        &self.channel
    }

    /// The request being processed.
    #[must_use]
    pub fn message(&self) -> &RequestMessage {
        &self.message
    }

    /// The server settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The graph manager.
    #[must_use]
    pub fn graph_manager(&self) -> &Arc<dyn GraphManager> {
        &self.graph_manager
    }

    /// Request cooperative cancellation of this request's worker.
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Relaxed)
    }

    /// Write a structured terminal response, unless one was already
    /// written. Returns `true` if the response was submitted.
    pub fn write_terminal(&self, response: ResponseMessage) -> bool {
        if self.claim_terminal() {
            self.channel.write_response(response);
            true
        } else {
            debug!(
                request_id = %self.message.request_id,
                code = %response.status.code,
                "suppressing duplicate terminal response"
            );
            false
        }
    }

    /// Write a serialized terminal frame, unless a terminal response was
    /// already written. Returns `true` if the frame was submitted.
    pub fn write_terminal_frame(&self, frame: Frame) -> bool {
        if self.claim_terminal() {
            self.channel.write_frame(frame);
            true
        } else {
            debug!(
                request_id = %self.message.request_id,
                "suppressing duplicate terminal frame"
            );
            false
        }
    }

    fn claim_terminal(&self) -> bool {
        self.terminal_written
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
