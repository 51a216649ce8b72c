//! Metric emission for the operation processor.
//!
//! Uses the [`metrics`] facade; the embedding server installs the recorder.

use std::time::Duration;

/// Histogram of per-request script-evaluation durations. The span covers
/// submission to completion of the evaluation future, not result
/// streaming.
pub const EVAL_OP_DURATION: &str = "arbor_server_op_eval_duration_seconds";

/// Count of failed evaluations, including streaming failures.
pub const EVAL_OP_ERRORS: &str = "arbor_server_op_eval_errors_total";

pub(crate) fn record_eval_duration(duration: Duration) {
    metrics::histogram!(EVAL_OP_DURATION).record(duration.as_secs_f64());
}

pub(crate) fn record_eval_error() {
    metrics::counter!(EVAL_OP_ERRORS).increment(1);
}
