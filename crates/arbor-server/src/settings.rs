//! Server settings consumed by the operation processor.

use std::time::Duration;

use serde::Deserialize;

/// Read-only server settings.
///
/// Deserializable so the embedding server can take them straight from its
/// configuration file; [`Settings::default`] carries the server defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Number of results per outbound frame unless the request overrides it
    /// with `batchSize`.
    pub result_iteration_batch_size: usize,
    /// Budget in milliseconds for producing and writing all frames of one
    /// response.
    pub serialized_response_timeout: u64,
    /// When `true`, transaction operations are scoped to the graphs named
    /// by the request's alias mapping instead of all managed graphs.
    pub strict_transaction_management: bool,
}

impl Settings {
    /// The serialization budget as a [`Duration`].
    #[must_use]
    pub const fn response_budget(&self) -> Duration {
        Duration::from_millis(self.serialized_response_timeout)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            result_iteration_batch_size: 64,
            serialized_response_timeout: 30_000,
            strict_transaction_management: false,
        }
    }
}
