//! The graph-manager seam and transaction coordination.

use std::collections::HashSet;

use arbor_core::{tokens, RequestMessage, Value};

/// Access to the graphs managed by the server.
///
/// Shared across requests; transactional isolation is the graph
/// implementation's concern. The commit/rollback operations are "attempts":
/// implementations swallow per-graph failures rather than propagating them,
/// and the effect of a rollback on a partially-consumed result cursor is
/// implementation-defined.
pub trait GraphManager: Send + Sync {
    /// Commit open transactions on every managed graph.
    fn commit_all(&self);

    /// Roll back open transactions on every managed graph.
    fn rollback_all(&self);

    /// Commit open transactions on the named graphs.
    fn commit(&self, graphs: &HashSet<String>);

    /// Roll back open transactions on the named graphs.
    fn rollback(&self, graphs: &HashSet<String>);
}

/// Commit at a successful terminal boundary.
///
/// In strict mode the operation is scoped to the graphs named by the
/// request's alias mapping; otherwise it applies to all managed graphs.
/// Called at most once per request, and never after a rollback.
pub fn attempt_commit(msg: &RequestMessage, graph_manager: &dyn GraphManager, strict: bool) {
    if strict {
        graph_manager.commit(&alias_graph_names(msg));
    } else {
        graph_manager.commit_all();
    }
}

/// Roll back on an error path.
///
/// Scoping as for [`attempt_commit`]. Called at most once per request, and
/// never after a commit.
pub fn attempt_rollback(msg: &RequestMessage, graph_manager: &dyn GraphManager, strict: bool) {
    if strict {
        graph_manager.rollback(&alias_graph_names(msg));
    } else {
        graph_manager.rollback_all();
    }
}

/// The graph names scoped by the request's alias mapping: the values of
/// `aliases`, or of `rebindings` when `aliases` is absent.
///
/// Shape validation happens before evaluation begins; by the time a
/// transaction operation runs, a strict-mode request is known to carry a
/// string-to-string mapping.
fn alias_graph_names(msg: &RequestMessage) -> HashSet<String> {
    let mapping = msg
        .arg(tokens::ARGS_ALIASES)
        .or_else(|| msg.arg(tokens::ARGS_REBINDINGS))
        .and_then(Value::as_map);

    match mapping {
        Some(entries) => entries
            .iter()
            .filter_map(|(_, graph)| graph.as_str().map(ToOwned::to_owned))
            .collect(),
        None => HashSet::new(),
    }
}
