//! Observational hooks for external inspection tooling.

use crate::tree::Tree;
use uuid::Uuid;

/// A swappable source of live trees for debug UIs.
///
/// Implemented by the host; purely observational, never consulted by the
/// runtime. The visitor style lets providers hand out borrowed trees without
/// committing to a storage scheme.
pub trait DebugTreeProvider {
    /// Calls `visitor` with a `(title, tree)` pair for every live tree.
    fn for_each_tree(&self, visitor: &mut dyn FnMut(&str, &Tree));
}

/// Runs every node's authoring-time validity hook and collects the
/// complaints, keyed by node guid. An empty result means the tree passed.
pub fn node_diagnostics(tree: &Tree) -> Vec<(Uuid, String)> {
    let mut diagnostics = vec![];
    tree.for_each_node(&mut |node| {
        if let Err(message) = node.behavior().validate() {
            diagnostics.push((node.guid(), message));
        }
    });
    diagnostics
}
