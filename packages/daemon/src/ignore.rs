//! # Ignore Registry
//!
//! Nodes exempt from capture. Components that keep their own subtree in
//! sync register here so the compiler neither rolls back nor reports their
//! edits. The daemon itself never creates entries.

use crate::errors::{DaemonError, DaemonResult};
use markweave_dom::{Dom, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IgnoreScope {
    /// Expires at the end of the next flush cycle
    Once,

    /// Stays until removed
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IgnoreEntry {
    pub scope: IgnoreScope,
    pub descendants: bool,
}

#[derive(Debug, Default)]
pub struct IgnoreRegistry {
    entries: HashMap<NodeId, IgnoreEntry>,
}

impl IgnoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every node or none. Re-registering overwrites.
    pub fn try_add(
        &mut self,
        dom: &Dom,
        nodes: &[NodeId],
        scope: IgnoreScope,
        descendants: bool,
    ) -> DaemonResult<()> {
        if let Some(bad) = nodes.iter().find(|n| !dom.contains(**n)) {
            return Err(DaemonError::InvalidIgnoreTarget(*bad));
        }
        for node in nodes {
            self.entries.insert(*node, IgnoreEntry { scope, descendants });
        }
        debug!(count = nodes.len(), ?scope, descendants, "ignore entries added");
        Ok(())
    }

    /// Like [`try_add`](Self::try_add) but skips unknown nodes with a warning
    pub fn add(&mut self, dom: &Dom, nodes: &[NodeId], scope: IgnoreScope, descendants: bool) {
        for node in nodes {
            if let Err(err) = self.try_add(dom, &[*node], scope, descendants) {
                warn!(node = %node, error = %err, "ignore target skipped");
            }
        }
    }

    pub fn remove(&mut self, node: NodeId) -> Option<IgnoreEntry> {
        self.entries.remove(&node)
    }

    pub fn get(&self, node: NodeId) -> Option<IgnoreEntry> {
        self.entries.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Matches the node's own entry, or an ancestor entry covering
    /// descendants, up to `root` inclusive.
    pub fn is_ignored(&self, dom: &Dom, root: NodeId, node: NodeId) -> bool {
        self.is_ignored_at(dom, root, node, dom.parent(node))
    }

    /// Same as [`is_ignored`](Self::is_ignored) for a node whose parent is
    /// known from a record but which may be detached right now.
    pub fn is_ignored_at(&self, dom: &Dom, root: NodeId, node: NodeId, parent: Option<NodeId>) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        if self.entries.contains_key(&node) {
            return true;
        }
        if node == root {
            return false;
        }

        let mut cursor = parent;
        while let Some(ancestor) = cursor {
            if self.entries.get(&ancestor).is_some_and(|e| e.descendants) {
                return true;
            }
            if ancestor == root {
                break;
            }
            cursor = dom.parent(ancestor);
        }
        false
    }

    /// Drops every `Once` entry; called once per flush after replay
    pub fn end_cycle(&mut self) {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.scope == IgnoreScope::Any);
        let expired = before - self.entries.len();
        if expired > 0 {
            debug!(expired, "one-shot ignore entries expired");
        }
    }

    /// Drops entries whose node is gone or no longer under `root`
    pub fn prune(&mut self, dom: &Dom, root: NodeId) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|node, _| dom.contains(*node) && dom.is_inclusive_ancestor(root, *node));
        let pruned = before - self.entries.len();
        if pruned > 0 {
            debug!(pruned, "stale ignore entries dropped");
        }
        pruned
    }
}
