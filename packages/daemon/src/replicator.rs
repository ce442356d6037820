//! # Mirror Replicator
//!
//! Applies compiled operation logs to the detached mirror document. The
//! mirror's body serialization is the canonical HTML.
//!
//! Each operation is applied on its own: an address that does not resolve,
//! or an operation that fails validation, is skipped and reported while
//! the rest of the log still applies.

use crate::address::{resolve, Address};
use crate::errors::{DaemonError, DaemonResult};
use crate::operation::Operation;
use markweave_dom::{parse_fragment, serialize_children, Dom, DomResult, NodeId};
use tracing::{debug, warn};

/// Detached document holding canonical content under its `body`
#[derive(Debug, Clone, Default)]
pub struct Mirror {
    dom: Dom,
}

impl Mirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_html(html: &str) -> DomResult<Self> {
        let mut mirror = Self::new();
        mirror.replace_html(html)?;
        Ok(mirror)
    }

    pub fn root(&self) -> NodeId {
        self.dom.body()
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    /// Canonical HTML: the serialized body content
    pub fn html(&self) -> String {
        serialize_children(&self.dom, self.dom.body())
    }

    /// Swaps the body content wholesale (history restore, document load)
    pub fn replace_html(&mut self, html: &str) -> DomResult<()> {
        let nodes = parse_fragment(&mut self.dom, html)?;
        let body = self.dom.body();
        self.dom.replace_children(body, &nodes)?;
        self.dom.collect_garbage(&[]);
        Ok(())
    }

    pub fn apply(&mut self, op: &Operation) -> DaemonResult<()> {
        let root = self.root();
        apply(&mut self.dom, root, op)
    }

    pub fn replay(&mut self, ops: &[Operation]) -> ReplayReport {
        let root = self.root();
        replay(&mut self.dom, root, ops)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedOperation {
    pub index: usize,
    pub kind: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub applied: usize,
    pub skipped: Vec<SkippedOperation>,
}

impl ReplayReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

fn lookup(dom: &Dom, root: NodeId, address: &Address) -> DaemonResult<NodeId> {
    resolve(dom, root, address).ok_or_else(|| DaemonError::unresolved(address))
}

/// Applies one operation under `root`
pub fn apply(dom: &mut Dom, root: NodeId, op: &Operation) -> DaemonResult<()> {
    op.validate()?;

    match op {
        Operation::Text { address, text } => {
            let node = lookup(dom, root, address)?;
            dom.set_text_content(node, text)?;
        }

        Operation::Add { parent, node, before } => {
            let parent = lookup(dom, root, parent)?;
            let before = match before {
                Some(address) => Some(lookup(dom, root, address)?),
                None => None,
            };
            if !dom.is_element(parent) {
                return Err(DaemonError::malformed("ADD into a non-element"));
            }
            let imported = dom.import(node);
            dom.insert_before(parent, imported, before)?;
        }

        Operation::Remove { parent, target } => {
            let parent = lookup(dom, root, parent)?;
            let target = lookup(dom, root, target)?;
            if target == root {
                return Err(DaemonError::malformed("REMOVE of the root"));
            }
            dom.remove_child(parent, target)?;
        }

        Operation::Replace { target, nodes } => {
            let node = lookup(dom, root, target)?;
            if node == root {
                return Err(DaemonError::malformed("REPLACE of the root"));
            }
            let parent = dom.parent(node).ok_or_else(|| DaemonError::unresolved(target))?;
            let imported: Vec<NodeId> = nodes.iter().map(|n| dom.import(n)).collect();
            dom.insert_all(parent, &imported, Some(node))?;
            dom.detach(node)?;
        }
    }

    Ok(())
}

/// Applies `ops` in order, skipping the ones that fail
pub fn replay(dom: &mut Dom, root: NodeId, ops: &[Operation]) -> ReplayReport {
    let mut report = ReplayReport::default();

    for (index, op) in ops.iter().enumerate() {
        match apply(dom, root, op) {
            Ok(()) => {
                debug!(index, kind = op.kind(), target = %op.target(), "applied");
                report.applied += 1;
            }
            Err(err) => {
                warn!(index, kind = op.kind(), target = %op.target(), error = %err, "operation skipped");
                report.skipped.push(SkippedOperation {
                    index,
                    kind: op.kind(),
                    reason: err.to_string(),
                });
            }
        }
    }

    report
}
