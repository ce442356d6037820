//! # Operations
//!
//! Semantic edit instructions addressed by [`Address`]. The compiler emits
//! `TEXT`, `ADD` and `REMOVE`; components push `REPLACE` (or any other
//! kind) through the daemon's operation side channel.
//!
//! Operations are order-dependent. A log is valid only when applied in the
//! order it was produced, oldest edit first.

use crate::address::Address;
use crate::errors::{DaemonError, DaemonResult};
use markweave_dom::NodeSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Operation {
    /// Set the data of a text node
    Text { address: Address, text: String },

    /// Insert a deep copy of a node before `before`, or append when `None`
    Add {
        parent: Address,
        node: NodeSnapshot,
        #[serde(default)]
        before: Option<Address>,
    },

    /// Detach `target` from `parent`
    Remove { parent: Address, target: Address },

    /// Swap `target` for `nodes` at the same position
    Replace {
        target: Address,
        nodes: Vec<NodeSnapshot>,
    },
}

impl Operation {
    pub fn text(address: Address, text: impl Into<String>) -> Self {
        Operation::Text {
            address,
            text: text.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Text { .. } => "TEXT",
            Operation::Add { .. } => "ADD",
            Operation::Remove { .. } => "REMOVE",
            Operation::Replace { .. } => "REPLACE",
        }
    }

    /// The address this operation primarily acts on
    pub fn target(&self) -> &Address {
        match self {
            Operation::Text { address, .. } => address,
            Operation::Add { parent, .. } => parent,
            Operation::Remove { target, .. } => target,
            Operation::Replace { target, .. } => target,
        }
    }

    /// Structural checks that need no document
    pub fn validate(&self) -> DaemonResult<()> {
        match self {
            Operation::Text { .. } => Ok(()),
            Operation::Add { parent, node, before } => {
                if before.as_ref() == Some(parent) {
                    return Err(DaemonError::malformed("ADD before its own parent"));
                }
                validate_snapshot(node)
            }
            Operation::Remove { parent, target } => {
                if target.is_root() {
                    return Err(DaemonError::malformed("REMOVE of the root"));
                }
                if parent == target {
                    return Err(DaemonError::malformed("REMOVE target equals parent"));
                }
                Ok(())
            }
            Operation::Replace { target, nodes } => {
                if target.is_root() {
                    return Err(DaemonError::malformed("REPLACE of the root"));
                }
                nodes.iter().try_for_each(validate_snapshot)
            }
        }
    }

    /// Parses one operation from JSON; any shape error is malformed
    pub fn from_json(json: &str) -> DaemonResult<Self> {
        let op: Operation =
            serde_json::from_str(json).map_err(|e| DaemonError::malformed(e.to_string()))?;
        op.validate()?;
        Ok(op)
    }
}

fn validate_snapshot(snapshot: &NodeSnapshot) -> DaemonResult<()> {
    match snapshot {
        NodeSnapshot::Element { tag, children, .. } => {
            if tag.is_empty() {
                return Err(DaemonError::malformed("element with an empty tag"));
            }
            children.iter().try_for_each(validate_snapshot)
        }
        _ => Ok(()),
    }
}
