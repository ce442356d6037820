//! Raw mutation records.
//!
//! A [`Dom`](crate::Dom) under observation appends one record per primitive
//! change, the same shape a browser mutation observer reports with
//! `childList`, `subtree`, `characterData` and `characterDataOldValue`
//! enabled. Records sit in an undelivered buffer until the observer takes
//! them.

use crate::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    ChildList,
    CharacterData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: RecordKind,

    /// Parent for child list changes, the text node for character data
    pub target: NodeId,

    /// Inserted nodes, in document order
    pub added_nodes: Vec<NodeId>,

    /// Detached nodes, in their former document order
    pub removed_nodes: Vec<NodeId>,

    /// Sibling before the changed run
    pub previous_sibling: Option<NodeId>,

    /// Sibling after the changed run
    pub next_sibling: Option<NodeId>,

    /// Text before a character data change
    pub old_value: Option<String>,
}

impl MutationRecord {
    pub fn child_list(
        target: NodeId,
        added_nodes: Vec<NodeId>,
        removed_nodes: Vec<NodeId>,
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    ) -> Self {
        Self {
            kind: RecordKind::ChildList,
            target,
            added_nodes,
            removed_nodes,
            previous_sibling,
            next_sibling,
            old_value: None,
        }
    }

    pub fn character_data(target: NodeId, old_value: String) -> Self {
        Self {
            kind: RecordKind::CharacterData,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            old_value: Some(old_value),
        }
    }

    pub fn is_child_list(&self) -> bool {
        self.kind == RecordKind::ChildList
    }

    pub fn is_character_data(&self) -> bool {
        self.kind == RecordKind::CharacterData
    }
}
