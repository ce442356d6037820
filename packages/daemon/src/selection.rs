//! Selection model and its address-based serialized form.
//!
//! Offsets follow DOM range rules: a character offset inside a text node,
//! a child index inside an element.

use crate::address::{address_of, resolve, Address};
use markweave_dom::{Dom, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    pub fn new(anchor: Position, focus: Position) -> Self {
        Self { anchor, focus }
    }

    pub fn caret(node: NodeId, offset: usize) -> Self {
        let position = Position::new(node, offset);
        Self::new(position, position)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// Selection as address + offset pairs, stable across re-renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionStatus {
    pub anchor: Address,
    pub anchor_offset: usize,
    pub focus: Address,
    pub focus_offset: usize,
}

impl SelectionStatus {
    /// `None` when either end has no address under `root`
    pub fn capture(dom: &Dom, root: NodeId, selection: &Selection) -> Option<Self> {
        Some(Self {
            anchor: address_of(dom, root, selection.anchor.node)?,
            anchor_offset: selection.anchor.offset,
            focus: address_of(dom, root, selection.focus.node)?,
            focus_offset: selection.focus.offset,
        })
    }

    /// Resolves both ends, clamping offsets to what the nodes now hold
    pub fn restore(&self, dom: &Dom, root: NodeId) -> Option<Selection> {
        let anchor = resolve(dom, root, &self.anchor)?;
        let focus = resolve(dom, root, &self.focus)?;
        Some(Selection::new(
            Position::new(anchor, self.anchor_offset.min(max_offset(dom, anchor))),
            Position::new(focus, self.focus_offset.min(max_offset(dom, focus))),
        ))
    }
}

/// Largest valid offset inside `node`
pub fn max_offset(dom: &Dom, node: NodeId) -> usize {
    match dom.text(node) {
        Some(text) => text.chars().count(),
        None => dom.children(node).len(),
    }
}
