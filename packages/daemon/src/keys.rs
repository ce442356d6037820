//! # Key Dispatch
//!
//! Structural keys are handled in two steps: the caret situation is first
//! classified into a closed [`CaretContext`], then a decision table maps
//! `(key, context)` to what happens.
//!
//! | context        | Enter    | Backspace          | Delete        |
//! |----------------|----------|--------------------|---------------|
//! | NoSelection    | prevent  | prevent            | prevent       |
//! | Range          | native   | native             | native        |
//! | OnContainer    | enter    | prevent            | prevent       |
//! | OnEmptyLine    | enter    | backspace override | del override  |
//! | OnNonEditable  | prevent  | prevent            | prevent       |
//! | AtLineStart    | enter    | backspace override | native        |
//! | AtLineEnd      | enter    | native             | del joining   |
//! | MidText        | enter    | native             | native        |

use crate::activation::{ActivationHandle, HandlerKind, KeyContext};
use crate::selection::{Position, Selection};
use markweave_dom::{Dom, NodeId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Enter,
    Backspace,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaretContext {
    NoSelection,
    /// A non-collapsed selection
    Range,
    /// Caret between blocks of the root or of a container element
    OnContainer,
    OnEmptyLine,
    OnNonEditable,
    AtLineStart,
    AtLineEnd,
    MidText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Native,
    Prevent,
    Delegate(HandlerKind),
}

/// What the host should do with the key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Let the browser's default behavior run
    Native,
    /// Suppress the key
    Prevented,
    /// A handler took it and the daemon already synced. `rejected` counts
    /// handler operations that failed validation and were dropped.
    Handled { rejected: usize },
}

/// Result of classification, ready to run outside the daemon lock
pub enum KeyDispatch {
    Native,
    Prevented,
    Delegate {
        kind: HandlerKind,
        handle: Arc<dyn ActivationHandle>,
        context: KeyContext,
    },
}

const CONTAINER_TAGS: &[&str] = &["ul", "ol", "blockquote", "table", "section", "div"];
const LINE_TAGS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "pre", "dt", "dd"];

pub fn decide(key: Key, context: CaretContext) -> KeyAction {
    use CaretContext::*;
    use HandlerKind::*;

    match (key, context) {
        (_, NoSelection) | (_, OnNonEditable) => KeyAction::Prevent,
        (_, Range) => KeyAction::Native,

        (Key::Enter, _) => KeyAction::Delegate(Enter),

        (Key::Backspace, OnContainer) | (Key::Delete, OnContainer) => KeyAction::Prevent,
        (Key::Backspace, OnEmptyLine) | (Key::Backspace, AtLineStart) => {
            KeyAction::Delegate(BackspaceOverride)
        }
        (Key::Delete, OnEmptyLine) => KeyAction::Delegate(DelOverride),
        (Key::Delete, AtLineEnd) => KeyAction::Delegate(DelJoining),

        (Key::Backspace, AtLineEnd) | (Key::Backspace, MidText) => KeyAction::Native,
        (Key::Delete, AtLineStart) | (Key::Delete, MidText) => KeyAction::Native,
    }
}

pub fn classify(dom: &Dom, root: NodeId, selection: Option<&Selection>) -> CaretContext {
    let Some(selection) = selection else {
        return CaretContext::NoSelection;
    };
    if !selection.is_collapsed() {
        return CaretContext::Range;
    }
    let focus = selection.focus;
    if !dom.contains(focus.node) || !dom.is_inclusive_ancestor(root, focus.node) {
        return CaretContext::NoSelection;
    }

    let non_editable = std::iter::once(focus.node)
        .chain(dom.ancestors(focus.node))
        .take_while(|n| *n != root)
        .any(|n| dom.attribute(n, "contenteditable") == Some("false"));
    if non_editable {
        return CaretContext::OnNonEditable;
    }

    if focus.node == root || dom.tag(focus.node).is_some_and(|t| CONTAINER_TAGS.contains(&t)) {
        return CaretContext::OnContainer;
    }

    let line = line_of(dom, root, focus.node);
    let length = dom.text_content(line).chars().count();
    if length == 0 {
        return CaretContext::OnEmptyLine;
    }

    match offset_in(dom, line, focus) {
        0 => CaretContext::AtLineStart,
        offset if offset >= length => CaretContext::AtLineEnd,
        _ => CaretContext::MidText,
    }
}

/// The block the caret belongs to: nearest line element, else the root's
/// direct child.
pub fn line_of(dom: &Dom, root: NodeId, node: NodeId) -> NodeId {
    let chain: Vec<NodeId> = std::iter::once(node)
        .chain(dom.ancestors(node))
        .take_while(|n| *n != root)
        .collect();
    chain
        .iter()
        .copied()
        .find(|n| dom.tag(*n).is_some_and(|t| LINE_TAGS.contains(&t)))
        .or_else(|| chain.last().copied())
        .unwrap_or(node)
}

/// Character offset of `position` within the text of `line`
pub fn offset_in(dom: &Dom, line: NodeId, position: Position) -> usize {
    let order: Vec<NodeId> = std::iter::once(line).chain(dom.descendants(line)).collect();
    let index_of = |node: NodeId| order.iter().position(|n| *n == node);

    let (boundary, extra) = if dom.is_text(position.node) {
        let length = dom.text(position.node).map_or(0, |t| t.chars().count());
        (index_of(position.node), position.offset.min(length))
    } else {
        let boundary = match dom.children(position.node).get(position.offset) {
            Some(child) => index_of(*child),
            None => index_of(position.node).map(|i| i + 1 + dom.descendants(position.node).len()),
        };
        (boundary, 0)
    };

    let Some(boundary) = boundary else {
        return 0;
    };
    let before: usize = order[..boundary.min(order.len())]
        .iter()
        .filter_map(|n| if dom.is_text(*n) { dom.text(*n) } else { None })
        .map(|t| t.chars().count())
        .sum();
    before + extra
}
