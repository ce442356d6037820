//! # Caret Continuity Planner
//!
//! Replacing subtrees during a re-render destroys the live selection. A
//! handler that knows where the caret should land records a symbolic
//! [`CaretDirective`] before the sync; after the re-render the plan is taken
//! once and turned into a concrete [`Selection`].
//!
//! A "line" is the block the caret sits in: the ancestor-or-self of the
//! anchor that is a direct child of the watched root.

use crate::selection::{Position, Selection, SelectionStatus};
use markweave_dom::{Dom, NodeId};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaretDirective {
    NextLine,
    PreviousLine,
    NextElement,
    PreviousElement,
    ElementStart,
    ElementEnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaretPlan {
    pub directive: CaretDirective,

    /// Selection when the plan was made, addressed so it survives re-render
    pub anchor: Option<SelectionStatus>,
}

#[derive(Debug, Default)]
pub struct CaretPlanner {
    plan: Option<CaretPlan>,
}

impl CaretPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a plan, overwriting any unconsumed one
    pub fn set(&mut self, directive: CaretDirective, anchor: Option<SelectionStatus>) {
        if let Some(previous) = self.plan.replace(CaretPlan { directive, anchor }) {
            debug!(previous = ?previous.directive, current = ?directive, "caret plan overwritten");
        }
    }

    pub fn take(&mut self) -> Option<CaretPlan> {
        self.plan.take()
    }

    pub fn peek(&self) -> Option<&CaretPlan> {
        self.plan.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.plan.is_some()
    }
}

/// Turns a plan into a selection in the freshly rendered tree
pub fn place(dom: &Dom, root: NodeId, plan: &CaretPlan) -> Option<Selection> {
    let anchor = plan.anchor.as_ref()?.restore(dom, root)?.focus;
    let node = anchor_node(dom, root, anchor);

    let position = match plan.directive {
        CaretDirective::NextLine => {
            let line = line_of(dom, root, node)?;
            match dom.next_sibling(line) {
                Some(next) => start_of(dom, next),
                None => end_of(dom, line),
            }
        }
        CaretDirective::PreviousLine => {
            let line = line_of(dom, root, node)?;
            match dom.previous_sibling(line) {
                Some(previous) => end_of(dom, previous),
                None => start_of(dom, line),
            }
        }
        CaretDirective::NextElement => {
            let element = element_of(dom, root, node)?;
            start_of(dom, following_element(dom, root, element)?)
        }
        CaretDirective::PreviousElement => {
            let element = element_of(dom, root, node)?;
            end_of(dom, preceding_element(dom, root, element)?)
        }
        CaretDirective::ElementStart => start_of(dom, element_of(dom, root, node)?),
        CaretDirective::ElementEnd => end_of(dom, element_of(dom, root, node)?),
    };

    Some(Selection::new(position, position))
}

/// A caret on an element points between children; use the child it precedes
fn anchor_node(dom: &Dom, root: NodeId, position: Position) -> NodeId {
    if dom.is_text(position.node) {
        return position.node;
    }
    let children = dom.children(position.node);
    match children.get(position.offset).or(children.last()) {
        Some(child) if position.node == root => *child,
        _ => position.node,
    }
}

fn line_of(dom: &Dom, root: NodeId, node: NodeId) -> Option<NodeId> {
    if node == root {
        return dom.first_child(root);
    }
    std::iter::once(node)
        .chain(dom.ancestors(node))
        .find(|n| dom.parent(*n) == Some(root))
}

fn element_of(dom: &Dom, root: NodeId, node: NodeId) -> Option<NodeId> {
    std::iter::once(node)
        .chain(dom.ancestors(node))
        .take_while(|n| *n != root)
        .find(|n| dom.is_element(*n))
}

fn following_element(dom: &Dom, root: NodeId, element: NodeId) -> Option<NodeId> {
    let mut current = element;
    while current != root {
        let mut sibling = dom.next_sibling(current);
        while let Some(candidate) = sibling {
            if dom.is_element(candidate) {
                return Some(candidate);
            }
            sibling = dom.next_sibling(candidate);
        }
        current = dom.parent(current)?;
    }
    None
}

fn preceding_element(dom: &Dom, root: NodeId, element: NodeId) -> Option<NodeId> {
    let mut current = element;
    while current != root {
        let mut sibling = dom.previous_sibling(current);
        while let Some(candidate) = sibling {
            if dom.is_element(candidate) {
                return Some(candidate);
            }
            sibling = dom.previous_sibling(candidate);
        }
        current = dom.parent(current)?;
    }
    None
}

fn start_of(dom: &Dom, node: NodeId) -> Position {
    let first_text = std::iter::once(node)
        .chain(dom.descendants(node))
        .find(|n| dom.is_text(*n));
    match first_text {
        Some(text) => Position::new(text, 0),
        None => Position::new(node, 0),
    }
}

fn end_of(dom: &Dom, node: NodeId) -> Position {
    let last_text = std::iter::once(node)
        .chain(dom.descendants(node))
        .filter(|n| dom.is_text(*n))
        .last();
    match last_text {
        Some(text) => Position::new(text, dom.text(text).map_or(0, |t| t.chars().count())),
        None => Position::new(node, dom.children(node).len()),
    }
}
