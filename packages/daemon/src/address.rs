//! # Address Resolver
//!
//! Stable, human-readable paths from the watched root to a node.
//!
//! ```text
//! /                      the watched root
//! /p[2]                  second <p> child of the root
//! /p[2]/text()[1]        first text node of that paragraph
//! #intro/text()[1]       first text node of the element with id="intro"
//! ```
//!
//! Element indices count only preceding siblings with the same tag; text
//! indices count only preceding text siblings. An address computed on the
//! live surface is resolved against the mirror document, whose root is a
//! different element; the root sentinel bridges the two.

use markweave_dom::{Dom, NodeId, NodeKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("empty address")]
    Empty,

    #[error("invalid anchor in {0:?}")]
    InvalidAnchor(String),

    #[error("invalid step {0:?}")]
    InvalidStep(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// The watched root (or the mirror body)
    Root,

    /// Element looked up by its `id` attribute
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    /// `text()[n]`, 1-based among text siblings
    Text { index: usize },

    /// `tag[n]`, 1-based among element siblings with the same tag
    Element { tag: String, index: usize },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Text { index } => write!(f, "text()[{index}]"),
            Step::Element { tag, index } => write!(f, "{tag}[{index}]"),
        }
    }
}

impl FromStr for Step {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AddressError::InvalidStep(s.to_string());
        let (name, rest) = s.split_once('[').ok_or_else(invalid)?;
        let index: usize = rest
            .strip_suffix(']')
            .and_then(|n| n.parse().ok())
            .filter(|n| *n >= 1)
            .ok_or_else(invalid)?;

        if name == "text()" {
            return Ok(Step::Text { index });
        }
        let valid_tag = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid_tag {
            return Err(invalid());
        }
        Ok(Step::Element {
            tag: name.to_string(),
            index,
        })
    }
}

/// Path from an anchor through child steps
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    anchor: Anchor,
    steps: Vec<Step>,
}

impl Address {
    pub fn root() -> Self {
        Self {
            anchor: Anchor::Root,
            steps: Vec::new(),
        }
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self {
            anchor: Anchor::Id(value.into()),
            steps: Vec::new(),
        }
    }

    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.anchor == Anchor::Root && self.steps.is_empty()
    }

    pub fn child(&self, step: Step) -> Self {
        let mut next = self.clone();
        next.steps.push(step);
        next
    }

    pub fn element(&self, tag: &str, index: usize) -> Self {
        self.child(Step::Element {
            tag: tag.to_ascii_lowercase(),
            index,
        })
    }

    pub fn text(&self, index: usize) -> Self {
        self.child(Step::Text { index })
    }

    /// Address with the last step dropped; `None` at an anchor
    pub fn parent(&self) -> Option<Self> {
        if self.steps.is_empty() {
            return None;
        }
        let mut parent = self.clone();
        parent.steps.pop();
        Some(parent)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.anchor {
            Anchor::Root if self.steps.is_empty() => return f.write_str("/"),
            Anchor::Root => {}
            Anchor::Id(id) => write!(f, "#{id}")?,
        }
        for step in &self.steps {
            write!(f, "/{step}")?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AddressError::Empty);
        }

        let (anchor, rest) = if let Some(after_hash) = s.strip_prefix('#') {
            let (id, rest) = after_hash.split_once('/').unwrap_or((after_hash, ""));
            if !is_stable_id(id) {
                return Err(AddressError::InvalidAnchor(s.to_string()));
            }
            if rest.is_empty() && after_hash.ends_with('/') {
                return Err(AddressError::InvalidStep(String::new()));
            }
            (Anchor::Id(id.to_string()), rest)
        } else if let Some(rest) = s.strip_prefix('/') {
            (Anchor::Root, rest)
        } else {
            return Err(AddressError::InvalidAnchor(s.to_string()));
        };

        let steps = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('/')
                .map(Step::from_str)
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self { anchor, steps })
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

/// Ids usable as anchors: non-empty and free of path syntax
pub fn is_stable_id(value: &str) -> bool {
    !value.is_empty()
        && !value
            .chars()
            .any(|c| c == '/' || c == '[' || c == ']' || c.is_whitespace())
}

/// Address of `node` relative to `root`, or `None` when `node` is not in
/// `root`'s subtree or is a comment.
pub fn address_of(dom: &Dom, root: NodeId, node: NodeId) -> Option<Address> {
    if !dom.is_inclusive_ancestor(root, node) {
        return None;
    }
    compute(dom, root, node)
}

fn compute(dom: &Dom, root: NodeId, node: NodeId) -> Option<Address> {
    if node == root {
        return Some(Address::root());
    }
    if let Some(id) = dom.attribute(node, "id").filter(|id| is_stable_id(id)) {
        return Some(Address::id(id));
    }

    let parent = dom.parent(node)?;
    let parent_address = compute(dom, root, parent)?;
    let preceding = dom.children(parent).iter().take_while(|c| **c != node);

    match dom.kind(node)? {
        NodeKind::Text(_) => {
            let index = 1 + preceding.filter(|c| dom.is_text(**c)).count();
            Some(parent_address.text(index))
        }
        NodeKind::Element { tag, .. } => {
            let index = 1 + preceding.filter(|c| dom.tag(**c) == Some(tag)).count();
            Some(parent_address.element(tag, index))
        }
        NodeKind::Comment(_) => None,
    }
}

/// Finds the node an address points at under `root`
pub fn resolve(dom: &Dom, root: NodeId, address: &Address) -> Option<NodeId> {
    let mut current = match address.anchor() {
        Anchor::Root => root,
        Anchor::Id(id) => dom.find_element_by_id(root, id)?,
    };

    for step in address.steps() {
        let children = dom.children(current);
        current = match step {
            Step::Text { index } => children
                .iter()
                .filter(|c| dom.is_text(**c))
                .nth(index - 1)
                .copied()?,
            Step::Element { tag, index } => children
                .iter()
                .filter(|c| dom.tag(**c) == Some(tag.as_str()))
                .nth(index - 1)
                .copied()?,
        };
    }

    Some(current)
}
