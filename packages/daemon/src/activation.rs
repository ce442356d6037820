//! # Activation Stack
//!
//! Structural components (paragraphs, list items, code blocks) register an
//! [`ActivationHandle`] while they are active. Key dispatch delegates
//! Enter/Backspace/Delete overrides to the handle on top of the stack.
//!
//! Membership is reference-counted per component: a component activated
//! twice must be released twice before it leaves the stack. Activating an
//! entry again moves it to the top.

use crate::caret::CaretDirective;
use crate::errors::{DaemonError, DaemonResult};
use crate::keys::{CaretContext, Key};
use crate::operation::Operation;
use crate::selection::SelectionStatus;
use futures::future::{self, BoxFuture, FutureExt};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(pub u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component-{}", self.0)
    }
}

/// Which override a delegated key invokes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Enter,
    BackspaceOverride,
    DelOverride,
    DelJoining,
}

/// Owned snapshot of the caret situation handed to a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyContext {
    pub key: Key,
    pub caret: CaretContext,
    pub selection: Option<SelectionStatus>,

    /// Text of the block the caret is in
    pub line_text: String,

    /// Character offset of the caret within `line_text`
    pub line_offset: usize,
}

impl KeyContext {
    pub fn require_selection(&self) -> DaemonResult<&SelectionStatus> {
        self.selection.as_ref().ok_or(DaemonError::SelectionUnavailable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Let the key through untouched
    Unhandled,

    /// Operations to apply, and where the caret goes after re-render
    Handled {
        operations: Vec<Operation>,
        caret: Option<CaretDirective>,
    },
}

fn unhandled() -> BoxFuture<'static, HandlerOutcome> {
    future::ready(HandlerOutcome::Unhandled).boxed()
}

/// Capability object a component registers while active
pub trait ActivationHandle: Send + Sync {
    fn enter(&self, _ctx: KeyContext) -> BoxFuture<'static, HandlerOutcome> {
        unhandled()
    }

    fn backspace_override(&self, _ctx: KeyContext) -> BoxFuture<'static, HandlerOutcome> {
        unhandled()
    }

    fn del_override(&self, _ctx: KeyContext) -> BoxFuture<'static, HandlerOutcome> {
        unhandled()
    }

    fn del_joining(&self, _ctx: KeyContext) -> BoxFuture<'static, HandlerOutcome> {
        unhandled()
    }
}

/// Calls the override matching `kind`
pub fn invoke(
    handle: &dyn ActivationHandle,
    kind: HandlerKind,
    ctx: KeyContext,
) -> BoxFuture<'static, HandlerOutcome> {
    match kind {
        HandlerKind::Enter => handle.enter(ctx),
        HandlerKind::BackspaceOverride => handle.backspace_override(ctx),
        HandlerKind::DelOverride => handle.del_override(ctx),
        HandlerKind::DelJoining => handle.del_joining(ctx),
    }
}

struct Entry {
    id: ComponentId,
    handle: Arc<dyn ActivationHandle>,
    count: usize,
}

#[derive(Default)]
pub struct ActivationStack {
    /// Bottom first, top last
    entries: Vec<Entry>,
}

impl ActivationStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reference and moves the component to the top. The latest
    /// handle replaces any earlier one. Returns the new reference count.
    pub fn activate(&mut self, id: ComponentId, handle: Arc<dyn ActivationHandle>) -> usize {
        let count = match self.entries.iter().position(|e| e.id == id) {
            Some(index) => self.entries.remove(index).count + 1,
            None => 1,
        };
        self.entries.push(Entry { id, handle, count });
        trace!(component = %id, count, "activated");
        count
    }

    /// Drops a reference; the entry leaves at zero. Returns the remaining
    /// count, `None` for unknown components.
    pub fn release(&mut self, id: ComponentId) -> Option<usize> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        let entry = &mut self.entries[index];
        entry.count -= 1;
        let remaining = entry.count;
        if remaining == 0 {
            self.entries.remove(index);
        }
        trace!(component = %id, remaining, "released");
        Some(remaining)
    }

    pub fn top(&self) -> Option<(ComponentId, Arc<dyn ActivationHandle>)> {
        self.entries.last().map(|e| (e.id, Arc::clone(&e.handle)))
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn count(&self, id: ComponentId) -> usize {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map_or(0, |e| e.count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ActivationStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| (e.id, e.count)))
            .finish()
    }
}
