//! # Post-Effect System
//!
//! Replayed operations can call for follow-up edits on the mirror. Effects
//! run after the whole log has replayed; every follow-up they produce is
//! applied immediately and appended to the log so the view and history see
//! one consistent result.
//!
//! Effects are:
//! - **Deterministic**: the same log and mirror give the same follow-ups
//! - **Self-validating**: a follow-up re-resolves its target against the
//!   mirror as it is now, never against a stale address

use crate::address::{address_of, resolve};
use crate::operation::Operation;
use crate::replicator::Mirror;
use crate::view::InlineMarkdown;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Follow-up analysis for one replayed operation
pub trait PostEffect: fmt::Debug + Send {
    fn analyze(&self, op: &Operation, mirror: &Mirror) -> Vec<Operation>;
}

/// Tags whose text is literal and never re-parsed
const VERBATIM_TAGS: &[&str] = &["code", "pre"];

/// Re-parses inline Markdown typed into a plain text run, e.g. `*word*`
/// becoming `<em>word</em>`.
pub struct InlineMarkdownEffect {
    markdown: Arc<dyn InlineMarkdown>,
}

impl InlineMarkdownEffect {
    pub fn new(markdown: Arc<dyn InlineMarkdown>) -> Self {
        Self { markdown }
    }
}

impl fmt::Debug for InlineMarkdownEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineMarkdownEffect").finish_non_exhaustive()
    }
}

impl PostEffect for InlineMarkdownEffect {
    fn analyze(&self, op: &Operation, mirror: &Mirror) -> Vec<Operation> {
        let Operation::Text { address, text } = op else {
            return vec![];
        };
        let dom = mirror.dom();
        let root = mirror.root();

        // The text may have been replaced or moved by a later operation
        let Some(node) = resolve(dom, root, address) else {
            return vec![];
        };
        if dom.text(node) != Some(text.as_str()) || !dom.is_text(node) {
            return vec![];
        }
        let verbatim = dom
            .parent(node)
            .and_then(|p| dom.tag(p))
            .is_some_and(|tag| VERBATIM_TAGS.contains(&tag));
        if verbatim {
            return vec![];
        }

        let Some(nodes) = self.markdown.reparse(text) else {
            return vec![];
        };
        let Some(target) = address_of(dom, root, node) else {
            return vec![];
        };
        vec![Operation::Replace { target, nodes }]
    }
}

#[derive(Debug, Default)]
pub struct PostEffectEngine {
    effects: Vec<Box<dyn PostEffect>>,
}

impl PostEffectEngine {
    /// Create an engine with no effects
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, effect: Box<dyn PostEffect>) {
        self.effects.push(effect);
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Analyzes every op in `log`, applying each follow-up as it is found.
    /// Returns the follow-ups that applied.
    pub fn run(&self, log: &[Operation], mirror: &mut Mirror) -> Vec<Operation> {
        let mut applied = Vec::new();
        if self.effects.is_empty() {
            return applied;
        }

        for op in log {
            for effect in &self.effects {
                for secondary in effect.analyze(op, mirror) {
                    match mirror.apply(&secondary) {
                        Ok(()) => {
                            debug!(kind = secondary.kind(), target = %secondary.target(), "post-effect applied");
                            applied.push(secondary);
                        }
                        Err(err) => {
                            warn!(target = %secondary.target(), error = %err, "post-effect skipped");
                        }
                    }
                }
            }
        }

        applied
    }
}
