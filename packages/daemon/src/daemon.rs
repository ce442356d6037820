//! # Daemon
//!
//! One instance per editor: owns the live surface, the mirror, the record
//! queue and every registry the flush cycle consults. There is no global
//! state; two editors are two daemons.
//!
//! ## Flush cycle
//!
//! ```text
//! deliver ─▶ mask ─▶ stop observer ─▶ compile + rollback ─▶ direct ops
//!    ─▶ replay on mirror ─▶ post-effects ─▶ expire one-shot ignores
//!    ─▶ finalize (re-render) ─▶ place caret ─▶ history ─▶ unmask
//!    ─▶ restart observer
//! ```
//!
//! A flush with nothing queued does nothing, finalize included. Nothing a
//! single operation does can abort the cycle.

use crate::activation::{ActivationStack, KeyContext};
use crate::caret::{place, CaretDirective, CaretPlanner};
use crate::compiler::compile;
use crate::config::DaemonConfig;
use crate::errors::{DaemonError, DaemonResult};
use crate::history::{HistoryBuffer, HistoryEntry};
use crate::ignore::{IgnoreRegistry, IgnoreScope};
use crate::keys::{classify, decide, line_of, offset_in, Key, KeyAction, KeyDispatch};
use crate::observer::ObserverAdapter;
use crate::operation::Operation;
use crate::post_effects::{InlineMarkdownEffect, PostEffectEngine};
use crate::replicator::Mirror;
use crate::scheduler::{FlushState, Scheduler};
use crate::selection::SelectionStatus;
use crate::surface::Surface;
use crate::view::{InlineMarkdown, MirrorView, RenderContext, ViewHost};
use markweave_dom::NodeId;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Outcome of one flush
#[derive(Debug, Clone, PartialEq)]
pub struct FlushReport {
    /// Everything replayed, compiled ops first, then direct ops, then
    /// post-effect follow-ups
    pub operations: Vec<Operation>,
    pub applied: usize,
    pub skipped: usize,

    /// New canonical HTML
    pub html: String,
}

pub struct Daemon {
    config: DaemonConfig,
    surface: Option<Surface>,
    mirror: Option<Mirror>,
    view: Box<dyn ViewHost>,
    observer: ObserverAdapter,
    ignore: IgnoreRegistry,
    caret: CaretPlanner,
    history: HistoryBuffer,
    scheduler: Scheduler,
    effects: PostEffectEngine,
    activation: ActivationStack,

    /// Operations pushed by components, applied after the compiled log
    direct: Vec<Operation>,
    mounted: bool,
}

impl Daemon {
    pub fn new(config: DaemonConfig) -> Self {
        Self {
            history: HistoryBuffer::with_max_entries(config.history_length),
            scheduler: Scheduler::new(config.debounce()),
            config,
            surface: None,
            mirror: None,
            view: Box::new(MirrorView),
            observer: ObserverAdapter::new(),
            ignore: IgnoreRegistry::new(),
            caret: CaretPlanner::new(),
            effects: PostEffectEngine::new(),
            activation: ActivationStack::new(),
            direct: Vec::new(),
            mounted: false,
        }
    }

    /// Surface and mirror built from the same HTML, already mounted
    pub fn from_html(config: DaemonConfig, html: &str) -> DaemonResult<Self> {
        let mut daemon = Self::new(config);
        daemon.attach_surface(Surface::from_html(html)?);
        daemon.attach_mirror(Mirror::from_html(html)?);
        daemon.mount()?;
        Ok(daemon)
    }

    pub fn with_view(mut self, view: Box<dyn ViewHost>) -> Self {
        self.view = view;
        self
    }

    /// Enables the inline Markdown post-effect
    pub fn with_inline_markdown(mut self, markdown: Arc<dyn InlineMarkdown>) -> Self {
        self.effects.register(Box::new(InlineMarkdownEffect::new(markdown)));
        self
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    pub fn attach_surface(&mut self, surface: Surface) {
        self.surface = Some(surface);
    }

    pub fn attach_mirror(&mut self, mirror: Mirror) {
        self.mirror = Some(mirror);
    }

    /// Starts observation. Without both a surface and a mirror the daemon
    /// stays disabled and `mount` can be retried once they are attached.
    pub fn mount(&mut self) -> DaemonResult<()> {
        if self.surface.is_none() {
            error!("mount without a watched root; daemon disabled");
            return Err(DaemonError::MissingWatchedRoot);
        }
        let Some(mirror) = self.mirror.as_ref() else {
            error!("mount without a mirror document; daemon disabled");
            return Err(DaemonError::MissingMirror);
        };

        if self.history.is_empty() {
            self.history.push(HistoryEntry::new(mirror.html(), None));
        }
        self.mounted = true;
        self.sync_observation()?;
        if !self.direct.is_empty() || self.observer.has_queued() {
            self.scheduler.on_records(Instant::now());
        }
        info!(observing = self.observer.is_started(), "daemon mounted");
        Ok(())
    }

    /// Stops observation and drops any pending timer. Queued records stay
    /// queued for the next mount.
    pub fn unmount(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            self.observer.stop(surface.dom_mut());
        }
        self.scheduler.cancel();
        self.mounted = false;
        info!("daemon unmounted");
    }

    fn sync_observation(&mut self) -> DaemonResult<()> {
        let Some(surface) = self.surface.as_mut() else {
            return Ok(());
        };
        if self.mounted && self.config.should_observe() {
            let root = surface.root();
            self.observer.start(surface.dom_mut(), root)?;
        } else {
            self.observer.stop(surface.dom_mut());
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Edits and scheduling
    // ---------------------------------------------------------------------

    /// Runs a user edit against the live surface and delivers its records
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Surface) -> R) -> DaemonResult<R> {
        let surface = self.surface.as_mut().ok_or(DaemonError::MissingWatchedRoot)?;
        let result = f(surface);
        self.deliver(Instant::now());
        Ok(result)
    }

    /// Observer callback: moves buffered records into the queue
    pub fn deliver(&mut self, now: Instant) -> usize {
        let Some(surface) = self.surface.as_mut() else {
            return 0;
        };
        let count = self.observer.deliver(surface.dom_mut());
        if count > 0 {
            self.scheduler.on_records(now);
        }
        count
    }

    /// Delivers and flushes if the debounce deadline has passed
    pub fn poll(&mut self, now: Instant) -> Option<FlushReport> {
        self.deliver(now);
        if self.scheduler.is_due(now) {
            self.flush(now)
        } else {
            None
        }
    }

    /// Flushes immediately
    pub fn sync_now(&mut self) -> Option<FlushReport> {
        let now = Instant::now();
        self.scheduler.request_sync(now);
        self.flush(now)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    pub fn flush_state(&self) -> FlushState {
        self.scheduler.state()
    }

    /// One flush cycle. `None` when disabled or when nothing was queued.
    pub fn flush(&mut self, now: Instant) -> Option<FlushReport> {
        let (true, Some(surface), Some(mirror)) = (self.mounted, self.surface.as_mut(), self.mirror.as_mut()) else {
            // Nothing can flush until the next mount
            if self.scheduler.state() != FlushState::Flushing {
                self.scheduler.cancel();
            }
            return None;
        };
        let root = surface.root();

        self.observer.deliver(surface.dom_mut());
        if !self.observer.has_queued() && self.direct.is_empty() {
            if self.scheduler.state() != FlushState::Flushing {
                self.scheduler.cancel();
            }
            return None;
        }
        if !self.scheduler.begin_flush() {
            return None;
        }

        let unmask = self.view.mask();
        self.observer.stop(surface.dom_mut());
        let records = self.observer.drain();
        let status = surface
            .selection()
            .and_then(|s| SelectionStatus::capture(surface.dom(), root, &s));

        let compiled = compile(surface.dom_mut(), root, &records, &self.ignore);
        let mut operations = compiled.operations;
        operations.append(&mut self.direct);

        let report = mirror.replay(&operations);
        let follow_ups = self.effects.run(&operations, mirror);
        let applied = report.applied + follow_ups.len();
        operations.extend(follow_ups);
        self.ignore.end_cycle();

        let html = mirror.html();
        self.view.finalize(RenderContext {
            canonical: &html,
            surface: &mut *surface,
            ignore: &self.ignore,
        });
        self.ignore.prune(surface.dom(), root);

        let planned = self.caret.take().and_then(|plan| place(surface.dom(), root, &plan));
        let selection = planned.or_else(|| status.as_ref().and_then(|s| s.restore(surface.dom(), root)));
        surface.set_selection(selection);
        let caret = selection.and_then(|s| SelectionStatus::capture(surface.dom(), root, &s));
        self.history.push(HistoryEntry::new(html.clone(), caret));

        let reclaimed = surface.dom_mut().collect_garbage(&[]) + mirror.dom_mut().collect_garbage(&[]);

        if let Some(unmask) = unmask {
            unmask();
        }
        if self.config.should_observe() {
            if let Err(err) = self.observer.start(surface.dom_mut(), root) {
                warn!(error = %err, "observer restart failed");
            }
        }
        self.scheduler.end_flush(now);

        let skipped = compiled.skipped + report.skipped.len();
        info!(
            records = records.len(),
            operations = operations.len(),
            applied,
            skipped,
            reclaimed,
            "flush complete"
        );

        Some(FlushReport {
            operations,
            applied,
            skipped,
            html,
        })
    }

    // ---------------------------------------------------------------------
    // Exposed to components
    // ---------------------------------------------------------------------

    /// Queues an operation for the next flush, bypassing capture
    pub fn add_to_operations(&mut self, op: Operation) -> DaemonResult<()> {
        if let Err(err) = op.validate() {
            warn!(kind = op.kind(), error = %err, "direct operation rejected");
            return Err(err);
        }
        debug!(kind = op.kind(), target = %op.target(), "direct operation queued");
        self.direct.push(op);
        self.scheduler.on_records(Instant::now());
        Ok(())
    }

    /// Registers exemptions on live surface nodes; unknown nodes are
    /// logged and skipped.
    pub fn add_to_ignore(&mut self, nodes: &[NodeId], scope: IgnoreScope, descendants: bool) {
        match self.surface.as_ref() {
            Some(surface) => self.ignore.add(surface.dom(), nodes, scope, descendants),
            None => warn!("ignore registration without a watched root"),
        }
    }

    /// Plans the caret for after the next re-render, anchored at the
    /// current selection
    pub fn set_future_caret(&mut self, directive: CaretDirective) {
        let anchor = self.selection_status();
        self.caret.set(directive, anchor);
    }

    pub fn selection_status(&self) -> Option<SelectionStatus> {
        let surface = self.surface.as_ref()?;
        let selection = surface.selection()?;
        SelectionStatus::capture(surface.dom(), surface.root(), &selection)
    }

    /// Restores a serialized selection. Without `override_selection` an
    /// existing selection is kept.
    pub fn set_selection_status(&mut self, status: &SelectionStatus, override_selection: bool) -> DaemonResult<()> {
        let surface = self.surface.as_mut().ok_or(DaemonError::MissingWatchedRoot)?;
        if surface.selection().is_some() && !override_selection {
            return Ok(());
        }
        let selection = status
            .restore(surface.dom(), surface.root())
            .ok_or_else(|| DaemonError::unresolved(&status.focus))?;
        surface.set_selection(Some(selection));
        Ok(())
    }

    // ---------------------------------------------------------------------
    // History and document loading
    // ---------------------------------------------------------------------

    /// Steps back one history entry. Pending edits are flushed first.
    pub fn undo(&mut self) -> DaemonResult<bool> {
        self.sync_now();
        let Some(entry) = self.history.undo().cloned() else {
            return Ok(false);
        };
        self.restore(&entry)?;
        Ok(true)
    }

    pub fn redo(&mut self) -> DaemonResult<bool> {
        self.sync_now();
        let Some(entry) = self.history.redo().cloned() else {
            return Ok(false);
        };
        self.restore(&entry)?;
        Ok(true)
    }

    /// Replaces the whole document and starts a fresh history
    pub fn load_html(&mut self, html: &str) -> DaemonResult<()> {
        self.sync_now();
        self.history.clear();
        self.restore(&HistoryEntry::new(html, None))?;
        self.history.push(HistoryEntry::new(self.canonical_html(), None));
        Ok(())
    }

    fn restore(&mut self, entry: &HistoryEntry) -> DaemonResult<()> {
        let surface = self.surface.as_mut().ok_or(DaemonError::MissingWatchedRoot)?;
        let mirror = self.mirror.as_mut().ok_or(DaemonError::MissingMirror)?;
        let root = surface.root();

        mirror.replace_html(&entry.html)?;
        let html = mirror.html();

        let unmask = self.view.mask();
        self.observer.stop(surface.dom_mut());
        // Anything still queued describes a document that no longer exists
        self.observer.drain();
        self.view.finalize(RenderContext {
            canonical: &html,
            surface: &mut *surface,
            ignore: &self.ignore,
        });
        self.ignore.prune(surface.dom(), root);
        surface.dom_mut().collect_garbage(&[]);
        let selection = entry.caret.as_ref().and_then(|s| s.restore(surface.dom(), root));
        surface.set_selection(selection);
        if let Some(unmask) = unmask {
            unmask();
        }
        self.sync_observation()?;
        debug!(bytes = html.len(), "document restored");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Key dispatch
    // ---------------------------------------------------------------------

    /// Classifies the caret and decides what `key` does. Delegation is
    /// resolved to the top activation handle; running it is the caller's
    /// job so no lock is held across the handler.
    pub fn dispatch_key(&self, key: Key) -> KeyDispatch {
        let Some(surface) = self.surface.as_ref() else {
            return KeyDispatch::Prevented;
        };
        let dom = surface.dom();
        let root = surface.root();
        let selection = surface.selection();
        let caret = classify(dom, root, selection.as_ref());

        match decide(key, caret) {
            KeyAction::Native => KeyDispatch::Native,
            KeyAction::Prevent => KeyDispatch::Prevented,
            KeyAction::Delegate(kind) => {
                let Some((component, handle)) = self.activation.top() else {
                    return KeyDispatch::Native;
                };
                let (line_text, line_offset) = match selection {
                    Some(s) => {
                        let line = line_of(dom, root, s.focus.node);
                        (dom.text_content(line), offset_in(dom, line, s.focus))
                    }
                    None => (String::new(), 0),
                };
                debug!(?key, ?caret, component = %component, "key delegated");
                KeyDispatch::Delegate {
                    kind,
                    handle,
                    context: KeyContext {
                        key,
                        caret,
                        selection: self.selection_status(),
                        line_text,
                        line_offset,
                    },
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn canonical_html(&self) -> String {
        self.mirror.as_ref().map(Mirror::html).unwrap_or_default()
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    /// Direct access to the surface. Edits made here are captured on the
    /// next `deliver`.
    pub fn surface_mut(&mut self) -> Option<&mut Surface> {
        self.surface.as_mut()
    }

    pub fn mirror(&self) -> Option<&Mirror> {
        self.mirror.as_ref()
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn ignore_registry(&self) -> &IgnoreRegistry {
        &self.ignore
    }

    pub fn activation(&mut self) -> &mut ActivationStack {
        &mut self.activation
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_observing(&self) -> bool {
        self.observer.is_started()
    }

    pub fn queued_records(&self) -> usize {
        self.observer.queue().len()
    }

    pub fn caret_pending(&self) -> bool {
        self.caret.is_pending()
    }
}
