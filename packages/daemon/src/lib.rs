//! # Markweave Daemon
//!
//! Mutation capture and replay for a live Markdown editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Surface: live DOM the user edits directly   │
//! └─────────────────────────────────────────────┘
//!                     ↓ mutation records
//! ┌─────────────────────────────────────────────┐
//! │ daemon: capture → compile → replay          │
//! │  - Observer adapter queues raw records      │
//! │  - Compiler rolls each record back and      │
//! │    emits addressed operations               │
//! │  - Replicator applies them to the mirror    │
//! │  - Scheduler debounces, history records     │
//! └─────────────────────────────────────────────┘
//!                     ↓ canonical HTML
//! ┌─────────────────────────────────────────────┐
//! │ view host: re-renders the surface           │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Mirror is source of truth**: the live surface is a projection
//! 2. **Rollback before replay**: after compiling, the surface is back at
//!    its pre-edit state and only the mirror has changed
//! 3. **Isolated failures**: one bad record or operation never aborts a flush
//! 4. **Instance scoped**: no globals, one daemon per editor
//!
//! ## Usage
//!
//! ```rust,ignore
//! use markweave_daemon::{Daemon, DaemonConfig};
//!
//! let mut daemon = Daemon::from_html(DaemonConfig::default(), "<p>Hello</p>")?;
//!
//! daemon.edit(|surface| {
//!     let p = surface.dom().children(surface.root())[0];
//!     let text = surface.dom().children(p)[0];
//!     surface.dom_mut().insert_text(text, 5, "X")
//! })??;
//!
//! let report = daemon.sync_now().expect("one edit queued");
//! assert_eq!(report.html, "<p>HelloX</p>");
//! ```

mod activation;
mod address;
mod caret;
mod compiler;
mod config;
mod daemon;
mod errors;
mod handle;
mod history;
mod ignore;
mod keys;
mod observer;
mod operation;
mod post_effects;
mod replicator;
mod scheduler;
mod selection;
mod surface;
mod view;

pub use activation::{invoke, ActivationHandle, ActivationStack, ComponentId, HandlerKind, HandlerOutcome, KeyContext};
pub use address::{address_of, is_stable_id, resolve, Address, AddressError, Anchor, Step};
pub use caret::{place, CaretDirective, CaretPlan, CaretPlanner};
pub use compiler::{compile, CompileOutput};
pub use config::{DaemonConfig, LogLevel, DEFAULT_CONFIG_NAME};
pub use daemon::{Daemon, FlushReport};
pub use errors::{DaemonError, DaemonResult};
pub use handle::DaemonHandle;
pub use history::{HistoryBuffer, HistoryEntry};
pub use ignore::{IgnoreEntry, IgnoreRegistry, IgnoreScope};
pub use keys::{classify, decide, CaretContext, Key, KeyAction, KeyDispatch, KeyOutcome};
pub use observer::ObserverAdapter;
pub use operation::Operation;
pub use post_effects::{InlineMarkdownEffect, PostEffect, PostEffectEngine};
pub use replicator::{apply, replay, Mirror, ReplayReport, SkippedOperation};
pub use scheduler::{FlushState, Scheduler};
pub use selection::{Position, Selection, SelectionStatus};
pub use surface::Surface;
pub use view::{InlineMarkdown, MirrorView, RenderContext, Unmask, ViewHost};

// Re-export the DOM crate for hosts and tests
pub use markweave_dom as dom;
