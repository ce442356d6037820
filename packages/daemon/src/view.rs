//! Seams to the excluded collaborators: the view layer that re-renders the
//! surface, and the Markdown converter used for inline re-parsing.

use crate::ignore::IgnoreRegistry;
use crate::surface::Surface;
use markweave_dom::{Dom, NodeId, NodeSnapshot};
use tracing::warn;

/// Callback returned by [`ViewHost::mask`], run once re-render completes
pub type Unmask = Box<dyn FnOnce() + Send>;

pub struct RenderContext<'a> {
    /// The new canonical HTML
    pub canonical: &'a str,

    /// Live surface to re-render into. Observation is off.
    pub surface: &'a mut Surface,

    /// Nodes components manage themselves
    pub ignore: &'a IgnoreRegistry,
}

pub trait ViewHost: Send {
    /// Hides the surface before a flush to avoid flicker
    fn mask(&mut self) -> Option<Unmask> {
        None
    }

    /// Called after each successful flush
    fn finalize(&mut self, ctx: RenderContext<'_>);
}

/// Patches the watched root toward the canonical HTML. Ignored nodes keep
/// whatever their component rendered.
#[derive(Debug, Default)]
pub struct MirrorView;

impl ViewHost for MirrorView {
    fn finalize(&mut self, ctx: RenderContext<'_>) {
        let ignore = ctx.ignore;
        let keep = |_: &Dom, node: NodeId| ignore.get(node).is_some();
        if let Err(err) = ctx.surface.render_keeping(ctx.canonical, &keep) {
            warn!(error = %err, "re-render failed");
        }
    }
}

/// Markdown collaborator: re-parses a run of plain text.
///
/// `None` means the text holds no inline syntax and stays as is.
pub trait InlineMarkdown: Send + Sync {
    fn reparse(&self, text: &str) -> Option<Vec<NodeSnapshot>>;
}
