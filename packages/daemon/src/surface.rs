//! The live editing surface: a document whose watched root is the element
//! users type into, plus the current selection.

use crate::selection::Selection;
use markweave_dom::{parse_document, patch_children, serialize_children, Dom, DomResult, NodeId};

pub const ROOT_TAG: &str = "div";
pub const ROOT_CLASS: &str = "markweave";

#[derive(Debug, Clone)]
pub struct Surface {
    dom: Dom,
    root: NodeId,
    selection: Option<Selection>,
}

impl Surface {
    /// An empty `<div class="markweave">` under a fresh body
    pub fn new() -> Self {
        let mut dom = Dom::new();
        let body = dom.body();
        let root = dom.create_element_with(ROOT_TAG, vec![("class".to_string(), ROOT_CLASS.to_string())]);
        // body is always an element and root is fresh, so this cannot fail
        let _ = dom.append_child(body, root);
        Self {
            dom,
            root,
            selection: None,
        }
    }

    pub fn from_html(html: &str) -> DomResult<Self> {
        let mut surface = Self::new();
        surface.render(html)?;
        Ok(surface)
    }

    /// Wraps an existing document, watching `root`
    pub fn with_root(dom: Dom, root: NodeId) -> Self {
        Self {
            dom,
            root,
            selection: None,
        }
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    /// Serialized content of the watched root
    pub fn html(&self) -> String {
        serialize_children(&self.dom, self.root)
    }

    /// Brings the watched root's children up to date with `html`, reusing
    /// every node whose shape still matches
    pub fn render(&mut self, html: &str) -> DomResult<()> {
        self.render_keeping(html, &|_, _| false)
    }

    /// Like [`render`](Self::render), leaving matched subtrees for which
    /// `keep` holds untouched
    pub fn render_keeping(&mut self, html: &str, keep: &dyn Fn(&Dom, NodeId) -> bool) -> DomResult<()> {
        let source = parse_document(html)?;
        patch_children(&mut self.dom, self.root, &source, source.body(), keep)
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_lives_under_body() {
        let surface = Surface::from_html("<p>a</p>").unwrap();
        let dom = surface.dom();
        assert_eq!(dom.parent(surface.root()), Some(dom.body()));
        assert_eq!(dom.attribute(surface.root(), "class"), Some(ROOT_CLASS));
        assert_eq!(surface.html(), "<p>a</p>");
    }

    #[test]
    fn test_render_replaces_content() {
        let mut surface = Surface::from_html("<p>a</p>").unwrap();
        surface.render("<h2>b</h2>").unwrap();
        assert_eq!(surface.html(), "<h2>b</h2>");
    }

    #[test]
    fn test_render_reuses_matching_nodes() {
        let mut surface = Surface::from_html("<p>a</p><p>b</p>").unwrap();
        let second = surface.dom().children(surface.root())[1];
        surface.render("<p>a</p><p>bc</p>").unwrap();
        assert_eq!(surface.dom().children(surface.root())[1], second);
        assert_eq!(surface.html(), "<p>a</p><p>bc</p>");
    }
}
