//! # Arena DOM
//!
//! A small document tree addressed by [`NodeId`]. Every structural or text
//! change goes through a method on [`Dom`] so that, while a subtree is
//! observed, the change is reported as a [`MutationRecord`].
//!
//! ```text
//! body (NodeId 0)
//!  ├── p
//!  │    └── "Hello"
//!  └── ul
//!       └── li
//! ```
//!
//! Detached nodes stay in the arena and can be reinserted, which is what
//! lets rollback put a removed node back exactly where it was. Once nothing
//! needs them any more, [`Dom::collect_garbage`] frees their slots for reuse.

use crate::error::{DomError, DomResult};
use crate::node::{NodeData, NodeId, NodeKind};
use crate::record::MutationRecord;
use crate::snapshot::NodeSnapshot;

#[derive(Debug, Clone)]
struct Observation {
    root: NodeId,
    records: Vec<MutationRecord>,
}

/// Document arena with an always-present `body` element
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Option<NodeData>>,
    free: Vec<NodeId>,
    body: NodeId,
    observation: Option<Observation>,
}

impl Dom {
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            body: NodeId(0),
            observation: None,
        };
        dom.body = dom.alloc(NodeKind::element("body"));
        dom
    }

    /// The document body
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Number of live nodes, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slots in the arena, live or free
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slot(id).is_some()
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = Some(NodeData::new(kind));
                id
            }
            None => {
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(Some(NodeData::new(kind)));
                id
            }
        }
    }

    fn slot(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn data(&self, id: NodeId) -> DomResult<&NodeData> {
        self.slot(id).ok_or(DomError::NodeNotFound(id))
    }

    fn data_mut(&mut self, id: NodeId) -> DomResult<&mut NodeData> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(DomError::NodeNotFound(id))
    }

    // ---------------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::element(tag))
    }

    pub fn create_element_with(&mut self, tag: &str, attributes: Vec<(String, String)>) -> NodeId {
        let attributes = attributes
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        self.alloc(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attributes,
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Comment(text.into()))
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.slot(id).map(|n| &n.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slot(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.kind(id).and_then(NodeKind::tag)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.kind(id).is_some_and(NodeKind::is_element)
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.kind(id).is_some_and(NodeKind::is_text)
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        match self.kind(id) {
            Some(NodeKind::Element { attributes, .. }) => attributes,
            _ => &[],
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attributes are not observed, matching the observer options the
    /// editor subscribes with.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> DomResult<()> {
        let name = name.to_ascii_lowercase();
        match &mut self.data_mut(id)?.kind {
            NodeKind::Element { attributes, .. } => {
                let value = value.into();
                if let Some(slot) = attributes.iter_mut().find(|(key, _)| *key == name) {
                    slot.1 = value;
                } else {
                    attributes.push((name, value));
                }
                Ok(())
            }
            _ => Err(DomError::NotAContainer(id)),
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<()> {
        match &mut self.data_mut(id)?.kind {
            NodeKind::Element { attributes, .. } => {
                attributes.retain(|(key, _)| key != name);
                Ok(())
            }
            _ => Err(DomError::NotAContainer(id)),
        }
    }

    /// Replaces the whole attribute list, keeping the given order
    pub fn set_attributes(&mut self, id: NodeId, list: Vec<(String, String)>) -> DomResult<()> {
        match &mut self.data_mut(id)?.kind {
            NodeKind::Element { attributes, .. } => {
                *attributes = list
                    .into_iter()
                    .map(|(name, value)| (name.to_ascii_lowercase(), value))
                    .collect();
                Ok(())
            }
            _ => Err(DomError::NotAContainer(id)),
        }
    }

    /// Data of a text or comment node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text(text)) | Some(NodeKind::Comment(text)) => Some(text),
            _ => None,
        }
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => text.clone(),
            Some(NodeKind::Comment(_)) | None => String::new(),
            Some(NodeKind::Element { .. }) => {
                let mut out = String::new();
                for descendant in self.descendants(id) {
                    if let Some(NodeKind::Text(text)) = self.kind(descendant) {
                        out.push_str(text);
                    }
                }
                out
            }
        }
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index.checked_sub(1).map(|i| self.children(parent)[i])
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Walks parents from `id` (exclusive) up to the top of its tree
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            dom: self,
            next: self.parent(id),
        }
    }

    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Pre-order descendants of `id`, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// First element under `scope` (inclusive) whose `id` attribute equals `value`
    pub fn find_element_by_id(&self, scope: NodeId, value: &str) -> Option<NodeId> {
        std::iter::once(scope)
            .chain(self.descendants(scope))
            .find(|node| self.attribute(*node, "id") == Some(value))
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_all(parent, &[child], None)
    }

    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>) -> DomResult<()> {
        self.insert_all(parent, &[child], before)
    }

    /// Inserts a run of nodes before `before` (or at the end) as one change,
    /// the way inserting a document fragment does.
    pub fn insert_all(&mut self, parent: NodeId, nodes: &[NodeId], before: Option<NodeId>) -> DomResult<()> {
        if !self.data(parent)?.kind.is_element() {
            return Err(DomError::NotAContainer(parent));
        }
        if let Some(before) = before {
            if self.parent(before) != Some(parent) || nodes.contains(&before) {
                return Err(DomError::NotAChild { parent, child: before });
            }
        }
        for &node in nodes {
            self.data(node)?;
            if self.is_inclusive_ancestor(node, parent) {
                return Err(DomError::CycleDetected { parent, child: node });
            }
        }
        if nodes.is_empty() {
            return Ok(());
        }

        for &node in nodes {
            self.detach(node)?;
        }

        let index = match before {
            Some(before) => self
                .children(parent)
                .iter()
                .position(|c| *c == before)
                .ok_or(DomError::NotAChild { parent, child: before })?,
            None => self.children(parent).len(),
        };
        let previous_sibling = index.checked_sub(1).map(|i| self.children(parent)[i]);

        let children = &mut self.data_mut(parent)?.children;
        for (offset, &node) in nodes.iter().enumerate() {
            children.insert(index + offset, node);
        }
        for &node in nodes {
            self.data_mut(node)?.parent = Some(parent);
        }

        self.record(MutationRecord::child_list(
            parent,
            nodes.to_vec(),
            Vec::new(),
            previous_sibling,
            before,
        ));
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child)
    }

    /// Removes `id` from its parent; a no-op for detached nodes
    pub fn detach(&mut self, id: NodeId) -> DomResult<()> {
        let Some(parent) = self.data(id)?.parent else {
            return Ok(());
        };
        let previous_sibling = self.previous_sibling(id);
        let next_sibling = self.next_sibling(id);

        self.data_mut(parent)?.children.retain(|c| *c != id);
        self.data_mut(id)?.parent = None;

        self.record(MutationRecord::child_list(
            parent,
            Vec::new(),
            vec![id],
            previous_sibling,
            next_sibling,
        ));
        Ok(())
    }

    /// Swaps every child of `parent` for `nodes` as one change
    pub fn replace_children(&mut self, parent: NodeId, nodes: &[NodeId]) -> DomResult<()> {
        if !self.data(parent)?.kind.is_element() {
            return Err(DomError::NotAContainer(parent));
        }
        for &node in nodes {
            self.data(node)?;
            if self.is_inclusive_ancestor(node, parent) {
                return Err(DomError::CycleDetected { parent, child: node });
            }
        }
        for &node in nodes {
            self.detach(node)?;
        }

        let removed = std::mem::take(&mut self.data_mut(parent)?.children);
        for &node in &removed {
            self.data_mut(node)?.parent = None;
        }
        self.data_mut(parent)?.children = nodes.to_vec();
        for &node in nodes {
            self.data_mut(node)?.parent = Some(parent);
        }

        if !removed.is_empty() || !nodes.is_empty() {
            self.record(MutationRecord::child_list(parent, nodes.to_vec(), removed, None, None));
        }
        Ok(())
    }

    /// Replaces the data of a text or comment node
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> DomResult<()> {
        let text = text.into();
        let old = match &mut self.data_mut(id)?.kind {
            NodeKind::Text(data) | NodeKind::Comment(data) => std::mem::replace(data, text),
            NodeKind::Element { .. } => return Err(DomError::NotCharacterData(id)),
        };
        self.record(MutationRecord::character_data(id, old));
        Ok(())
    }

    /// `textContent` setter: character data is overwritten, element
    /// children are replaced by a single text node (none for `""`).
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> DomResult<()> {
        if self.data(id)?.kind.is_element() {
            let nodes = if text.is_empty() {
                Vec::new()
            } else {
                vec![self.create_text(text)]
            };
            self.replace_children(id, &nodes)
        } else {
            self.set_text(id, text)
        }
    }

    /// Inserts `insert` at character `offset` of a text node
    pub fn insert_text(&mut self, id: NodeId, offset: usize, insert: &str) -> DomResult<()> {
        let current = self.text(id).ok_or(DomError::NotCharacterData(id))?;
        let at = byte_offset(current, offset);
        let mut next = String::with_capacity(current.len() + insert.len());
        next.push_str(&current[..at]);
        next.push_str(insert);
        next.push_str(&current[at..]);
        self.set_text(id, next)
    }

    /// Deletes `count` characters starting at character `offset`
    pub fn delete_text(&mut self, id: NodeId, offset: usize, count: usize) -> DomResult<()> {
        let current = self.text(id).ok_or(DomError::NotCharacterData(id))?;
        let start = byte_offset(current, offset);
        let end = byte_offset(current, offset.saturating_add(count));
        let next = format!("{}{}", &current[..start], &current[end..]);
        self.set_text(id, next)
    }

    /// `Text.splitText`: truncates the node at `offset` and inserts the tail
    /// as a new sibling, returning it.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> DomResult<NodeId> {
        let current = self.text(id).ok_or(DomError::NotCharacterData(id))?;
        let at = byte_offset(current, offset);
        let head = current[..at].to_string();
        let tail = current[at..].to_string();

        let tail_node = self.create_text(tail);
        self.set_text(id, head)?;
        if let Some(parent) = self.parent(id) {
            let next = self.next_sibling(id);
            self.insert_before(parent, tail_node, next)?;
        }
        Ok(tail_node)
    }

    // ---------------------------------------------------------------------
    // Cloning
    // ---------------------------------------------------------------------

    /// Owned deep copy of the subtree rooted at `id`
    pub fn snapshot(&self, id: NodeId) -> DomResult<NodeSnapshot> {
        let data = self.data(id)?;
        Ok(match &data.kind {
            NodeKind::Element { tag, attributes } => NodeSnapshot::Element {
                tag: tag.clone(),
                attributes: attributes.clone(),
                children: data
                    .children
                    .iter()
                    .map(|child| self.snapshot(*child))
                    .collect::<DomResult<Vec<_>>>()?,
            },
            NodeKind::Text(content) => NodeSnapshot::Text {
                content: content.clone(),
            },
            NodeKind::Comment(content) => NodeSnapshot::Comment {
                content: content.clone(),
            },
        })
    }

    /// Builds a detached subtree from a snapshot; nothing is recorded
    pub fn import(&mut self, snapshot: &NodeSnapshot) -> NodeId {
        match snapshot {
            NodeSnapshot::Element {
                tag,
                attributes,
                children,
            } => {
                let id = self.create_element_with(tag, attributes.clone());
                let child_ids: Vec<NodeId> = children.iter().map(|child| self.import(child)).collect();
                for child_id in &child_ids {
                    if let Ok(child) = self.data_mut(*child_id) {
                        child.parent = Some(id);
                    }
                }
                if let Ok(data) = self.data_mut(id) {
                    data.children = child_ids;
                }
                id
            }
            NodeSnapshot::Text { content } => self.create_text(content.clone()),
            NodeSnapshot::Comment { content } => self.create_comment(content.clone()),
        }
    }

    pub fn deep_clone(&mut self, id: NodeId) -> DomResult<NodeId> {
        let snapshot = self.snapshot(id)?;
        Ok(self.import(&snapshot))
    }

    // ---------------------------------------------------------------------
    // Observation
    // ---------------------------------------------------------------------

    /// Starts recording changes inside `root`'s subtree. Re-observing keeps
    /// undelivered records.
    pub fn observe(&mut self, root: NodeId) -> DomResult<()> {
        self.data(root)?;
        let records = self
            .observation
            .take()
            .map(|o| o.records)
            .unwrap_or_default();
        self.observation = Some(Observation { root, records });
        Ok(())
    }

    pub fn is_observing(&self) -> bool {
        self.observation.is_some()
    }

    pub fn observed_root(&self) -> Option<NodeId> {
        self.observation.as_ref().map(|o| o.root)
    }

    pub fn has_pending_records(&self) -> bool {
        self.observation
            .as_ref()
            .is_some_and(|o| !o.records.is_empty())
    }

    /// Takes undelivered records, leaving observation in place
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        self.observation
            .as_mut()
            .map(|o| std::mem::take(&mut o.records))
            .unwrap_or_default()
    }

    /// Stops recording and hands back whatever was still undelivered
    pub fn disconnect(&mut self) -> Vec<MutationRecord> {
        self.observation
            .take()
            .map(|o| o.records)
            .unwrap_or_default()
    }

    // ---------------------------------------------------------------------
    // Reclamation
    // ---------------------------------------------------------------------

    /// Frees every node that is unreachable from the body, from a node in
    /// `keep`, or from an undelivered record. A kept node retains its whole
    /// tree, ancestors included. Freed ids are handed out again by later
    /// allocations. Returns the number of nodes freed.
    pub fn collect_garbage(&mut self, keep: &[NodeId]) -> usize {
        let mut roots = vec![self.body];
        roots.extend(keep.iter().copied().filter(|id| self.contains(*id)));
        if let Some(observation) = &self.observation {
            for record in &observation.records {
                roots.push(record.target);
                roots.extend(record.added_nodes.iter().copied());
                roots.extend(record.removed_nodes.iter().copied());
                roots.extend(record.previous_sibling);
                roots.extend(record.next_sibling);
            }
        }

        let mut marked = vec![false; self.nodes.len()];
        for root in roots {
            if !self.contains(root) {
                continue;
            }
            let top = self.ancestors(root).last().unwrap_or(root);
            if marked[top.index()] {
                continue;
            }
            marked[top.index()] = true;
            for node in self.descendants(top) {
                marked[node.index()] = true;
            }
        }

        let mut freed = 0;
        for (index, slot) in self.nodes.iter_mut().enumerate() {
            if slot.is_some() && !marked[index] {
                *slot = None;
                self.free.push(NodeId(index as u32));
                freed += 1;
            }
        }
        freed
    }

    fn record(&mut self, record: MutationRecord) {
        let Some(root) = self.observation.as_ref().map(|o| o.root) else {
            return;
        };
        if !self.is_inclusive_ancestor(root, record.target) {
            return;
        }
        if let Some(observation) = self.observation.as_mut() {
            observation.records.push(record);
        }
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Ancestors<'a> {
    dom: &'a Dom,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.dom.parent(current);
        Some(current)
    }
}

/// Byte index of character `offset`, clamped to the end
pub fn byte_offset(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordKind;

    fn paragraph(dom: &mut Dom, text: &str) -> (NodeId, NodeId) {
        let p = dom.create_element("p");
        let t = dom.create_text(text);
        dom.append_child(p, t).unwrap();
        (p, t)
    }

    #[test]
    fn test_insert_and_navigate() {
        let mut dom = Dom::new();
        let body = dom.body();
        let (a, _) = paragraph(&mut dom, "A");
        let (b, _) = paragraph(&mut dom, "B");
        dom.append_child(body, b).unwrap();
        dom.insert_before(body, a, Some(b)).unwrap();

        assert_eq!(dom.children(body), &[a, b]);
        assert_eq!(dom.next_sibling(a), Some(b));
        assert_eq!(dom.previous_sibling(b), Some(a));
        assert_eq!(dom.text_content(body), "AB");
    }

    #[test]
    fn test_cycle_rejected() {
        let mut dom = Dom::new();
        let body = dom.body();
        let div = dom.create_element("div");
        dom.append_child(body, div).unwrap();
        let err = dom.append_child(div, body).unwrap_err();
        assert_eq!(err, DomError::CycleDetected { parent: div, child: body });
    }

    #[test]
    fn test_records_only_inside_observed_subtree() {
        let mut dom = Dom::new();
        let body = dom.body();
        let root = dom.create_element("div");
        let outside = dom.create_element("aside");
        dom.append_child(body, root).unwrap();
        dom.append_child(body, outside).unwrap();
        dom.observe(root).unwrap();

        let (p, t) = paragraph(&mut dom, "x");
        dom.append_child(root, p).unwrap();
        let other = dom.create_text("y");
        dom.append_child(outside, other).unwrap();
        dom.set_text(t, "xy").unwrap();

        let records = dom.take_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, RecordKind::ChildList);
        assert_eq!(records[0].added_nodes, vec![p]);
        assert_eq!(records[1].kind, RecordKind::CharacterData);
        assert_eq!(records[1].old_value.as_deref(), Some("x"));
    }

    #[test]
    fn test_move_records_removal_then_insertion() {
        let mut dom = Dom::new();
        let body = dom.body();
        let (a, _) = paragraph(&mut dom, "A");
        let (b, _) = paragraph(&mut dom, "B");
        dom.append_child(body, a).unwrap();
        dom.append_child(body, b).unwrap();
        dom.observe(body).unwrap();

        dom.insert_before(body, b, Some(a)).unwrap();

        let records = dom.disconnect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].removed_nodes, vec![b]);
        assert_eq!(records[0].previous_sibling, Some(a));
        assert_eq!(records[1].added_nodes, vec![b]);
        assert_eq!(records[1].next_sibling, Some(a));
        assert!(!dom.is_observing());
    }

    #[test]
    fn test_text_editing_helpers_use_char_offsets() {
        let mut dom = Dom::new();
        let t = dom.create_text("héllo");
        dom.insert_text(t, 2, "X").unwrap();
        assert_eq!(dom.text(t), Some("héXllo"));
        dom.delete_text(t, 0, 2).unwrap();
        assert_eq!(dom.text(t), Some("Xllo"));
    }

    #[test]
    fn test_split_text_inserts_tail_sibling() {
        let mut dom = Dom::new();
        let body = dom.body();
        let (p, t) = paragraph(&mut dom, "HelloWorld");
        dom.append_child(body, p).unwrap();

        let tail = dom.split_text(t, 5).unwrap();
        assert_eq!(dom.text(t), Some("Hello"));
        assert_eq!(dom.text(tail), Some("World"));
        assert_eq!(dom.next_sibling(t), Some(tail));
    }

    #[test]
    fn test_snapshot_import_is_deep() {
        let mut dom = Dom::new();
        let ul = dom.create_element_with("UL", vec![("ID".to_string(), "list".to_string())]);
        let li = dom.create_element("li");
        let t = dom.create_text("item");
        dom.append_child(li, t).unwrap();
        dom.append_child(ul, li).unwrap();

        let copy = dom.deep_clone(ul).unwrap();
        assert_ne!(copy, ul);
        assert_eq!(dom.tag(copy), Some("ul"));
        assert_eq!(dom.attribute(copy, "id"), Some("list"));
        assert_eq!(dom.text_content(copy), "item");
        assert_eq!(dom.parent(copy), None);
    }

    #[test]
    fn test_replace_children_is_one_record() {
        let mut dom = Dom::new();
        let body = dom.body();
        let (p, t) = paragraph(&mut dom, "old");
        dom.append_child(body, p).unwrap();
        dom.observe(body).unwrap();

        dom.set_text_content(p, "new").unwrap();

        let records = dom.take_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].removed_nodes, vec![t]);
        assert_eq!(records[0].added_nodes.len(), 1);
        assert_eq!(dom.text_content(p), "new");
    }

    #[test]
    fn test_collect_garbage_frees_detached_subtrees() {
        let mut dom = Dom::new();
        let body = dom.body();
        let (kept, _) = paragraph(&mut dom, "kept");
        let (dropped, _) = paragraph(&mut dom, "dropped");
        let (held, held_text) = paragraph(&mut dom, "held");
        dom.append_child(body, kept).unwrap();
        assert_eq!(dom.len(), 7);

        assert_eq!(dom.collect_garbage(&[held_text]), 2);
        assert!(!dom.contains(dropped));
        assert!(dom.contains(held));
        assert_eq!(dom.len(), 5);

        dom.create_text("reused");
        assert_eq!(dom.capacity(), 7);
        assert_eq!(dom.text_content(kept), "kept");
    }

    #[test]
    fn test_collect_garbage_keeps_undelivered_record_nodes() {
        let mut dom = Dom::new();
        let body = dom.body();
        let (p, t) = paragraph(&mut dom, "x");
        dom.append_child(body, p).unwrap();
        dom.observe(body).unwrap();
        dom.detach(p).unwrap();

        assert_eq!(dom.collect_garbage(&[]), 0);
        assert!(dom.contains(t));

        dom.take_records();
        assert_eq!(dom.collect_garbage(&[]), 2);
    }

    #[test]
    fn test_delete_text_saturates() {
        let mut dom = Dom::new();
        let t = dom.create_text("abc");
        dom.delete_text(t, 1, usize::MAX).unwrap();
        assert_eq!(dom.text(t), Some("a"));
    }
}
