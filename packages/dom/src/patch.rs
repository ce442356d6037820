//! In-place patching of one tree toward another.
//!
//! Children are matched by kind and tag: a common prefix and suffix first,
//! then the remaining middle position by position. Matched nodes keep their
//! ids and only have their text, attributes and children brought up to
//! date; unmatched ones are detached or imported from the source. Detached
//! nodes stay in the arena until [`Dom::collect_garbage`] runs.

use crate::error::DomResult;
use crate::node::{NodeId, NodeKind};
use crate::Dom;

/// Makes the children of `parent` in `dom` match the children of
/// `source_parent` in `source`. Subtrees for which `keep` returns `true`
/// are left exactly as they are when matched.
pub fn patch_children(
    dom: &mut Dom,
    parent: NodeId,
    source: &Dom,
    source_parent: NodeId,
    keep: &dyn Fn(&Dom, NodeId) -> bool,
) -> DomResult<()> {
    let live = dom.children(parent).to_vec();
    let wanted = source.children(source_parent).to_vec();

    let mut prefix = 0;
    while prefix < live.len()
        && prefix < wanted.len()
        && same_shape(dom, live[prefix], source, wanted[prefix])
    {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < live.len() - prefix
        && suffix < wanted.len() - prefix
        && same_shape(
            dom,
            live[live.len() - 1 - suffix],
            source,
            wanted[wanted.len() - 1 - suffix],
        )
    {
        suffix += 1;
    }

    let mut pairs: Vec<(NodeId, NodeId)> = live[..prefix]
        .iter()
        .copied()
        .zip(wanted[..prefix].iter().copied())
        .collect();
    pairs.extend(
        live[live.len() - suffix..]
            .iter()
            .copied()
            .zip(wanted[wanted.len() - suffix..].iter().copied()),
    );

    let live_middle = &live[prefix..live.len() - suffix];
    let wanted_middle = &wanted[prefix..wanted.len() - suffix];
    let anchor = live.get(live.len() - suffix).copied();

    for index in 0..live_middle.len().max(wanted_middle.len()) {
        match (live_middle.get(index).copied(), wanted_middle.get(index).copied()) {
            (Some(current), Some(next)) if same_shape(dom, current, source, next) => {
                pairs.push((current, next));
            }
            (Some(current), Some(next)) => {
                let fresh = dom.import(&source.snapshot(next)?);
                dom.insert_before(parent, fresh, Some(current))?;
                dom.detach(current)?;
            }
            (Some(current), None) => dom.detach(current)?,
            (None, Some(next)) => {
                let fresh = dom.import(&source.snapshot(next)?);
                dom.insert_before(parent, fresh, anchor)?;
            }
            (None, None) => {}
        }
    }

    for (current, next) in pairs {
        patch_node(dom, current, source, next, keep)?;
    }
    Ok(())
}

fn patch_node(
    dom: &mut Dom,
    node: NodeId,
    source: &Dom,
    source_node: NodeId,
    keep: &dyn Fn(&Dom, NodeId) -> bool,
) -> DomResult<()> {
    if keep(dom, node) {
        return Ok(());
    }
    match source.kind(source_node) {
        Some(NodeKind::Text(text)) | Some(NodeKind::Comment(text)) => {
            if dom.text(node) != Some(text.as_str()) {
                dom.set_text(node, text.clone())?;
            }
        }
        Some(NodeKind::Element { attributes, .. }) => {
            if dom.attributes(node) != attributes.as_slice() {
                dom.set_attributes(node, attributes.clone())?;
            }
            patch_children(dom, node, source, source_node, keep)?;
        }
        None => {}
    }
    Ok(())
}

fn same_shape(dom: &Dom, node: NodeId, source: &Dom, source_node: NodeId) -> bool {
    match (dom.kind(node), source.kind(source_node)) {
        (Some(NodeKind::Text(_)), Some(NodeKind::Text(_))) => true,
        (Some(NodeKind::Comment(_)), Some(NodeKind::Comment(_))) => true,
        (Some(NodeKind::Element { tag: a, .. }), Some(NodeKind::Element { tag: b, .. })) => a == b,
        _ => false,
    }
}
