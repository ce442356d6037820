//! HTML serialization.
//!
//! Output is canonical: no pretty printing, attributes in insertion order,
//! double-quoted values. Parsing the output of [`serialize_children`] and
//! serializing again yields the same string.

use crate::entities::{escape_attribute, escape_text};
use crate::node::{is_void_element, NodeKind};
use crate::snapshot::NodeSnapshot;
use crate::{Dom, NodeId};

/// Inner HTML of `id`
pub fn serialize_children(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    for child in dom.children(id) {
        write_node(dom, *child, &mut out);
    }
    out
}

/// Outer HTML of `id`
pub fn serialize_node(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    write_node(dom, id, &mut out);
    out
}

pub fn serialize_snapshot(snapshot: &NodeSnapshot) -> String {
    let mut out = String::new();
    write_snapshot(snapshot, &mut out);
    out
}

fn write_open_tag(tag: &str, attributes: &[(String, String)], out: &mut String) {
    out.push('<');
    out.push_str(tag);
    for (name, value) in attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attribute(value, out);
        out.push('"');
    }
    out.push('>');
}

fn write_close_tag(tag: &str, out: &mut String) {
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn write_node(dom: &Dom, id: NodeId, out: &mut String) {
    match dom.kind(id) {
        Some(NodeKind::Element { tag, attributes }) => {
            write_open_tag(tag, attributes, out);
            if is_void_element(tag) {
                return;
            }
            for child in dom.children(id) {
                write_node(dom, *child, out);
            }
            write_close_tag(tag, out);
        }
        Some(NodeKind::Text(text)) => escape_text(text, out),
        Some(NodeKind::Comment(text)) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        None => {}
    }
}

fn write_snapshot(snapshot: &NodeSnapshot, out: &mut String) {
    match snapshot {
        NodeSnapshot::Element {
            tag,
            attributes,
            children,
        } => {
            write_open_tag(tag, attributes, out);
            if is_void_element(tag) {
                return;
            }
            for child in children {
                write_snapshot(child, out);
            }
            write_close_tag(tag, out);
        }
        NodeSnapshot::Text { content } => escape_text(content, out),
        NodeSnapshot::Comment { content } => {
            out.push_str("<!--");
            out.push_str(content);
            out.push_str("-->");
        }
    }
}
