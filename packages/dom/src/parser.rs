//! Tree builder for the HTML subset.
//!
//! Lenient by construction: unmatched end tags are dropped, unclosed
//! elements are closed at end of input, `html`/`head`/`body` wrappers are
//! unwrapped so a full document and a body fragment parse the same way.

use crate::entities::decode_entities;
use crate::error::{DomResult, ParseError};
use crate::lexer::{tokenize, HtmlToken};
use crate::node::is_void_element;
use crate::{Dom, NodeId};

pub type ParseResult<T> = Result<T, ParseError>;

/// Parses `source` into detached top-level nodes of `dom`
pub fn parse_fragment(dom: &mut Dom, source: &str) -> ParseResult<Vec<NodeId>> {
    let tokens = tokenize(source).map_err(ParseError::lexer_error)?;
    let mut builder = TreeBuilder::new(dom);

    for spanned in tokens {
        match spanned.token {
            HtmlToken::Text(text) => builder.text(&decode_entities(text)),
            HtmlToken::Lt => builder.text("<"),
            HtmlToken::Comment(raw) => {
                let content = raw
                    .strip_prefix("<!--")
                    .and_then(|s| s.strip_suffix("-->"))
                    .unwrap_or_default();
                builder.comment(content);
            }
            HtmlToken::Doctype => {}
            HtmlToken::StartTag(raw) => {
                let (tag, attributes) = scan_start_tag(raw, spanned.start)?;
                builder.start_tag(&tag, attributes);
            }
            HtmlToken::EndTag(raw) => {
                let name = raw[2..raw.len() - 1].trim().to_ascii_lowercase();
                builder.end_tag(&name);
            }
        }
    }

    Ok(builder.finish())
}

/// Parses `source` and appends the result to `parent` as a single change
pub fn parse_into(dom: &mut Dom, parent: NodeId, source: &str) -> DomResult<Vec<NodeId>> {
    let nodes = parse_fragment(dom, source)?;
    dom.insert_all(parent, &nodes, None)?;
    Ok(nodes)
}

/// Fresh document whose body holds `source`
pub fn parse_document(source: &str) -> DomResult<Dom> {
    let mut dom = Dom::new();
    let body = dom.body();
    parse_into(&mut dom, body, source)?;
    Ok(dom)
}

struct TreeBuilder<'a> {
    dom: &'a mut Dom,
    roots: Vec<NodeId>,
    open: Vec<NodeId>,
    pending_text: String,
}

impl<'a> TreeBuilder<'a> {
    fn new(dom: &'a mut Dom) -> Self {
        Self {
            dom,
            roots: Vec::new(),
            open: Vec::new(),
            pending_text: String::new(),
        }
    }

    fn attach(&mut self, node: NodeId) {
        match self.open.last() {
            // Open elements are detached, so this never produces records
            Some(&parent) => {
                let _ = self.dom.append_child(parent, node);
            }
            None => self.roots.push(node),
        }
    }

    fn flush_text(&mut self) {
        if self.pending_text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.pending_text);
        let node = self.dom.create_text(text);
        self.attach(node);
    }

    fn text(&mut self, text: &str) {
        self.pending_text.push_str(text);
    }

    fn comment(&mut self, content: &str) {
        self.flush_text();
        let node = self.dom.create_comment(content);
        self.attach(node);
    }

    fn start_tag(&mut self, tag: &str, attributes: Vec<(String, String)>) {
        if matches!(tag, "html" | "head" | "body") {
            return;
        }
        self.flush_text();
        let node = self.dom.create_element_with(tag, attributes);
        self.attach(node);
        if !is_void_element(tag) {
            self.open.push(node);
        }
    }

    fn end_tag(&mut self, tag: &str) {
        if matches!(tag, "html" | "head" | "body") {
            return;
        }
        let Some(depth) = self
            .open
            .iter()
            .rposition(|open| self.dom.tag(*open) == Some(tag))
        else {
            return;
        };
        self.flush_text();
        self.open.truncate(depth);
    }

    fn finish(mut self) -> Vec<NodeId> {
        self.flush_text();
        self.roots
    }
}

/// Splits `<tag a="1" b c=d>` into a lowercase tag name and attributes
fn scan_start_tag(raw: &str, pos: usize) -> ParseResult<(String, Vec<(String, String)>)> {
    let inner = raw
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .ok_or_else(|| ParseError::malformed_tag(pos, "missing angle brackets"))?;

    let name_end = inner
        .find(|c: char| c.is_ascii_whitespace() || c == '/')
        .unwrap_or(inner.len());
    let tag = inner[..name_end].to_ascii_lowercase();
    if tag.is_empty() {
        return Err(ParseError::malformed_tag(pos, "empty tag name"));
    }

    let mut attributes = Vec::new();
    let mut rest = &inner[name_end..];
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '/');
        if rest.is_empty() {
            break;
        }

        let name_len = rest
            .find(|c: char| c.is_ascii_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let name = rest[..name_len].to_ascii_lowercase();
        rest = rest[name_len..].trim_start();

        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let (value, remaining) = scan_attribute_value(after_eq)
                .ok_or_else(|| ParseError::malformed_tag(pos, format!("unterminated value for {name}")))?;
            rest = remaining;
            decode_entities(value)
        } else {
            String::new()
        };

        if !name.is_empty() && !attributes.iter().any(|(existing, _)| *existing == name) {
            attributes.push((name, value));
        }
    }

    Ok((tag, attributes))
}

fn scan_attribute_value(input: &str) -> Option<(&str, &str)> {
    match input.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let body = &input[1..];
            let end = body.find(quote)?;
            Some((&body[..end], &body[end + 1..]))
        }
        Some(_) => {
            let end = input
                .find(|c: char| c.is_ascii_whitespace())
                .unwrap_or(input.len());
            Some((&input[..end], &input[end..]))
        }
        None => Some(("", "")),
    }
}
