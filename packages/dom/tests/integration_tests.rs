//! Integration tests for dom crate

use markweave_dom::{parse_document, parse_fragment, serialize_children, Dom, NodeSnapshot, RecordKind};

#[test]
fn test_canonical_output_is_stable() {
    let source = r#"<h1 id="t">Title &amp; more</h1><p>a<br>b <em>c</em></p><!-- c --><ul><li>x</li></ul>"#;
    let first = parse_document(source).unwrap();
    let html = serialize_children(&first, first.body());
    let second = parse_document(&html).unwrap();

    assert_eq!(html, source);
    assert_eq!(serialize_children(&second, second.body()), html);
}

#[test]
fn test_snapshot_moves_between_documents() {
    let live = parse_document("<p>one <strong>two</strong></p>").unwrap();
    let p = live.children(live.body())[0];
    let snapshot = live.snapshot(p).unwrap();
    assert_eq!(snapshot.text_content(), "one two");

    let mut mirror = Dom::new();
    let copy = mirror.import(&snapshot);
    let body = mirror.body();
    mirror.append_child(body, copy).unwrap();
    assert_eq!(serialize_children(&mirror, body), "<p>one <strong>two</strong></p>");
}

#[test]
fn test_built_snapshot_serializes_like_parsed_html() {
    let built = NodeSnapshot::element("p")
        .with_attr("class", "x")
        .with_text("a")
        .with_child(NodeSnapshot::element("em").with_text("b"));

    let mut dom = Dom::new();
    let node = dom.import(&built);
    let body = dom.body();
    dom.append_child(body, node).unwrap();
    assert_eq!(serialize_children(&dom, body), r#"<p class="x">a<em>b</em></p>"#);
}

#[test]
fn test_observer_sees_only_its_subtree() {
    let mut dom = parse_document("<div><p>in</p></div><p>out</p>").unwrap();
    let body = dom.body();
    let root = dom.children(body)[0];
    let inside = dom.children(dom.children(root)[0])[0];
    let outside = dom.children(dom.children(body)[1])[0];

    dom.observe(root).unwrap();
    dom.set_text(outside, "OUT").unwrap();
    dom.set_text(inside, "IN").unwrap();

    let staged = parse_fragment(&mut dom, "<p>new <em>node</em></p>").unwrap();
    dom.insert_all(root, &staged, None).unwrap();

    let records = dom.take_records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].kind, RecordKind::CharacterData);
    assert_eq!(records[0].old_value.as_deref(), Some("in"));
    assert_eq!(records[1].kind, RecordKind::ChildList);
    assert_eq!(records[1].added_nodes, staged);
    assert!(!dom.has_pending_records());
}

#[test]
fn test_disconnect_returns_undelivered() {
    let mut dom = parse_document("<p>a</p><p>b</p>").unwrap();
    let body = dom.body();
    let second = dom.children(body)[1];

    dom.observe(body).unwrap();
    dom.detach(second).unwrap();
    let records = dom.disconnect();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].removed_nodes, vec![second]);
    assert_eq!(records[0].previous_sibling, Some(dom.children(body)[0]));
    assert!(!dom.is_observing());

    let first = dom.children(dom.children(body)[0])[0];
    dom.set_text(first, "x").unwrap();
    assert!(dom.take_records().is_empty());
}
