//! Integration tests for the daemon crate

use futures::future::{BoxFuture, FutureExt};
use markweave_daemon::dom::{NodeId, NodeSnapshot};
use markweave_daemon::{
    address_of, resolve, ActivationHandle, CaretDirective, ComponentId, Daemon, DaemonConfig,
    DaemonHandle, FlushState, HandlerOutcome, IgnoreScope, InlineMarkdown, Key, KeyContext, KeyOutcome,
    Operation, RenderContext, Selection, Surface, ViewHost,
};
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Leaves the surface exactly as the compiler left it
struct KeepView;

impl ViewHost for KeepView {
    fn finalize(&mut self, _ctx: RenderContext<'_>) {}
}

fn daemon(html: &str) -> Daemon {
    Daemon::from_html(DaemonConfig::default(), html).unwrap()
}

fn text_at(surface: &Surface, path: &[usize]) -> NodeId {
    let dom = surface.dom();
    path.iter()
        .fold(surface.root(), |node, index| dom.children(node)[*index])
}

// -------------------------------------------------------------------------
// Scenarios
// -------------------------------------------------------------------------

#[test]
fn test_typing_after_insert_is_one_text_op() {
    let mut daemon = daemon("");

    daemon
        .edit(|s| {
            let root = s.root();
            let dom = s.dom_mut();
            let p = dom.create_element("p");
            let text = dom.create_text("Hello");
            dom.append_child(p, text).unwrap();
            dom.append_child(root, p).unwrap();
        })
        .unwrap();
    let inserted = daemon.sync_now().unwrap();
    assert_eq!(inserted.operations.len(), 1);
    assert_eq!(inserted.operations[0].kind(), "ADD");

    daemon
        .edit(|s| {
            let text = text_at(s, &[0, 0]);
            s.dom_mut().insert_text(text, 5, "X").unwrap();
        })
        .unwrap();
    let typed = daemon.sync_now().unwrap();

    assert_eq!(
        typed.operations,
        vec![Operation::text("/p[1]/text()[1]".parse().unwrap(), "HelloX")]
    );
    assert_eq!(daemon.canonical_html(), "<p>HelloX</p>");
}

#[test]
fn test_insert_and_type_in_one_batch() {
    let mut daemon = daemon("");
    daemon
        .edit(|s| {
            let root = s.root();
            let dom = s.dom_mut();
            let p = dom.create_element("p");
            let text = dom.create_text("Hello");
            dom.append_child(p, text).unwrap();
            dom.append_child(root, p).unwrap();
            dom.insert_text(text, 5, "X").unwrap();
        })
        .unwrap();

    let report = daemon.sync_now().unwrap();
    let texts: Vec<_> = report
        .operations
        .iter()
        .filter(|op| op.kind() == "TEXT")
        .collect();
    assert_eq!(texts.len(), 1);
    assert_eq!(report.html, "<p>HelloX</p>");
}

#[test]
fn test_removing_second_paragraph() {
    let mut daemon = daemon("<p>A</p><p>B</p>");
    daemon
        .edit(|s| {
            let b = text_at(s, &[1]);
            s.dom_mut().detach(b).unwrap();
        })
        .unwrap();

    let report = daemon.sync_now().unwrap();
    assert_eq!(report.operations.len(), 1);
    match &report.operations[0] {
        Operation::Remove { parent, target } => {
            assert!(parent.is_root());
            assert_eq!(target.to_string(), "/p[2]");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(daemon.canonical_html(), "<p>A</p>");
    assert_eq!(daemon.surface().unwrap().html(), "<p>A</p>");
}

#[test]
fn test_ignore_once_then_captured() {
    let mut daemon = daemon("<p>a</p>").with_view(Box::new(KeepView));
    let node = text_at(daemon.surface().unwrap(), &[0, 0]);
    daemon.add_to_ignore(&[node], IgnoreScope::Once, false);

    daemon.edit(|s| s.dom_mut().set_text(node, "ab").unwrap()).unwrap();
    let first = daemon.sync_now().unwrap();
    assert!(first.operations.is_empty());
    assert_eq!(daemon.canonical_html(), "<p>a</p>");
    assert_eq!(daemon.ignore_registry().get(node), None);

    daemon.edit(|s| s.dom_mut().set_text(node, "abc").unwrap()).unwrap();
    let second = daemon.sync_now().unwrap();
    assert_eq!(
        second.operations,
        vec![Operation::text("/p[1]/text()[1]".parse().unwrap(), "abc")]
    );
    assert_eq!(daemon.canonical_html(), "<p>abc</p>");
}

#[test]
fn test_persistent_ignore_covers_descendants() {
    let mut daemon = daemon("<p>a</p><div><span>widget</span></div>");
    let widget = text_at(daemon.surface().unwrap(), &[1]);
    daemon.add_to_ignore(&[widget], IgnoreScope::Any, true);

    for round in 0..3 {
        daemon
            .edit(|s| {
                let label = text_at(s, &[1, 0, 0]);
                s.dom_mut().set_text(label, format!("state {round}")).unwrap();
                let text = text_at(s, &[0, 0]);
                s.dom_mut().set_text(text, format!("a{round}")).unwrap();
            })
            .unwrap();
        let report = daemon.sync_now().unwrap();
        assert_eq!(
            report.operations,
            vec![Operation::text("/p[1]/text()[1]".parse().unwrap(), format!("a{round}"))]
        );

        let surface = daemon.surface().unwrap();
        assert_eq!(text_at(surface, &[1]), widget);
        assert_eq!(
            surface.html(),
            format!("<p>a{round}</p><div><span>state {round}</span></div>")
        );
        assert_eq!(daemon.ignore_registry().len(), 1);
    }
    assert_eq!(daemon.canonical_html(), "<p>a2</p><div><span>widget</span></div>");
}

#[test]
fn test_ignore_entry_dropped_with_its_node() {
    let mut daemon = daemon("<p>a</p><div>widget</div>");
    let widget = text_at(daemon.surface().unwrap(), &[1]);
    daemon.add_to_ignore(&[widget], IgnoreScope::Any, true);

    daemon
        .add_to_operations(Operation::Remove {
            parent: "/".parse().unwrap(),
            target: "/div[1]".parse().unwrap(),
        })
        .unwrap();
    daemon.sync_now().unwrap();

    assert_eq!(daemon.surface().unwrap().html(), "<p>a</p>");
    assert!(daemon.ignore_registry().is_empty());
}

#[test]
fn test_arena_stays_bounded_over_many_flushes() {
    let mut daemon = daemon("<h1>T</h1><p>a</p>");
    let surface_len = daemon.surface().unwrap().dom().len();
    let mirror_len = daemon.mirror().unwrap().dom().len();

    for round in 0..500 {
        daemon
            .edit(|s| {
                let root = s.root();
                let dom = s.dom_mut();
                let p = dom.create_element("p");
                let text = dom.create_text(format!("line {round}"));
                dom.append_child(p, text).unwrap();
                dom.append_child(root, p).unwrap();
            })
            .unwrap();
        daemon.sync_now().unwrap();

        daemon
            .edit(|s| {
                let last = text_at(s, &[2]);
                s.dom_mut().detach(last).unwrap();
                let text = text_at(s, &[1, 0]);
                s.dom_mut().set_text(text, format!("a{round}")).unwrap();
            })
            .unwrap();
        daemon.sync_now().unwrap();
    }

    let surface = daemon.surface().unwrap().dom();
    let mirror = daemon.mirror().unwrap().dom();
    assert_eq!(surface.len(), surface_len);
    assert_eq!(mirror.len(), mirror_len);
    assert!(surface.capacity() <= surface_len + 4);
    assert!(mirror.capacity() <= mirror_len + 4);
    assert_eq!(daemon.canonical_html(), "<h1>T</h1><p>a499</p>");
}

// -------------------------------------------------------------------------
// Properties
// -------------------------------------------------------------------------

#[test]
fn test_idempotent_flush() {
    let mut daemon = daemon("<p>a</p>");
    assert!(daemon.sync_now().is_none());

    daemon
        .edit(|s| {
            let text = text_at(s, &[0, 0]);
            s.dom_mut().set_text(text, "b").unwrap();
        })
        .unwrap();
    assert!(daemon.sync_now().is_some());
    assert!(daemon.sync_now().is_none());
    assert_eq!(daemon.history().len(), 2);
}

#[test]
fn test_sequential_text_edits_collapse() {
    let mut daemon = daemon("<p>a</p>");
    daemon
        .edit(|s| {
            let text = text_at(s, &[0, 0]);
            s.dom_mut().insert_text(text, 1, "b").unwrap();
            s.dom_mut().insert_text(text, 2, "c").unwrap();
        })
        .unwrap();

    let report = daemon.sync_now().unwrap();
    assert_eq!(
        report.operations,
        vec![Operation::text("/p[1]/text()[1]".parse().unwrap(), "abc")]
    );
}

#[test]
fn test_address_round_trip_after_edits() {
    let mut daemon = daemon(r#"<h1 id="top">T</h1><p>a<em>b</em>c</p><ul><li>1</li><li>2</li></ul>"#);
    daemon
        .edit(|s| {
            let ul = text_at(s, &[2]);
            let dom = s.dom_mut();
            let li = dom.create_element("li");
            dom.append_child(ul, li).unwrap();
        })
        .unwrap();
    daemon.sync_now();

    let surface = daemon.surface().unwrap();
    let dom = surface.dom();
    let root = surface.root();
    for node in dom.descendants(root) {
        let address = address_of(dom, root, node).unwrap();
        assert_eq!(resolve(dom, root, &address), Some(node), "{address}");
    }
}

/// Small deterministic generator so failures are reproducible
struct Rng(u64);

impl Rng {
    fn below(&mut self, n: usize) -> usize {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 % n.max(1) as u64) as usize
    }

    fn pick(&mut self, items: &[NodeId]) -> Option<NodeId> {
        if items.is_empty() {
            None
        } else {
            Some(items[self.below(items.len())])
        }
    }
}

fn random_edit(surface: &mut Surface, rng: &mut Rng) {
    let root = surface.root();
    let dom = surface.dom_mut();
    let blocks = dom.children(root).to_vec();
    let texts: Vec<NodeId> = dom
        .descendants(root)
        .into_iter()
        .filter(|n| dom.is_text(*n))
        .collect();

    match rng.below(8) {
        0 => {
            if let Some(text) = rng.pick(&texts) {
                dom.set_text(text, format!("t{}", rng.below(100))).unwrap();
            }
        }
        1 => {
            if let Some(text) = rng.pick(&texts) {
                let len = dom.text(text).map_or(0, |t| t.chars().count());
                let offset = rng.below(len + 1);
                dom.insert_text(text, offset, "+").unwrap();
            }
        }
        2 => {
            let p = dom.create_element("p");
            let text = dom.create_text(format!("new {}", rng.below(10)));
            dom.append_child(p, text).unwrap();
            let before = blocks.get(rng.below(blocks.len() + 1)).copied();
            dom.insert_before(root, p, before).unwrap();
        }
        3 => {
            if blocks.len() > 1 {
                let block = blocks[rng.below(blocks.len())];
                dom.detach(block).unwrap();
            }
        }
        4 => {
            if blocks.len() > 1 {
                let moved = blocks[rng.below(blocks.len())];
                let others: Vec<NodeId> = blocks.iter().copied().filter(|b| *b != moved).collect();
                let before = rng.pick(&others);
                dom.insert_before(root, moved, before).unwrap();
            }
        }
        5 => {
            let long: Vec<NodeId> = texts
                .iter()
                .copied()
                .filter(|t| dom.text(*t).map_or(0, |s| s.chars().count()) >= 2)
                .collect();
            if let Some(text) = rng.pick(&long) {
                dom.split_text(text, 1).unwrap();
            }
        }
        6 => {
            if let Some(block) = rng.pick(&blocks) {
                dom.set_text_content(block, "reset").unwrap();
            }
        }
        _ => {
            let list = blocks.iter().copied().find(|b| dom.tag(*b) == Some("ul"));
            if let Some(list) = list {
                let li = dom.create_element("li");
                let text = dom.create_text("item");
                dom.append_child(li, text).unwrap();
                dom.append_child(list, li).unwrap();
            }
        }
    }
}

#[test]
fn test_rollback_invariant_and_replay_equivalence() {
    let source = "<h1>Title</h1><p>alpha <em>beta</em> gamma</p><ul><li>one</li><li>two</li></ul><p>omega</p>";

    for seed in 1..=60u64 {
        let mut daemon = daemon(source).with_view(Box::new(KeepView));
        let mut rng = Rng(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        let pre = daemon.surface().unwrap().html();

        let edits = 1 + (seed as usize % 8);
        daemon
            .edit(|s| {
                for _ in 0..edits {
                    random_edit(s, &mut rng);
                }
            })
            .unwrap();
        let post = daemon.surface().unwrap().html();

        let report = daemon.sync_now();
        let surface_after = daemon.surface().unwrap().html();
        assert_eq!(surface_after, pre, "rollback, seed {seed}");

        match report {
            Some(report) => {
                assert_eq!(report.skipped, 0, "seed {seed}");
                assert_eq!(report.html, post, "replay, seed {seed}");
            }
            None => assert_eq!(post, pre, "seed {seed}"),
        }
    }
}

// -------------------------------------------------------------------------
// Inline Markdown
// -------------------------------------------------------------------------

/// Turns `**x**` into `<strong>x</strong>`
struct Strong;

impl InlineMarkdown for Strong {
    fn reparse(&self, text: &str) -> Option<Vec<NodeSnapshot>> {
        let start = text.find("**")?;
        let len = text[start + 2..].find("**")?;
        let mut nodes = Vec::new();
        if start > 0 {
            nodes.push(NodeSnapshot::text(&text[..start]));
        }
        nodes.push(NodeSnapshot::element("strong").with_text(&text[start + 2..start + 2 + len]));
        let rest = &text[start + len + 4..];
        if !rest.is_empty() {
            nodes.push(NodeSnapshot::text(rest));
        }
        Some(nodes)
    }
}

#[test]
fn test_inline_markdown_reparsed_after_replay() {
    let mut daemon = daemon("<p>bold</p>").with_inline_markdown(Arc::new(Strong));
    daemon
        .edit(|s| {
            let text = text_at(s, &[0, 0]);
            s.dom_mut().set_text(text, "a **bold** move").unwrap();
        })
        .unwrap();

    let report = daemon.sync_now().unwrap();
    let kinds: Vec<_> = report.operations.iter().map(Operation::kind).collect();
    assert_eq!(kinds, vec!["TEXT", "REPLACE"]);
    assert_eq!(report.html, "<p>a <strong>bold</strong> move</p>");
    assert_eq!(daemon.surface().unwrap().html(), report.html);
}

// -------------------------------------------------------------------------
// Async handle
// -------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_debouncer_flushes_after_quiet_period() {
    let (handle, task) = DaemonHandle::spawn(daemon("<p>a</p>"));

    handle
        .edit(|s| {
            let text = text_at(s, &[0, 0]);
            s.dom_mut().set_text(text, "ab").unwrap();
        })
        .await
        .unwrap();

    sleep(Duration::from_millis(299)).await;
    assert_eq!(handle.with(|d| d.canonical_html()).await, "<p>a</p>");

    sleep(Duration::from_millis(10)).await;
    assert_eq!(handle.with(|d| d.canonical_html()).await, "<p>ab</p>");

    handle.dispose();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_new_edits_restart_debounce() {
    let (handle, _task) = DaemonHandle::spawn(daemon("<p>a</p>"));
    let type_char = |c: &'static str| {
        let handle = handle.clone();
        async move {
            handle
                .edit(move |s| {
                    let text = text_at(s, &[0, 0]);
                    let len = s.dom().text(text).map_or(0, |t| t.chars().count());
                    s.dom_mut().insert_text(text, len, c).unwrap();
                })
                .await
                .unwrap();
        }
    };

    type_char("b").await;
    sleep(Duration::from_millis(200)).await;
    type_char("c").await;
    sleep(Duration::from_millis(200)).await;
    assert_eq!(handle.with(|d| d.canonical_html()).await, "<p>a</p>");

    sleep(Duration::from_millis(150)).await;
    assert_eq!(handle.with(|d| d.canonical_html()).await, "<p>abc</p>");
    assert_eq!(handle.with(|d| d.history().len()).await, 2);
}

#[tokio::test(start_paused = true)]
async fn test_debouncer_parks_while_unmounted() {
    let (handle, task) = DaemonHandle::spawn(daemon("<p>a</p>"));
    handle
        .with(|d| {
            d.unmount();
            d.add_to_operations(Operation::text("/p[1]/text()[1]".parse().unwrap(), "b"))
                .unwrap();
        })
        .await;
    handle.notify();

    sleep(Duration::from_secs(5)).await;
    let (state, deadline, html) = handle
        .with(|d| (d.flush_state(), d.next_deadline(), d.canonical_html()))
        .await;
    assert_eq!(state, FlushState::Idle);
    assert_eq!(deadline, None);
    assert_eq!(html, "<p>a</p>");

    handle.with(|d| d.mount().unwrap()).await;
    handle.notify();
    sleep(Duration::from_millis(350)).await;
    assert_eq!(handle.with(|d| d.canonical_html()).await, "<p>b</p>");

    handle.dispose();
    task.await.unwrap();
}

#[tokio::test]
async fn test_double_sync_now_flushes_each_batch_once() {
    let handle = DaemonHandle::new(daemon("<p>a</p>"));
    let set = |value: &'static str| {
        move |s: &mut Surface| {
            let text = text_at(s, &[0, 0]);
            s.dom_mut().set_text(text, value).unwrap();
        }
    };

    handle.edit(set("b")).await.unwrap();
    let (first, second) = tokio::join!(handle.sync_now(), async {
        handle.edit(set("c")).await.unwrap();
        handle.sync_now().await
    });

    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.operations.len(), 1);
    assert_eq!(second.operations.len(), 1);
    assert_ne!(first.operations, second.operations);
    assert!(handle.sync_now().await.is_none());
    assert_eq!(handle.with(|d| d.canonical_html()).await, "<p>c</p>");
}

#[tokio::test]
async fn test_concurrent_sync_now_runs_one_flush() {
    let handle = DaemonHandle::new(daemon("<p>a</p>"));
    handle
        .edit(|s| {
            let text = text_at(s, &[0, 0]);
            s.dom_mut().set_text(text, "b").unwrap();
        })
        .await
        .unwrap();

    let a = tokio::spawn({
        let handle = handle.clone();
        async move { handle.sync_now().await }
    });
    let b = tokio::spawn({
        let handle = handle.clone();
        async move { handle.sync_now().await }
    });
    let reports: Vec<_> = [a.await.unwrap(), b.await.unwrap()]
        .into_iter()
        .flatten()
        .collect();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].operations.len(), 1);
}

/// Splits the current paragraph at the caret
struct ParagraphSplitter;

impl ActivationHandle for ParagraphSplitter {
    fn enter(&self, ctx: KeyContext) -> BoxFuture<'static, HandlerOutcome> {
        async move {
            let Ok(selection) = ctx.require_selection() else {
                return HandlerOutcome::Unhandled;
            };
            let head: String = ctx.line_text.chars().take(ctx.line_offset).collect();
            let tail: String = ctx.line_text.chars().skip(ctx.line_offset).collect();

            HandlerOutcome::Handled {
                operations: vec![
                    Operation::text(selection.focus.clone(), head),
                    Operation::Add {
                        parent: "/".parse().unwrap(),
                        node: NodeSnapshot::element("p").with_text(tail),
                        before: Some("/p[2]".parse().unwrap()),
                    },
                ],
                caret: Some(CaretDirective::NextLine),
            }
        }
        .boxed()
    }
}

#[tokio::test]
async fn test_enter_delegates_to_top_handle() {
    let handle = DaemonHandle::new(daemon("<p>HelloWorld</p><p>B</p>"));
    handle
        .with(|d| {
            d.activation().activate(ComponentId(7), Arc::new(ParagraphSplitter));
            let surface = d.surface_mut().unwrap();
            let text = text_at(surface, &[0, 0]);
            surface.set_selection(Some(Selection::caret(text, 5)));
        })
        .await;

    assert_eq!(
        handle.handle_key(Key::Enter).await,
        KeyOutcome::Handled { rejected: 0 }
    );

    let (html, status) = handle
        .with(|d| (d.canonical_html(), d.selection_status()))
        .await;
    assert_eq!(html, "<p>Hello</p><p>World</p><p>B</p>");
    let status = status.unwrap();
    assert_eq!(status.focus.to_string(), "/p[2]/text()[1]");
    assert_eq!(status.focus_offset, 0);
}

/// Tries to delete the whole document on Enter
struct RootRemover;

impl ActivationHandle for RootRemover {
    fn enter(&self, _ctx: KeyContext) -> BoxFuture<'static, HandlerOutcome> {
        async move {
            HandlerOutcome::Handled {
                operations: vec![
                    Operation::Remove {
                        parent: "/".parse().unwrap(),
                        target: "/".parse().unwrap(),
                    },
                    Operation::text("/p[1]/text()[1]".parse().unwrap(), "kept"),
                ],
                caret: None,
            }
        }
        .boxed()
    }
}

#[tokio::test]
async fn test_rejected_handler_operations_are_counted() {
    let handle = DaemonHandle::new(daemon("<p>ab</p>"));
    handle
        .with(|d| {
            d.activation().activate(ComponentId(3), Arc::new(RootRemover));
            let surface = d.surface_mut().unwrap();
            let text = text_at(surface, &[0, 0]);
            surface.set_selection(Some(Selection::caret(text, 1)));
        })
        .await;

    assert_eq!(
        handle.handle_key(Key::Enter).await,
        KeyOutcome::Handled { rejected: 1 }
    );
    assert_eq!(handle.with(|d| d.canonical_html()).await, "<p>kept</p>");
}

#[tokio::test]
async fn test_keys_without_handler_or_selection() {
    let handle = DaemonHandle::new(daemon("<p>ab</p>"));
    assert_eq!(handle.handle_key(Key::Enter).await, KeyOutcome::Prevented);

    handle
        .with(|d| {
            let surface = d.surface_mut().unwrap();
            let text = text_at(surface, &[0, 0]);
            surface.set_selection(Some(Selection::caret(text, 1)));
        })
        .await;
    assert_eq!(handle.handle_key(Key::Enter).await, KeyOutcome::Native);
    assert_eq!(handle.handle_key(Key::Backspace).await, KeyOutcome::Native);
}
