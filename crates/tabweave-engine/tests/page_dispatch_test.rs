//! End-to-end dispatch across the page boundary: the engine serializes the
//! context, the real in-page executor works against an in-memory DOM, and
//! the reply outputs are decoded back into the run.

mod common;

use common::{MockBrowser, action, pipeline, var};
use tabweave_common::codec;
use tabweave_common::protocol::{ActionKind, LogLevel};
use tabweave_common::value::Value;
use tabweave_engine::executor::SequenceRunner;
use tabweave_page::channel::spawn_page;
use tabweave_page::dom::{NodeId, StaticDom};
use tabweave_page::selector::selector_for_node;

/// html > body > div#main > input(q), plus a second link row.
fn sample_dom() -> (StaticDom, NodeId, NodeId, NodeId) {
    let mut dom = StaticDom::new();
    let html = dom.add_element(None, "html", &[]);
    let body = dom.add_element(Some(html), "body", &[]);
    let main = dom.add_element(Some(body), "div", &[("id", "main")]);
    let input = dom.add_element(Some(main), "input", &[("name", "q")]);
    dom.make_text_input(input, "orig");
    let link_a = dom.add_element(Some(main), "a", &[("href", "/a")]);
    let link_b = dom.add_element(Some(main), "a", &[("href", "/b")]);
    (dom, input, link_a, link_b)
}

fn browser_with_page(dom: StaticDom) -> (MockBrowser, tokio::task::JoinHandle<tabweave_page::executor::PageExecutor<StaticDom>>) {
    let (handle, task) = spawn_page(dom);
    let mut browser = MockBrowser::new();
    browser.windows.push(1);
    browser.seed_tab(1, 1, "https://example.com");
    browser.active = Some(1);
    browser.page = Some(handle);
    (browser, task)
}

#[tokio::test]
async fn find_click_read_write_round_trips_through_the_page() {
    let (dom, input, _, _) = sample_dom();
    let selector = selector_for_node(&dom, input, "search box", "https://example.com");
    let encoded_selector = codec::encode(&Value::Selector(selector.clone())).unwrap();

    let actions = vec![
        action(
            ActionKind::FindElementBySelector,
            vec![var("Selector", "s", "selector")],
            vec![var("Element", "e", "element")],
        ),
        action(ActionKind::ClickElement, vec![var("Element", "e", "element")], vec![]),
        action(
            ActionKind::ReadElementText,
            vec![var("Element", "e", "element")],
            vec![var("Element Text", "txt", "string")],
        ),
        action(
            ActionKind::WriteElementText,
            vec![var("Element", "e", "element"), var("Text", "wt", "string")],
            vec![var("Is Input", "ii", "boolean")],
        ),
    ];
    let mut pipeline = pipeline(actions, &[("wt", "\"hello\"")]);
    pipeline.context.insert("s".to_string(), encoded_selector.clone());

    let (browser, task) = browser_with_page(dom);
    let mut runner = SequenceRunner::new(browser);
    let result = runner.run(&pipeline).await;

    assert_eq!(result.results.len(), 4);
    assert!(result.results.iter().all(|r| !r.fatal));

    // The element label carries its owning tab.
    let element = codec::decode("element", &result.results[0].action_outputs["e"]).unwrap();
    assert_eq!(element.as_element().map(|e| e.tab_id), Some(1));

    // An input's value wins over rendered text.
    let text = codec::decode("string", &result.results[2].action_outputs["txt"]).unwrap();
    assert_eq!(text.as_str(), Some("orig"));

    let is_input = codec::decode("boolean", &result.results[3].action_outputs["ii"]).unwrap();
    assert_eq!(is_input.as_bool(), Some(true));

    // The selector crossed the boundary byte-identical.
    let browser = runner.browser_mut();
    assert_eq!(browser.page_requests[0].context["s"], encoded_selector);
    assert!(browser.page_requests.iter().all(|r| r.tab_id == 1));
    assert_eq!(browser.active, Some(1));

    drop(runner);
    let executor = task.await.unwrap();
    let dom = executor.into_dom();
    let node = dom.node(4).unwrap();
    assert_eq!(node.clicks, 1);
    assert_eq!(node.value.as_deref(), Some("hello"));
    assert!(node.marked);
}

#[tokio::test]
async fn find_elements_reports_labels_and_count() {
    let (dom, _, link_a, _) = sample_dom();
    let selector = selector_for_node(&dom, link_a, "links", "https://example.com");
    let encoded = codec::encode(&Value::Selector(selector)).unwrap();

    let actions = vec![action(
        ActionKind::FindElementsBySelector,
        vec![var("Selector", "s", "selector")],
        vec![var("Elements", "els", "elements"), var("Count", "c", "number")],
    )];
    let mut pipeline = pipeline(actions, &[]);
    pipeline.context.insert("s".to_string(), encoded);

    let (browser, task) = browser_with_page(dom);
    let mut runner = SequenceRunner::new(browser);
    let result = runner.run(&pipeline).await;

    let record = &result.results[0];
    assert!(!record.fatal);

    let elements = codec::decode("elements", &record.action_outputs["els"]).unwrap();
    let handles = elements.as_elements().unwrap();
    assert_eq!(handles.len(), 2);
    assert!(handles.iter().all(|h| h.tab_id == 1));

    let count = codec::decode("number", &record.action_outputs["c"]).unwrap();
    assert_eq!(count.as_number(), Some(2.0));

    drop(runner);
    let executor = task.await.unwrap();
    let dom = executor.into_dom();
    assert!(dom.node(5).unwrap().marked);
    assert!(dom.node(6).unwrap().marked);
}

#[tokio::test]
async fn unrecognized_opcodes_are_forwarded_and_answered_with_warnings() {
    let (dom, _, _, _) = sample_dom();
    let actions = vec![
        action(
            ActionKind::Custom("ScrollToBottom".into()),
            vec![],
            vec![var("Result", "r", "string")],
        ),
        action(
            ActionKind::CreateWindow,
            vec![],
            vec![var("Window", "w", "window")],
        ),
    ];
    let pipeline = pipeline(actions, &[]);

    let (browser, _task) = browser_with_page(dom);
    let mut runner = SequenceRunner::new(browser);
    let result = runner.run(&pipeline).await;

    // The unknown opcode is not fatal; the sequence keeps going.
    assert_eq!(result.results.len(), 2);
    let record = &result.results[0];
    assert!(!record.fatal);
    assert!(record
        .action_logs
        .iter()
        .any(|log| log.level == LogLevel::Warning && log.message.contains("No page handler")));
    assert!(record
        .action_logs
        .iter()
        .any(|log| log.level == LogLevel::Warning && log.message.contains("not provided by the page")));
}

#[tokio::test]
async fn find_without_a_selector_declaration_never_reaches_the_page() {
    let (dom, _, _, _) = sample_dom();
    let actions = vec![action(
        ActionKind::FindElementBySelector,
        vec![],
        vec![var("Element", "e", "element")],
    )];
    let pipeline = pipeline(actions, &[]);

    let (browser, _task) = browser_with_page(dom);
    let mut runner = SequenceRunner::new(browser);
    let result = runner.run(&pipeline).await;

    let record = &result.results[0];
    assert!(record.fatal);
    assert_eq!(record.action_logs[0].level, LogLevel::Error);
    assert!(runner.browser_mut().page_requests.is_empty());
}
