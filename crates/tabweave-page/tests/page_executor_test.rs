use std::collections::BTreeMap;
use tabweave_common::codec;
use tabweave_common::protocol::{
    Action, ActionKind, LogLevel, PageRequest, Variable,
};
use tabweave_common::value::Value;
use tabweave_page::channel::spawn_page;
use tabweave_page::dom::{NodeId, StaticDom};
use tabweave_page::executor::PageExecutor;
use tabweave_page::selector::selector_for_node;

fn sample_dom() -> (StaticDom, NodeId, NodeId) {
    let mut dom = StaticDom::new();
    let html = dom.add_element(None, "html", &[]);
    let body = dom.add_element(Some(html), "body", &[]);
    let form = dom.add_element(Some(body), "form", &[("id", "login")]);
    let input = dom.add_element(Some(form), "input", &[("name", "user")]);
    dom.make_text_input(input, "");
    let button = dom.add_element(Some(form), "button", &[]);
    dom.set_text(button, "Sign in");
    (dom, input, button)
}

fn request(
    kind: ActionKind,
    inputs: Vec<Variable>,
    outputs: Vec<Variable>,
    context: Vec<(&str, Value)>,
) -> PageRequest {
    let mut serialized = BTreeMap::new();
    for (name, value) in context {
        serialized.insert(name.to_string(), codec::encode(&value).unwrap());
    }
    PageRequest {
        action: Action {
            kind,
            inputs,
            outputs,
        },
        context: serialized,
        tab_id: 7,
    }
}

fn var(original_name: &str, name: &str, ty: &str) -> Variable {
    Variable::new(original_name, name, ty)
}

#[test]
fn find_marks_labels_and_counts() {
    let (dom, input, _) = sample_dom();
    let selector = selector_for_node(&dom, input, "user box", "https://example.com");

    let mut executor = PageExecutor::new(dom);
    let response = executor.execute(&request(
        ActionKind::FindElementsBySelector,
        vec![var("Selector", "s", "selector")],
        vec![
            var("Elements", "els", "elements"),
            var("Count", "c", "number"),
        ],
        vec![("s", Value::Selector(selector))],
    ));

    let elements = codec::decode("elements", &response.action_outputs["els"]).unwrap();
    let handles = elements.as_elements().unwrap();
    assert_eq!(handles.len(), 1);
    assert_eq!(handles[0].tab_id, 7);

    let count = codec::decode("number", &response.action_outputs["c"]).unwrap();
    assert_eq!(count.as_number(), Some(1.0));

    assert!(executor.dom().node(4).unwrap().marked);
}

#[test]
fn labeled_elements_can_be_clicked_and_read() {
    let (dom, _, button) = sample_dom();
    let selector = selector_for_node(&dom, button, "sign in", "https://example.com");

    let mut executor = PageExecutor::new(dom);
    let found = executor.execute(&request(
        ActionKind::FindElementBySelector,
        vec![var("Selector", "s", "selector")],
        vec![var("Element", "e", "element")],
        vec![("s", Value::Selector(selector))],
    ));
    let element = codec::decode("element", &found.action_outputs["e"]).unwrap();

    let clicked = executor.execute(&request(
        ActionKind::ClickElement,
        vec![var("Element", "e", "element")],
        vec![],
        vec![("e", element.clone())],
    ));
    assert!(clicked
        .action_logs
        .iter()
        .any(|log| log.level == LogLevel::Success));
    assert_eq!(executor.dom().node(5).unwrap().clicks, 1);

    let read = executor.execute(&request(
        ActionKind::ReadElementText,
        vec![var("Element", "e", "element")],
        vec![var("Element Text", "txt", "string")],
        vec![("e", element)],
    ));
    let text = codec::decode("string", &read.action_outputs["txt"]).unwrap();
    assert_eq!(text.as_str(), Some("Sign in"));
}

#[test]
fn writing_only_lands_on_text_inputs() {
    let (dom, input, button) = sample_dom();
    let input_selector = selector_for_node(&dom, input, "user box", "https://example.com");
    let button_selector = selector_for_node(&dom, button, "sign in", "https://example.com");

    let mut executor = PageExecutor::new(dom);

    let found = executor.execute(&request(
        ActionKind::FindElementBySelector,
        vec![var("Selector", "s", "selector")],
        vec![var("Element", "e", "element")],
        vec![("s", Value::Selector(input_selector))],
    ));
    let element = codec::decode("element", &found.action_outputs["e"]).unwrap();

    let wrote = executor.execute(&request(
        ActionKind::WriteElementText,
        vec![var("Element", "e", "element"), var("Text", "t", "string")],
        vec![var("Is Input", "ii", "boolean")],
        vec![("e", element), ("t", Value::String("admin".into()))],
    ));
    let is_input = codec::decode("boolean", &wrote.action_outputs["ii"]).unwrap();
    assert_eq!(is_input.as_bool(), Some(true));
    assert_eq!(
        executor.dom().node(4).unwrap().value.as_deref(),
        Some("admin")
    );

    // A button takes no text; the flag reports it and nothing is written.
    let found = executor.execute(&request(
        ActionKind::FindElementBySelector,
        vec![var("Selector", "s", "selector")],
        vec![var("Element", "e", "element")],
        vec![("s", Value::Selector(button_selector))],
    ));
    let element = codec::decode("element", &found.action_outputs["e"]).unwrap();
    let wrote = executor.execute(&request(
        ActionKind::WriteElementText,
        vec![var("Element", "e", "element"), var("Text", "t", "string")],
        vec![var("Is Input", "ii", "boolean")],
        vec![("e", element), ("t", Value::String("nope".into()))],
    ));
    let is_input = codec::decode("boolean", &wrote.action_outputs["ii"]).unwrap();
    assert_eq!(is_input.as_bool(), Some(false));
}

#[test]
fn stale_labels_and_unknown_opcodes_answer_defensively() {
    let (dom, _, _) = sample_dom();
    let mut executor = PageExecutor::new(dom);

    let response = executor.execute(&request(
        ActionKind::ClickElement,
        vec![var("Element", "e", "element")],
        vec![],
        vec![(
            "e",
            Value::Element(tabweave_common::value::ElementHandle {
                tab_id: 7,
                element_id: 999,
            }),
        )],
    ));
    assert!(response
        .action_logs
        .iter()
        .any(|log| log.level == LogLevel::Error && log.message.contains("Unknown element label")));

    let response = executor.execute(&request(
        ActionKind::Custom("SpinAround".into()),
        vec![],
        vec![],
        vec![],
    ));
    assert!(response
        .action_logs
        .iter()
        .any(|log| log.level == LogLevel::Warning && log.message.contains("No page handler")));
}

#[test]
fn missing_output_declarations_warn_but_keep_the_side_effect() {
    let (dom, input, _) = sample_dom();
    let selector = selector_for_node(&dom, input, "user box", "https://example.com");

    let mut executor = PageExecutor::new(dom);
    let response = executor.execute(&request(
        ActionKind::FindElementsBySelector,
        vec![var("Selector", "s", "selector")],
        vec![],
        vec![("s", Value::Selector(selector))],
    ));

    assert!(response.action_outputs.is_empty());
    assert_eq!(
        response
            .action_logs
            .iter()
            .filter(|log| log.level == LogLevel::Warning)
            .count(),
        2
    );
    // The match was still highlighted.
    assert!(executor.dom().node(4).unwrap().marked);
}

#[tokio::test]
async fn the_channel_round_trips_requests_and_replies() {
    let (dom, input, _) = sample_dom();
    let selector = selector_for_node(&dom, input, "user box", "https://example.com");

    let (handle, task) = spawn_page(dom);
    let response = handle
        .request(request(
            ActionKind::FindElementBySelector,
            vec![var("Selector", "s", "selector")],
            vec![var("Element", "e", "element")],
            vec![("s", Value::Selector(selector))],
        ))
        .await
        .unwrap();
    assert!(response.action_outputs.contains_key("e"));

    drop(handle);
    let executor = task.await.unwrap();
    assert!(executor.dom().node(4).unwrap().marked);
}
