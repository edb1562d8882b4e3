//! The document surface the in-page executor works against, and an
//! in-memory implementation of it for tests and local development.

use std::collections::BTreeMap;

pub type NodeId = u64;

/// Minimal view of the live document: enough to relocate elements from a
/// compiled selector, read and write their content, and highlight matches.
pub trait Dom {
    /// Elements matching a compiled selector string, in document order.
    fn query_all(&self, selector: &str) -> Vec<NodeId>;

    fn tag(&self, node: NodeId) -> Option<String>;

    /// Attributes in document order.
    fn attributes(&self, node: NodeId) -> Vec<(String, String)>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Rendered text content of the element.
    fn text(&self, node: NodeId) -> String;

    /// Current value, for elements that carry one.
    fn input_value(&self, node: NodeId) -> Option<String>;

    fn is_text_input(&self, node: NodeId) -> bool;

    /// Write a value into a text-input-capable element. Returns false if
    /// the element cannot take one.
    fn set_input_value(&mut self, node: NodeId, value: &str) -> bool;

    fn click(&mut self, node: NodeId);

    /// Visually highlight a matched element.
    fn mark(&mut self, node: NodeId);
}

#[derive(Debug, Default)]
pub struct StaticNode {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub value: Option<String>,
    pub text_input: bool,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub clicks: u32,
    pub marked: bool,
}

/// An in-memory DOM arena. Nodes are created top-down, so ascending ids are
/// document order.
#[derive(Debug, Default)]
pub struct StaticDom {
    nodes: BTreeMap<NodeId, StaticNode>,
    next: NodeId,
}

impl StaticDom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(
        &mut self,
        parent: Option<NodeId>,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> NodeId {
        self.next += 1;
        let id = self.next;
        self.nodes.insert(
            id,
            StaticNode {
                tag: tag.to_string(),
                attributes: attributes
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                parent,
                ..StaticNode::default()
            },
        );
        if let Some(parent) = parent
            && let Some(node) = self.nodes.get_mut(&parent)
        {
            node.children.push(id);
        }
        id
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.text = text.to_string();
        }
    }

    /// Turn a node into a text-input-capable element with an initial value.
    pub fn make_text_input(&mut self, node: NodeId, initial: &str) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.text_input = true;
            node.value = Some(initial.to_string());
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&StaticNode> {
        self.nodes.get(&id)
    }

    fn matches_part(&self, id: NodeId, part: &QueryPart) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        if !part.tag.is_empty() && node.tag != part.tag {
            return false;
        }
        part.attrs.iter().all(|(name, value)| {
            node.attributes
                .iter()
                .any(|(n, v)| n == name && v == value)
        })
    }

    /// `parts[idx]` already matched at `id`; check the rest of the chain
    /// against the ancestors. A child combinator pins the immediate parent,
    /// a descendant combinator tries every ancestor.
    fn matches_chain(&self, id: NodeId, parts: &[QueryPart], idx: usize) -> bool {
        if idx == 0 {
            return true;
        }
        let prev = idx - 1;
        let parent = self.nodes.get(&id).and_then(|n| n.parent);
        if parts[idx].child_of_prev {
            match parent {
                Some(p) => self.matches_part(p, &parts[prev]) && self.matches_chain(p, parts, prev),
                None => false,
            }
        } else {
            let mut ancestor = parent;
            while let Some(p) = ancestor {
                if self.matches_part(p, &parts[prev]) && self.matches_chain(p, parts, prev) {
                    return true;
                }
                ancestor = self.nodes.get(&p).and_then(|n| n.parent);
            }
            false
        }
    }
}

impl Dom for StaticDom {
    fn query_all(&self, selector: &str) -> Vec<NodeId> {
        let parts = parse_query(selector);
        if parts.is_empty() {
            return Vec::new();
        }
        let last = parts.len() - 1;
        self.nodes
            .keys()
            .copied()
            .filter(|id| self.matches_part(*id, &parts[last]) && self.matches_chain(*id, &parts, last))
            .collect()
    }

    fn tag(&self, node: NodeId) -> Option<String> {
        self.nodes.get(&node).map(|n| n.tag.clone())
    }

    fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.nodes
            .get(&node)
            .map(|n| n.attributes.clone())
            .unwrap_or_default()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    fn text(&self, node: NodeId) -> String {
        self.nodes
            .get(&node)
            .map(|n| n.text.clone())
            .unwrap_or_default()
    }

    fn input_value(&self, node: NodeId) -> Option<String> {
        self.nodes.get(&node).and_then(|n| n.value.clone())
    }

    fn is_text_input(&self, node: NodeId) -> bool {
        self.nodes.get(&node).map(|n| n.text_input).unwrap_or(false)
    }

    fn set_input_value(&mut self, node: NodeId, value: &str) -> bool {
        match self.nodes.get_mut(&node) {
            Some(n) if n.text_input => {
                n.value = Some(value.to_string());
                true
            }
            _ => false,
        }
    }

    fn click(&mut self, node: NodeId) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.clicks += 1;
        }
    }

    fn mark(&mut self, node: NodeId) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.marked = true;
        }
    }
}

#[derive(Debug)]
struct QueryPart {
    tag: String,
    attrs: Vec<(String, String)>,
    /// Relation to the previous part: child (`>`) or descendant (space).
    child_of_prev: bool,
}

/// Parse the selector grammar the serializer emits: stage tokens of
/// `tag[attr="value"]...` separated by `" > "` or `" "`.
fn parse_query(query: &str) -> Vec<QueryPart> {
    let mut parts = Vec::new();
    let mut child = false;
    for token in query.split_whitespace() {
        if token == ">" {
            child = true;
            continue;
        }
        let (tag, attrs) = parse_stage_token(token);
        parts.push(QueryPart {
            tag,
            attrs,
            child_of_prev: child,
        });
        child = false;
    }
    parts
}

fn parse_stage_token(token: &str) -> (String, Vec<(String, String)>) {
    let (tag, rest) = match token.find('[') {
        Some(at) => (token[..at].to_string(), &token[at..]),
        None => (token.to_string(), ""),
    };
    let mut attrs = Vec::new();
    let mut remaining = rest;
    while let Some(open) = remaining.find('[') {
        let Some(close) = remaining[open..].find(']') else {
            break;
        };
        let body = &remaining[open + 1..open + close];
        if let Some((name, value)) = body.split_once('=') {
            attrs.push((name.to_string(), value.trim_matches('"').to_string()));
        }
        remaining = &remaining[open + close + 1..];
    }
    (tag, attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (StaticDom, NodeId, NodeId, NodeId) {
        let mut dom = StaticDom::new();
        let html = dom.add_element(None, "html", &[]);
        let body = dom.add_element(Some(html), "body", &[]);
        let main = dom.add_element(Some(body), "div", &[("id", "main")]);
        let row = dom.add_element(Some(main), "div", &[("class", "row")]);
        let link = dom.add_element(Some(row), "a", &[("href", "/about")]);
        (dom, main, row, link)
    }

    #[test]
    fn id_queries_find_the_one_node() {
        let (dom, main, _, _) = sample();
        assert_eq!(dom.query_all(r#"div[id="main"]"#), vec![main]);
    }

    #[test]
    fn child_combinators_pin_the_immediate_parent() {
        let (dom, _, _, link) = sample();
        assert_eq!(dom.query_all(r#"div[class="row"] > a"#), vec![link]);
        assert!(dom.query_all(r#"div[id="main"] > a"#).is_empty());
    }

    #[test]
    fn descendant_combinators_span_dropped_stages() {
        let (dom, _, _, link) = sample();
        assert_eq!(dom.query_all(r#"div[id="main"] a"#), vec![link]);
        assert_eq!(dom.query_all("body a"), vec![link]);
    }

    #[test]
    fn bare_tags_match_every_instance() {
        let (dom, main, row, _) = sample();
        assert_eq!(dom.query_all("div"), vec![main, row]);
    }

    #[test]
    fn input_values_only_land_on_text_inputs() {
        let mut dom = StaticDom::new();
        let body = dom.add_element(None, "body", &[]);
        let input = dom.add_element(Some(body), "input", &[("id", "q")]);
        let span = dom.add_element(Some(body), "span", &[]);
        dom.make_text_input(input, "");

        assert!(dom.set_input_value(input, "hello"));
        assert!(!dom.set_input_value(span, "hello"));
        assert_eq!(dom.input_value(input).as_deref(), Some("hello"));
    }
}
