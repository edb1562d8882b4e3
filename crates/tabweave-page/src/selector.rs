//! Builds a structural selector for a live element: one stage per ancestor,
//! outermost first, with every attribute captured and only `id` flagged for
//! matching.

use crate::dom::{Dom, NodeId};
use tabweave_common::selector::{Selector, SelectorStage};

/// Capture the ancestor chain of `node` as a selector. The chain runs from
/// the document root (index 0) down to the element itself; `in_use` flags
/// are recomputed so stages above the innermost id-bearing ancestor are
/// trimmed.
pub fn selector_for_node<D: Dom>(dom: &D, node: NodeId, name: &str, url: &str) -> Selector {
    let mut stages = Vec::new();
    let mut current = Some(node);
    while let Some(id) = current {
        let Some(tag) = dom.tag(id) else {
            break;
        };
        let mut stage = SelectorStage::new(tag);
        for (attr, value) in dom.attributes(id) {
            stage.push_attribute(attr, value);
        }
        stages.push(stage);
        current = dom.parent(id);
    }
    stages.reverse();

    let mut selector = Selector::new(name, url);
    selector.stages = stages;
    selector.recompute_in_use();
    selector
}
