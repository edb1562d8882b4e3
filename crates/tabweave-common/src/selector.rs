use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// One ancestor in a selector chain: a tag plus its captured attributes.
/// `use_attributes` flags which attributes participate in matching and
/// `in_use` whether the stage participates in the compiled selector at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorStage {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub use_attributes: BTreeMap<String, bool>,
    #[serde(default)]
    pub in_use: bool,
}

impl SelectorStage {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            use_attributes: BTreeMap::new(),
            in_use: true,
        }
    }

    /// Record an attribute. Only `id` is flagged for matching by default;
    /// everything else is captured for later, manual selection.
    pub fn push_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.use_attributes.insert(name.clone(), name == "id");
        self.attributes.insert(name, value.into());
    }

    pub fn has_id(&self) -> bool {
        self.attributes.contains_key("id")
    }

    fn render(&self, out: &mut String) {
        out.push_str(&self.tag);
        for (name, value) in &self.attributes {
            if self.use_attributes.get(name).copied().unwrap_or(false) {
                let _ = write!(out, "[{}=\"{}\"]", name, value);
            }
        }
    }
}

/// A structural description of a DOM element: the ancestor chain from the
/// outermost stage (index 0) down to the target element itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub stages: Vec<SelectorStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_image: Option<String>,
}

impl Selector {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            url: url.into(),
            stages: Vec::new(),
            base64_image: None,
        }
    }

    /// Recompute the `in_use` flags: walking outward from the target element,
    /// stages stay in use up to and including the first id-bearing ancestor.
    /// An id is assumed document-unique, so everything above it is redundant
    /// for lookup and gets trimmed.
    pub fn recompute_in_use(&mut self) {
        let mut keep = true;
        for stage in self.stages.iter_mut().rev() {
            stage.in_use = keep;
            if keep && stage.has_id() {
                keep = false;
            }
        }
    }

    /// Render the in-use stages as a CSS selector. Adjacent in-use stages are
    /// joined with the child combinator; once a stage has been dropped the
    /// join degrades to the descendant combinator, since exact depth is no
    /// longer known.
    pub fn to_query_string(&self) -> String {
        let mut out = String::new();
        let mut prev_in_use = false;
        for stage in &self.stages {
            if !stage.in_use {
                prev_in_use = false;
                continue;
            }
            if !out.is_empty() {
                out.push_str(if prev_in_use { " > " } else { " " });
            }
            prev_in_use = true;
            stage.render(&mut out);
        }
        out
    }
}
