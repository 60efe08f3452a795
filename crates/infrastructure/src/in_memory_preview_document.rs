use std::collections::BTreeMap;

use regex::Regex;
use tenderform_application::PreviewSurface;
use tenderform_core::{AppError, AppResult};
use tenderform_domain::FormSchema;

const BINDING_PATTERN: &str = r#"data-placeholder-for="([^"]+)""#;

/// Document preview holding the HTML of every bound node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryPreviewDocument {
    nodes: BTreeMap<String, Vec<String>>,
}

impl InMemoryPreviewDocument {
    /// Creates a document without bound nodes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds one node to every schema field.
    #[must_use]
    pub fn from_schema(schema: &FormSchema) -> Self {
        let mut document = Self::new();
        for field in schema.fields() {
            document.bind(field.name().as_str());
        }
        document
    }

    /// Binds one node per `data-placeholder-for="name"` attribute in a
    /// rendered document template.
    pub fn from_template(template: &str) -> AppResult<Self> {
        let pattern = Regex::new(BINDING_PATTERN)
            .map_err(|error| AppError::Internal(format!("invalid binding pattern: {error}")))?;

        let mut document = Self::new();
        for captures in pattern.captures_iter(template) {
            if let Some(name) = captures.get(1) {
                document.bind(name.as_str());
            }
        }
        Ok(document)
    }

    /// Adds one empty node bound to `name`.
    pub fn bind(&mut self, name: &str) {
        self.nodes.entry(name.to_owned()).or_default().push(String::new());
    }

    /// Returns the HTML of every node bound to `name`.
    #[must_use]
    pub fn nodes(&self, name: &str) -> &[String] {
        self.nodes.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the HTML of the first node bound to `name`.
    #[must_use]
    pub fn html(&self, name: &str) -> Option<&str> {
        self.nodes(name).first().map(String::as_str)
    }

    /// Returns every binding with its node contents.
    #[must_use]
    pub fn bindings(&self) -> &BTreeMap<String, Vec<String>> {
        &self.nodes
    }
}

impl PreviewSurface for InMemoryPreviewDocument {
    fn write_bound_nodes(&mut self, name: &str, html: &str) -> usize {
        let Some(nodes) = self.nodes.get_mut(name) else {
            return 0;
        };

        for node in nodes.iter_mut() {
            html.clone_into(node);
        }
        nodes.len()
    }
}
