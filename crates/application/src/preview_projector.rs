use tenderform_domain::{FieldDefinition, FieldType, FieldValue, FormSchema, ValueLabelMap};

use crate::form_ports::{FieldValueProvider, PreviewSurface};

/// Placeholder shown for fields without a value.
pub const DEFAULT_PREVIEW_PLACEHOLDER: &str = "**********";

/// Mirrors field values into the read-only document preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewProjector {
    placeholder: String,
}

impl Default for PreviewProjector {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_PLACEHOLDER)
    }
}

impl PreviewProjector {
    /// Creates a projector with the given empty-value placeholder.
    #[must_use]
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
        }
    }

    /// Returns the empty-value placeholder.
    #[must_use]
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Renders one raw value as preview HTML.
    ///
    /// Option values are swapped for their labels (element-wise for
    /// comma-joined lists), the result is escaped and newlines become `<br>`.
    #[must_use]
    pub fn render(&self, raw: &str, labels: Option<&ValueLabelMap>) -> String {
        let display = match labels {
            Some(labels) => map_labels(raw, labels),
            None => raw.to_owned(),
        };

        if display.is_empty() {
            return self.placeholder.clone();
        }

        escape_html(display.replace("\r\n", "\n").as_str()).replace('\n', "<br>")
    }

    /// Writes one rendered value into every node bound to `name`.
    ///
    /// Returns the number of nodes written; zero when the field is not part
    /// of the previewed document.
    pub fn project(
        &self,
        preview: &mut dyn PreviewSurface,
        name: &str,
        raw: &str,
        labels: Option<&ValueLabelMap>,
    ) -> usize {
        let written = preview.write_bound_nodes(name, self.render(raw, labels).as_str());
        if written == 0 {
            tracing::trace!(field = %name, "field has no preview nodes");
        }
        written
    }

    /// Projects a live value using the field's kind and option labels.
    ///
    /// Single checkboxes show `是`/`否`.
    pub fn project_field(
        &self,
        preview: &mut dyn PreviewSurface,
        field: &FieldDefinition,
        value: &FieldValue,
    ) -> usize {
        let raw = if field.field_type() == FieldType::Checkbox {
            value.display_text()
        } else {
            value.raw_text()
        };
        let labels = field.value_to_label_map();

        self.project(preview, field.name().as_str(), raw.as_str(), labels.as_ref())
    }

    /// Projects every schema field, falling back to its default value when empty.
    pub fn project_all<P>(&self, preview: &mut dyn PreviewSurface, schema: &FormSchema, values: &P) -> usize
    where
        P: FieldValueProvider + ?Sized,
    {
        schema
            .fields()
            .iter()
            .map(|field| {
                let value = values
                    .field_value(field.name().as_str())
                    .filter(|value| !value.is_empty())
                    .or_else(|| field.default_value().map(FieldValue::from))
                    .unwrap_or_else(|| FieldValue::text(""));
                self.project_field(preview, field, &value)
            })
            .sum()
    }
}

fn map_labels(raw: &str, labels: &ValueLabelMap) -> String {
    if let Some(label) = labels.get(raw) {
        return label.clone();
    }
    if !raw.contains(',') {
        return raw.to_owned();
    }

    let items: Vec<&str> = raw.split(',').map(str::trim).collect();
    if !items.iter().any(|item| labels.contains_key(*item)) {
        return raw.to_owned();
    }

    items
        .iter()
        .map(|item| labels.get(*item).map_or(*item, String::as_str))
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for character in value.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(character),
        }
    }
    escaped
}
