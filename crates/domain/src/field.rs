use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use tenderform_core::{AppError, AppResult, NonEmptyString};

use crate::ValidationRules;

/// Raw option value to display label lookup.
pub type ValueLabelMap = BTreeMap<String, String>;

/// Supported form field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    /// Single-line text input.
    Text,
    /// Multi-line text input.
    Textarea,
    /// Numeric input.
    Number,
    /// Date input (`YYYY-MM-DD`).
    Date,
    /// Drop-down with one selection.
    Select,
    /// Radio button group.
    Radio,
    /// Single boolean checkbox.
    Checkbox,
    /// Group of checkboxes with many selections.
    CheckboxGroup,
    /// Drop-down with many selections.
    SelectMultiple,
}

impl FieldType {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Number => "number",
            Self::Date => "date",
            Self::Select => "select",
            Self::Radio => "radio",
            Self::Checkbox => "checkbox",
            Self::CheckboxGroup => "checkbox-group",
            Self::SelectMultiple => "select-multiple",
        }
    }

    /// Returns whether the kind is a drop-down whose option list can be filtered.
    #[must_use]
    pub fn is_select_like(&self) -> bool {
        matches!(self, Self::Select | Self::SelectMultiple)
    }

    /// Returns whether values are comma-joined lists.
    #[must_use]
    pub fn is_multi_value(&self) -> bool {
        matches!(self, Self::CheckboxGroup | Self::SelectMultiple)
    }

    /// Returns whether the user types the value rather than picking it.
    #[must_use]
    pub fn is_free_text(&self) -> bool {
        matches!(self, Self::Text | Self::Textarea)
    }

    /// Returns whether the kind needs a declared option list.
    #[must_use]
    pub fn requires_options(&self) -> bool {
        matches!(
            self,
            Self::Select | Self::Radio | Self::CheckboxGroup | Self::SelectMultiple
        )
    }

    /// Returns whether ordering operators are meaningful for this kind.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        matches!(self, Self::Number | Self::Date)
    }
}

impl FromStr for FieldType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(Self::Text),
            "textarea" => Ok(Self::Textarea),
            "number" => Ok(Self::Number),
            "date" => Ok(Self::Date),
            "select" => Ok(Self::Select),
            "radio" => Ok(Self::Radio),
            "checkbox" => Ok(Self::Checkbox),
            "checkbox-group" => Ok(Self::CheckboxGroup),
            "select-multiple" => Ok(Self::SelectMultiple),
            _ => Err(AppError::Validation(format!("unknown field type '{value}'"))),
        }
    }
}

/// One selectable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionItem {
    /// Display label.
    pub label: String,
    /// Raw stored value.
    pub value: String,
}

impl OptionItem {
    /// Creates an option item.
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// Creates an option whose label equals its value.
    #[must_use]
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

/// Input payload for constructing one field definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinitionInput {
    /// Stable identifier used by rules and the preview.
    pub name: String,
    /// Display label.
    pub label: String,
    /// Field kind.
    pub field_type: FieldType,
    /// Ordered options for option-bearing kinds.
    pub options: Vec<OptionItem>,
    /// Value used when nothing is stored.
    pub default_value: Option<String>,
    /// Help text shown beside the input.
    pub help_tip: Option<String>,
    /// Typed validation rules.
    pub validation_rules: ValidationRules,
}

/// Schema definition of one form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldDefinitionDocument")]
pub struct FieldDefinition {
    name: NonEmptyString,
    label: NonEmptyString,
    #[serde(rename = "type")]
    field_type: FieldType,
    options: Vec<OptionItem>,
    default_value: Option<String>,
    help_tip: Option<String>,
    validation_rules: ValidationRules,
    export_word_as_label: bool,
    export_excel_as_label: bool,
}

impl FieldDefinition {
    /// Creates a validated field definition.
    pub fn new(input: FieldDefinitionInput) -> AppResult<Self> {
        let FieldDefinitionInput {
            name,
            label,
            field_type,
            options,
            default_value,
            help_tip,
            validation_rules,
        } = input;

        let name = NonEmptyString::new(name)?;
        if field_type.requires_options() && options.is_empty() {
            return Err(AppError::Validation(format!(
                "field '{}' of type '{}' requires at least one option",
                name.as_str(),
                field_type.as_str()
            )));
        }

        Ok(Self {
            label: NonEmptyString::new(label)?,
            name,
            field_type,
            options,
            default_value: default_value.filter(|value| !value.is_empty()),
            help_tip: help_tip.filter(|value| !value.trim().is_empty()),
            validation_rules,
            export_word_as_label: false,
            export_excel_as_label: true,
        })
    }

    /// Returns a copy with explicit export label flags.
    #[must_use]
    pub fn with_export_labels(mut self, word_as_label: bool, excel_as_label: bool) -> Self {
        self.export_word_as_label = word_as_label;
        self.export_excel_as_label = excel_as_label;
        self
    }

    /// Returns the stable field name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the display label.
    #[must_use]
    pub fn label(&self) -> &NonEmptyString {
        &self.label
    }

    /// Returns the field kind.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Returns the declared options.
    #[must_use]
    pub fn options(&self) -> &[OptionItem] {
        &self.options
    }

    /// Returns the default value.
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// Returns the help tip.
    #[must_use]
    pub fn help_tip(&self) -> Option<&str> {
        self.help_tip.as_deref()
    }

    /// Returns the typed validation rules.
    #[must_use]
    pub fn validation_rules(&self) -> &ValidationRules {
        &self.validation_rules
    }

    /// Returns whether Word exports use option labels instead of raw values.
    #[must_use]
    pub fn export_word_as_label(&self) -> bool {
        self.export_word_as_label
    }

    /// Returns whether Excel exports use option labels instead of raw values.
    #[must_use]
    pub fn export_excel_as_label(&self) -> bool {
        self.export_excel_as_label
    }

    /// Returns the raw value to label map, or `None` when the field has no options.
    #[must_use]
    pub fn value_to_label_map(&self) -> Option<ValueLabelMap> {
        if self.options.is_empty() {
            return None;
        }

        Some(
            self.options
                .iter()
                .map(|option| (option.value.clone(), option.label.clone()))
                .collect(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct FieldDefinitionDocument {
    name: String,
    label: String,
    #[serde(rename = "type", alias = "field_type")]
    field_type: FieldType,
    #[serde(default, deserialize_with = "deserialize_options")]
    options: Vec<OptionItem>,
    #[serde(default)]
    default_value: Option<String>,
    #[serde(default)]
    help_tip: Option<String>,
    #[serde(default)]
    validation_rules: ValidationRules,
    #[serde(default)]
    export_word_as_label: bool,
    #[serde(default = "default_excel_as_label")]
    export_excel_as_label: bool,
}

fn default_excel_as_label() -> bool {
    true
}

impl TryFrom<FieldDefinitionDocument> for FieldDefinition {
    type Error = AppError;

    fn try_from(document: FieldDefinitionDocument) -> Result<Self, Self::Error> {
        Ok(Self::new(FieldDefinitionInput {
            name: document.name,
            label: document.label,
            field_type: document.field_type,
            options: document.options,
            default_value: document.default_value,
            help_tip: document.help_tip,
            validation_rules: document.validation_rules,
        })?
        .with_export_labels(document.export_word_as_label, document.export_excel_as_label))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OptionsDocument {
    Items(Vec<OptionItem>),
    CommaSeparated(String),
}

fn deserialize_options<'de, D>(deserializer: D) -> Result<Vec<OptionItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let document = Option::<OptionsDocument>::deserialize(deserializer)?;
    Ok(match document {
        None => Vec::new(),
        Some(OptionsDocument::Items(items)) => items,
        Some(OptionsDocument::CommaSeparated(text)) => text
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(OptionItem::plain)
            .collect(),
    })
}
