use std::collections::BTreeMap;

use serde::Serialize;
use tenderform_application::{FieldAccessor, FieldState, FieldValueProvider};
use tenderform_core::{AppError, AppResult};
use tenderform_domain::{
    CHECKED_DISPLAY, FieldDefinition, FieldType, FieldValue, FormSchema, OptionItem,
    SpaceAllowance, UNCHECKED_DISPLAY, parse_legacy_flag,
};

#[cfg(test)]
mod tests;

/// One checkbox inside a checkbox group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupItem {
    /// Option backing the checkbox.
    pub option: OptionItem,
    /// Whether the box is ticked.
    pub checked: bool,
}

/// DOM-like control rendered for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum FormControl {
    /// Text, textarea, number or date input.
    Input {
        /// Current text.
        value: String,
    },
    /// Single boolean checkbox.
    Checkbox {
        /// Whether the box is ticked.
        checked: bool,
    },
    /// Radio buttons sharing one name.
    Radio {
        /// Buttons in document order.
        options: Vec<OptionItem>,
        /// Value of the checked button.
        checked: Option<String>,
    },
    /// Checkboxes sharing one name.
    CheckboxGroup {
        /// Boxes in document order.
        items: Vec<GroupItem>,
    },
    /// Single-selection drop-down.
    Select {
        /// Offered options.
        options: Vec<OptionItem>,
        /// Selected value; empty when nothing is selected.
        selected: String,
    },
    /// Multi-selection drop-down.
    SelectMultiple {
        /// Offered options.
        options: Vec<OptionItem>,
        /// Selected values.
        selected: Vec<String>,
    },
}

impl FormControl {
    fn render(definition: &FieldDefinition, initial: &str) -> Self {
        let options = definition.options().to_vec();
        match definition.field_type() {
            FieldType::Text | FieldType::Textarea | FieldType::Number | FieldType::Date => {
                Self::Input {
                    value: initial.to_owned(),
                }
            }
            FieldType::Checkbox => Self::Checkbox {
                checked: parse_checked(definition.name().as_str(), initial),
            },
            FieldType::Radio => Self::Radio {
                checked: offered(&options, initial).then(|| initial.to_owned()),
                options,
            },
            FieldType::CheckboxGroup => {
                let values = split_values(initial);
                Self::CheckboxGroup {
                    items: options
                        .into_iter()
                        .map(|option| GroupItem {
                            checked: values.contains(&option.value.as_str()),
                            option,
                        })
                        .collect(),
                }
            }
            FieldType::Select => Self::Select {
                selected: if offered(&options, initial) {
                    initial.to_owned()
                } else {
                    String::new()
                },
                options,
            },
            FieldType::SelectMultiple => Self::SelectMultiple {
                selected: split_values(initial)
                    .into_iter()
                    .filter(|value| offered(&options, value))
                    .map(str::to_owned)
                    .collect(),
                options,
            },
        }
    }

    /// Returns the value a form submission would carry.
    #[must_use]
    pub fn value(&self) -> FieldValue {
        match self {
            Self::Input { value } => FieldValue::Text(value.clone()),
            Self::Checkbox { checked } => FieldValue::Checked(*checked),
            Self::Radio { checked, .. } => FieldValue::Text(checked.clone().unwrap_or_default()),
            Self::CheckboxGroup { items } => FieldValue::Text(
                items
                    .iter()
                    .filter(|item| item.checked)
                    .map(|item| item.option.value.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            Self::Select { selected, .. } => FieldValue::Text(selected.clone()),
            Self::SelectMultiple { options, selected } => FieldValue::Text(
                options
                    .iter()
                    .filter(|option| selected.contains(&option.value))
                    .map(|option| option.value.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        }
    }

    fn assign(&mut self, value: &FieldValue) {
        match self {
            Self::Input { value: current } => *current = value.raw_text(),
            Self::Checkbox { checked } => {
                *checked = match value {
                    FieldValue::Checked(flag) => *flag,
                    FieldValue::Text(text) => text == CHECKED_DISPLAY || text == "True",
                }
            }
            Self::Radio { options, checked } => {
                let text = value.raw_text();
                *checked = offered(options, &text).then_some(text);
            }
            Self::CheckboxGroup { items } => {
                let text = value.raw_text();
                let values = split_values(&text);
                for item in items {
                    item.checked = values.contains(&item.option.value.as_str());
                }
            }
            Self::Select { options, selected } => {
                let text = value.raw_text();
                *selected = if offered(options, &text) {
                    text
                } else {
                    String::new()
                };
            }
            Self::SelectMultiple { options, selected } => {
                let text = value.raw_text();
                *selected = split_values(&text)
                    .into_iter()
                    .filter(|value| offered(options, value))
                    .map(str::to_owned)
                    .collect();
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RenderedField {
    control: FormControl,
    state: FieldState,
    validity_reports: usize,
}

/// Serializable view of one rendered field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSnapshot {
    /// Submitted value.
    pub value: FieldValue,
    /// Options currently offered by a drop-down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Interactive attributes.
    #[serde(flatten)]
    pub state: FieldState,
    /// Number of native validity reports triggered.
    pub validity_reports: usize,
}

/// In-memory form that renders one DOM-like control per schema field.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFormSurface {
    fields: BTreeMap<String, RenderedField>,
}

impl InMemoryFormSurface {
    /// Renders every schema field with its stored value, or its default value
    /// when nothing is stored.
    #[must_use]
    pub fn from_schema(schema: &FormSchema, stored: &BTreeMap<String, String>) -> Self {
        let fields = schema
            .fields()
            .iter()
            .map(|definition| {
                let name = definition.name().as_str();
                let initial = stored
                    .get(name)
                    .map(String::as_str)
                    .or_else(|| definition.default_value())
                    .unwrap_or_default();

                (
                    name.to_owned(),
                    RenderedField {
                        control: FormControl::render(definition, initial),
                        state: FieldState {
                            space_allowance: SpaceAllowance {
                                english: true,
                                chinese: true,
                            },
                            ..FieldState::default()
                        },
                        validity_reports: 0,
                    },
                )
            })
            .collect();

        Self { fields }
    }

    /// Removes a control, simulating a form that no longer renders a field.
    pub fn remove(&mut self, name: &str) -> bool {
        self.fields.remove(name).is_some()
    }

    /// Types or picks a value the way a user would.
    ///
    /// Drop-downs and radios only accept offered values; checkbox groups and
    /// multi-selects take a comma-joined list; single checkboxes take
    /// `是`/`否` or the legacy `True`/`False`.
    pub fn enter_value(&mut self, name: &str, value: &str) -> AppResult<()> {
        let field = self.editable(name)?;
        if matches!(field.control, FormControl::Checkbox { .. }) {
            let checked = parse_checkbox_input(name, value)?;
            return Self::set_checkbox(field, name, checked);
        }

        let accepted = match &field.control {
            FormControl::Radio { options, .. } | FormControl::Select { options, .. } => {
                value.is_empty() || offered(options, value)
            }
            FormControl::SelectMultiple { options, .. } => split_values(value)
                .iter()
                .all(|item| offered(options, item)),
            FormControl::CheckboxGroup { items } => split_values(value)
                .iter()
                .all(|item| items.iter().any(|group_item| group_item.option.value == *item)),
            FormControl::Checkbox { .. } | FormControl::Input { .. } => true,
        };

        if !accepted {
            return Err(AppError::Validation(format!(
                "'{value}' is not an option of field '{name}'"
            )));
        }

        field.control.assign(&FieldValue::text(value));
        Ok(())
    }

    /// Ticks or clears a single checkbox.
    pub fn set_checked(&mut self, name: &str, checked: bool) -> AppResult<()> {
        let field = self.editable(name)?;
        Self::set_checkbox(field, name, checked)
    }

    /// Ticks or clears one option of a checkbox group or multi-select.
    pub fn toggle_option(&mut self, name: &str, option: &str, checked: bool) -> AppResult<()> {
        let field = self.editable(name)?;
        match &mut field.control {
            FormControl::CheckboxGroup { items } => {
                let item = items
                    .iter_mut()
                    .find(|item| item.option.value == option)
                    .ok_or_else(|| {
                        AppError::Validation(format!("'{option}' is not an option of field '{name}'"))
                    })?;
                item.checked = checked;
                Ok(())
            }
            FormControl::SelectMultiple { options, selected } => {
                if !offered(options, option) {
                    return Err(AppError::Validation(format!(
                        "'{option}' is not an option of field '{name}'"
                    )));
                }
                selected.retain(|value| value != option);
                if checked {
                    selected.push(option.to_owned());
                }
                Ok(())
            }
            _ => Err(AppError::Validation(format!(
                "field '{name}' has no toggleable options"
            ))),
        }
    }

    /// Returns the rendered control.
    #[must_use]
    pub fn control(&self, name: &str) -> Option<&FormControl> {
        self.fields.get(name).map(|field| &field.control)
    }

    /// Returns how often the host reported validity for a field.
    #[must_use]
    pub fn validity_reports(&self, name: &str) -> usize {
        self.fields.get(name).map_or(0, |field| field.validity_reports)
    }

    /// Returns a serializable view of every field.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, FieldSnapshot> {
        self.fields
            .iter()
            .map(|(name, field)| {
                (
                    name.clone(),
                    FieldSnapshot {
                        value: field.control.value(),
                        options: self.options(name).map(|options| {
                            options.into_iter().map(|option| option.value).collect()
                        }),
                        state: field.state.clone(),
                        validity_reports: field.validity_reports,
                    },
                )
            })
            .collect()
    }

    fn editable(&mut self, name: &str) -> AppResult<&mut RenderedField> {
        let field = self
            .fields
            .get_mut(name)
            .ok_or_else(|| AppError::NotFound(format!("field '{name}' is not rendered")))?;

        if field.state.disabled {
            return Err(AppError::Conflict(format!("field '{name}' is disabled")));
        }

        Ok(field)
    }

    fn set_checkbox(field: &mut RenderedField, name: &str, checked: bool) -> AppResult<()> {
        match &mut field.control {
            FormControl::Checkbox { checked: current } => {
                *current = checked;
                Ok(())
            }
            _ => Err(AppError::Validation(format!(
                "field '{name}' is not a single checkbox"
            ))),
        }
    }

    fn with_field(&mut self, name: &str, update: impl FnOnce(&mut RenderedField)) {
        if let Some(field) = self.fields.get_mut(name) {
            update(field);
        }
    }
}

impl FieldValueProvider for InMemoryFormSurface {
    fn field_value(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).map(|field| field.control.value())
    }
}

impl FieldAccessor for InMemoryFormSurface {
    fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    fn set_value(&mut self, name: &str, value: FieldValue) {
        self.with_field(name, |field| field.control.assign(&value));
    }

    fn set_disabled(&mut self, name: &str, disabled: bool) {
        self.with_field(name, |field| field.state.disabled = disabled);
    }

    fn set_required(&mut self, name: &str, required: bool) {
        self.with_field(name, |field| field.state.required = required);
    }

    fn set_hidden(&mut self, name: &str, hidden: bool) {
        self.with_field(name, |field| field.state.hidden = hidden);
    }

    fn set_space_allowance(&mut self, name: &str, allowance: SpaceAllowance) {
        self.with_field(name, |field| field.state.space_allowance = allowance);
    }

    fn options(&self, name: &str) -> Option<Vec<OptionItem>> {
        match self.fields.get(name).map(|field| &field.control) {
            Some(FormControl::Select { options, .. } | FormControl::SelectMultiple { options, .. }) => {
                Some(options.clone())
            }
            _ => None,
        }
    }

    fn set_options(&mut self, name: &str, options: &[OptionItem]) {
        self.with_field(name, |field| match &mut field.control {
            FormControl::Select {
                options: current,
                selected,
            } => {
                *current = options.to_vec();
                if !offered(current, selected) {
                    selected.clear();
                }
            }
            FormControl::SelectMultiple {
                options: current,
                selected,
            } => {
                *current = options.to_vec();
                selected.retain(|value| offered(options, value));
            }
            _ => {}
        });
    }

    fn set_validation_message(&mut self, name: &str, message: &str) {
        self.with_field(name, |field| {
            message.clone_into(&mut field.state.validation_message);
        });
    }

    fn report_validity(&mut self, name: &str) {
        self.with_field(name, |field| {
            field.validity_reports += 1;
            if !field.state.validation_message.is_empty() {
                tracing::debug!(
                    field = %name,
                    message = %field.state.validation_message,
                    "validity reported"
                );
            }
        });
    }

    fn field_state(&self, name: &str) -> Option<FieldState> {
        self.fields.get(name).map(|field| field.state.clone())
    }
}

fn offered(options: &[OptionItem], value: &str) -> bool {
    options.iter().any(|option| option.value == value)
}

fn split_values(value: &str) -> Vec<&str> {
    value.split(',').filter(|item| !item.is_empty()).collect()
}

fn parse_checked(name: &str, stored: &str) -> bool {
    if stored == CHECKED_DISPLAY {
        return true;
    }

    parse_legacy_flag(stored).unwrap_or_else(|error| {
        tracing::warn!(field = %name, error = %error, "unreadable stored checkbox value");
        false
    })
}

fn parse_checkbox_input(name: &str, value: &str) -> AppResult<bool> {
    match value {
        CHECKED_DISPLAY => Ok(true),
        UNCHECKED_DISPLAY => Ok(false),
        _ => parse_legacy_flag(value).map_err(|_| {
            AppError::Validation(format!("'{value}' is not a checkbox state of field '{name}'"))
        }),
    }
}
