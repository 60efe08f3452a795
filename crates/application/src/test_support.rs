use std::collections::BTreeMap;

use tenderform_domain::{FieldType, FieldValue, FormSchema, OptionItem, SpaceAllowance};

use crate::form_ports::{FieldAccessor, FieldState, FieldValueProvider, PreviewSurface};

#[derive(Debug, Clone)]
pub(crate) struct FakeField {
    pub value: FieldValue,
    pub state: FieldState,
    pub options: Option<Vec<OptionItem>>,
    pub reports: usize,
}

/// Flat in-memory surface: every control stores its value directly.
#[derive(Debug, Default)]
pub(crate) struct FakeSurface {
    fields: BTreeMap<String, FakeField>,
}

impl FakeSurface {
    pub fn from_schema(schema: &FormSchema) -> Self {
        let mut surface = Self::default();
        for field in schema.fields() {
            let name = field.name().as_str();
            let value = match field.field_type() {
                FieldType::Checkbox => FieldValue::Checked(false),
                _ => FieldValue::text(field.default_value().unwrap_or_default()),
            };
            let options = field
                .field_type()
                .is_select_like()
                .then(|| field.options().to_vec());
            surface.insert(name, value, options);
        }
        surface
    }

    pub fn add_text(&mut self, name: &str, value: &str) {
        self.insert(name, FieldValue::text(value), None);
    }

    pub fn add_checkbox(&mut self, name: &str, checked: bool) {
        self.insert(name, FieldValue::Checked(checked), None);
    }

    pub fn set_raw(&mut self, name: &str, value: FieldValue) {
        if let Some(field) = self.fields.get_mut(name) {
            field.value = value;
        }
    }

    pub fn field_value_text(&self, name: &str) -> String {
        self.fields
            .get(name)
            .map(|field| field.value.raw_text())
            .unwrap_or_default()
    }

    pub fn remove(&mut self, name: &str) {
        self.fields.remove(name);
    }

    pub fn state(&self, name: &str) -> FieldState {
        self.fields
            .get(name)
            .map(|field| field.state.clone())
            .unwrap_or_default()
    }

    pub fn option_values(&self, name: &str) -> Vec<String> {
        self.fields
            .get(name)
            .and_then(|field| field.options.as_ref())
            .map(|options| options.iter().map(|option| option.value.clone()).collect())
            .unwrap_or_default()
    }

    pub fn reports(&self, name: &str) -> usize {
        self.fields.get(name).map_or(0, |field| field.reports)
    }

    pub fn snapshot(&self) -> BTreeMap<String, (FieldValue, FieldState, Vec<String>)> {
        self.fields
            .keys()
            .map(|name| {
                let field = &self.fields[name];
                (
                    name.clone(),
                    (field.value.clone(), field.state.clone(), self.option_values(name)),
                )
            })
            .collect()
    }

    fn insert(&mut self, name: &str, value: FieldValue, options: Option<Vec<OptionItem>>) {
        self.fields.insert(
            name.to_owned(),
            FakeField {
                value,
                state: FieldState {
                    space_allowance: SpaceAllowance {
                        english: true,
                        chinese: true,
                    },
                    ..FieldState::default()
                },
                options,
                reports: 0,
            },
        );
    }

    fn with_field(&mut self, name: &str, update: impl FnOnce(&mut FakeField)) {
        if let Some(field) = self.fields.get_mut(name) {
            update(field);
        }
    }
}

impl FieldValueProvider for FakeSurface {
    fn field_value(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).map(|field| field.value.clone())
    }
}

impl FieldAccessor for FakeSurface {
    fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    fn set_value(&mut self, name: &str, value: FieldValue) {
        self.with_field(name, |field| field.value = value);
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
        self.fields.get(name).and_then(|field| field.options.clone())
    }

    fn set_options(&mut self, name: &str, options: &[OptionItem]) {
        self.with_field(name, |field| field.options = Some(options.to_vec()));
    }

    fn set_validation_message(&mut self, name: &str, message: &str) {
        self.with_field(name, |field| {
            field.state.validation_message = message.to_owned();
        });
    }

    fn report_validity(&mut self, name: &str) {
        self.with_field(name, |field| field.reports += 1);
    }

    fn field_state(&self, name: &str) -> Option<FieldState> {
        self.fields.get(name).map(|field| field.state.clone())
    }
}

/// Preview with one node per bound field name.
#[derive(Debug, Default)]
pub(crate) struct FakePreview {
    pub nodes: BTreeMap<String, String>,
}

impl FakePreview {
    pub fn bound_to(names: &[&str]) -> Self {
        Self {
            nodes: names
                .iter()
                .map(|name| ((*name).to_owned(), String::new()))
                .collect(),
        }
    }
}

impl PreviewSurface for FakePreview {
    fn write_bound_nodes(&mut self, name: &str, html: &str) -> usize {
        match self.nodes.get_mut(name) {
            Some(node) => {
                html.clone_into(node);
                1
            }
            None => 0,
        }
    }
}
