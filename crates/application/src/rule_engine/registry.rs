use std::collections::BTreeMap;

use tenderform_domain::{FieldDefinition, FormSchema, OptionItem, SpaceAllowance, ValidationRules};

use crate::form_ports::FieldAccessor;

/// Schema-declared interactive state of one field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldBaseline {
    /// Declared `required` rule.
    pub required: bool,
    /// Declared `disabled` rule.
    pub disabled: bool,
    /// Declared space rules.
    pub space_allowance: SpaceAllowance,
}

impl FieldBaseline {
    /// Reads the baseline from typed validation rules.
    #[must_use]
    pub fn from_rules(rules: &ValidationRules) -> Self {
        Self {
            required: rules.required(),
            disabled: rules.disabled(),
            space_allowance: rules.space_allowance(),
        }
    }

    /// Required flag the field shows when no rule overrides it.
    ///
    /// A disabled field is never required.
    #[must_use]
    pub fn effective_required(&self) -> bool {
        self.required && !self.disabled
    }

    /// Space allowance the field shows when no rule overrides it.
    #[must_use]
    pub fn effective_space_allowance(&self) -> SpaceAllowance {
        if self.disabled {
            SpaceAllowance::NONE
        } else {
            self.space_allowance
        }
    }
}

#[derive(Debug, Clone)]
struct RegisteredField {
    definition: FieldDefinition,
    baseline: FieldBaseline,
    original_options: Option<Vec<OptionItem>>,
}

/// Name-keyed lookup of schema fields with their captured baselines.
///
/// Captured once when the engine starts and never updated afterwards.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: BTreeMap<String, RegisteredField>,
}

impl FieldRegistry {
    /// Captures baselines and original option lists for every schema field.
    ///
    /// Option lists of select-like fields are read from the surface when it
    /// renders them and fall back to the declared options otherwise.
    #[must_use]
    pub fn capture(schema: &FormSchema, surface: &dyn FieldAccessor) -> Self {
        let fields = schema
            .fields()
            .iter()
            .map(|definition| {
                let name = definition.name().as_str();
                let original_options = definition.field_type().is_select_like().then(|| {
                    surface
                        .options(name)
                        .filter(|options| !options.is_empty())
                        .unwrap_or_else(|| definition.options().to_vec())
                });

                (
                    name.to_owned(),
                    RegisteredField {
                        baseline: FieldBaseline::from_rules(definition.validation_rules()),
                        definition: definition.clone(),
                        original_options,
                    },
                )
            })
            .collect();

        Self { fields }
    }

    /// Returns whether the schema declares a field with this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Returns the field definition.
    #[must_use]
    pub fn definition(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name).map(|field| &field.definition)
    }

    /// Returns the captured baseline.
    #[must_use]
    pub fn baseline(&self, name: &str) -> Option<FieldBaseline> {
        self.fields.get(name).map(|field| field.baseline)
    }

    /// Returns the original option list of a select-like field.
    #[must_use]
    pub fn original_options(&self, name: &str) -> Option<&[OptionItem]> {
        self.fields
            .get(name)
            .and_then(|field| field.original_options.as_deref())
    }

    /// Returns the display label, falling back to the name for unknown fields.
    #[must_use]
    pub fn label<'a>(&'a self, name: &'a str) -> &'a str {
        self.fields
            .get(name)
            .map_or(name, |field| field.definition.label().as_str())
    }

    /// Iterates registered field names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}
