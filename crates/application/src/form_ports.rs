use async_trait::async_trait;
use serde::Serialize;
use tenderform_core::AppResult;
use tenderform_domain::{FieldValue, FormSchema, OptionItem, SpaceAllowance};

/// Read access to live field values.
pub trait FieldValueProvider {
    /// Returns the current value of a field, or `None` when the form has no such field.
    ///
    /// Checkbox groups and multi-selects report comma-joined raw values in
    /// option order, single checkboxes report a boolean and radios report the
    /// checked option's value (empty when none is checked).
    fn field_value(&self, name: &str) -> Option<FieldValue>;
}

/// Snapshot of the interactive attributes of one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldState {
    /// Container is hidden.
    pub hidden: bool,
    /// Control is not interactive.
    pub disabled: bool,
    /// Control is marked required.
    pub required: bool,
    /// Whitespace kinds the control accepts.
    pub space_allowance: SpaceAllowance,
    /// Custom validation message; empty when valid.
    pub validation_message: String,
}

/// Capability interface the rule engine drives.
///
/// Every mutator is a silent no-op for names the host does not render.
pub trait FieldAccessor: FieldValueProvider {
    /// Returns whether the host renders a control with this name.
    fn has_field(&self, name: &str) -> bool;

    /// Replaces the field value.
    fn set_value(&mut self, name: &str, value: FieldValue);

    /// Toggles the interactive state.
    fn set_disabled(&mut self, name: &str, disabled: bool);

    /// Toggles the required flag.
    fn set_required(&mut self, name: &str, required: bool);

    /// Toggles the container-level hidden flag.
    fn set_hidden(&mut self, name: &str, hidden: bool);

    /// Sets which whitespace kinds the control accepts.
    fn set_space_allowance(&mut self, name: &str, allowance: SpaceAllowance);

    /// Returns the options currently offered by a select-like control.
    fn options(&self, name: &str) -> Option<Vec<OptionItem>>;

    /// Replaces the options offered by a select-like control.
    fn set_options(&mut self, name: &str, options: &[OptionItem]);

    /// Attaches a custom validation message; an empty message clears it.
    fn set_validation_message(&mut self, name: &str, message: &str);

    /// Triggers the host's native validity report for one field.
    fn report_validity(&mut self, name: &str);

    /// Returns the current interactive attributes of a field.
    fn field_state(&self, name: &str) -> Option<FieldState>;
}

/// Document preview with nodes bound to field names.
pub trait PreviewSurface {
    /// Writes sanitized HTML into every node bound to `name`; returns the node count.
    fn write_bound_nodes(&mut self, name: &str, html: &str) -> usize;
}

/// Source of admin-authored form schemas.
#[async_trait]
pub trait FormSchemaSource: Send + Sync {
    /// Loads the schema registered under `form_key`.
    async fn load_form_schema(&self, form_key: &str) -> AppResult<FormSchema>;
}
