use serde::{Deserialize, Serialize};

/// Display literal for a checked checkbox or a legacy `"True"` value.
pub const CHECKED_DISPLAY: &str = "是";

/// Display literal for an unchecked checkbox or a legacy `"False"` value.
pub const UNCHECKED_DISPLAY: &str = "否";

/// Current value of one form field as read from the host surface.
///
/// Single checkboxes report [`FieldValue::Checked`]; every other control
/// reports text. Checkbox groups and multi-selects use a comma-joined list of
/// the selected raw values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean state of a single checkbox.
    Checked(bool),
    /// Text, selected value, or comma-joined multi-value list.
    Text(String),
}

impl FieldValue {
    /// Creates a text value.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Returns the value as authored conditions see it.
    ///
    /// Booleans and the legacy `"True"`/`"False"` strings collapse to
    /// [`CHECKED_DISPLAY`]/[`UNCHECKED_DISPLAY`].
    #[must_use]
    pub fn display_text(&self) -> String {
        match self {
            Self::Checked(true) => CHECKED_DISPLAY.to_owned(),
            Self::Checked(false) => UNCHECKED_DISPLAY.to_owned(),
            Self::Text(text) if text == "True" => CHECKED_DISPLAY.to_owned(),
            Self::Text(text) if text == "False" => UNCHECKED_DISPLAY.to_owned(),
            Self::Text(text) => text.clone(),
        }
    }

    /// Returns the stored representation (`"True"`/`"False"` for checkboxes).
    #[must_use]
    pub fn raw_text(&self) -> String {
        match self {
            Self::Checked(flag) => crate::legacy_flag(*flag).to_owned(),
            Self::Text(text) => text.clone(),
        }
    }

    /// Returns whether the value is an empty string. Unchecked boxes are not empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Checked(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}
