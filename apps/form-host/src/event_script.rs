use serde::{Deserialize, Serialize};
use tenderform_application::{FieldEvent, FieldEventKind, FormSession};
use tenderform_core::{AppError, AppResult};
use tenderform_infrastructure::{InMemoryFormSurface, InMemoryPreviewDocument};


/// One scripted user edit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ScriptedInput {
    ToggleOption {
        field: String,
        option: String,
        checked: bool,
    },
    SetChecked {
        field: String,
        checked: bool,
    },
    EnterValue {
        field: String,
        value: String,
    },
}

impl ScriptedInput {
    pub fn field(&self) -> &str {
        match self {
            Self::ToggleOption { field, .. }
            | Self::SetChecked { field, .. }
            | Self::EnterValue { field, .. } => field.as_str(),
        }
    }

    fn apply(&self, surface: &mut InMemoryFormSurface) -> AppResult<()> {
        match self {
            Self::ToggleOption {
                field,
                option,
                checked,
            } => surface.toggle_option(field, option, *checked),
            Self::SetChecked { field, checked } => surface.set_checked(field, *checked),
            Self::EnterValue { field, value } => surface.enter_value(field, value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptStep {
    #[serde(flatten)]
    pub input: ScriptedInput,
    #[serde(default)]
    pub event: Option<FieldEventKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedInput {
    pub step: usize,
    pub field: String,
    pub reason: String,
}

pub type HostSession = FormSession<InMemoryFormSurface, InMemoryPreviewDocument>;

pub fn parse_script(content: &str) -> AppResult<Vec<ScriptStep>> {
    serde_json::from_str(content)
        .map_err(|error| AppError::Validation(format!("invalid event script: {error}")))
}

/// Applies every step in order and raises its event.
///
/// A rejected edit still raises its event; the rejection is returned.
pub fn replay(session: &mut HostSession, steps: &[ScriptStep]) -> Vec<RejectedInput> {
    let mut rejected = Vec::new();

    for (index, step) in steps.iter().enumerate() {
        let field = step.input.field();
        if let Err(error) = step.input.apply(session.surface_mut()) {
            tracing::warn!(step = index, field = %field, error = %error, "scripted input rejected");
            rejected.push(RejectedInput {
                step: index,
                field: field.to_owned(),
                reason: error.to_string(),
            });
        }

        let event = match step.event.unwrap_or(FieldEventKind::Change) {
            FieldEventKind::Change => FieldEvent::change(field),
            FieldEventKind::Input => FieldEvent::input(field),
        };
        let report = session.handle_event(&event);
        tracing::debug!(
            step = index,
            field = %field,
            matched = report.matched_rules().len(),
            "scripted event handled"
        );
    }

    rejected
}
