use serde::{Deserialize, Serialize};
use tenderform_core::AppResult;
use tenderform_domain::{CHECKED_DISPLAY, FieldValue, FormSchema, ValidationViolation};

use crate::engine_config::EngineConfig;
use crate::form_ports::{FieldAccessor, FormSchemaSource, PreviewSurface};
use crate::preview_projector::PreviewProjector;
use crate::rule_engine::{EvaluationReport, RuleEngine};


/// Kind of host event that starts an evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldEventKind {
    /// Keystroke-level edit.
    Input,
    /// Committed change (selection, toggle, blur).
    Change,
}

/// One `input`/`change` notification from the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEvent {
    /// Field that changed.
    pub field: String,
    /// Event kind.
    pub kind: FieldEventKind,
}

impl FieldEvent {
    /// Creates a `change` event.
    #[must_use]
    pub fn change(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: FieldEventKind::Change,
        }
    }

    /// Creates an `input` event.
    #[must_use]
    pub fn input(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: FieldEventKind::Input,
        }
    }
}

/// Validation problems of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValidationReport {
    /// Field name.
    pub field: String,
    /// Field label.
    pub label: String,
    /// Failed declared rules.
    pub violations: Vec<ValidationViolation>,
    /// Message attached by a cross-field comparison.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison_message: Option<String>,
}

/// One open form: schema, engine, live surface and preview.
///
/// Owns every piece of per-form state; dropping it tears the form down.
pub struct FormSession<S, P> {
    schema: FormSchema,
    engine: RuleEngine,
    projector: PreviewProjector,
    surface: S,
    preview: P,
    last_report: EvaluationReport,
}

impl<S, P> FormSession<S, P>
where
    S: FieldAccessor,
    P: PreviewSurface,
{
    /// Loads a schema and starts a session on the surface `build` renders for it.
    pub async fn open<F>(
        source: &dyn FormSchemaSource,
        form_key: &str,
        config: &EngineConfig,
        build: F,
    ) -> AppResult<Self>
    where
        F: FnOnce(&FormSchema) -> (S, P),
    {
        let schema = source.load_form_schema(form_key).await?;
        for issue in schema.lint_rules() {
            tracing::warn!(form_key = %form_key, issue = ?issue, "conditional rule lint");
        }

        let (surface, preview) = build(&schema);
        Ok(Self::start(schema, surface, preview, config).await)
    }

    /// Initializes the engine, waits the settle delay, runs the first pass
    /// and projects the initial preview.
    pub async fn start(schema: FormSchema, mut surface: S, mut preview: P, config: &EngineConfig) -> Self {
        let engine = RuleEngine::initialize(&schema, &mut surface);

        if !config.settle_delay.is_zero() {
            tokio::time::sleep(config.settle_delay).await;
        }

        let last_report = engine.evaluate_all(&mut surface);
        let projector = PreviewProjector::new(config.preview_placeholder.as_str());
        let projected = projector.project_all(&mut preview, &schema, &surface);

        tracing::info!(
            fields = schema.fields().len(),
            rules = schema.conditional_rules().len(),
            preview_nodes = projected,
            "form session opened"
        );

        Self {
            schema,
            engine,
            projector,
            surface,
            preview,
            last_report,
        }
    }

    /// Re-evaluates every rule and mirrors the changed fields into the preview.
    ///
    /// Besides the field that raised the event, every field whose selection
    /// the rules cleared is projected again.
    pub fn handle_event(&mut self, event: &FieldEvent) -> &EvaluationReport {
        let name = event.field.as_str();
        if !self.surface.has_field(name) {
            tracing::debug!(field = %name, "event from a field outside the form");
        }

        self.last_report = self.engine.evaluate_all(&mut self.surface);

        let changed = self
            .last_report
            .changed_fields
            .iter()
            .map(String::as_str)
            .filter(|changed| *changed != name);
        for field_name in std::iter::once(name).chain(changed) {
            if let Some(field) = self.schema.field(field_name)
                && let Some(value) = self.surface.field_value(field_name)
            {
                self.projector
                    .project_field(&mut self.preview, field, &value);
            }
        }

        &self.last_report
    }

    /// Checks every visible, enabled field against its declared rules.
    ///
    /// Uses the live required flag, so rule-driven requirement changes apply.
    #[must_use]
    pub fn validate(&self) -> Vec<FieldValidationReport> {
        self.schema
            .fields()
            .iter()
            .filter_map(|field| {
                let name = field.name().as_str();
                let state = self.surface.field_state(name)?;
                if state.hidden || state.disabled {
                    return None;
                }

                let text = match self.surface.field_value(name)? {
                    FieldValue::Checked(true) => CHECKED_DISPLAY.to_owned(),
                    FieldValue::Checked(false) => String::new(),
                    FieldValue::Text(text) => text,
                };
                let violations = field.validation_rules().check(
                    field.field_type(),
                    field.label().as_str(),
                    text.as_str(),
                    state.required,
                );
                let comparison_message =
                    Some(state.validation_message).filter(|message| !message.is_empty());

                if violations.is_empty() && comparison_message.is_none() {
                    return None;
                }

                Some(FieldValidationReport {
                    field: name.to_owned(),
                    label: field.label().as_str().to_owned(),
                    violations,
                    comparison_message,
                })
            })
            .collect()
    }

    /// Returns the loaded schema.
    #[must_use]
    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    /// Returns the report of the most recent evaluation pass.
    #[must_use]
    pub fn last_report(&self) -> &EvaluationReport {
        &self.last_report
    }

    /// Returns the live form surface.
    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Returns the live form surface for host-side edits.
    ///
    /// Follow every edit with [`FormSession::handle_event`].
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Returns the preview surface.
    #[must_use]
    pub fn preview(&self) -> &P {
        &self.preview
    }
}
