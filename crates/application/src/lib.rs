//! Conditional logic engine, preview projection and form sessions.

#![forbid(unsafe_code)]

mod action_executor;
mod condition_evaluator;
mod engine_config;
mod form_ports;
mod form_session;
mod preview_projector;
mod rule_engine;

#[cfg(test)]
mod test_support;

pub use action_executor::{ActionContext, ActionOutcome, apply_action, interpolate_field_tokens};
pub use condition_evaluator::{evaluate, matches_operator};
pub use engine_config::{DEFAULT_SETTLE_DELAY, EngineConfig};
pub use form_ports::{
    FieldAccessor, FieldState, FieldValueProvider, FormSchemaSource, PreviewSurface,
};
pub use form_session::{FieldEvent, FieldEventKind, FieldValidationReport, FormSession};
pub use preview_projector::{DEFAULT_PREVIEW_PLACEHOLDER, PreviewProjector};
pub use rule_engine::{EvaluationReport, FieldBaseline, FieldRegistry, RuleEngine, RuleOutcome};
