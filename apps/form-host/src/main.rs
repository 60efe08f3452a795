//! Tenderform host: loads a form, replays scripted edits and prints the result.

#![forbid(unsafe_code)]

mod event_script;
mod host_config;

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tenderform_application::{
    EvaluationReport, FieldValidationReport, FormSchemaSource, FormSession,
};
use tenderform_core::{AppError, AppResult};
use tenderform_domain::{FormSchema, RuleLintIssue};
use tenderform_infrastructure::{
    FieldSnapshot, InMemoryFormSurface, InMemoryPreviewDocument, JsonFileFormSchemaSource,
};
use tracing::info;

use crate::event_script::{RejectedInput, parse_script, replay};
use crate::host_config::{FormHostConfig, HostMode, init_tracing};

#[derive(Debug, Serialize)]
struct ReplayOutput<'a> {
    form_key: &'a str,
    matched_rules: Vec<&'a str>,
    last_report: &'a EvaluationReport,
    fields: BTreeMap<String, FieldSnapshot>,
    preview: &'a BTreeMap<String, Vec<String>>,
    validation: Vec<FieldValidationReport>,
    rejected_inputs: Vec<RejectedInput>,
    lint: Vec<RuleLintIssue>,
}

#[derive(Debug, Serialize)]
struct LintOutput<'a> {
    form_key: &'a str,
    rules: Vec<String>,
    lint: Vec<RuleLintIssue>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = FormHostConfig::load()?;
    let source = JsonFileFormSchemaSource::new(config.schema_dir.clone());

    match config.mode {
        HostMode::Lint => lint(&source, &config).await,
        HostMode::Replay => run_replay(&source, &config).await,
    }
}

async fn lint(source: &JsonFileFormSchemaSource, config: &FormHostConfig) -> AppResult<()> {
    let schema = source.load_form_schema(config.form_key.as_str()).await?;
    let output = LintOutput {
        form_key: config.form_key.as_str(),
        rules: schema
            .conditional_rules()
            .iter()
            .map(|rule| rule.describe(schema.fields()))
            .collect(),
        lint: schema.lint_rules(),
    };

    info!(form_key = %config.form_key, issues = output.lint.len(), "form schema linted");
    print_json(&output)
}

async fn run_replay(source: &JsonFileFormSchemaSource, config: &FormHostConfig) -> AppResult<()> {
    let stored = match &config.values_path {
        Some(path) => load_stored_values(path).await?,
        None => BTreeMap::new(),
    };
    let template = match &config.template_path {
        Some(path) => Some(read_file(path, "preview template").await?),
        None => None,
    };
    let steps = match &config.events_path {
        Some(path) => parse_script(read_file(path, "event script").await?.as_str())?,
        None => Vec::new(),
    };

    let mut build_error = None;
    let mut session = FormSession::open(
        source,
        config.form_key.as_str(),
        &config.engine_config(),
        |schema: &FormSchema| {
            let surface = InMemoryFormSurface::from_schema(schema, &stored);
            let preview = match template.as_deref() {
                Some(template) => InMemoryPreviewDocument::from_template(template)
                    .unwrap_or_else(|error| {
                        build_error = Some(error);
                        InMemoryPreviewDocument::new()
                    }),
                None => InMemoryPreviewDocument::from_schema(schema),
            };
            (surface, preview)
        },
    )
    .await?;
    if let Some(error) = build_error {
        return Err(error);
    }

    let rejected_inputs = replay(&mut session, &steps);
    info!(
        form_key = %config.form_key,
        steps = steps.len(),
        rejected = rejected_inputs.len(),
        "event script replayed"
    );

    let output = ReplayOutput {
        form_key: config.form_key.as_str(),
        matched_rules: session.last_report().matched_rules(),
        last_report: session.last_report(),
        fields: session.surface().snapshot(),
        preview: session.preview().bindings(),
        validation: session.validate(),
        rejected_inputs,
        lint: session.schema().lint_rules(),
    };

    print_json(&output)
}

async fn load_stored_values(path: &Path) -> AppResult<BTreeMap<String, String>> {
    let content = read_file(path, "stored values").await?;
    serde_json::from_str(content.as_str()).map_err(|error| {
        AppError::Validation(format!("invalid stored values {}: {error}", path.display()))
    })
}

async fn read_file(path: &Path, what: &str) -> AppResult<String> {
    tokio::fs::read_to_string(path).await.map_err(|error| {
        AppError::Internal(format!("failed to read {what} {}: {error}", path.display()))
    })
}

fn print_json(output: &impl Serialize) -> AppResult<()> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|error| AppError::Internal(format!("failed to encode output: {error}")))?;
    println!("{json}");
    Ok(())
}
