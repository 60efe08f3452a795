use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tenderform_application::FormSchemaSource;
use tenderform_core::{AppError, AppResult};
use tenderform_domain::FormSchema;

/// Loads form schemas from `<root>/<form_key>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileFormSchemaSource {
    root: PathBuf,
}

impl JsonFileFormSchemaSource {
    /// Creates a source reading schema documents below `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the schema directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, form_key: &str) -> AppResult<PathBuf> {
        let form_key = form_key.trim();
        let is_plain_key = !form_key.is_empty()
            && form_key
                .chars()
                .all(|character| character.is_alphanumeric() || matches!(character, '-' | '_'));

        if !is_plain_key {
            return Err(AppError::Validation(format!(
                "form key '{form_key}' must be non-empty and contain only letters, digits, '-' or '_'"
            )));
        }

        Ok(self.root.join(format!("{form_key}.json")))
    }
}

#[async_trait]
impl FormSchemaSource for JsonFileFormSchemaSource {
    async fn load_form_schema(&self, form_key: &str) -> AppResult<FormSchema> {
        let path = self.path_for(form_key)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|error| match error.kind() {
                ErrorKind::NotFound => AppError::NotFound(format!(
                    "form schema '{form_key}' does not exist at {}",
                    path.display()
                )),
                _ => AppError::Internal(format!(
                    "failed to read form schema {}: {error}",
                    path.display()
                )),
            })?;

        let schema: FormSchema = serde_json::from_str(content.as_str()).map_err(|error| {
            AppError::Validation(format!(
                "invalid form schema {}: {error}",
                path.display()
            ))
        })?;

        tracing::info!(
            form_key = %form_key,
            path = %path.display(),
            fields = schema.fields().len(),
            rules = schema.conditional_rules().len(),
            "loaded form schema"
        );

        Ok(schema)
    }
}
