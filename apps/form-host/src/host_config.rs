use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tenderform_application::{DEFAULT_PREVIEW_PLACEHOLDER, DEFAULT_SETTLE_DELAY, EngineConfig};
use tenderform_core::{AppError, AppResult};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMode {
    Replay,
    Lint,
}

#[derive(Debug, Clone)]
pub struct FormHostConfig {
    pub mode: HostMode,
    pub schema_dir: PathBuf,
    pub form_key: String,
    pub values_path: Option<PathBuf>,
    pub events_path: Option<PathBuf>,
    pub template_path: Option<PathBuf>,
    pub settle_delay_ms: u64,
    pub preview_placeholder: String,
}

impl FormHostConfig {
    pub fn load() -> AppResult<Self> {
        let mode = match env::args().nth(1).as_deref() {
            None | Some("replay") => HostMode::Replay,
            Some("lint") => HostMode::Lint,
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "unknown command '{other}', expected 'replay' or 'lint'"
                )));
            }
        };

        let schema_dir = PathBuf::from(required_non_empty_env("FORM_SCHEMA_DIR")?);
        let form_key = required_non_empty_env("FORM_KEY")?;
        let default_delay_ms = u64::try_from(DEFAULT_SETTLE_DELAY.as_millis()).unwrap_or(200);
        let settle_delay_ms = parse_env_u64("FORM_SETTLE_DELAY_MS", default_delay_ms)?;
        let preview_placeholder = env::var("FORM_PREVIEW_PLACEHOLDER")
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_PREVIEW_PLACEHOLDER.to_owned());

        Ok(Self {
            mode,
            schema_dir,
            form_key,
            values_path: optional_path_env("FORM_VALUES_PATH"),
            events_path: optional_path_env("FORM_EVENTS_PATH"),
            template_path: optional_path_env("FORM_TEMPLATE_PATH"),
            settle_delay_ms,
            preview_placeholder,
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            preview_placeholder: self.preview_placeholder.clone(),
        }
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn required_non_empty_env(name: &str) -> AppResult<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn optional_path_env(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.trim().parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
