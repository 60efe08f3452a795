use std::time::Duration;

use crate::preview_projector::DEFAULT_PREVIEW_PLACEHOLDER;

/// Default wait between engine start-up and the first evaluation pass.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Runtime settings of one form session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// One-shot delay before the first evaluation pass so the host can finish rendering.
    pub settle_delay: Duration,
    /// Preview text for fields without a value.
    pub preview_placeholder: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            preview_placeholder: DEFAULT_PREVIEW_PLACEHOLDER.to_owned(),
        }
    }
}

impl EngineConfig {
    /// Returns a copy with a different settle delay.
    #[must_use]
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }
}
