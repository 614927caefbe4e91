use crate::prompts::PromptEngineConfig;
use crate::transcription::WorkerConfig;
use std::time::Duration;

/// Per-session pipeline tuning.
///
/// Defaults are sized for a one-hour coaching call with five-second audio
/// chunks; a deployment overrides them through the service configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bounded capacity of the capture-to-transcription queue
    pub queue_capacity: usize,
    /// Queue depth at which the degraded signal is raised
    pub queue_watermark: usize,
    /// Capacity of the UI event channel
    pub event_capacity: usize,
    pub worker: WorkerConfig,
    pub prompts: PromptEngineConfig,
    /// Deadline for the summarization backend before the extractive
    /// fallback kicks in
    pub summary_timeout: Duration,
    /// How long stop waits for the pipeline to drain before degrading
    pub stop_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            queue_watermark: 16,
            event_capacity: 256,
            worker: WorkerConfig::default(),
            prompts: PromptEngineConfig::default(),
            summary_timeout: Duration::from_secs(10),
            stop_grace: Duration::from_secs(10),
        }
    }
}
