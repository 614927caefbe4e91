use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Recording,
    Stopping,
    Summarizing,
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Stopping => "stopping",
            Self::Summarizing => "summarizing",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a session, served over the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub session_id: String,
    pub coach_id: Option<String>,
    pub client_id: Option<String>,
    pub state: SessionState,
    pub started_at: Option<DateTime<Utc>>,
    /// Wall time spent recording, measured on the monotonic clock so a
    /// system clock adjustment mid-session cannot distort it
    pub elapsed_ms: Option<u64>,
    pub chunks_received: u64,
    pub segments: usize,
    pub degraded_segments: usize,
    pub prompts: usize,
    /// Risk events handed to the escalation channel but not yet acknowledged
    pub escalations_pending: usize,
    pub escalations_delivered: usize,
    /// Whether the backlog watchdog currently reports transcription as
    /// falling behind capture
    pub pipeline_degraded: bool,
}
