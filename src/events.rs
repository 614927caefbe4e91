use crate::prompts::{PromptKind, PromptPriority};
use crate::risk::Severity;
use serde::Serialize;
use tokio::sync::broadcast;

/// Events streamed to the UI sink for one session.
///
/// The sink is a read-only consumer: everything here is also queryable
/// through the HTTP API, the stream just removes the need to poll.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A transcript segment was appended to the ordered log
    SegmentAppended {
        sequence: u64,
        degraded: bool,
    },
    /// A coaching prompt was issued
    PromptIssued {
        id: String,
        kind: PromptKind,
        priority: PromptPriority,
        title: String,
    },
    /// A risk event was handed to the escalation channel
    RiskEscalated {
        sequence: u64,
        severity: Severity,
    },
    /// Transcription is falling behind capture; chunks are still being
    /// drained, but the coach should rely on manual judgment
    PipelineDegraded { queue_depth: usize },
    /// The backlog cleared
    PipelineRecovered,
    /// The post-session summary is available
    SummaryReady { degraded: bool },
}

/// Create the per-session event channel for UI consumers.
pub fn channel(capacity: usize) -> broadcast::Sender<SessionEvent> {
    let (tx, _rx) = broadcast::channel(capacity);
    tx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_snake_case_tags() {
        let event = SessionEvent::SegmentAppended {
            sequence: 3,
            degraded: false,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "segment_appended");
        assert_eq!(json["sequence"], 3);

        let event = SessionEvent::RiskEscalated {
            sequence: 7,
            severity: Severity::Critical,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "risk_escalated");
        assert_eq!(json["severity"], "critical");
    }
}
