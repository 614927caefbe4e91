// Integration tests for the out-of-band risk escalation path: delivery
// under latency, secondary fallback, and duplicate suppression.

mod common;

use chrono::Utc;
use common::{RecordingNotifier, ScriptedStt, SttBehavior, TestSessionBuilder};
use session_intel::risk::{Notifier, RiskEscalationChannel, RiskEvent, Severity};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_critical_risk_is_delivered_despite_notifier_latency() {
    let primary = Arc::new(RecordingNotifier::with_latency(Duration::from_millis(200)));
    let session = TestSessionBuilder::new()
        .primary_notifier(Arc::clone(&primary))
        .start("s-critical")
        .await;

    session.feed_text(0, "I think I want to die").await;

    let controller = Arc::clone(&session.controller);
    common::wait_for(Duration::from_secs(5), || {
        let c = Arc::clone(&controller);
        async move { c.transcript().await.len() >= 1 }
    })
    .await;

    // Stop drains the escalation channel before summarizing
    session.controller.stop().await.unwrap();

    let delivered = primary.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].severity, Severity::Critical);
    assert_eq!(delivered[0].source_sequence, 0);
    assert!(delivered[0].delivered_at.is_none(), "stamped after the ack, not before");
}

#[tokio::test]
async fn test_critical_risk_outruns_a_transcription_backlog() {
    // The chunk ahead of the crisis utterance is stuck in transcription for
    // far longer than the reorder window; the critical signal must still go
    // out once the window expires, not wait for the slow call to resolve
    let stt = Arc::new(ScriptedStt::new().with(0, SttBehavior::Delayed(Duration::from_secs(3))));
    let primary = Arc::new(RecordingNotifier::new());
    let session = TestSessionBuilder::new()
        .stt(stt)
        .primary_notifier(Arc::clone(&primary))
        .start("s-backlog")
        .await;

    session.feed_text(0, "a long rambling story").await;
    session.feed_text(1, "I want to die").await;

    // Deadline well under the scripted 3s stall: delivery must not be
    // serialized behind the stuck head-of-line chunk
    let notifier = Arc::clone(&primary);
    assert!(
        common::wait_for(Duration::from_millis(1500), || {
            let n = Arc::clone(&notifier);
            async move { !n.delivered().is_empty() }
        })
        .await,
        "critical signal was held behind the transcription backlog"
    );

    let delivered = primary.delivered();
    assert_eq!(delivered[0].severity, Severity::Critical);
    assert_eq!(delivered[0].source_sequence, 1);

    session.controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_primary_outage_falls_back_to_secondary() {
    // Primary fails every attempt it gets
    let primary = Arc::new(RecordingNotifier::failing_first(u32::MAX));
    let secondary = Arc::new(RecordingNotifier::new());
    let channel = RiskEscalationChannel::new(
        Arc::clone(&primary) as Arc<dyn Notifier>,
        Arc::clone(&secondary) as Arc<dyn Notifier>,
        common::fast_escalation_policy(),
    );

    channel
        .submit(RiskEvent {
            session_id: "s-fallback".to_string(),
            source_sequence: 4,
            severity: Severity::High,
            detected_at: Utc::now(),
            delivered_at: None,
        })
        .unwrap();

    assert!(channel.drain(Duration::from_secs(5)).await, "event never acknowledged");
    assert!(primary.delivered().is_empty());
    assert_eq!(secondary.delivered().len(), 1);

    let record = channel.delivered().await;
    assert_eq!(record.len(), 1);
    assert!(record[0].delivered_at.is_some());

    channel.shutdown().await;
}

#[tokio::test]
async fn test_duplicate_risk_events_are_delivered_once() {
    let primary = Arc::new(RecordingNotifier::new());
    let secondary = Arc::new(RecordingNotifier::new());
    let channel = RiskEscalationChannel::new(
        Arc::clone(&primary) as Arc<dyn Notifier>,
        Arc::clone(&secondary) as Arc<dyn Notifier>,
        common::fast_escalation_policy(),
    );

    let event = RiskEvent {
        session_id: "s-dup".to_string(),
        source_sequence: 2,
        severity: Severity::Critical,
        detected_at: Utc::now(),
        delivered_at: None,
    };
    channel.submit(event.clone()).unwrap();
    channel.submit(event).unwrap();

    assert!(channel.drain(Duration::from_secs(5)).await);
    assert_eq!(primary.delivered().len(), 1);

    channel.shutdown().await;
}

#[tokio::test]
async fn test_transient_primary_failures_retry_until_acknowledged() {
    let primary = Arc::new(RecordingNotifier::failing_first(1));
    let session = TestSessionBuilder::new()
        .primary_notifier(Arc::clone(&primary))
        .start("s-retry")
        .await;

    session.feed_text(0, "I've been thinking about suicide").await;

    let controller = Arc::clone(&session.controller);
    common::wait_for(Duration::from_secs(5), || {
        let c = Arc::clone(&controller);
        async move { c.transcript().await.len() >= 1 }
    })
    .await;
    session.controller.stop().await.unwrap();

    let delivered = primary.delivered();
    assert_eq!(delivered.len(), 1, "retry after the scripted failure must land");
    assert_eq!(delivered[0].severity, Severity::High);
}
