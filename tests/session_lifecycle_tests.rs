// Integration tests for the session lifecycle: start, stop, idempotency,
// and summary generation under degraded conditions.

mod common;

use common::{FailingSummarize, ScriptedStt, TestSessionBuilder};
use session_intel::audio::{CaptureDevice, IngestCapture, UnavailableCapture};
use session_intel::risk::{KeywordRiskClassifier, LogNotifier, Notifier, RiskEscalationChannel};
use session_intel::summary::OutlineSummarize;
use session_intel::{SessionController, SessionDeps, SessionError, SessionState};
use std::sync::Arc;
use std::time::Duration;

fn idle_session_with_unavailable_capture(id: &str) -> SessionController {
    let deps = SessionDeps {
        capture: Arc::new(UnavailableCapture),
        stt: Arc::new(ScriptedStt::new()),
        risk: Arc::new(KeywordRiskClassifier::new()),
        summarize: Arc::new(OutlineSummarize::new()),
        escalation: Arc::new(RiskEscalationChannel::new(
            Arc::new(LogNotifier) as Arc<dyn Notifier>,
            Arc::new(LogNotifier) as Arc<dyn Notifier>,
            common::fast_escalation_policy(),
        )),
    };
    SessionController::new(id.to_string(), common::fast_config(), deps)
}

#[tokio::test]
async fn test_stop_is_idempotent_and_produces_one_summary() {
    let session = TestSessionBuilder::new().start("s-stop-twice").await;

    session.feed_text(0, "talking about my week").await;
    let controller = Arc::clone(&session.controller);
    common::wait_for(Duration::from_secs(5), || {
        let c = Arc::clone(&controller);
        async move { c.transcript().await.len() >= 1 }
    })
    .await;

    let first = session.controller.stop().await.unwrap();
    let second = session.controller.stop().await.unwrap();

    assert_eq!(first.generated_at, second.generated_at, "same summary, not a regeneration");
    assert_eq!(first.insights, second.insights);
    assert_eq!(session.controller.state().await, SessionState::Closed);
}

#[tokio::test]
async fn test_concurrent_stops_resolve_to_the_same_summary() {
    let session = TestSessionBuilder::new().start("s-stop-race").await;
    session.feed_text(0, "a quick session").await;

    let a = Arc::clone(&session.controller);
    let b = Arc::clone(&session.controller);
    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { a.stop().await }),
        tokio::spawn(async move { b.stop().await }),
    );

    let sa = ra.unwrap().unwrap();
    let sb = rb.unwrap().unwrap();
    assert_eq!(sa.generated_at, sb.generated_at);
}

#[tokio::test]
async fn test_chunk_after_stop_is_rejected() {
    let session = TestSessionBuilder::new().start("s-late-chunk").await;
    session.controller.stop().await.unwrap();

    let err = session
        .controller
        .ingest(common::chunk("s-late-chunk", 7, "too late"))
        .await
        .unwrap_err();

    match err {
        SessionError::ChunkRejected { sequence, state, .. } => {
            assert_eq!(sequence, 7);
            assert_eq!(state, "closed");
        }
        other => panic!("expected ChunkRejected, got {other}"),
    }
}

#[tokio::test]
async fn test_all_transcription_failures_still_close_with_degraded_summary() {
    let stt = Arc::new(ScriptedStt::always_failing());
    let session = TestSessionBuilder::new().stt(stt).start("s-stt-down").await;

    for sequence in 0..3 {
        session.feed_text(sequence, "will never transcribe").await;
    }
    let controller = Arc::clone(&session.controller);
    common::wait_for(Duration::from_secs(10), || {
        let c = Arc::clone(&controller);
        async move { c.transcript().await.len() >= 3 }
    })
    .await;

    let summary = session.controller.stop().await.unwrap();

    let transcript = session.controller.transcript().await;
    assert_eq!(transcript.len(), 3, "every chunk still gets an ordered slot");
    assert!(transcript.iter().all(|s| s.degraded && s.text.is_empty()));
    assert!(summary.degraded);
    assert!(!summary.insights.is_empty(), "fallback summary is never empty");
}

#[tokio::test]
async fn test_summarizer_failure_falls_back_to_extractive_summary() {
    let session = TestSessionBuilder::new()
        .summarize(Arc::new(FailingSummarize))
        .start("s-summarizer-down")
        .await;

    session.feed_text(0, "we talked through the plan").await;
    let controller = Arc::clone(&session.controller);
    common::wait_for(Duration::from_secs(5), || {
        let c = Arc::clone(&controller);
        async move { c.transcript().await.len() >= 1 }
    })
    .await;

    let summary = session.controller.stop().await.unwrap();
    assert!(summary.degraded);
    assert!(summary
        .insights
        .iter()
        .any(|i| i.contains("we talked through the plan")));
}

#[tokio::test]
async fn test_capture_failure_leaves_session_idle() {
    let session = idle_session_with_unavailable_capture("s-no-capture");

    let err = session.start().await.unwrap_err();
    assert!(matches!(err, SessionError::CaptureUnavailable(_)));
    assert_eq!(session.state().await, SessionState::Idle);

    // An idle session holds no intake, so chunks are rejected
    let err = session
        .ingest(common::chunk("s-no-capture", 0, "hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::ChunkRejected { .. }));

    // Stop on an idle session is an explicit state error, not a summary
    let err = session.stop().await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidState { .. }));
}

#[tokio::test]
async fn test_stop_releases_the_ingest_capture_slot() {
    let capture = Arc::new(IngestCapture::new());
    let deps = SessionDeps {
        capture: Arc::clone(&capture) as Arc<dyn CaptureDevice>,
        stt: Arc::new(ScriptedStt::new()),
        risk: Arc::new(KeywordRiskClassifier::new()),
        summarize: Arc::new(OutlineSummarize::new()),
        escalation: Arc::new(RiskEscalationChannel::new(
            Arc::new(LogNotifier) as Arc<dyn Notifier>,
            Arc::new(LogNotifier) as Arc<dyn Notifier>,
            common::fast_escalation_policy(),
        )),
    };
    let session = SessionController::new("s-ingest".to_string(), common::fast_config(), deps);
    session.start().await.unwrap();

    session.ingest(common::chunk("s-ingest", 0, "checking in")).await.unwrap();
    session.stop().await.unwrap();

    // The device slot for this session id must be free again after stop
    assert!(capture.acquire("s-ingest").await.is_ok());
}

#[tokio::test]
async fn test_stats_report_monotonic_elapsed_and_counts() {
    let session = TestSessionBuilder::new().start("s-stats").await;
    session.feed_text(0, "counting this chunk").await;

    let controller = Arc::clone(&session.controller);
    common::wait_for(Duration::from_secs(5), || {
        let c = Arc::clone(&controller);
        async move { c.stats().await.segments >= 1 }
    })
    .await;

    let recording = session.controller.stats().await;
    assert_eq!(recording.state, SessionState::Recording);
    assert!(recording.started_at.is_some());
    assert_eq!(recording.segments, 1);

    session.controller.stop().await.unwrap();
    let closed = session.controller.stats().await;
    assert_eq!(closed.state, SessionState::Closed);

    // Elapsed freezes at stop
    let frozen = closed.elapsed_ms.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.controller.stats().await.elapsed_ms.unwrap(), frozen);
}
