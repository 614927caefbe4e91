use crate::error::SessionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};

/// One fixed-duration unit of captured audio.
///
/// The payload is opaque to the pipeline (PCM or encoded bytes destined for
/// the speech-to-text service). Sequence numbers are assigned by the capture
/// side and are monotonic per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioChunk {
    pub session_id: String,
    /// Monotonic per-session sequence number, starting at 0
    pub sequence: u64,
    /// When the chunk was captured
    pub captured_at: DateTime<Utc>,
    /// Opaque audio payload
    pub payload: Vec<u8>,
}

/// Capture device abstraction.
///
/// Implementations hand out a per-session stream of fixed-duration chunks.
/// Failure to acquire the device is fatal to session start.
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Acquire a chunk stream for the given session.
    ///
    /// Returns `SessionError::CaptureUnavailable` when the underlying device
    /// cannot be opened.
    async fn acquire(&self, session_id: &str) -> Result<mpsc::Receiver<AudioChunk>, SessionError>;

    /// Release per-session resources held since `acquire`.
    ///
    /// Called when the session stops. Devices without per-session state keep
    /// the default no-op.
    async fn release(&self, _session_id: &str) {}

    /// Device name for logging
    fn name(&self) -> &str;
}

/// Capture device fed manually through a channel.
///
/// Used by integration tests and by deployments where chunks arrive over an
/// ingest API rather than from local hardware. `acquire` may be called once
/// per constructed device; a second call reports the device as busy.
pub struct ChannelCapture {
    receiver: Mutex<Option<mpsc::Receiver<AudioChunk>>>,
    sender: mpsc::Sender<AudioChunk>,
}

impl ChannelCapture {
    pub fn new(buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer);
        Self {
            receiver: Mutex::new(Some(rx)),
            sender: tx,
        }
    }

    /// Producer handle for pushing chunks into the capture stream
    pub fn sender(&self) -> mpsc::Sender<AudioChunk> {
        self.sender.clone()
    }
}

#[async_trait::async_trait]
impl CaptureDevice for ChannelCapture {
    async fn acquire(&self, _session_id: &str) -> Result<mpsc::Receiver<AudioChunk>, SessionError> {
        self.receiver
            .lock()
            .await
            .take()
            .ok_or_else(|| SessionError::CaptureUnavailable("capture stream already in use".into()))
    }

    fn name(&self) -> &str {
        "channel"
    }
}

/// Capture device for ingest deployments where audio arrives over the API.
///
/// Hands out a stream per session that stays open but never yields; chunks
/// enter the pipeline through the session's ingest path instead. The held
/// sender is dropped by `release` when the session stops.
#[derive(Default)]
pub struct IngestCapture {
    held: Mutex<std::collections::HashMap<String, mpsc::Sender<AudioChunk>>>,
}

impl IngestCapture {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CaptureDevice for IngestCapture {
    async fn acquire(&self, session_id: &str) -> Result<mpsc::Receiver<AudioChunk>, SessionError> {
        let mut held = self.held.lock().await;
        if held.contains_key(session_id) {
            return Err(SessionError::CaptureUnavailable(format!(
                "session {session_id} already holds a capture stream"
            )));
        }
        let (tx, rx) = mpsc::channel(1);
        held.insert(session_id.to_string(), tx);
        Ok(rx)
    }

    async fn release(&self, session_id: &str) {
        self.held.lock().await.remove(session_id);
    }

    fn name(&self) -> &str {
        "ingest"
    }
}

/// Capture device that always fails to acquire.
///
/// Stand-in for deployments where no capture integration is wired yet;
/// sessions started against it fail fast with `CaptureUnavailable`.
pub struct UnavailableCapture;

#[async_trait::async_trait]
impl CaptureDevice for UnavailableCapture {
    async fn acquire(&self, _session_id: &str) -> Result<mpsc::Receiver<AudioChunk>, SessionError> {
        Err(SessionError::CaptureUnavailable(
            "no capture device configured".into(),
        ))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}
