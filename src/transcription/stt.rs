use crate::audio::AudioChunk;
use crate::transcript::Speaker;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output of one speech-to-text call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    /// Best-effort speaker attribution from the service, if it has one
    pub speaker_hint: Option<Speaker>,
    pub confidence: Option<f32>,
}

/// Context handed to the service alongside the chunk, for engines that use
/// the preceding conversation to improve accuracy.
#[derive(Debug, Clone, Default)]
pub struct SttContext {
    /// Most recent transcribed lines, oldest first
    pub recent_lines: Vec<String>,
}

/// Failure modes of the external service.
///
/// The worker retries `Transient` with bounded backoff; `Permanent` inserts
/// a degraded segment immediately to preserve log ordering.
#[derive(Debug, Error)]
pub enum SttError {
    #[error("transient speech-to-text failure: {0}")]
    Transient(String),
    #[error("permanent speech-to-text failure: {0}")]
    Permanent(String),
}

/// External speech-to-text service.
#[async_trait::async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(
        &self,
        chunk: &AudioChunk,
        context: &SttContext,
    ) -> Result<Transcription, SttError>;

    fn name(&self) -> &str;
}

/// Loopback engine that treats the chunk payload as UTF-8 text.
///
/// Useful for development and tests where no real STT service is wired: the
/// producer writes the "speech" directly into the chunk payload.
pub struct PlainTextStt;

#[async_trait::async_trait]
impl SpeechToText for PlainTextStt {
    async fn transcribe(
        &self,
        chunk: &AudioChunk,
        _context: &SttContext,
    ) -> Result<Transcription, SttError> {
        let text = String::from_utf8(chunk.payload.clone())
            .map_err(|e| SttError::Permanent(format!("payload is not UTF-8 text: {e}")))?;
        Ok(Transcription {
            text,
            speaker_hint: None,
            confidence: Some(1.0),
        })
    }

    fn name(&self) -> &str {
        "plaintext"
    }
}
