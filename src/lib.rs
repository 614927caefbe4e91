pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod prompts;
pub mod risk;
pub mod session;
pub mod summary;
pub mod transcript;
pub mod transcription;

pub use audio::{AudioChunk, CaptureDevice, ChannelCapture, IngestCapture};
pub use config::Config;
pub use error::SessionError;
pub use events::SessionEvent;
pub use http::{create_router, AppState};
pub use prompts::{CoachingPrompt, PromptKind, PromptPriority};
pub use risk::{KeywordRiskClassifier, RiskEscalationChannel, Severity};
pub use session::{SessionConfig, SessionController, SessionDeps, SessionState, SessionStats};
pub use summary::{OutlineSummarize, SessionSummary};
pub use transcript::{Speaker, TranscriptSegment};
pub use transcription::{PlainTextStt, SpeechToText};
