pub mod reorder;
pub mod stt;
pub mod worker;

pub use reorder::{ReadySlot, ReorderBuffer, SlotOutcome};
pub use stt::{PlainTextStt, SpeechToText, SttContext, SttError, Transcription};
pub use worker::{OrderedTranscript, WorkerConfig};
