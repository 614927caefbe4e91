pub mod capture;
pub mod queue;

pub use capture::{AudioChunk, CaptureDevice, ChannelCapture, IngestCapture, UnavailableCapture};
pub use queue::{AudioChunkQueue, AudioChunkReceiver};
