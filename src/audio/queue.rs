use super::capture::AudioChunk;
use crate::events::SessionEvent;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

/// Bounded per-session FIFO between capture and transcription.
///
/// Chunks are never dropped: when transcription falls behind, the producer
/// blocks on the bounded channel and a "pipeline degraded" signal is raised
/// once queue depth crosses the watchdog watermark. The signal clears once
/// the backlog has drained to half the watermark, so it does not flap at the
/// boundary.
pub struct AudioChunkQueue {
    tx: mpsc::Sender<AudioChunk>,
    depth: Arc<AtomicUsize>,
    watermark: usize,
    degraded: Arc<AtomicBool>,
    events: broadcast::Sender<SessionEvent>,
}

/// Consumer half of the queue, owned by the transcription worker.
pub struct AudioChunkReceiver {
    rx: mpsc::Receiver<AudioChunk>,
    depth: Arc<AtomicUsize>,
    watermark: usize,
    degraded: Arc<AtomicBool>,
    events: broadcast::Sender<SessionEvent>,
}

impl AudioChunkQueue {
    pub fn new(
        capacity: usize,
        watermark: usize,
        events: broadcast::Sender<SessionEvent>,
    ) -> (Self, AudioChunkReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        let depth = Arc::new(AtomicUsize::new(0));
        let degraded = Arc::new(AtomicBool::new(false));

        let queue = Self {
            tx,
            depth: Arc::clone(&depth),
            watermark,
            degraded: Arc::clone(&degraded),
            events: events.clone(),
        };
        let receiver = AudioChunkReceiver {
            rx,
            depth,
            watermark,
            degraded,
            events,
        };
        (queue, receiver)
    }

    /// Enqueue a chunk, applying backpressure when full.
    ///
    /// Returns an error only when the consumer side has shut down.
    pub async fn push(&self, chunk: AudioChunk) -> anyhow::Result<()> {
        let sequence = chunk.sequence;
        self.tx
            .send(chunk)
            .await
            .map_err(|_| anyhow::anyhow!("chunk queue closed while pushing chunk {}", sequence))?;

        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        if depth > self.watermark && !self.degraded.swap(true, Ordering::SeqCst) {
            warn!(
                depth,
                watermark = self.watermark,
                "transcription falling behind capture, raising degraded signal"
            );
            let _ = self.events.send(SessionEvent::PipelineDegraded { queue_depth: depth });
        }
        Ok(())
    }

    /// Whether the watchdog currently reports the pipeline as degraded
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

impl AudioChunkReceiver {
    /// Receive the next chunk in arrival order.
    ///
    /// Returns `None` once the intake side has closed and the queue drained.
    pub async fn recv(&mut self) -> Option<AudioChunk> {
        let chunk = self.rx.recv().await?;

        let depth = self.depth.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        if depth <= self.watermark / 2 && self.degraded.swap(false, Ordering::SeqCst) {
            info!(depth, "transcription backlog cleared");
            let _ = self.events.send(SessionEvent::PipelineRecovered);
        }
        Some(chunk)
    }
}
