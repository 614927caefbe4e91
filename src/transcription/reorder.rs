use super::stt::Transcription;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Completion outcome for one chunk's transcription.
#[derive(Debug)]
pub enum SlotOutcome {
    Transcribed(Transcription),
    /// Permanent failure; the slot is still inserted (degraded) to preserve
    /// ordering and visibility
    Failed(String),
}

/// A slot released by the buffer in strict sequence order.
#[derive(Debug)]
pub enum ReadySlot {
    Transcribed {
        sequence: u64,
        transcription: Transcription,
    },
    Degraded {
        sequence: u64,
        reason: String,
    },
}

impl ReadySlot {
    pub fn sequence(&self) -> u64 {
        match self {
            ReadySlot::Transcribed { sequence, .. } => *sequence,
            ReadySlot::Degraded { sequence, .. } => *sequence,
        }
    }
}

/// Reorders out-of-order transcription completions into a strictly
/// sequenced stream.
///
/// This is the sole serialization point for transcript ordering: slots are
/// released only once every smaller sequence has been released. A head-of-
/// line gap older than `max_wait` is filled with degraded slots rather than
/// blocking the log indefinitely. Completions for already-released sequences
/// are ignored, so a retried chunk can never produce a duplicate segment.
pub struct ReorderBuffer {
    next: u64,
    max_wait: Duration,
    pending: BTreeMap<u64, SlotOutcome>,
    /// Since when out-of-order completions have been waiting on the head gap
    blocked_since: Option<Instant>,
}

impl ReorderBuffer {
    pub fn new(max_wait: Duration) -> Self {
        Self {
            next: 0,
            max_wait,
            pending: BTreeMap::new(),
            blocked_since: None,
        }
    }

    /// Next sequence number the buffer is waiting to release
    pub fn next_sequence(&self) -> u64 {
        self.next
    }

    /// Insert a completion; returns every slot that became releasable.
    ///
    /// Duplicates (sequence already released or already pending) release
    /// nothing.
    pub fn insert(&mut self, sequence: u64, outcome: SlotOutcome, now: Instant) -> Vec<ReadySlot> {
        if sequence < self.next || self.pending.contains_key(&sequence) {
            return Vec::new();
        }
        self.pending.insert(sequence, outcome);
        self.release(now)
    }

    /// Fill the head gap with degraded slots if it has been blocking longer
    /// than `max_wait`, then release what follows.
    pub fn flush_expired(&mut self, now: Instant) -> Vec<ReadySlot> {
        let expired = self
            .blocked_since
            .is_some_and(|since| now.duration_since(since) >= self.max_wait);
        if !expired {
            return Vec::new();
        }

        let first_pending = match self.pending.keys().next() {
            Some(&seq) => seq,
            None => return Vec::new(),
        };

        let mut out = self.fill_gap(first_pending);
        out.extend(self.release(now));
        out
    }

    /// Force-release everything: fill all gaps and drain all pending slots.
    /// Used when the session is finalizing.
    pub fn flush_all(&mut self, now: Instant) -> Vec<ReadySlot> {
        let mut out = Vec::new();
        while let Some(&first_pending) = self.pending.keys().next() {
            out.extend(self.fill_gap(first_pending));
            out.extend(self.release(now));
        }
        out
    }

    /// Whether any completions are parked behind a gap
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn fill_gap(&mut self, up_to: u64) -> Vec<ReadySlot> {
        let mut out = Vec::new();
        while self.next < up_to {
            out.push(ReadySlot::Degraded {
                sequence: self.next,
                reason: "transcription did not complete within the reorder window".into(),
            });
            self.next += 1;
        }
        out
    }

    fn release(&mut self, now: Instant) -> Vec<ReadySlot> {
        let mut out = Vec::new();
        while let Some(outcome) = self.pending.remove(&self.next) {
            let slot = match outcome {
                SlotOutcome::Transcribed(t) => ReadySlot::Transcribed {
                    sequence: self.next,
                    transcription: t,
                },
                SlotOutcome::Failed(reason) => ReadySlot::Degraded {
                    sequence: self.next,
                    reason,
                },
            };
            out.push(slot);
            self.next += 1;
        }

        self.blocked_since = if self.pending.is_empty() {
            None
        } else if self.blocked_since.is_none() {
            Some(now)
        } else {
            self.blocked_since
        };

        out
    }
}
