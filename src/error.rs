use thiserror::Error;

/// Errors surfaced by the session pipeline.
///
/// Transient conditions (STT retries, escalation redelivery) are handled
/// inside the components that own them; anything that reaches this type is
/// either fatal to the operation or must be visible to the caller.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The capture device could not be acquired. Fatal to `start()`; the
    /// session stays Idle.
    #[error("capture device unavailable: {0}")]
    CaptureUnavailable(String),

    /// A chunk arrived while the session was not accepting intake.
    /// Rejected explicitly rather than silently dropped.
    #[error("chunk {sequence} rejected: session {session_id} is {state}")]
    ChunkRejected {
        session_id: String,
        sequence: u64,
        state: &'static str,
    },

    /// An operation was attempted in a state that does not allow it.
    #[error("session {session_id} is {actual}, expected {expected}")]
    InvalidState {
        session_id: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Internal ordering invariant violated when appending to the
    /// transcript log. Always a bug in the reorder path, never recoverable.
    #[error("transcript log order violation: got sequence {got}, expected {expected}")]
    OrderViolation { expected: u64, got: u64 },
}
