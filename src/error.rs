//! Error types for lifecycle misuse and engine input validation.

use crate::types::SessionState;

/// A lifecycle operation was requested from a state that does not allow it.
///
/// These are rejections, never faults: the controller leaves its state
/// untouched and the caller may ignore the error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// `start_session` was called after the participant snapshot was taken.
    #[error("session already started")]
    AlreadyStarted,

    /// The registry produced no participants at snapshot time.
    #[error("cannot start a session without participants")]
    NoParticipants,

    /// The session has not been started yet.
    #[error("session not started")]
    NotStarted,

    /// The operation requires a running session.
    #[error("session is not playing (state: {state:?})")]
    NotPlaying { state: SessionState },

    /// `resume_session` requires a paused session.
    #[error("session is not paused (state: {state:?})")]
    NotPaused { state: SessionState },

    /// The session already reached `Won` or `Lost`.
    #[error("session already ended (state: {state:?})")]
    Terminal { state: SessionState },
}

/// Errors raised by the tick engine when handling participant input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("unknown participant: {id}")]
    UnknownParticipant { id: String },

    #[error("participant {id} has been caught")]
    ParticipantEliminated { id: String },

    #[error("coin not found: {id}")]
    CoinNotFound { id: String },

    #[error(transparent)]
    Session(#[from] SessionError),
}
