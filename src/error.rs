//! # Engine Errors
//!
//! Typed failures surfaced by the session engine. Only session start can fail;
//! everything that happens afterwards (stale events, empty power-up inventory,
//! answers after the session ended) is a silent no-op instead of an error.

use thiserror::Error;

use crate::config::GameMode;

/// Errors returned when a session cannot be started.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The question provider returned nothing for this game.
    #[error("no questions available for game '{game_id}'")]
    NoQuestionsAvailable { game_id: String },

    /// Every record in the pool failed validation.
    #[error("none of the {rejected} questions for game '{game_id}' are playable")]
    NoValidQuestions { game_id: String, rejected: usize },

    /// The mode id is not one of the canonical modes.
    #[error("unknown game mode: '{0}'")]
    UnknownMode(String),

    /// The mode exists but its feature flag is switched off.
    #[error("game mode {0:?} is not enabled")]
    ModeDisabled(GameMode),

    /// A mode table entry breaks its own invariants.
    #[error("invalid configuration for mode {mode:?}: {reason}")]
    InvalidMode { mode: GameMode, reason: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;
