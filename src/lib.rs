//! # Quiz Engine
//!
//! The session engine behind a single quiz play-through: mode selection,
//! question preparation, per-question and session clocks, power-ups, streak
//! scoring and the final XP settlement.
//!
//! [`session::SessionController`] is the entry point. Question storage and the
//! leveling curve are collaborators behind [`data_loader::QuestionProvider`]
//! and [`leveling::LevelingOracle`].

pub mod config;
pub mod data_loader;
pub mod error;
pub mod leveling;
pub mod power_ups;
pub mod question;
pub mod scoring;
pub mod session;
pub mod telemetry;
pub mod timing;

pub use config::{EngineConfig, GameMode};
pub use error::EngineError;
pub use question::{Answer, Question, QuestionRecord};
pub use scoring::{EndReason, ResultSettlement};
pub use session::{Phase, SessionController, SessionState};
