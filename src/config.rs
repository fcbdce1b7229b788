//! # Game Configuration Module
//!
//! This module holds the static mode table and the tunable engine settings.
//! It defines the canonical game modes, the per-mode timing rules, the feature
//! flags that gate optional modes, and the interactive mode picker used by the
//! terminal front end.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Select};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::power_ups::PowerUpInventory;

/// Feature flag name that gates Blitz mode.
pub const BLITZ_FLAG: &str = "BLITZ";

/// Defines the canonical ways a session can be played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Ten questions, each on its own 15 second clock.
    Standard,
    /// Five questions on a 10 second clock with an advisory session clock.
    Quick,
    /// Ten questions racing a hard 90 second session clock.
    Blitz,
}

impl GameMode {
    pub fn all() -> &'static [GameMode] {
        &[GameMode::Standard, GameMode::Quick, GameMode::Blitz]
    }

    /// Stable identifier used by callers and telemetry.
    pub fn id(&self) -> &'static str {
        match self {
            GameMode::Standard => "standard",
            GameMode::Quick => "quick",
            GameMode::Blitz => "blitz",
        }
    }

    /// The mode table entry for this mode.
    pub fn config(&self) -> ModeConfig {
        match self {
            GameMode::Standard => ModeConfig {
                mode: *self,
                question_count: 10,
                label: "Standard",
                per_question_seconds: 15,
                session_seconds: None,
                session_clock_hard: false,
                feature_flag: None,
            },
            GameMode::Quick => ModeConfig {
                mode: *self,
                question_count: 5,
                label: "Quick Play",
                per_question_seconds: 10,
                session_seconds: Some(60),
                session_clock_hard: false,
                feature_flag: None,
            },
            GameMode::Blitz => ModeConfig {
                mode: *self,
                question_count: 10,
                label: "Blitz",
                per_question_seconds: 15,
                session_seconds: Some(90),
                session_clock_hard: true,
                feature_flag: Some(BLITZ_FLAG),
            },
        }
    }

    /// Quick and Blitz settle against the answered count rather than the
    /// nominal question count.
    pub fn is_time_boxed(&self) -> bool {
        matches!(self, GameMode::Quick | GameMode::Blitz)
    }

    /// Scale applied to the clamped XP total at settlement.
    pub fn xp_multiplier(&self) -> f64 {
        match self {
            GameMode::Standard => 1.0,
            GameMode::Quick => 0.8,
            GameMode::Blitz => 1.5,
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for GameMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(GameMode::Standard),
            "quick" => Ok(GameMode::Quick),
            "blitz" => Ok(GameMode::Blitz),
            _ => Err(EngineError::UnknownMode(s.to_string())),
        }
    }
}

/// One row of the static mode table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeConfig {
    pub mode: GameMode,
    /// How many questions a session draws from the pool.
    pub question_count: usize,
    pub label: &'static str,
    /// Base allotment for every question's countdown.
    pub per_question_seconds: u32,
    /// Session-wide countdown, if the mode has one.
    pub session_seconds: Option<u32>,
    /// Whether the session clock ends the session on expiry or is only shown.
    pub session_clock_hard: bool,
    /// Flag that must be enabled for the mode to be offered.
    pub feature_flag: Option<&'static str>,
}

impl ModeConfig {
    /// Checks the table invariants for this entry.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.question_count == 0 {
            return Err(EngineError::InvalidMode {
                mode: self.mode,
                reason: "question count must be positive".to_string(),
            });
        }
        if let Some(session) = self.session_seconds {
            if session <= self.per_question_seconds {
                return Err(EngineError::InvalidMode {
                    mode: self.mode,
                    reason: format!(
                        "session clock ({}s) must exceed the per-question clock ({}s)",
                        session, self.per_question_seconds
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Feature switches supplied by the surrounding application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default)]
    pub blitz: bool,
}

impl FeatureFlags {
    pub fn is_enabled(&self, flag: &str) -> bool {
        match flag {
            BLITZ_FLAG => self.blitz,
            _ => false,
        }
    }
}

/// Tunable engine settings, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub features: FeatureFlags,
    /// Inventory every new session starts with.
    #[serde(default)]
    pub power_ups: PowerUpInventory,
    /// Seconds granted by one time-bonus power-up.
    #[serde(default = "default_time_bonus_seconds")]
    pub time_bonus_seconds: u32,
    /// An answer counts as fast when it lands within this many seconds of the
    /// full allotment.
    #[serde(default = "default_fast_answer_window")]
    pub fast_answer_window: u32,
    /// Upper bound for the pre-multiplier XP total.
    #[serde(default = "default_xp_cap")]
    pub xp_cap: u32,
}

fn default_time_bonus_seconds() -> u32 {
    10
}

fn default_fast_answer_window() -> u32 {
    3
}

fn default_xp_cap() -> u32 {
    1000
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            features: FeatureFlags::default(),
            power_ups: PowerUpInventory::default(),
            time_bonus_seconds: default_time_bonus_seconds(),
            fast_answer_window: default_fast_answer_window(),
            xp_cap: default_xp_cap(),
        }
    }
}

impl EngineConfig {
    /// Modes the surrounding application may offer under the current flags.
    pub fn available_modes(&self) -> Vec<GameMode> {
        GameMode::all()
            .iter()
            .copied()
            .filter(|mode| self.is_mode_enabled(*mode))
            .collect()
    }

    pub fn is_mode_enabled(&self, mode: GameMode) -> bool {
        mode.config()
            .feature_flag
            .map_or(true, |flag| self.features.is_enabled(flag))
    }
}

/// Prompts the user to pick one of the enabled modes.
///
/// Returns an `Err` if the terminal interaction fails or the user cancels.
pub fn prompt_mode(config: &EngineConfig) -> Result<GameMode> {
    let theme = ColorfulTheme::default();
    let modes = config.available_modes();
    let labels: Vec<String> = modes
        .iter()
        .map(|mode| {
            let row = mode.config();
            match row.session_seconds {
                Some(secs) => format!("{} ({} questions, {}s)", row.label, row.question_count, secs),
                None => format!("{} ({} questions)", row.label, row.question_count),
            }
        })
        .collect();

    let selection_idx = Select::with_theme(&theme)
        .with_prompt("Pick a game mode:")
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(modes[selection_idx])
}
