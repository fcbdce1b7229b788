//! # Power-Ups
//!
//! One-shot modifiers for the current question. The session controller owns
//! the inventory and the per-question effect state; the helpers here decide
//! whether a power-up applies and what it changes.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::question::Question;
use crate::scoring::AnswerFeedback;

/// How many options fifty-fifty removes at most.
const FIFTY_FIFTY_HIDES: usize = 2;

/// Fifty-fifty is only offered on questions with at least this many options.
const FIFTY_FIFTY_MIN_OPTIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
    FiftyFifty,
    Hint,
    TimeBonus,
    Skip,
}

impl PowerUpKind {
    pub fn all() -> &'static [PowerUpKind] {
        &[
            PowerUpKind::FiftyFifty,
            PowerUpKind::Hint,
            PowerUpKind::TimeBonus,
            PowerUpKind::Skip,
        ]
    }

    pub fn id(&self) -> &'static str {
        match self {
            PowerUpKind::FiftyFifty => "fifty_fifty",
            PowerUpKind::Hint => "hint",
            PowerUpKind::TimeBonus => "time_bonus",
            PowerUpKind::Skip => "skip",
        }
    }
}

impl fmt::Display for PowerUpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Remaining uses per power-up for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerUpInventory {
    #[serde(default)]
    pub fifty_fifty: u32,
    #[serde(default)]
    pub time_bonus: u32,
    #[serde(default)]
    pub hint: u32,
    #[serde(default)]
    pub skip: u32,
}

impl Default for PowerUpInventory {
    fn default() -> Self {
        PowerUpInventory {
            fifty_fifty: 2,
            time_bonus: 2,
            hint: 2,
            skip: 1,
        }
    }
}

impl PowerUpInventory {
    pub fn remaining(&self, kind: PowerUpKind) -> u32 {
        match kind {
            PowerUpKind::FiftyFifty => self.fifty_fifty,
            PowerUpKind::TimeBonus => self.time_bonus,
            PowerUpKind::Hint => self.hint,
            PowerUpKind::Skip => self.skip,
        }
    }

    /// Takes one use. Returns `false` and leaves the count alone when empty.
    pub fn consume(&mut self, kind: PowerUpKind) -> bool {
        let slot = match kind {
            PowerUpKind::FiftyFifty => &mut self.fifty_fifty,
            PowerUpKind::TimeBonus => &mut self.time_bonus,
            PowerUpKind::Hint => &mut self.hint,
            PowerUpKind::Skip => &mut self.skip,
        };
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }
}

/// What a successful power-up did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PowerUpEffect {
    /// Option indices newly hidden by fifty-fifty.
    OptionsHidden(Vec<usize>),
    HintRevealed(String),
    /// Seconds added to the running question clock.
    TimeExtended(u32),
    Skipped(AnswerFeedback),
}

/// Result of a power-up request. Only `Applied` consumes inventory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PowerUpOutcome {
    Applied(PowerUpEffect),
    /// Inventory for this power-up is empty.
    Depleted,
    /// The current question does not support it, or it would have no effect.
    NotApplicable,
    /// No session is in play.
    Ignored,
}

/// Picks up to two visible, non-correct options to hide.
///
/// At least one wrong option always stays visible, so a question already down
/// to one right and one wrong option has nothing left to hide. Returns an
/// empty list in that case and when the question has fewer than three
/// options; the caller must not charge inventory then.
pub fn pick_hidden_options<R: Rng + ?Sized>(
    question: &Question,
    already_hidden: &[usize],
    rng: &mut R,
) -> Vec<usize> {
    let Some(correct) = question.correct_index() else {
        return Vec::new();
    };
    let option_count = question.options().len();
    if option_count < FIFTY_FIFTY_MIN_OPTIONS {
        return Vec::new();
    }
    let candidates: Vec<usize> = (0..option_count)
        .filter(|&i| i != correct && !already_hidden.contains(&i))
        .collect();
    let hideable = candidates.len().saturating_sub(1).min(FIFTY_FIFTY_HIDES);
    let mut picked: Vec<usize> = candidates
        .choose_multiple(rng, hideable)
        .copied()
        .collect();
    picked.sort_unstable();
    picked
}

/// Explanation text the hint reveals, if the question has one.
pub fn hint_text(question: &Question) -> Option<&str> {
    question.explanation.as_deref()
}
