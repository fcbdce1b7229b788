//! # Question Model
//!
//! Raw catalog records arrive loosely shaped: every field except the prompt is
//! optional and the meaning of `options` depends on `type`. This module turns
//! a [`QuestionRecord`] into a playable [`Question`] whose [`QuestionKind`]
//! carries exactly the fields that kind needs, and rejects records that cannot
//! be played.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A question as stored by the question provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    /// Signed so that negative indices in bad data are caught by validation
    /// instead of failing the whole catalog parse.
    #[serde(default)]
    pub correct_index: Option<i64>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
}

fn default_kind() -> String {
    "multiple_choice".to_string()
}

/// Why a record was dropped from the session.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuestionDefect {
    #[error("question text is empty")]
    EmptyPrompt,
    #[error("unknown question type '{0}'")]
    UnknownKind(String),
    #[error("question type '{0}' requires options")]
    MissingOptions(String),
    #[error("correct_index is missing")]
    MissingCorrectIndex,
    #[error("correct_index {index} is out of range for {len} options")]
    CorrectIndexOutOfRange { index: i64, len: usize },
    #[error("swipe questions need exactly two options, found {0}")]
    SwipeArity(usize),
    #[error("ordering questions need at least two items, found {0}")]
    TooFewItems(usize),
    #[error("{weights} weights supplied for {options} options")]
    WeightMismatch { weights: usize, options: usize },
}

/// Kind-specific payload of a playable question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
        correct_index: usize,
    },
    /// Binary left/right choice.
    Swipe {
        options: Vec<String>,
        correct_index: usize,
    },
    /// `items` is in display order; `solution` lists display indices in the
    /// correct order.
    Ordering {
        items: Vec<String>,
        solution: Vec<usize>,
    },
    /// Opinion question without a right answer.
    Poll {
        options: Vec<String>,
        weights: Vec<f64>,
    },
    /// Free-form scenario answered with text.
    Board,
}

/// What the player submitted for a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Answer {
    Choice(usize),
    Order(Vec<usize>),
    Text(String),
}

/// A validated question ready to be played.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    pub id: Option<String>,
    pub prompt: String,
    pub explanation: Option<String>,
    pub kind: QuestionKind,
}

impl TryFrom<QuestionRecord> for Question {
    type Error = QuestionDefect;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        let prompt = record.question.trim().to_string();
        if prompt.is_empty() {
            return Err(QuestionDefect::EmptyPrompt);
        }

        let kind_name = record.kind.trim().to_ascii_lowercase();
        let kind = match kind_name.as_str() {
            "multiple_choice" | "mcq" | "image" => {
                let (options, correct_index) = discrete_options(&kind_name, &record)?;
                QuestionKind::MultipleChoice {
                    options,
                    correct_index,
                }
            }
            "swipe" | "true_false" => {
                let (options, correct_index) = discrete_options(&kind_name, &record)?;
                if options.len() != 2 {
                    return Err(QuestionDefect::SwipeArity(options.len()));
                }
                QuestionKind::Swipe {
                    options,
                    correct_index,
                }
            }
            "ordering" | "ranking" => {
                let items = record.options.clone().unwrap_or_default();
                if items.len() < 2 {
                    return Err(QuestionDefect::TooFewItems(items.len()));
                }
                let solution = (0..items.len()).collect();
                QuestionKind::Ordering { items, solution }
            }
            "poll" => {
                let options = record.options.clone().unwrap_or_default();
                let weights = match &record.weights {
                    Some(weights) if weights.len() != options.len() => {
                        return Err(QuestionDefect::WeightMismatch {
                            weights: weights.len(),
                            options: options.len(),
                        });
                    }
                    Some(weights) => weights.clone(),
                    None => Vec::new(),
                };
                QuestionKind::Poll { options, weights }
            }
            "board" | "scenario" => QuestionKind::Board,
            _ => return Err(QuestionDefect::UnknownKind(record.kind.clone())),
        };

        Ok(Question {
            id: record.id,
            prompt,
            explanation: record
                .explanation
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            kind,
        })
    }
}

fn discrete_options(
    kind_name: &str,
    record: &QuestionRecord,
) -> Result<(Vec<String>, usize), QuestionDefect> {
    let options = match &record.options {
        Some(options) if !options.is_empty() => options.clone(),
        _ => return Err(QuestionDefect::MissingOptions(kind_name.to_string())),
    };
    let index = record
        .correct_index
        .ok_or(QuestionDefect::MissingCorrectIndex)?;
    if index < 0 || index as usize >= options.len() {
        return Err(QuestionDefect::CorrectIndexOutOfRange {
            index,
            len: options.len(),
        });
    }
    Ok((options, index as usize))
}

impl Question {
    /// Discrete options shown to the player, if the kind has any.
    pub fn options(&self) -> &[String] {
        match &self.kind {
            QuestionKind::MultipleChoice { options, .. }
            | QuestionKind::Swipe { options, .. }
            | QuestionKind::Poll { options, .. } => options,
            QuestionKind::Ordering { items, .. } => items,
            QuestionKind::Board => &[],
        }
    }

    /// Index of the right option for kinds that have one.
    pub fn correct_index(&self) -> Option<usize> {
        match &self.kind {
            QuestionKind::MultipleChoice { correct_index, .. }
            | QuestionKind::Swipe { correct_index, .. } => Some(*correct_index),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            QuestionKind::MultipleChoice { .. } => "multiple_choice",
            QuestionKind::Swipe { .. } => "swipe",
            QuestionKind::Ordering { .. } => "ordering",
            QuestionKind::Poll { .. } => "poll",
            QuestionKind::Board => "board",
        }
    }

    /// Whether `answer` is credited. Polls and boards accept any well-formed
    /// answer; answers of the wrong shape are never credited.
    pub fn is_correct(&self, answer: &Answer) -> bool {
        match (&self.kind, answer) {
            (
                QuestionKind::MultipleChoice { correct_index, .. }
                | QuestionKind::Swipe { correct_index, .. },
                Answer::Choice(index),
            ) => index == correct_index,
            (QuestionKind::Ordering { solution, .. }, Answer::Order(order)) => order == solution,
            (QuestionKind::Poll { options, .. }, Answer::Choice(index)) => *index < options.len(),
            (QuestionKind::Poll { options, .. }, Answer::Text(text)) => {
                options.is_empty() && !text.trim().is_empty()
            }
            (QuestionKind::Board, Answer::Text(text)) => !text.trim().is_empty(),
            _ => false,
        }
    }

    /// Reorders options so positions cannot be memorised between sessions.
    ///
    /// The correct index is remapped to follow its option, poll weights move
    /// with their options, and ordering solutions are recomputed.
    pub fn shuffle_options<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let len = self.options().len();
        if len < 2 {
            return;
        }
        let mut perm: Vec<usize> = (0..len).collect();
        perm.shuffle(rng);

        match &mut self.kind {
            QuestionKind::MultipleChoice {
                options,
                correct_index,
            }
            | QuestionKind::Swipe {
                options,
                correct_index,
            } => {
                *options = perm.iter().map(|&i| options[i].clone()).collect();
                // perm always contains the old index
                if let Some(pos) = perm.iter().position(|&i| i == *correct_index) {
                    *correct_index = pos;
                }
            }
            QuestionKind::Ordering { items, solution } => {
                let canonical: Vec<String> = solution.iter().map(|&i| items[i].clone()).collect();
                *items = perm.iter().map(|&i| canonical[i].clone()).collect();
                *solution = (0..len)
                    .filter_map(|rank| perm.iter().position(|&i| i == rank))
                    .collect();
            }
            QuestionKind::Poll { options, weights } => {
                *options = perm.iter().map(|&i| options[i].clone()).collect();
                if !weights.is_empty() {
                    *weights = perm.iter().map(|&i| weights[i]).collect();
                }
            }
            QuestionKind::Board => {}
        }
    }
}
