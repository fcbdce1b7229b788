//! # Scoring & Settlement
//!
//! Per-answer bookkeeping (score, streak, bonus XP) and the final settlement
//! that turns a finished or truncated session into a percentage, an XP award
//! and a tier.

use serde::{Deserialize, Serialize};

use crate::config::GameMode;
use crate::leveling::LevelingOracle;

/// XP every correct answer is worth before multipliers.
pub const BASE_XP: u32 = 10;

/// XP per point of `max_streak` added at settlement.
const MAX_STREAK_XP: i64 = 2;

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// All questions were answered.
    Complete,
    /// The hard session clock ran out.
    Timer,
}

/// Streak multiplier applied to per-answer XP. Blitz constants are tuned
/// values, not derived from the standard ones.
pub fn streak_multiplier(mode: GameMode, streak: u32) -> f64 {
    let blitz = mode == GameMode::Blitz;
    match streak {
        s if s >= 5 => {
            if blitz {
                3.5
            } else {
                3.0
            }
        }
        s if s >= 3 => {
            if blitz {
                2.2
            } else {
                2.0
            }
        }
        _ => 1.0,
    }
}

/// XP granted for answering almost instantly.
pub fn fast_answer_bonus(mode: GameMode) -> u32 {
    if mode == GameMode::Blitz {
        7
    } else {
        5
    }
}

/// What one answer was worth, for display and review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerFeedback {
    pub correct: bool,
    /// Set when the question clock forced the answer.
    pub timed_out: bool,
    /// Streak after this answer.
    pub streak: u32,
    /// Streak multiplier applied to this answer's XP.
    pub multiplier: f64,
    /// Bonus XP granted for this answer.
    pub xp: u32,
    /// Earned the fast-answer bonus.
    pub fast: bool,
    /// Right option, revealed after answering.
    pub correct_index: Option<usize>,
}

/// Running counters for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreTally {
    /// Correct answers so far.
    pub score: u32,
    /// Answers recorded, timeouts and skips included.
    pub answered_count: u32,
    /// Current run of correct answers.
    pub streak: u32,
    /// Longest run of correct answers.
    pub max_streak: u32,
    /// Fast-answer XP, already multiplied by the streak.
    pub time_bonus_xp: u32,
    /// XP earned from streak multipliers above 1.
    pub streak_bonus_xp: u32,
}

impl ScoreTally {
    /// Records one answer.
    ///
    /// `allotted` is the full clock the question had, bonus time included.
    /// A `time_remaining` of zero never earns the fast-answer bonus, so forced
    /// timeouts and skips are excluded automatically.
    pub fn record(
        &mut self,
        mode: GameMode,
        correct: bool,
        time_remaining: u32,
        allotted: u32,
        fast_window: u32,
    ) -> AnswerFeedback {
        self.answered_count += 1;

        if !correct {
            self.streak = 0;
            return AnswerFeedback {
                correct: false,
                timed_out: false,
                streak: 0,
                multiplier: 1.0,
                xp: 0,
                fast: false,
                correct_index: None,
            };
        }

        self.score += 1;
        self.streak += 1;
        self.max_streak = self.max_streak.max(self.streak);

        let multiplier = streak_multiplier(mode, self.streak);
        let fast = time_remaining > 0 && time_remaining.saturating_add(fast_window) >= allotted;
        let fast_xp = if fast { fast_answer_bonus(mode) } else { 0 };

        let streak_xp = if multiplier > 1.0 {
            (BASE_XP as f64 * multiplier).round() as u32
        } else {
            0
        };
        let time_xp = (fast_xp as f64 * multiplier).round() as u32;
        self.streak_bonus_xp = self.streak_bonus_xp.saturating_add(streak_xp);
        self.time_bonus_xp = self.time_bonus_xp.saturating_add(time_xp);

        AnswerFeedback {
            correct: true,
            timed_out: false,
            streak: self.streak,
            multiplier,
            xp: ((BASE_XP + fast_xp) as f64 * multiplier).round() as u32,
            fast,
            correct_index: None,
        }
    }
}

/// Final, immutable outcome of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultSettlement {
    pub percentage: u32,
    pub effective_denominator: u32,
    pub xp_earned: u32,
    pub tier_name: String,
    pub tier_emoji: String,
    pub tier_message: String,
    pub score: u32,
    pub answered: u32,
    pub max_streak: u32,
    pub reason: EndReason,
    /// Player level the XP award was computed for.
    pub level: u32,
}

/// Answered count for time-boxed modes, the full question count otherwise.
pub fn effective_denominator(mode: GameMode, answered: u32, question_count: usize) -> u32 {
    if mode.is_time_boxed() {
        answered
    } else {
        question_count as u32
    }
}

/// `round(score / max(denominator, 1) * 100)`, clamped to 0..=100.
pub fn percentage(score: u32, denominator: u32) -> u32 {
    let ratio = score as f64 / denominator.max(1) as f64;
    ((ratio * 100.0).round() as u32).min(100)
}

/// Everything settlement needs from the session.
pub struct SettlementInput<'a> {
    pub game_id: &'a str,
    pub mode: GameMode,
    pub question_count: usize,
    pub tally: &'a ScoreTally,
    pub reason: EndReason,
    pub player_xp: u64,
    pub xp_cap: u32,
}

/// Computes the settlement, asking the oracle for the base award and tier.
pub fn settle(input: SettlementInput<'_>, oracle: &dyn LevelingOracle) -> ResultSettlement {
    let tally = input.tally;
    let denominator = effective_denominator(input.mode, tally.answered_count, input.question_count);
    let percentage = percentage(tally.score, denominator);

    let level = oracle.level_for_xp(input.player_xp);
    let award = oracle.xp_for_result(percentage, level.level);
    let raw = award
        .saturating_add(tally.max_streak as i64 * MAX_STREAK_XP)
        .saturating_add(tally.time_bonus_xp as i64)
        .saturating_add(tally.streak_bonus_xp as i64);
    let clamped = raw.clamp(0, input.xp_cap as i64);
    let xp_earned = (clamped as f64 * input.mode.xp_multiplier()).round() as u32;

    let tier = oracle.tier_for_score(input.game_id, percentage);

    ResultSettlement {
        percentage,
        effective_denominator: denominator,
        xp_earned,
        tier_name: tier.name,
        tier_emoji: tier.emoji,
        tier_message: tier.message,
        score: tally.score,
        answered: tally.answered_count,
        max_streak: tally.max_streak,
        reason: input.reason,
        level: level.level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leveling::{LevelInfo, Tier};

    struct FixedOracle(i64);

    impl LevelingOracle for FixedOracle {
        fn level_for_xp(&self, _total_xp: u64) -> LevelInfo {
            LevelInfo {
                level: 1,
                title: "Novice".to_string(),
                emoji: "🌱".to_string(),
            }
        }

        fn tier_for_score(&self, _game_id: &str, _percentage: u32) -> Tier {
            Tier {
                name: "Any".to_string(),
                emoji: "*".to_string(),
                message: String::new(),
            }
        }

        fn xp_for_result(&self, _percentage: u32, _level: u32) -> i64 {
            self.0
        }
    }

    fn input<'a>(mode: GameMode, tally: &'a ScoreTally) -> SettlementInput<'a> {
        SettlementInput {
            game_id: "general",
            mode,
            question_count: 10,
            tally,
            reason: EndReason::Complete,
            player_xp: 0,
            xp_cap: 1000,
        }
    }

    #[test]
    fn multipliers_by_streak() {
        assert_eq!(streak_multiplier(GameMode::Standard, 1), 1.0);
        assert_eq!(streak_multiplier(GameMode::Standard, 3), 2.0);
        assert_eq!(streak_multiplier(GameMode::Standard, 5), 3.0);
        assert_eq!(streak_multiplier(GameMode::Blitz, 4), 2.2);
        assert_eq!(streak_multiplier(GameMode::Blitz, 9), 3.5);
    }

    #[test]
    fn wrong_answer_resets_streak_only() {
        let mut tally = ScoreTally::default();
        tally.record(GameMode::Standard, true, 5, 15, 3);
        tally.record(GameMode::Standard, true, 5, 15, 3);
        let feedback = tally.record(GameMode::Standard, false, 5, 15, 3);
        assert!(!feedback.correct);
        assert_eq!(tally.streak, 0);
        assert_eq!(tally.max_streak, 2);
        assert_eq!(tally.score, 2);
        assert_eq!(tally.answered_count, 3);
    }

    #[test]
    fn fast_answers_earn_time_bonus() {
        let mut tally = ScoreTally::default();
        let feedback = tally.record(GameMode::Standard, true, 13, 15, 3);
        assert!(feedback.fast);
        assert_eq!(feedback.xp, 15);
        assert_eq!(tally.time_bonus_xp, 5);

        let slow = tally.record(GameMode::Standard, true, 11, 15, 3);
        assert!(!slow.fast);
        assert_eq!(tally.time_bonus_xp, 5);
    }

    #[test]
    fn streak_bonus_accrues_from_third_answer() {
        let mut tally = ScoreTally::default();
        for _ in 0..3 {
            tally.record(GameMode::Blitz, true, 1, 15, 3);
        }
        assert_eq!(tally.streak_bonus_xp, 22);
        assert_eq!(tally.time_bonus_xp, 0);
    }

    #[test]
    fn zero_time_is_never_fast() {
        let mut tally = ScoreTally::default();
        let feedback = tally.record(GameMode::Standard, true, 0, 2, 3);
        assert!(!feedback.fast);
    }

    #[test]
    fn denominator_follows_mode() {
        assert_eq!(effective_denominator(GameMode::Blitz, 4, 10), 4);
        assert_eq!(effective_denominator(GameMode::Quick, 2, 5), 2);
        assert_eq!(effective_denominator(GameMode::Standard, 4, 10), 10);
    }

    #[test]
    fn percentage_survives_zero_denominator() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(7, 10), 70);
    }

    #[test]
    fn xp_is_clamped_then_scaled() {
        let tally = ScoreTally {
            score: 10,
            answered_count: 10,
            max_streak: 10,
            ..Default::default()
        };
        let settled = settle(input(GameMode::Blitz, &tally), &FixedOracle(5_000));
        assert_eq!(settled.xp_earned, 1500);

        let settled = settle(input(GameMode::Quick, &tally), &FixedOracle(-5_000));
        assert_eq!(settled.xp_earned, 0);
    }

    #[test]
    fn settlement_adds_streak_and_bonuses() {
        let tally = ScoreTally {
            score: 7,
            answered_count: 10,
            streak: 0,
            max_streak: 2,
            time_bonus_xp: 5,
            streak_bonus_xp: 20,
        };
        let settled = settle(input(GameMode::Standard, &tally), &FixedOracle(100));
        assert_eq!(settled.percentage, 70);
        assert_eq!(settled.xp_earned, 100 + 4 + 5 + 20);
    }
}
