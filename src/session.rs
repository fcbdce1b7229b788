//! # Session Controller
//!
//! Owns the state of the session in play and arbitrates every transition:
//! `Intro → Playing → Results`. All mutation goes through the entry points on
//! [`SessionController`]; timers and the event queue only call back into them.
//!
//! Two latches keep late events harmless. `has_ended` freezes the whole
//! session once settlement ran, and queued answers name the question they
//! target so a second answer for the same question is dropped. Restarting or
//! abandoning bumps the session epoch, which discards events still queued for
//! the superseded session.

use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::{EngineConfig, GameMode};
use crate::data_loader::QuestionProvider;
use crate::error::{EngineError, Result};
use crate::leveling::{LevelingOracle, StandardLeveling};
use crate::power_ups::{
    hint_text, pick_hidden_options, PowerUpEffect, PowerUpInventory, PowerUpKind, PowerUpOutcome,
};
use crate::question::{Answer, Question, QuestionRecord};
use crate::scoring::{settle, AnswerFeedback, EndReason, ResultSettlement, ScoreTally, SettlementInput};
use crate::telemetry::{EventName, EventSink, LogSink, TelemetryEvent};
use crate::timing::{EventQueue, Scheduled, SessionEvent, SessionTimers, TimerSignal};

/// Where the controller is in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// No session has been started.
    Intro,
    Playing,
    /// Settled; only a new `start_session` leaves this phase.
    Results,
}

/// One answered question, kept for the results review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerRecord {
    /// Index into `SessionState::questions`.
    pub question: usize,
    /// `None` for timeouts and skips.
    pub answer: Option<Answer>,
    /// Answered by the skip power-up.
    pub skipped: bool,
    /// Seconds left on the question clock when it was answered.
    pub time_remaining: u32,
    pub feedback: AnswerFeedback,
}

/// Everything that describes the session in play.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    /// Catalog game the questions came from.
    pub game_id: String,
    pub mode: GameMode,
    /// Shuffled, validated and truncated at start; never changes afterwards.
    pub questions: Vec<Question>,
    /// Index of the question in play.
    pub cursor: usize,
    /// Score, streak and bonus counters.
    pub tally: ScoreTally,
    /// Set once by `end_session`; nothing mutates the session after it.
    pub has_ended: bool,
    pub end_reason: Option<EndReason>,
    /// Seconds left on the session clock, for modes that have one.
    pub session_clock_remaining: Option<u32>,
    /// Seconds left on the current question.
    pub question_clock_remaining: u32,
    /// Uses left per power-up.
    pub power_ups: PowerUpInventory,
    /// Options hidden by fifty-fifty on the current question.
    pub hidden_option_indices: Vec<usize>,
    /// The hint was shown for the current question.
    pub hint_revealed: bool,
    /// Seconds the time bonus added to the current question.
    pub bonus_time_seconds: u32,
    /// One entry per answered question, in order.
    pub answers: Vec<AnswerRecord>,
}

impl SessionState {
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.cursor)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

/// What processing one queued event produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Dispatched {
    Answered(AnswerFeedback),
    PowerUp(PowerUpOutcome),
    Ticked {
        /// Feedback for a question the clock forced.
        timed_out: Option<AnswerFeedback>,
        /// The hard session clock ended the session on this tick.
        session_expired: bool,
    },
}

pub struct SessionController {
    config: EngineConfig,
    oracle: Box<dyn LevelingOracle>,
    sink: Box<dyn EventSink>,
    rng: StdRng,
    timers: SessionTimers,
    queue: EventQueue,
    epoch: u64,
    player_xp: u64,
    session: Option<SessionState>,
    settlement: Option<ResultSettlement>,
}

impl SessionController {
    /// Creates a controller with the bundled leveling curve, logging sink and
    /// an entropy-seeded RNG.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Same as [`new`](Self::new) but with reproducible shuffles.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: EngineConfig, rng: StdRng) -> Self {
        SessionController {
            config,
            oracle: Box::new(StandardLeveling),
            sink: Box::new(LogSink),
            rng,
            timers: SessionTimers::new(),
            queue: EventQueue::new(),
            epoch: 0,
            player_xp: 0,
            session: None,
            settlement: None,
        }
    }

    pub fn with_oracle(mut self, oracle: impl LevelingOracle + 'static) -> Self {
        self.oracle = Box::new(oracle);
        self
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Lifetime XP of the player; settlement derives the level from it.
    pub fn set_player_xp(&mut self, total_xp: u64) {
        self.player_xp = total_xp;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        match &self.session {
            None => Phase::Intro,
            Some(state) if state.has_ended => Phase::Results,
            Some(_) => Phase::Playing,
        }
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    pub fn settlement(&self) -> Option<&ResultSettlement> {
        self.settlement.as_ref()
    }

    /// Identifier of the current session; changes on every start and abandon.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.session
            .as_ref()
            .filter(|state| !state.has_ended)
            .and_then(SessionState::current_question)
    }

    /// Fetches the pool once from `provider` and starts a session with it.
    pub fn start_from_provider(
        &mut self,
        provider: &dyn QuestionProvider,
        game_id: &str,
        mode_id: &str,
    ) -> Result<&SessionState> {
        let pool = provider.get_questions(game_id);
        self.start_session(game_id, mode_id, pool)
    }

    /// Starts a new session, superseding any session in play.
    ///
    /// Malformed records are dropped; the session fails to start only when the
    /// pool is empty or nothing in it is playable.
    pub fn start_session(
        &mut self,
        game_id: &str,
        mode_id: &str,
        pool: Vec<QuestionRecord>,
    ) -> Result<&SessionState> {
        let mode: GameMode = mode_id.parse()?;
        let row = mode.config();
        row.validate()?;
        if !self.config.is_mode_enabled(mode) {
            return Err(EngineError::ModeDisabled(mode));
        }
        if pool.is_empty() {
            return Err(EngineError::NoQuestionsAvailable {
                game_id: game_id.to_string(),
            });
        }

        let offered = pool.len();
        let mut questions: Vec<Question> = pool
            .into_iter()
            .enumerate()
            .filter_map(|(position, record)| {
                let id = record.id.clone();
                match Question::try_from(record) {
                    Ok(question) => Some(question),
                    Err(defect) => {
                        warn!(
                            "Dropping question {} ({:?}) from game '{}': {}",
                            position, id, game_id, defect
                        );
                        None
                    }
                }
            })
            .collect();
        if questions.is_empty() {
            return Err(EngineError::NoValidQuestions {
                game_id: game_id.to_string(),
                rejected: offered,
            });
        }

        questions.shuffle(&mut self.rng);
        questions.truncate(row.question_count);
        for question in questions.iter_mut() {
            question.shuffle_options(&mut self.rng);
        }

        self.timers.cancel();
        self.epoch += 1;
        self.settlement = None;
        self.timers
            .arm_session(row.session_seconds, row.session_clock_hard);
        self.timers.arm_question(row.per_question_seconds);

        let state = SessionState {
            game_id: game_id.to_string(),
            mode,
            questions,
            cursor: 0,
            tally: ScoreTally::default(),
            has_ended: false,
            end_reason: None,
            session_clock_remaining: row.session_seconds,
            question_clock_remaining: row.per_question_seconds,
            power_ups: self.config.power_ups,
            hidden_option_indices: Vec::new(),
            hint_revealed: false,
            bonus_time_seconds: 0,
            answers: Vec::new(),
        };

        debug!(
            "Session {} started: game '{}', mode {}, {} of {} questions playable",
            self.epoch,
            game_id,
            mode,
            state.questions.len(),
            offered
        );
        self.sink
            .emit(&telemetry(&state, EventName::GameStart, None, None, None));

        Ok(&*self.session.insert(state))
    }

    /// Records an answer for the current question. `None` is a forced timeout.
    ///
    /// Returns `None` without touching state when no session is in play or it
    /// has already ended.
    pub fn submit_answer(
        &mut self,
        answer: Option<Answer>,
        time_remaining: u32,
    ) -> Option<AnswerFeedback> {
        self.record_answer(answer, time_remaining, false)
    }

    fn record_answer(
        &mut self,
        answer: Option<Answer>,
        time_remaining: u32,
        skipped: bool,
    ) -> Option<AnswerFeedback> {
        let state = self.session.as_mut()?;
        if state.has_ended {
            trace!("Ignoring answer after session end");
            return None;
        }
        let question = state.questions.get(state.cursor)?;

        let correct = skipped
            || answer
                .as_ref()
                .is_some_and(|answer| question.is_correct(answer));
        let mut feedback = state.tally.record(
            state.mode,
            correct,
            time_remaining,
            self.timers.question_allotted(),
            self.config.fast_answer_window,
        );
        feedback.timed_out = answer.is_none() && !skipped;
        feedback.correct_index = question.correct_index();

        trace!(
            "Question {} answered: correct={} timed_out={} streak={}",
            state.cursor,
            feedback.correct,
            feedback.timed_out,
            feedback.streak
        );
        state.answers.push(AnswerRecord {
            question: state.cursor,
            answer,
            skipped,
            time_remaining,
            feedback: feedback.clone(),
        });

        self.advance();
        Some(feedback)
    }

    /// Moves to the next question, or settles after the last one.
    fn advance(&mut self) {
        let Some(state) = self.session.as_mut() else {
            return;
        };
        if state.cursor + 1 >= state.questions.len() {
            self.end_session(EndReason::Complete);
            return;
        }

        let base = state.mode.config().per_question_seconds;
        state.cursor += 1;
        state.hidden_option_indices.clear();
        state.hint_revealed = false;
        state.bonus_time_seconds = 0;
        state.question_clock_remaining = base;
        self.timers.arm_question(base);
    }

    /// Ends the session and settles it.
    ///
    /// Calling it again, from any path, returns the existing settlement and
    /// changes nothing. Returns `None` only when no session was ever started.
    pub fn end_session(&mut self, reason: EndReason) -> Option<&ResultSettlement> {
        let state = self.session.as_mut()?;
        if state.has_ended {
            return self.settlement.as_ref();
        }

        state.has_ended = true;
        state.end_reason = Some(reason);
        self.timers.cancel();

        let settlement = settle(
            SettlementInput {
                game_id: &state.game_id,
                mode: state.mode,
                question_count: state.questions.len(),
                tally: &state.tally,
                reason,
                player_xp: self.player_xp,
                xp_cap: self.config.xp_cap,
            },
            self.oracle.as_ref(),
        );

        debug!(
            "Session {} ended ({:?}): {}/{} correct, {}%, {} XP",
            self.epoch,
            reason,
            settlement.score,
            settlement.effective_denominator,
            settlement.percentage,
            settlement.xp_earned
        );
        self.sink.emit(&telemetry(
            state,
            EventName::GameComplete,
            Some(settlement.percentage),
            Some(reason),
            None,
        ));

        Some(&*self.settlement.insert(settlement))
    }

    /// Drops the session without settling it, as when the player navigates
    /// away. Queued events for it become stale.
    pub fn abandon(&mut self) {
        if self.session.is_some() {
            debug!("Session {} abandoned", self.epoch);
        }
        self.timers.cancel();
        self.epoch += 1;
        self.session = None;
        self.settlement = None;
    }

    /// Applies a power-up to the current question.
    pub fn use_power_up(&mut self, kind: PowerUpKind) -> PowerUpOutcome {
        let Some(state) = self.session.as_mut() else {
            return PowerUpOutcome::Ignored;
        };
        if state.has_ended {
            return PowerUpOutcome::Ignored;
        }
        if state.power_ups.remaining(kind) == 0 {
            debug!("Power-up {} requested with empty inventory", kind);
            return PowerUpOutcome::Depleted;
        }
        let Some(question) = state.questions.get(state.cursor) else {
            return PowerUpOutcome::Ignored;
        };

        let effect = match kind {
            PowerUpKind::FiftyFifty => {
                let hidden =
                    pick_hidden_options(question, &state.hidden_option_indices, &mut self.rng);
                if hidden.is_empty() {
                    return PowerUpOutcome::NotApplicable;
                }
                state.hidden_option_indices.extend(hidden.iter().copied());
                state.hidden_option_indices.sort_unstable();
                PowerUpEffect::OptionsHidden(hidden)
            }
            PowerUpKind::Hint => {
                if state.hint_revealed {
                    return PowerUpOutcome::NotApplicable;
                }
                let Some(text) = hint_text(question).map(str::to_string) else {
                    return PowerUpOutcome::NotApplicable;
                };
                state.hint_revealed = true;
                PowerUpEffect::HintRevealed(text)
            }
            PowerUpKind::TimeBonus => {
                let seconds = self.config.time_bonus_seconds;
                self.timers.extend_question(seconds);
                state.bonus_time_seconds = state.bonus_time_seconds.saturating_add(seconds);
                state.question_clock_remaining = self.timers.question_remaining();
                PowerUpEffect::TimeExtended(seconds)
            }
            PowerUpKind::Skip => {
                state.power_ups.consume(kind);
                self.sink
                    .emit(&telemetry(state, EventName::PowerUpUsed, None, None, Some(kind)));
                return match self.record_answer(None, 0, true) {
                    Some(feedback) => PowerUpOutcome::Applied(PowerUpEffect::Skipped(feedback)),
                    None => PowerUpOutcome::Ignored,
                };
            }
        };

        state.power_ups.consume(kind);
        self.sink
            .emit(&telemetry(state, EventName::PowerUpUsed, None, None, Some(kind)));
        debug!("Power-up {} applied: {:?}", kind, effect);
        PowerUpOutcome::Applied(effect)
    }

    /// Advances the clocks by one second and acts on whatever ran out.
    pub fn tick(&mut self) -> Dispatched {
        let mut timed_out = None;
        let mut session_expired = false;
        if self.phase() != Phase::Playing {
            return Dispatched::Ticked {
                timed_out,
                session_expired,
            };
        }

        for signal in self.timers.tick() {
            match signal {
                TimerSignal::QuestionExpired => {
                    debug!("Question clock expired");
                    timed_out = self.submit_answer(None, 0);
                }
                TimerSignal::SessionExpired { hard: true } => {
                    debug!("Session clock expired");
                    let already_ended = self.phase() == Phase::Results;
                    self.end_session(EndReason::Timer);
                    session_expired = !already_ended;
                }
                TimerSignal::SessionExpired { hard: false } => {
                    debug!("Advisory session clock reached zero");
                }
            }
        }

        if let Some(state) = self.session.as_mut().filter(|state| !state.has_ended) {
            state.question_clock_remaining = self.timers.question_remaining();
            state.session_clock_remaining = self.timers.session_remaining();
        }

        Dispatched::Ticked {
            timed_out,
            session_expired,
        }
    }

    /// Queues an event for the current session.
    pub fn enqueue(&mut self, event: SessionEvent) {
        self.queue.push(self.epoch, event);
    }

    /// Drains the queue in order.
    pub fn process_events(&mut self) -> Vec<Dispatched> {
        let mut results = Vec::new();
        while let Some(scheduled) = self.queue.pop() {
            if let Some(result) = self.dispatch(scheduled) {
                results.push(result);
            }
        }
        results
    }

    /// Handles one event. Events from another epoch and answers for a
    /// question that is no longer current are dropped.
    pub fn dispatch(&mut self, scheduled: Scheduled) -> Option<Dispatched> {
        if scheduled.epoch != self.epoch {
            warn!(
                "Dropping stale {:?} from session {} (current {})",
                scheduled.event, scheduled.epoch, self.epoch
            );
            return None;
        }

        match scheduled.event {
            SessionEvent::Tick => Some(self.tick()),
            SessionEvent::Answer { question, answer } => {
                if !self.targets_current(question) {
                    debug!("Ignoring answer for question {}", question);
                    return None;
                }
                let remaining = self.timers.question_remaining();
                self.submit_answer(Some(answer), remaining)
                    .map(Dispatched::Answered)
            }
            SessionEvent::PowerUp { question, kind } => {
                if !self.targets_current(question) {
                    debug!("Ignoring {} meant for question {}", kind, question);
                    return None;
                }
                Some(Dispatched::PowerUp(self.use_power_up(kind)))
            }
        }
    }

    /// Whether `question` is the one in play right now.
    fn targets_current(&self, question: usize) -> bool {
        self.session
            .as_ref()
            .is_some_and(|state| !state.has_ended && state.cursor == question)
    }
}

fn telemetry(
    state: &SessionState,
    name: EventName,
    percentage: Option<u32>,
    reason: Option<EndReason>,
    power_up: Option<PowerUpKind>,
) -> TelemetryEvent {
    TelemetryEvent {
        name,
        game_id: state.game_id.clone(),
        mode: state.mode,
        percentage,
        reason,
        answered: state.tally.answered_count,
        score: state.tally.score,
        power_up,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::MemorySink;

    fn record(id: usize, options: &[&str], correct: i64) -> QuestionRecord {
        QuestionRecord {
            id: Some(format!("q{id}")),
            kind: "multiple_choice".to_string(),
            question: format!("Question {id}?"),
            options: Some(options.iter().map(|s| s.to_string()).collect()),
            correct_index: Some(correct),
            explanation: Some(format!("Explanation {id}")),
            weights: None,
        }
    }

    fn pool(n: usize) -> Vec<QuestionRecord> {
        (0..n).map(|i| record(i, &["a", "b", "c", "d"], 0)).collect()
    }

    fn controller() -> SessionController {
        SessionController::with_seed(EngineConfig::default(), 42)
    }

    fn correct_answer(controller: &SessionController) -> Answer {
        let question = controller.current_question().unwrap();
        Answer::Choice(question.correct_index().unwrap())
    }

    fn wrong_answer(controller: &SessionController) -> Answer {
        let question = controller.current_question().unwrap();
        let correct = question.correct_index().unwrap();
        Answer::Choice((correct + 1) % question.options().len())
    }

    #[test]
    fn start_rejects_unknown_and_disabled_modes() {
        let mut controller = controller();
        assert_eq!(
            controller.start_session("general", "marathon", pool(3)).err(),
            Some(EngineError::UnknownMode("marathon".to_string()))
        );
        assert_eq!(
            controller.start_session("general", "blitz", pool(3)).err(),
            Some(EngineError::ModeDisabled(GameMode::Blitz))
        );
        assert_eq!(controller.phase(), Phase::Intro);
    }

    #[test]
    fn start_rejects_empty_and_unplayable_pools() {
        let mut controller = controller();
        assert!(matches!(
            controller.start_session("general", "standard", Vec::new()),
            Err(EngineError::NoQuestionsAvailable { .. })
        ));
        let broken = vec![record(0, &["a"], 3), record(1, &[], 0)];
        assert_eq!(
            controller.start_session("general", "standard", broken).err(),
            Some(EngineError::NoValidQuestions {
                game_id: "general".to_string(),
                rejected: 2
            })
        );
    }

    #[test]
    fn start_truncates_and_filters() {
        let mut controller = controller();
        let state = controller.start_session("general", "quick", pool(12)).unwrap();
        assert_eq!(state.questions.len(), 5);

        let mut small = pool(3);
        small.push(record(9, &["a", "b"], 7));
        let state = controller.start_session("general", "standard", small).unwrap();
        assert_eq!(state.questions.len(), 3);
        assert_eq!(state.cursor, 0);
        assert_eq!(state.question_clock_remaining, 15);
        assert_eq!(state.session_clock_remaining, None);
    }

    #[test]
    fn last_answer_settles_session() {
        let mut controller = controller();
        controller.start_session("general", "standard", pool(2)).unwrap();
        let answer = correct_answer(&controller);
        controller.submit_answer(Some(answer), 5).unwrap();
        let answer = correct_answer(&controller);
        controller.submit_answer(Some(answer), 5).unwrap();

        assert_eq!(controller.phase(), Phase::Results);
        let state = controller.state().unwrap();
        assert_eq!(state.end_reason, Some(EndReason::Complete));
        assert_eq!(state.tally.max_streak, 2);
        assert_eq!(controller.settlement().unwrap().percentage, 100);
    }

    #[test]
    fn repeated_end_and_late_answers_change_nothing() {
        let mut controller = controller();
        controller.start_session("general", "standard", pool(10)).unwrap();
        let answer = correct_answer(&controller);
        controller.submit_answer(Some(answer), 10);

        let first = controller.end_session(EndReason::Timer).cloned().unwrap();
        let snapshot = controller.state().cloned().unwrap();

        let second = controller.end_session(EndReason::Complete).cloned().unwrap();
        assert_eq!(first, second);
        assert!(controller.submit_answer(Some(Answer::Choice(0)), 3).is_none());
        assert_eq!(controller.use_power_up(PowerUpKind::Skip), PowerUpOutcome::Ignored);
        controller.tick();
        assert_eq!(controller.state().unwrap(), &snapshot);
    }

    #[test]
    fn timeout_scores_as_incorrect() {
        let mut controller = controller();
        controller.start_session("general", "quick", pool(5)).unwrap();
        for _ in 0..9 {
            controller.tick();
        }
        assert_eq!(controller.state().unwrap().cursor, 0);
        let Dispatched::Ticked { timed_out, .. } = controller.tick() else {
            panic!("expected tick");
        };
        let feedback = timed_out.unwrap();
        assert!(feedback.timed_out);
        assert!(!feedback.correct);
        let state = controller.state().unwrap();
        assert_eq!(state.cursor, 1);
        assert_eq!(state.tally.answered_count, 1);
        assert_eq!(state.question_clock_remaining, 10);
    }

    #[test]
    fn power_up_effects_reset_per_question() {
        let mut controller = controller();
        controller.start_session("general", "standard", pool(3)).unwrap();

        assert!(matches!(
            controller.use_power_up(PowerUpKind::TimeBonus),
            PowerUpOutcome::Applied(PowerUpEffect::TimeExtended(10))
        ));
        assert!(matches!(
            controller.use_power_up(PowerUpKind::Hint),
            PowerUpOutcome::Applied(PowerUpEffect::HintRevealed(_))
        ));
        assert_eq!(
            controller.use_power_up(PowerUpKind::Hint),
            PowerUpOutcome::NotApplicable
        );
        {
            let state = controller.state().unwrap();
            assert_eq!(state.question_clock_remaining, 25);
            assert_eq!(state.bonus_time_seconds, 10);
            assert!(state.hint_revealed);
            assert_eq!(state.power_ups.time_bonus, 1);
            assert_eq!(state.power_ups.hint, 1);
        }

        let answer = wrong_answer(&controller);
        controller.submit_answer(Some(answer), 20);
        let state = controller.state().unwrap();
        assert_eq!(state.bonus_time_seconds, 0);
        assert!(!state.hint_revealed);
        assert!(state.hidden_option_indices.is_empty());
        assert_eq!(state.question_clock_remaining, 15);
    }

    #[test]
    fn hint_needs_an_explanation() {
        let mut bare = pool(2);
        for record in bare.iter_mut() {
            record.explanation = None;
        }
        bare[1].explanation = Some("   ".to_string());
        let mut controller = controller();
        controller.start_session("general", "standard", bare).unwrap();

        for _ in 0..2 {
            assert_eq!(
                controller.use_power_up(PowerUpKind::Hint),
                PowerUpOutcome::NotApplicable
            );
            let state = controller.state().unwrap();
            assert!(!state.hint_revealed);
            assert_eq!(state.power_ups.hint, 2);
            let answer = correct_answer(&controller);
            controller.submit_answer(Some(answer), 5);
        }
    }

    #[test]
    fn skip_counts_as_correct_without_time_bonus() {
        let mut controller = controller();
        controller.start_session("general", "standard", pool(3)).unwrap();
        let outcome = controller.use_power_up(PowerUpKind::Skip);
        let PowerUpOutcome::Applied(PowerUpEffect::Skipped(feedback)) = &outcome else {
            panic!("expected skip, got {outcome:?}");
        };
        assert!(feedback.correct);
        assert!(!feedback.fast);
        let state = controller.state().unwrap();
        assert_eq!(state.tally.answered_count, 1);
        assert_eq!(state.tally.score, 1);
        assert_eq!(state.tally.time_bonus_xp, 0);
        assert_eq!(state.power_ups.skip, 0);
        assert!(state.answers[0].skipped);

        assert_eq!(controller.use_power_up(PowerUpKind::Skip), PowerUpOutcome::Depleted);
    }

    #[test]
    fn telemetry_reports_lifecycle() {
        let sink = MemorySink::new();
        let mut controller = controller().with_sink(sink.clone());
        controller.start_session("general", "standard", pool(1)).unwrap();
        controller.use_power_up(PowerUpKind::FiftyFifty);
        let answer = correct_answer(&controller);
        controller.submit_answer(Some(answer), 1);
        controller.end_session(EndReason::Complete);

        assert_eq!(
            sink.names(),
            vec![
                EventName::GameStart,
                EventName::PowerUpUsed,
                EventName::GameComplete
            ]
        );
        let complete = sink.events().pop().unwrap();
        assert_eq!(complete.percentage, Some(100));
        assert_eq!(complete.reason, Some(EndReason::Complete));
        assert_eq!(complete.answered, 1);
    }

    #[test]
    fn queued_answers_target_one_question() {
        let mut controller = controller();
        controller.start_session("general", "standard", pool(4)).unwrap();
        let answer = correct_answer(&controller);
        controller.enqueue(SessionEvent::Answer {
            question: 0,
            answer: answer.clone(),
        });
        controller.enqueue(SessionEvent::Answer { question: 0, answer });
        let results = controller.process_events();
        assert_eq!(results.len(), 1);
        let state = controller.state().unwrap();
        assert_eq!(state.cursor, 1);
        assert_eq!(state.tally.answered_count, 1);
    }

    #[test]
    fn queued_power_up_is_dropped_once_its_question_times_out() {
        let mut controller = controller();
        controller.start_session("general", "quick", pool(5)).unwrap();
        for _ in 0..10 {
            controller.enqueue(SessionEvent::Tick);
        }
        controller.enqueue(SessionEvent::PowerUp {
            question: 0,
            kind: PowerUpKind::Skip,
        });
        controller.enqueue(SessionEvent::PowerUp {
            question: 0,
            kind: PowerUpKind::FiftyFifty,
        });
        controller.process_events();

        let state = controller.state().unwrap();
        assert_eq!(state.cursor, 1);
        assert_eq!(state.tally.answered_count, 1);
        assert_eq!(state.answers.len(), 1);
        assert!(state.answers[0].feedback.timed_out);
        assert!(state.hidden_option_indices.is_empty());
        assert_eq!(state.power_ups, EngineConfig::default().power_ups);
    }

    #[test]
    fn queued_power_up_applies_to_its_question() {
        let mut controller = controller();
        controller.start_session("general", "standard", pool(3)).unwrap();
        controller.enqueue(SessionEvent::PowerUp {
            question: 0,
            kind: PowerUpKind::Hint,
        });
        let results = controller.process_events();
        assert!(matches!(
            results.as_slice(),
            [Dispatched::PowerUp(PowerUpOutcome::Applied(
                PowerUpEffect::HintRevealed(_)
            ))]
        ));
        assert!(controller.state().unwrap().hint_revealed);
    }

    #[test]
    fn restart_discards_stale_events() {
        let mut controller = controller();
        controller.start_session("general", "quick", pool(5)).unwrap();
        for _ in 0..20 {
            controller.enqueue(SessionEvent::Tick);
        }
        controller.start_session("general", "quick", pool(5)).unwrap();
        assert!(controller.process_events().is_empty());
        let state = controller.state().unwrap();
        assert_eq!(state.tally.answered_count, 0);
        assert_eq!(state.question_clock_remaining, 10);
    }

    #[test]
    fn abandon_returns_to_intro() {
        let mut controller = controller();
        controller.start_session("general", "standard", pool(3)).unwrap();
        controller.enqueue(SessionEvent::Tick);
        controller.abandon();
        assert_eq!(controller.phase(), Phase::Intro);
        assert!(controller.process_events().is_empty());
        assert!(controller.end_session(EndReason::Complete).is_none());
    }
}
