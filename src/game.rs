//! # Terminal Play Loop
//!
//! Drives a [`SessionController`] from the terminal: keys become queued
//! session events, wall time becomes one-second ticks, and the screen is
//! redrawn from the controller's state after every pass.
//!
//! Controls: digits pick an option (or build an ordering), Enter submits an
//! ordering or a typed answer, F1-F4 use power-ups, Esc abandons the session.

use std::io::{stdout, Stdout, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    style::Print,
    terminal,
};
use figlet_rs::FIGfont;
use log::{debug, trace};
use quiz_engine::power_ups::{PowerUpEffect, PowerUpKind, PowerUpOutcome};
use quiz_engine::question::QuestionKind;
use quiz_engine::scoring::AnswerFeedback;
use quiz_engine::session::Dispatched;
use quiz_engine::timing::{SessionEvent, SystemClock, Ticker};
use quiz_engine::{Answer, EndReason, Phase, SessionController, SessionState};
use textwrap::wrap;

/// How the player answers the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputStyle {
    /// A single digit answers immediately.
    Choice,
    /// Digits build a sequence, Enter submits.
    Sequence,
    /// Free text, Enter submits.
    Text,
}

fn input_style(state: &SessionState) -> InputStyle {
    match state.current_question().map(|q| &q.kind) {
        Some(QuestionKind::Ordering { .. }) => InputStyle::Sequence,
        Some(QuestionKind::Board) => InputStyle::Text,
        Some(QuestionKind::Poll { options, .. }) if options.is_empty() => InputStyle::Text,
        _ => InputStyle::Choice,
    }
}

/// Turns a key press into a queued event. Returns `false` when the player quit.
fn handle_key(code: KeyCode, controller: &mut SessionController, input: &mut String) -> bool {
    let Some(state) = controller.state() else {
        return true;
    };
    let question = state.cursor;
    let style = input_style(state);
    let option_count = state.current_question().map_or(0, |q| q.options().len());
    let hidden = state.hidden_option_indices.clone();

    let event = match code {
        KeyCode::Esc => return false,
        KeyCode::F(1) => Some(SessionEvent::PowerUp { question, kind: PowerUpKind::FiftyFifty }),
        KeyCode::F(2) => Some(SessionEvent::PowerUp { question, kind: PowerUpKind::Hint }),
        KeyCode::F(3) => Some(SessionEvent::PowerUp { question, kind: PowerUpKind::TimeBonus }),
        KeyCode::F(4) => Some(SessionEvent::PowerUp { question, kind: PowerUpKind::Skip }),
        KeyCode::Backspace => {
            input.pop();
            None
        }
        KeyCode::Enter if style != InputStyle::Choice && !input.trim().is_empty() => {
            let answer = match style {
                InputStyle::Sequence => Answer::Order(
                    input
                        .chars()
                        .filter_map(|c| c.to_digit(10))
                        .map(|d| (d as usize).saturating_sub(1))
                        .collect(),
                ),
                _ => Answer::Text(input.trim().to_string()),
            };
            input.clear();
            Some(SessionEvent::Answer { question, answer })
        }
        KeyCode::Char(c) => match style {
            InputStyle::Choice => c
                .to_digit(10)
                .map(|d| d as usize)
                .filter(|&d| d >= 1 && d <= option_count && !hidden.contains(&(d - 1)))
                .map(|d| SessionEvent::Answer {
                    question,
                    answer: Answer::Choice(d - 1),
                }),
            InputStyle::Sequence => {
                if c.is_ascii_digit() {
                    input.push(c);
                }
                None
            }
            InputStyle::Text => {
                input.push(c);
                None
            }
        },
        _ => None,
    };

    if let Some(event) = event {
        trace!("Queueing {:?}", event);
        controller.enqueue(event);
    }
    true
}

fn describe_feedback(feedback: &AnswerFeedback) -> String {
    if feedback.correct {
        let fast = if feedback.fast { " Lightning fast!" } else { "" };
        format!(
            "Correct! +{} XP, streak {}.{}",
            feedback.xp, feedback.streak, fast
        )
    } else {
        let lead = if feedback.timed_out { "Time's up." } else { "Not quite." };
        match feedback.correct_index {
            Some(index) => format!("{} The answer was option {}.", lead, index + 1),
            None => lead.to_string(),
        }
    }
}

fn describe(dispatched: &Dispatched) -> Option<String> {
    match dispatched {
        Dispatched::Answered(feedback) => Some(describe_feedback(feedback)),
        Dispatched::Ticked {
            session_expired: true,
            ..
        } => Some("The session clock ran out!".to_string()),
        Dispatched::Ticked {
            timed_out: Some(feedback),
            ..
        } => Some(describe_feedback(feedback)),
        Dispatched::Ticked { .. } => None,
        Dispatched::PowerUp(outcome) => Some(match outcome {
            PowerUpOutcome::Applied(PowerUpEffect::OptionsHidden(hidden)) => {
                format!("Fifty-fifty removed {} option(s).", hidden.len())
            }
            PowerUpOutcome::Applied(PowerUpEffect::HintRevealed(_)) => "Hint revealed.".to_string(),
            PowerUpOutcome::Applied(PowerUpEffect::TimeExtended(secs)) => {
                format!("+{}s on the clock.", secs)
            }
            PowerUpOutcome::Applied(PowerUpEffect::Skipped(_)) => "Question skipped.".to_string(),
            PowerUpOutcome::Depleted => "None of those left.".to_string(),
            PowerUpOutcome::NotApplicable => "That won't help here.".to_string(),
            PowerUpOutcome::Ignored => return None,
        }),
    }
}

/// Displays the current question, clocks, inventory and the latest notice.
fn display_question(
    stdout: &mut Stdout,
    state: &SessionState,
    input: &str,
    notice: Option<&str>,
    terminal_width: u16,
    terminal_height: u16,
) -> Result<()> {
    execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
    let Some(question) = state.current_question() else {
        return Ok(());
    };
    let row = state.mode.config();
    let wrap_width = (terminal_width.saturating_sub(4)).max(10) as usize;

    let mut header = format!(
        "{} | Question {}/{} | Score {} | Streak {} | Time {}s",
        row.label,
        state.cursor + 1,
        state.question_count(),
        state.tally.score,
        state.tally.streak,
        state.question_clock_remaining
    );
    if let Some(session) = state.session_clock_remaining {
        header.push_str(&format!(" | Session {:02}:{:02}", session / 60, session % 60));
    }

    let mut lines: Vec<String> = vec![header, String::new()];
    for line in wrap(&question.prompt, wrap_width) {
        lines.push(line.to_string());
    }
    lines.push(String::new());

    match &question.kind {
        QuestionKind::Ordering { items, .. } => {
            for (i, item) in items.iter().enumerate() {
                lines.push(format!("  {}. {}", i + 1, item));
            }
            lines.push(String::new());
            lines.push(format!("Your order: {}", input));
        }
        QuestionKind::Board => lines.push(format!("> {}", input)),
        QuestionKind::Poll { options, .. } if options.is_empty() => {
            lines.push(format!("> {}", input))
        }
        _ => {
            for (i, option) in question.options().iter().enumerate() {
                if state.hidden_option_indices.contains(&i) {
                    lines.push(format!("  {}. {}", i + 1, "----".dimmed()));
                } else {
                    lines.push(format!("  {}. {}", i + 1, option));
                }
            }
        }
    }

    if state.hint_revealed {
        if let Some(explanation) = &question.explanation {
            lines.push(String::new());
            for line in wrap(&format!("Hint: {}", explanation), wrap_width) {
                lines.push(line.italic().to_string());
            }
        }
    }

    lines.push(String::new());
    let inventory = state.power_ups;
    lines.push(format!(
        "F1 50/50 x{}  F2 Hint x{}  F3 +Time x{}  F4 Skip x{}",
        inventory.fifty_fifty, inventory.hint, inventory.time_bonus, inventory.skip
    ));
    if let Some(notice) = notice {
        lines.push(notice.yellow().to_string());
    }

    for (i, line) in lines.iter().enumerate() {
        execute!(stdout, cursor::MoveTo(2, i as u16), Print(line))?;
    }
    let quit_msg = "Press Esc to quit";
    let quit_msg_padding = (terminal_width.saturating_sub(quit_msg.len() as u16)) / 2;
    execute!(
        stdout,
        cursor::MoveTo(quit_msg_padding, terminal_height.saturating_sub(1)),
        Print(quit_msg)
    )?;
    stdout.flush()?;
    Ok(())
}

fn play_loop(stdout: &mut Stdout, controller: &mut SessionController) -> Result<()> {
    let clock = SystemClock::new();
    let mut ticker = Ticker::start(&clock);
    let mut input = String::new();
    let mut notice: Option<String> = None;
    let (mut term_cols, mut term_rows) = terminal::size().context("Failed to get terminal size")?;

    while controller.phase() == Phase::Playing {
        for _ in 0..ticker.due(&clock) {
            controller.enqueue(SessionEvent::Tick);
        }

        if event::poll(Duration::from_millis(100)).context("Event polling failed in active game")? {
            match event::read().context("Failed to read event in active game")? {
                Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                    if !handle_key(key_event.code, controller, &mut input) {
                        debug!("Escape key pressed. Abandoning session.");
                        controller.abandon();
                        break;
                    }
                }
                Event::Resize(new_cols, new_rows) => {
                    term_cols = new_cols;
                    term_rows = new_rows;
                }
                _ => {}
            }
        }

        let cursor_before = controller.state().map(|s| s.cursor);
        for dispatched in controller.process_events() {
            if let Some(text) = describe(&dispatched) {
                notice = Some(text);
            }
        }
        if controller.state().map(|s| s.cursor) != cursor_before {
            input.clear();
        }

        if let Some(state) = controller.state().filter(|s| !s.has_ended) {
            display_question(stdout, state, &input, notice.as_deref(), term_cols, term_rows)
                .context("Failed to display question")?;
        }
    }
    Ok(())
}

/// Runs one session in raw mode. The terminal is restored even on error.
pub fn run_game(controller: &mut SessionController) -> Result<()> {
    let mut stdout = stdout();
    terminal::enable_raw_mode().context("Failed to enable raw mode")?;
    execute!(stdout, terminal::Clear(terminal::ClearType::All), cursor::Hide)
        .context("Failed to clear screen or hide cursor")?;

    let result = play_loop(&mut stdout, controller);

    execute!(stdout, terminal::Clear(terminal::ClearType::All), cursor::MoveTo(0, 0), cursor::Show).ok();
    terminal::disable_raw_mode().ok();
    result
}

/// Prints the settlement and a per-question review after raw mode is off.
pub fn print_results(controller: &SessionController) {
    let (Some(state), Some(settlement)) = (controller.state(), controller.settlement()) else {
        println!("{}", "Session abandoned. No XP awarded.".dimmed());
        return;
    };

    if let Ok(font) = FIGfont::standard() {
        if let Some(banner) = font.convert("Results") {
            println!("{}", banner.to_string().cyan());
        }
    }

    let reason = match settlement.reason {
        EndReason::Complete => "All questions answered",
        EndReason::Timer => "Session clock ran out",
    };
    println!("{}", reason.dimmed());
    println!(
        "{} {} {}",
        settlement.tier_emoji,
        settlement.tier_name.bold(),
        settlement.tier_message.italic()
    );
    println!(
        "Score:      {}/{} ({}%)",
        settlement.score, settlement.effective_denominator, settlement.percentage
    );
    println!("Best streak: {}", settlement.max_streak);
    println!("XP earned:  {}", settlement.xp_earned.to_string().green().bold());
    println!();

    for record in &state.answers {
        let Some(question) = state.questions.get(record.question) else {
            continue;
        };
        let mark = if record.skipped {
            "skip".yellow()
        } else if record.feedback.correct {
            "ok".green()
        } else if record.feedback.timed_out {
            "time".red()
        } else {
            "miss".red()
        };
        let prompt = wrap(&question.prompt, 70)
            .first()
            .map(|line| line.to_string())
            .unwrap_or_default();
        println!("  [{:>4}] {}", mark, prompt);
    }
}
