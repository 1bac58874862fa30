//! Line-oriented front-end: renders session updates and turns typed lines into events.

use std::io::{self, Write};

use quiz_core::model::Identity;
use services::{
    FeedbackKind, RoundOutcome, RoundPrompt, RoundState, SessionEvent, SessionProgress,
    SessionUpdate,
};
use storage::repository::StoredResult;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// What the screen is currently asking for; decides how a bare line is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Loading,
    SelectLine,
    TypeCorrection,
    Answered { is_last_round: bool },
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Session(Vec<SessionEvent>),
    Quit,
    SignOut,
    History,
    Help,
    Unknown(String),
}

/// Interpret one typed line.
///
/// `:N` always picks line N. Otherwise a bare number picks a line, text replaces
/// the draft and submits, and an empty line accepts whatever the screen offers.
pub fn parse_input(line: &str, screen: Screen) -> Command {
    let trimmed = line.trim();
    match trimmed {
        ":q" | ":quit" | ":exit" => return Command::Quit,
        ":signout" | ":logout" => return Command::SignOut,
        ":history" => return Command::History,
        ":help" | ":h" | "?" => return Command::Help,
        ":next" => return Command::Session(vec![SessionEvent::Next]),
        ":finish" => return Command::Session(vec![SessionEvent::Finish]),
        ":restart" => return Command::Session(vec![SessionEvent::Restart]),
        ":submit" => return Command::Session(vec![SessionEvent::Submit]),
        _ => {}
    }
    if let Some(rest) = trimmed.strip_prefix(':') {
        return match rest.trim().parse::<u32>() {
            Ok(n) => Command::Session(vec![SessionEvent::SelectLine(n)]),
            Err(_) => Command::Unknown(trimmed.to_owned()),
        };
    }

    match screen {
        Screen::SelectLine => match trimmed.parse::<u32>() {
            Ok(n) => Command::Session(vec![SessionEvent::SelectLine(n)]),
            // typing before picking a line is still a submission attempt
            Err(_) if trimmed.is_empty() => Command::Session(vec![SessionEvent::Submit]),
            Err(_) => Command::Unknown(trimmed.to_owned()),
        },
        Screen::TypeCorrection if trimmed.is_empty() => {
            Command::Session(vec![SessionEvent::Submit])
        }
        Screen::TypeCorrection => Command::Session(vec![
            SessionEvent::EditAnswer(line.trim_end_matches(['\r', '\n']).to_owned()),
            SessionEvent::Submit,
        ]),
        Screen::Answered { is_last_round } if trimmed.is_empty() => {
            let event = if is_last_round {
                SessionEvent::Finish
            } else {
                SessionEvent::Next
            };
            Command::Session(vec![event])
        }
        Screen::Complete if trimmed.is_empty() => {
            Command::Session(vec![SessionEvent::Restart])
        }
        _ if trimmed.is_empty() => Command::Session(Vec::new()),
        _ => Command::Unknown(trimmed.to_owned()),
    }
}

/// Forward stdin lines until EOF.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to read from stdin");
                    break;
                }
            }
        }
    });
    rx
}

//
// ─── RENDERING ─────────────────────────────────────────────────────────────────
//

pub fn render_welcome(out: &mut impl Write, identity: &Identity) -> io::Result<()> {
    writeln!(out, "Python Debugger")?;
    writeln!(
        out,
        "Welcome, {}! Find and fix the bug in each snippet. The faster you are, the higher your score.",
        identity.display_name_or_anonymous()
    )?;
    writeln!(out, "Type :help for commands.")?;
    writeln!(out)
}

pub fn render_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "  <n> or :<n>   pick line n (':<n>' also works while typing a correction)")?;
    writeln!(out, "  <text>        replace the line with <text> and submit")?;
    writeln!(out, "  <enter>       submit the line as shown, or continue after feedback")?;
    writeln!(out, "  :next  :finish  :restart")?;
    writeln!(out, "  :history      your recorded results")?;
    writeln!(out, "  :signout      sign out and end the session")?;
    writeln!(out, "  :quit         leave")
}

/// Render one update and return the screen it leaves the player on.
pub fn render_update(out: &mut impl Write, update: &SessionUpdate, screen: Screen) -> io::Result<Screen> {
    match update {
        SessionUpdate::RoundStarted { round, progress } => {
            render_round(out, round, progress)?;
            Ok(Screen::SelectLine)
        }
        SessionUpdate::LineSelected { line, draft } => {
            writeln!(out, "Line {line} selected: {draft}")?;
            render_prompt(out, RoundPrompt::TypeCorrection)?;
            Ok(Screen::TypeCorrection)
        }
        SessionUpdate::TimeLeft { remaining_ms, .. } => {
            if should_announce(*remaining_ms) {
                writeln!(out, "  [{}s left]", remaining_ms / 1_000)?;
            }
            Ok(screen)
        }
        SessionUpdate::RoundFinished(outcome) => {
            render_outcome(out, outcome)?;
            Ok(Screen::Answered {
                is_last_round: outcome.is_last_round,
            })
        }
        SessionUpdate::SessionComplete { final_score } => {
            writeln!(out)?;
            writeln!(out, "Game Over! Your final score is: {final_score}")?;
            writeln!(out, "Press Enter to play again, or :quit to leave.")?;
            Ok(Screen::Complete)
        }
        SessionUpdate::Rejected(err) => {
            writeln!(out, "! {err}")?;
            Ok(screen)
        }
        SessionUpdate::SignedOut => {
            writeln!(out, "Signed out.")?;
            Ok(Screen::Loading)
        }
    }
}

fn should_announce(remaining_ms: u64) -> bool {
    remaining_ms % 1_000 == 0 && (remaining_ms % 5_000 == 0 || remaining_ms <= 3_000)
}

fn render_round(out: &mut impl Write, round: &RoundState, progress: &SessionProgress) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "{}   score {}   {}",
        progress.heading(),
        progress.score,
        progress_bar(progress.session_fraction, 20)
    )?;
    writeln!(out, "{} seconds on the clock.", round.remaining_time_ms / 1_000)?;
    let width = round.question.line_count().to_string().len();
    for (i, line) in round.question.code().iter().enumerate() {
        writeln!(out, "{:>width$} | {line}", i + 1)?;
    }
    render_prompt(out, RoundPrompt::SelectLine)
}

fn render_prompt(out: &mut impl Write, prompt: RoundPrompt) -> io::Result<()> {
    let text = match prompt {
        RoundPrompt::SelectLine => "1. Type the number of the line with the error.",
        RoundPrompt::TypeCorrection => {
            "2. Now, type the corrected line of code (Enter keeps it as shown)."
        }
    };
    writeln!(out, "{text}")
}

fn render_outcome(out: &mut impl Write, outcome: &RoundOutcome) -> io::Result<()> {
    let marker = match outcome.feedback.kind {
        FeedbackKind::Correct { .. } => "Correct!",
        FeedbackKind::TimedOut => "Out of time.",
        FeedbackKind::WrongText | FeedbackKind::WrongLine { .. } => "Not quite.",
    };
    writeln!(out, "{marker} {}", outcome.feedback.message)?;
    writeln!(out, "Score: {}", outcome.cumulative_score)?;
    if outcome.is_last_round {
        writeln!(out, "Press Enter to finish the game.")
    } else {
        writeln!(out, "Press Enter for the next question.")
    }
}

pub fn render_history(out: &mut impl Write, rows: &[StoredResult]) -> io::Result<()> {
    if rows.is_empty() {
        return writeln!(out, "No results recorded yet.");
    }
    for row in rows {
        writeln!(
            out,
            "  {}  {:<10} {:<16} {:>3} pts  {:>5.1}s  {}",
            row.recorded_at.format("%Y-%m-%d %H:%M"),
            row.record.question_id,
            row.record.error_type,
            row.record.score,
            row.record.time_taken_ms as f64 / 1_000.0,
            if row.record.is_correct { "ok" } else { "miss" },
        )?;
    }
    Ok(())
}

fn progress_bar(fraction: f64, width: usize) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(width - filled))
}
