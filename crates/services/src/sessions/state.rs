use std::fmt;

use quiz_core::model::QuestionRecord;

use super::feedback::Feedback;

/// Where the session is in its round cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Loading,
    AwaitingLineSelection,
    AwaitingAnswerText,
    Answered,
    SessionComplete,
}

impl SessionPhase {
    /// Phases in which the round timer runs and a submission is accepted.
    #[must_use]
    pub fn is_awaiting_answer(self) -> bool {
        matches!(
            self,
            SessionPhase::AwaitingLineSelection | SessionPhase::AwaitingAnswerText
        )
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionPhase::Loading => "loading",
            SessionPhase::AwaitingLineSelection => "awaiting line selection",
            SessionPhase::AwaitingAnswerText => "awaiting answer text",
            SessionPhase::Answered => "answered",
            SessionPhase::SessionComplete => "session complete",
        };
        f.write_str(label)
    }
}

/// The live question and what the player has done with it so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundState {
    pub question: QuestionRecord,
    pub selected_line: Option<u32>,
    pub draft_answer_text: String,
    pub is_answered: bool,
    pub remaining_time_ms: u64,
    pub feedback: Option<Feedback>,
}

impl RoundState {
    #[must_use]
    pub fn new(question: QuestionRecord, time_limit_ms: u64) -> Self {
        Self {
            question,
            selected_line: None,
            draft_answer_text: String::new(),
            is_answered: false,
            remaining_time_ms: time_limit_ms,
            feedback: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    /// 0-based; only moves forward, and only after the current round is answered.
    pub round_index: u32,
    pub cumulative_score: u32,
    pub is_finished: bool,
}
