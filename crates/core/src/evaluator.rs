//! Answer checking and time-decay scoring.
//!
//! A submission is correct only when the selected line is the faulty one and the
//! corrected text matches the expected line after whitespace normalization (or the
//! question's validation pattern, when it carries one).

use crate::model::{QuizSettings, QuestionRecord};

/// Point range and countdown length used to score a correct answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scoring {
    pub time_limit_ms: u64,
    pub max_points: u32,
    pub min_points: u32,
}

impl Scoring {
    /// Points for a correct answer given after `elapsed_ms`.
    ///
    /// Linear from `max_points` at 0 ms down to `min_points` at the limit, floored.
    /// Answers recorded after the limit still earn `min_points`.
    #[must_use]
    pub fn points_for(&self, elapsed_ms: u64) -> u32 {
        if self.time_limit_ms == 0 {
            return self.min_points;
        }
        let remaining = u128::from(self.time_limit_ms.saturating_sub(elapsed_ms));
        let span = self.max_points.saturating_sub(self.min_points);
        // u32 * u64 fits in u128, and the quotient never exceeds span
        let bonus = u128::from(span) * remaining / u128::from(self.time_limit_ms);
        self.min_points + u32::try_from(bonus).unwrap_or(span)
    }
}

impl From<&QuizSettings> for Scoring {
    fn from(settings: &QuizSettings) -> Self {
        Self {
            time_limit_ms: settings.time_limit_ms(),
            max_points: settings.max_points(),
            min_points: settings.min_points(),
        }
    }
}

/// Evaluator output for one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub is_correct: bool,
    pub points: u32,
    pub line_correct: bool,
    pub text_correct: bool,
}

/// Trim and collapse every internal whitespace run to a single space.
#[must_use]
pub fn normalize_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compare a submission against the question's known correction.
///
/// `selected_line` is 1-based; `None` (no line picked) is never line-correct.
#[must_use]
pub fn evaluate(
    question: &QuestionRecord,
    selected_line: Option<u32>,
    submitted_text: &str,
    elapsed_ms: u64,
    scoring: &Scoring,
) -> Verdict {
    let line_correct = selected_line == Some(question.error_line());

    let submitted = normalize_line(submitted_text);
    let text_correct = submitted == normalize_line(question.correct_line_text())
        || question
            .validation()
            .is_some_and(|pattern| pattern.is_match(&submitted));

    let is_correct = line_correct && text_correct;
    let points = if is_correct {
        scoring.points_for(elapsed_ms)
    } else {
        0
    };

    Verdict {
        is_correct,
        points,
        line_correct,
        text_correct,
    }
}
