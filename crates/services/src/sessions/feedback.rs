use quiz_core::Verdict;
use quiz_core::model::QuestionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Correct { points: u32 },
    WrongText,
    WrongLine { selected: u32 },
    TimedOut,
}

/// Verdict shown to the player after a round ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub message: String,
}

impl Feedback {
    #[must_use]
    pub fn for_verdict(question: &QuestionRecord, selected_line: u32, verdict: &Verdict) -> Self {
        let (kind, message) = if verdict.is_correct {
            (
                FeedbackKind::Correct {
                    points: verdict.points,
                },
                format!("+{} points! {}", verdict.points, question.explanation()),
            )
        } else if verdict.line_correct {
            (
                FeedbackKind::WrongText,
                format!(
                    "You found the right line, but the correction is incorrect.\nThe correct line is: `{}`",
                    question.correct_line_text().trim()
                ),
            )
        } else {
            (
                FeedbackKind::WrongLine {
                    selected: selected_line,
                },
                format!(
                    "The error is on line {}, not line {}. {}",
                    question.error_line(),
                    selected_line,
                    question.explanation()
                ),
            )
        };
        Self { kind, message }
    }

    #[must_use]
    pub fn timed_out(question: &QuestionRecord) -> Self {
        Self {
            kind: FeedbackKind::TimedOut,
            message: format!("Time's up! {}", question.explanation()),
        }
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        matches!(self.kind, FeedbackKind::Correct { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(is_correct: bool, line_correct: bool, points: u32) -> Verdict {
        Verdict {
            is_correct,
            points,
            line_correct,
            text_correct: is_correct,
        }
    }

    #[test]
    fn correct_message_leads_with_points() {
        let q = QuestionRecord::fallback();
        let fb = Feedback::for_verdict(&q, 1, &verdict(true, true, 73));
        assert!(fb.is_correct());
        assert_eq!(fb.message, format!("+73 points! {}", q.explanation()));
    }

    #[test]
    fn right_line_wrong_text_shows_correction() {
        let q = QuestionRecord::fallback();
        let fb = Feedback::for_verdict(&q, 1, &verdict(false, true, 0));
        assert_eq!(fb.kind, FeedbackKind::WrongText);
        assert_eq!(
            fb.message,
            "You found the right line, but the correction is incorrect.\nThe correct line is: `def greet(name):`"
        );
    }

    #[test]
    fn wrong_line_names_both_lines() {
        let q = QuestionRecord::fallback();
        let fb = Feedback::for_verdict(&q, 2, &verdict(false, false, 0));
        assert_eq!(fb.kind, FeedbackKind::WrongLine { selected: 2 });
        assert!(fb.message.starts_with("The error is on line 1, not line 2. "));
    }

    #[test]
    fn timeout_message() {
        let q = QuestionRecord::fallback();
        let fb = Feedback::timed_out(&q);
        assert!(!fb.is_correct());
        assert!(fb.message.starts_with("Time's up! "));
    }
}
