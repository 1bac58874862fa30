/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionProgress {
    /// 1-based number of the current question, capped at `total_rounds`.
    pub question_number: u32,
    pub total_rounds: u32,
    /// Fraction of rounds already behind the player, `0.0..=1.0`.
    pub session_fraction: f64,
    /// Fraction of the round's time still left, `0.0..=1.0`.
    pub time_fraction: f64,
    pub score: u32,
    pub prompt: Option<RoundPrompt>,
}

/// Next thing the player is expected to do while a round is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPrompt {
    SelectLine,
    TypeCorrection,
}

impl SessionProgress {
    /// Header text, e.g. `Question 3 of 10`.
    #[must_use]
    pub fn heading(&self) -> String {
        format!("Question {} of {}", self.question_number, self.total_rounds)
    }
}
