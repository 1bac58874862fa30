use chrono::{DateTime, Utc};
use quiz_core::model::{Catalogue, Identity, QuestionRecord, QuizSettings, ResultRecord};
use quiz_core::time::elapsed_ms;
use quiz_core::{Scoring, evaluate};

use super::feedback::Feedback;
use super::progress::{RoundPrompt, SessionProgress};
use super::state::{RoundState, SessionPhase, SessionState};
use crate::error::SessionError;
use crate::sampler::QuestionSampler;
use crate::timer::{RoundTimer, TickOutcome};

//
// ─── ROUND OUTCOME ─────────────────────────────────────────────────────────────
//

/// Everything produced when a round ends, by submission or by timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub record: ResultRecord,
    pub feedback: Feedback,
    pub cumulative_score: u32,
    pub is_last_round: bool,
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Synchronous round/session state machine.
///
/// Owns the sampler and the countdown for one player. Every method that needs
/// the time takes `now` from the caller so scoring stays deterministic in tests.
#[derive(Debug, Clone)]
pub struct SessionController {
    settings: QuizSettings,
    scoring: Scoring,
    identity: Identity,
    sampler: QuestionSampler,
    timer: RoundTimer,
    phase: SessionPhase,
    session: SessionState,
    round: Option<RoundState>,
}

impl SessionController {
    /// New session waiting for its first question.
    #[must_use]
    pub fn new(settings: QuizSettings, sampler: QuestionSampler, identity: Identity) -> Self {
        Self {
            scoring: Scoring::from(&settings),
            timer: RoundTimer::from_settings(&settings),
            settings,
            identity,
            sampler,
            phase: SessionPhase::Loading,
            session: SessionState::default(),
            round: None,
        }
    }

    #[must_use]
    pub fn from_catalogue(settings: QuizSettings, catalogue: Catalogue, identity: Identity) -> Self {
        Self::new(settings, QuestionSampler::new(catalogue), identity)
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    #[must_use]
    pub fn round(&self) -> Option<&RoundState> {
        self.round.as_ref()
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn timer(&self) -> &RoundTimer {
        &self.timer
    }

    #[must_use]
    pub fn sampler(&self) -> &QuestionSampler {
        &self.sampler
    }

    #[must_use]
    pub fn is_last_round(&self) -> bool {
        self.session.round_index + 1 >= self.settings.total_rounds()
    }

    /// Results written from now on carry the new identity.
    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.settings.total_rounds();
        let session_fraction = if self.session.is_finished {
            1.0
        } else {
            f64::from(self.session.round_index) / f64::from(total)
        };
        let time_fraction = if self.round.is_some() {
            self.timer.remaining_fraction()
        } else {
            1.0
        };
        let prompt = match self.phase {
            SessionPhase::AwaitingLineSelection => Some(RoundPrompt::SelectLine),
            SessionPhase::AwaitingAnswerText => Some(RoundPrompt::TypeCorrection),
            _ => None,
        };
        SessionProgress {
            question_number: (self.session.round_index + 1).min(total),
            total_rounds: total,
            session_fraction,
            time_fraction,
            score: self.session.cumulative_score,
            prompt,
        }
    }

    /// Draw the next question and start its countdown.
    ///
    /// An empty catalogue is not an error here: the fallback question is served.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` unless the session is `Loading`.
    pub fn start_round(&mut self, now: DateTime<Utc>) -> Result<&RoundState, SessionError> {
        self.expect_phase(SessionPhase::Loading, "start a round")?;

        let question = self.sampler.draw().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "no question available, serving fallback");
            QuestionRecord::fallback()
        });
        Ok(self.open_round(question, now))
    }

    /// Start the countdown on a question fetched outside the sampler.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` unless the session is `Loading`.
    pub fn start_round_with(
        &mut self,
        question: QuestionRecord,
        now: DateTime<Utc>,
    ) -> Result<&RoundState, SessionError> {
        self.expect_phase(SessionPhase::Loading, "start a round")?;
        Ok(self.open_round(question, now))
    }

    fn open_round(&mut self, question: QuestionRecord, now: DateTime<Utc>) -> &RoundState {
        tracing::debug!(
            round = self.session.round_index,
            question_id = %question.id(),
            "round started"
        );

        self.timer.stop();
        self.timer.start(now);
        self.phase = SessionPhase::AwaitingLineSelection;
        let limit = self.settings.time_limit_ms();
        &*self.round.insert(RoundState::new(question, limit))
    }

    /// Pick the suspected line; the draft is prefilled with that line's text.
    ///
    /// Picking again replaces the previous selection and draft.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` if no round is awaiting an answer, or
    /// `SessionError::LineOutOfRange` if `line` is not in the snippet.
    pub fn select_line(&mut self, line: u32) -> Result<&RoundState, SessionError> {
        if !self.phase.is_awaiting_answer() {
            return Err(self.invalid("select a line"));
        }
        let phase = self.phase;
        let Some(round) = self.round.as_mut() else {
            return Err(SessionError::InvalidPhase {
                phase,
                action: "select a line",
            });
        };
        let Some(text) = round.question.line(line) else {
            return Err(SessionError::LineOutOfRange {
                line,
                len: round.question.line_count(),
            });
        };

        round.draft_answer_text = text.to_owned();
        round.selected_line = Some(line);
        self.phase = SessionPhase::AwaitingAnswerText;
        Ok(&*round)
    }

    /// Replace the draft correction.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoLineSelected` before a line is picked, or
    /// `SessionError::InvalidPhase` outside an open round.
    pub fn edit_answer(&mut self, text: impl Into<String>) -> Result<&RoundState, SessionError> {
        match self.phase {
            SessionPhase::AwaitingAnswerText => {}
            SessionPhase::AwaitingLineSelection => return Err(SessionError::NoLineSelected),
            _ => return Err(self.invalid("edit the answer")),
        }
        let phase = self.phase;
        let round = self.round.as_mut().ok_or(SessionError::InvalidPhase {
            phase,
            action: "edit the answer",
        })?;
        round.draft_answer_text = text.into();
        Ok(&*round)
    }

    /// Stop the countdown, score the draft and close the round.
    ///
    /// `now` is the submission instant; elapsed time is measured from the round's
    /// start, not from ticks.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoLineSelected` (state untouched, timer still
    /// running) or `SessionError::InvalidPhase` outside an open round.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<RoundOutcome, SessionError> {
        if !self.phase.is_awaiting_answer() {
            return Err(self.invalid("submit"));
        }
        let Some(round) = self.round.as_ref() else {
            return Err(self.invalid("submit"));
        };
        let Some(selected) = round.selected_line else {
            return Err(SessionError::NoLineSelected);
        };

        let elapsed = self.timer.started_at().map_or(0, |start| elapsed_ms(start, now));
        let verdict = evaluate(
            &round.question,
            Some(selected),
            &round.draft_answer_text,
            elapsed,
            &self.scoring,
        );
        let feedback = Feedback::for_verdict(&round.question, selected, &verdict);

        self.timer.stop();
        self.close_round(verdict.is_correct, verdict.points, elapsed, feedback)
    }

    /// Advance the countdown by one tick.
    ///
    /// Returns the timeout outcome on the tick that exhausts the time; ticks
    /// outside an open round are ignored.
    pub fn tick(&mut self) -> Option<RoundOutcome> {
        if !self.phase.is_awaiting_answer() {
            return None;
        }
        match self.timer.tick() {
            TickOutcome::Running { remaining_ms } => {
                if let Some(round) = self.round.as_mut() {
                    round.remaining_time_ms = remaining_ms;
                }
                None
            }
            TickOutcome::Expired => {
                let round = self.round.as_ref()?;
                let feedback = Feedback::timed_out(&round.question);
                let limit = self.settings.time_limit_ms();
                self.close_round(false, 0, limit, feedback).ok()
            }
            TickOutcome::Ignored => None,
        }
    }

    /// Move on to the next round.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::LastRound` on the final round, or
    /// `SessionError::InvalidPhase` unless the round is answered.
    pub fn next(&mut self) -> Result<(), SessionError> {
        self.expect_phase(SessionPhase::Answered, "go to the next round")?;
        if self.is_last_round() {
            return Err(SessionError::LastRound);
        }
        self.session.round_index += 1;
        self.round = None;
        self.phase = SessionPhase::Loading;
        Ok(())
    }

    /// End the session after its final round and return the final score.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RoundsRemaining` before the final round, or
    /// `SessionError::InvalidPhase` unless the round is answered.
    pub fn finish(&mut self) -> Result<u32, SessionError> {
        self.expect_phase(SessionPhase::Answered, "finish")?;
        if !self.is_last_round() {
            return Err(SessionError::RoundsRemaining);
        }
        self.session.is_finished = true;
        self.phase = SessionPhase::SessionComplete;
        tracing::info!(
            user_id = %self.identity.id,
            score = self.session.cumulative_score,
            rounds = self.settings.total_rounds(),
            "session complete"
        );
        Ok(self.session.cumulative_score)
    }

    /// Start over with a clean score and the full question pool.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` unless the session is complete.
    pub fn restart(&mut self) -> Result<(), SessionError> {
        self.expect_phase(SessionPhase::SessionComplete, "restart")?;
        // same random stream, so a seeded sampler keeps replaying deterministically
        self.sampler.reset();
        self.timer = RoundTimer::from_settings(&self.settings);
        self.session = SessionState::default();
        self.round = None;
        self.phase = SessionPhase::Loading;
        tracing::info!(user_id = %self.identity.id, "session restarted");
        Ok(())
    }

    /// Stop the countdown without answering, e.g. when the player leaves.
    pub fn abandon(&mut self) {
        self.timer.stop();
    }

    fn close_round(
        &mut self,
        is_correct: bool,
        points: u32,
        time_taken_ms: u64,
        feedback: Feedback,
    ) -> Result<RoundOutcome, SessionError> {
        let phase = self.phase;
        let round = self.round.as_mut().ok_or(SessionError::InvalidPhase {
            phase,
            action: "close the round",
        })?;

        let record = ResultRecord::new(
            &self.identity,
            &round.question,
            is_correct,
            points,
            time_taken_ms,
        );
        round.is_answered = true;
        round.remaining_time_ms = self.timer.remaining_ms();
        round.feedback = Some(feedback.clone());

        self.session.cumulative_score = self.session.cumulative_score.saturating_add(points);
        self.phase = SessionPhase::Answered;

        tracing::debug!(
            round = self.session.round_index,
            question_id = %record.question_id,
            is_correct,
            points,
            time_taken_ms,
            "round answered"
        );

        Ok(RoundOutcome {
            record,
            feedback,
            cumulative_score: self.session.cumulative_score,
            is_last_round: self.is_last_round(),
        })
    }

    fn expect_phase(&self, expected: SessionPhase, action: &'static str) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidPhase {
            phase: self.phase,
            action,
        }
    }
}
