use std::sync::Arc;

use quiz_core::model::{Catalogue, Identity, QuestionRecord, QuizSettings};
use storage::QuestionGenerator;
use storage::repository::QuestionSource;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::controller::{RoundOutcome, SessionController};
use super::progress::SessionProgress;
use super::state::RoundState;
use crate::Clock;
use crate::error::SessionError;
use crate::reporting::Reporter;
use crate::sampler::QuestionSampler;
use crate::timer::Ticker;

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// Commands and timer ticks, consumed in order by the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SelectLine(u32),
    EditAnswer(String),
    Submit,
    Next,
    Finish,
    Restart,
    /// Countdown tick tagged with the round it was started for.
    Tick { generation: u64 },
    /// A generated question arrived for the round being loaded.
    QuestionLoaded {
        generation: u64,
        question: Box<QuestionRecord>,
    },
}

/// What the front-end should show after an event has been handled.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    RoundStarted {
        round: RoundState,
        progress: SessionProgress,
    },
    LineSelected {
        line: u32,
        draft: String,
    },
    TimeLeft {
        remaining_ms: u64,
        progress: SessionProgress,
    },
    RoundFinished(RoundOutcome),
    SessionComplete {
        final_score: u32,
    },
    Rejected(SessionError),
    SignedOut,
}

/// Why `SessionLoop::run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    SignedOut,
    /// Every `SessionHandle` was dropped.
    Closed,
}

/// Sending side of the session's event queue.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    /// Queue an event. Returns `false` once the session loop has stopped.
    pub fn send(&self, event: SessionEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Builds session loops from the configured question source and reporter.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    settings: QuizSettings,
    questions: Arc<dyn QuestionSource>,
    reporter: Reporter,
    sampler_seed: Option<u64>,
    generator: Option<Arc<dyn QuestionGenerator>>,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        settings: QuizSettings,
        questions: Arc<dyn QuestionSource>,
        reporter: Reporter,
    ) -> Self {
        Self {
            clock,
            settings,
            questions,
            reporter,
            sampler_seed: None,
            generator: None,
        }
    }

    /// Draw questions in a reproducible order.
    #[must_use]
    pub fn with_sampler_seed(mut self, seed: u64) -> Self {
        self.sampler_seed = Some(seed);
        self
    }

    /// Ask `generator` for a fresh question at the start of every round
    /// instead of drawing from the catalogue.
    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn QuestionGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    /// Fetch the catalogue. A failing source yields an empty catalogue, which
    /// makes every round serve the fallback question.
    pub async fn load_catalogue(&self) -> Catalogue {
        match self.questions.load_catalogue().await {
            Ok(catalogue) => {
                if catalogue.is_empty() {
                    tracing::warn!("question source returned an empty catalogue");
                }
                catalogue
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load questions, using fallback");
                Catalogue::empty()
            }
        }
    }

    /// Prepare a session for `identity`.
    ///
    /// `identity_changes` is observed while the session runs: a new identity is
    /// used for later results, and a sign-out ends the loop.
    pub async fn start(
        &self,
        identity: Identity,
        identity_changes: watch::Receiver<Option<Identity>>,
    ) -> (SessionLoop, SessionHandle, mpsc::UnboundedReceiver<SessionUpdate>) {
        // generated sessions never draw from the catalogue
        let catalogue = if self.generator.is_some() {
            Catalogue::empty()
        } else {
            self.load_catalogue().await
        };
        let sampler = match self.sampler_seed {
            Some(seed) => QuestionSampler::with_seed(catalogue, seed),
            None => QuestionSampler::new(catalogue),
        };
        tracing::info!(
            user_id = %identity.id,
            rounds = self.settings.total_rounds(),
            questions = sampler.catalogue().len(),
            generated = self.generator.is_some(),
            "session started"
        );
        let controller = SessionController::new(self.settings, sampler, identity);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let session = SessionLoop {
            clock: self.clock,
            controller,
            reporter: self.reporter.clone(),
            generator: self.generator.clone(),
            events_tx: events_tx.downgrade(),
            events_rx,
            updates: updates_tx,
            identity_changes,
            ticker: None,
            loading: None,
            generation: 0,
            pending_reports: Vec::new(),
        };
        (session, SessionHandle { events: events_tx }, updates_rx)
    }
}

//
// ─── LOOP ──────────────────────────────────────────────────────────────────────
//

/// Single owner of a session's state.
///
/// Player commands and countdown ticks arrive on one queue and are applied one
/// at a time, so a manual submit and a timeout can never both end a round.
pub struct SessionLoop {
    clock: Clock,
    controller: SessionController,
    reporter: Reporter,
    generator: Option<Arc<dyn QuestionGenerator>>,
    events_tx: mpsc::WeakUnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    updates: mpsc::UnboundedSender<SessionUpdate>,
    identity_changes: watch::Receiver<Option<Identity>>,
    ticker: Option<Ticker>,
    loading: Option<JoinHandle<()>>,
    generation: u64,
    pending_reports: Vec<JoinHandle<()>>,
}

impl SessionLoop {
    #[must_use]
    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Drive the session until sign-out or until every handle is dropped.
    ///
    /// Results still being submitted are awaited before returning.
    pub async fn run(mut self) -> SessionExit {
        self.begin_round();

        let mut watching_identity = true;
        let exit = loop {
            tokio::select! {
                event = self.events_rx.recv() => {
                    let Some(event) = event else {
                        break SessionExit::Closed;
                    };
                    self.handle(event);
                }
                changed = self.identity_changes.changed(), if watching_identity => {
                    if changed.is_err() {
                        watching_identity = false;
                        continue;
                    }
                    let current = self.identity_changes.borrow_and_update().clone();
                    match current {
                        Some(identity) => self.controller.set_identity(identity),
                        None => {
                            self.emit(SessionUpdate::SignedOut);
                            break SessionExit::SignedOut;
                        }
                    }
                }
            }
        };

        self.stop_ticker();
        if let Some(loading) = self.loading.take() {
            loading.abort();
        }
        self.controller.abandon();
        for report in self.pending_reports.drain(..) {
            let _ = report.await;
        }
        tracing::debug!(?exit, "session loop stopped");
        exit
    }

    fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Tick { generation } => {
                if generation != self.generation {
                    return;
                }
                if let Some(outcome) = self.controller.tick() {
                    self.round_finished(outcome);
                    return;
                }
                let remaining_ms = match self.controller.round() {
                    Some(round) if !round.is_answered => round.remaining_time_ms,
                    _ => return,
                };
                self.emit(SessionUpdate::TimeLeft {
                    remaining_ms,
                    progress: self.controller.progress(),
                });
            }
            SessionEvent::QuestionLoaded {
                generation,
                question,
            } => {
                if generation != self.generation {
                    return;
                }
                self.loading = None;
                let now = self.clock.now();
                match self.controller.start_round_with(*question, now) {
                    Ok(round) => {
                        let round = round.clone();
                        self.round_started(round);
                    }
                    Err(err) => self.reject(err),
                }
            }
            SessionEvent::SelectLine(line) => match self.controller.select_line(line) {
                Ok(round) => {
                    let draft = round.draft_answer_text.clone();
                    self.emit(SessionUpdate::LineSelected { line, draft });
                }
                Err(err) => self.reject(err),
            },
            SessionEvent::EditAnswer(text) => {
                if let Err(err) = self.controller.edit_answer(text) {
                    self.reject(err);
                }
            }
            SessionEvent::Submit => match self.controller.submit(self.clock.now()) {
                Ok(outcome) => self.round_finished(outcome),
                Err(err) => self.reject(err),
            },
            SessionEvent::Next => match self.controller.next() {
                Ok(()) => self.begin_round(),
                Err(err) => self.reject(err),
            },
            SessionEvent::Finish => match self.controller.finish() {
                Ok(final_score) => self.emit(SessionUpdate::SessionComplete { final_score }),
                Err(err) => self.reject(err),
            },
            SessionEvent::Restart => match self.controller.restart() {
                Ok(()) => self.begin_round(),
                Err(err) => self.reject(err),
            },
        }
    }

    fn begin_round(&mut self) {
        self.stop_ticker();
        self.generation += 1;
        if let Some(loading) = self.loading.take() {
            loading.abort();
        }
        if let Some(generator) = self.generator.clone() {
            self.loading = Some(self.request_question(generator));
            return;
        }

        let round = match self.controller.start_round(self.clock.now()) {
            Ok(round) => round.clone(),
            Err(err) => {
                self.reject(err);
                return;
            }
        };
        self.round_started(round);
    }

    /// Generate the next question off the loop; it comes back as `QuestionLoaded`.
    fn request_question(&self, generator: Arc<dyn QuestionGenerator>) -> JoinHandle<()> {
        let events = self.events_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let question = match generator.generate().await {
                Ok(question) => question,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to generate question, using fallback");
                    QuestionRecord::fallback()
                }
            };
            if let Some(events) = events.upgrade() {
                let _ = events.send(SessionEvent::QuestionLoaded {
                    generation,
                    question: Box::new(question),
                });
            }
        })
    }

    fn round_started(&mut self, round: RoundState) {
        let generation = self.generation;
        self.ticker = Some(Ticker::spawn(
            self.controller.settings().tick(),
            self.events_tx.clone(),
            move || SessionEvent::Tick { generation },
        ));

        self.emit(SessionUpdate::RoundStarted {
            round,
            progress: self.controller.progress(),
        });
    }

    fn round_finished(&mut self, outcome: RoundOutcome) {
        self.stop_ticker();
        self.pending_reports.retain(|report| !report.is_finished());
        self.pending_reports
            .push(self.reporter.report(outcome.record.clone()));
        self.emit(SessionUpdate::RoundFinished(outcome));
    }

    fn stop_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
    }

    fn reject(&self, err: SessionError) {
        tracing::debug!(error = %err, "command rejected");
        self.emit(SessionUpdate::Rejected(err));
    }

    fn emit(&self, update: SessionUpdate) {
        // The front-end may already be gone; the session still runs to completion.
        let _ = self.updates.send(update);
    }
}
