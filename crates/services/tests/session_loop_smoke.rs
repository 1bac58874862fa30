use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{Catalogue, Identity, QuestionDraft, QuestionRecord, QuizSettings, UserId};
use quiz_core::time::fixed_now;
use services::{
    AppServices, Clock, IdentityProvider, LocalIdentityProvider, Reporter, ResultBackend,
    SessionError, SessionEvent, SessionExit, SessionHandle, SessionLoopService, SessionUpdate,
};
use storage::QuestionGenerator;
use storage::repository::{InMemoryRepository, QuestionSource, StaticCatalogue, StorageError};
use tokio::sync::{mpsc, watch};

struct BrokenSource;

#[async_trait]
impl QuestionSource for BrokenSource {
    async fn load_catalogue(&self) -> Result<Catalogue, StorageError> {
        Err(StorageError::Io("questions.json: permission denied".into()))
    }
}

/// Numbers its questions `gen-1`, `gen-2`, ...; fails every call when `broken`.
#[derive(Default)]
struct CountingGenerator {
    calls: AtomicU32,
    broken: bool,
}

#[async_trait]
impl QuestionGenerator for CountingGenerator {
    async fn generate(&self) -> Result<QuestionRecord, StorageError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.broken {
            return Err(StorageError::RemoteStatus(503));
        }
        let question = QuestionDraft {
            id: format!("gen-{n}"),
            code: "items = [1, 2, 3]\nprint(items[3])".into(),
            error_line: 2,
            correct_line_text: "print(items[2])".into(),
            explanation: "Index 3 is past the end.".into(),
            error_type: "IndexError".into(),
            validation_regex: None,
        }
        .validate()
        .unwrap();
        Ok(question)
    }
}

fn service(rounds: u32, repo: &InMemoryRepository) -> SessionLoopService {
    let settings = QuizSettings::default().with_total_rounds(rounds).unwrap();
    SessionLoopService::new(
        Clock::fixed(fixed_now()),
        settings,
        Arc::new(StaticCatalogue::builtin().unwrap()),
        Reporter::new(Arc::new(repo.clone())),
    )
    .with_sampler_seed(11)
}

fn player() -> Identity {
    Identity::new(UserId::new("u-1"), Some("Ada".into()))
}

/// Answer every round perfectly and finish; returns the final score.
async fn play_perfectly(
    handle: &SessionHandle,
    updates: &mut mpsc::UnboundedReceiver<SessionUpdate>,
) -> u32 {
    loop {
        match updates.recv().await.expect("session loop alive") {
            SessionUpdate::RoundStarted { round, .. } => {
                let question = round.question;
                assert!(handle.send(SessionEvent::SelectLine(question.error_line())));
                assert!(handle.send(SessionEvent::EditAnswer(
                    question.correct_line_text().to_owned()
                )));
                assert!(handle.send(SessionEvent::Submit));
            }
            SessionUpdate::RoundFinished(outcome) => {
                assert!(outcome.record.is_correct, "{}", outcome.feedback.message);
                let next = if outcome.is_last_round {
                    SessionEvent::Finish
                } else {
                    SessionEvent::Next
                };
                assert!(handle.send(next));
            }
            SessionUpdate::SessionComplete { final_score } => return final_score,
            SessionUpdate::Rejected(err) => panic!("unexpected rejection: {err}"),
            _ => {}
        }
    }
}

#[tokio::test(start_paused = true)]
async fn perfect_ten_round_session_totals_one_thousand() {
    let repo = InMemoryRepository::new();
    let (_identity_tx, identity_rx) = watch::channel(Some(player()));
    let (session, handle, mut updates) = service(10, &repo).start(player(), identity_rx).await;
    let task = tokio::spawn(session.run());

    assert_eq!(play_perfectly(&handle, &mut updates).await, 1_000);

    drop(handle);
    assert_eq!(task.await.unwrap(), SessionExit::Closed);

    let records = repo.records().unwrap();
    assert_eq!(records.len(), 10);
    assert!(records.iter().all(|r| r.is_correct && r.score == 100));
    assert!(records.iter().all(|r| r.student_display_name.as_deref() == Some("Ada")));

    // 14 questions in the bank, so ten rounds never repeat one
    let mut ids: Vec<_> = records.iter().map(|r| r.question_id.clone()).collect();
    ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    ids.dedup();
    assert_eq!(ids.len(), 10);
}

#[tokio::test(start_paused = true)]
async fn unanswered_round_times_out_exactly_once() {
    let repo = InMemoryRepository::new();
    let (_identity_tx, identity_rx) = watch::channel(Some(player()));
    let (session, handle, mut updates) = service(1, &repo).start(player(), identity_rx).await;
    let task = tokio::spawn(session.run());

    let outcome = loop {
        if let SessionUpdate::RoundFinished(outcome) = updates.recv().await.unwrap() {
            break outcome;
        }
    };
    assert!(!outcome.record.is_correct);
    assert_eq!(outcome.record.score, 0);
    assert_eq!(outcome.record.time_taken_ms, 20_000);
    assert!(outcome.feedback.message.starts_with("Time's up! "));

    // a late submit cannot produce a second result
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(handle.send(SessionEvent::Submit));
    drop(handle);
    assert_eq!(task.await.unwrap(), SessionExit::Closed);

    while let Ok(update) = updates.try_recv() {
        assert!(!matches!(update, SessionUpdate::RoundFinished(_)));
    }
    let records = repo.records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].time_taken_ms, 20_000);
}

#[tokio::test(start_paused = true)]
async fn countdown_reports_time_left() {
    let repo = InMemoryRepository::new();
    let (_identity_tx, identity_rx) = watch::channel(Some(player()));
    let (session, handle, mut updates) = service(1, &repo).start(player(), identity_rx).await;
    let task = tokio::spawn(session.run());

    let mut seen = Vec::new();
    while seen.len() < 3 {
        if let SessionUpdate::TimeLeft { remaining_ms, .. } = updates.recv().await.unwrap() {
            seen.push(remaining_ms);
        }
    }
    assert_eq!(seen, vec![19_900, 19_800, 19_700]);

    drop(handle);
    task.abort();
}

#[tokio::test(start_paused = true)]
async fn submit_without_line_is_rejected_and_round_continues() {
    let repo = InMemoryRepository::new();
    let (_identity_tx, identity_rx) = watch::channel(Some(player()));
    let (session, handle, mut updates) = service(1, &repo).start(player(), identity_rx).await;
    let task = tokio::spawn(session.run());

    assert!(matches!(
        updates.recv().await.unwrap(),
        SessionUpdate::RoundStarted { .. }
    ));
    handle.send(SessionEvent::Submit);
    loop {
        match updates.recv().await.unwrap() {
            SessionUpdate::Rejected(err) => {
                assert_eq!(err, SessionError::NoLineSelected);
                break;
            }
            SessionUpdate::TimeLeft { .. } => {}
            other => panic!("unexpected update: {other:?}"),
        }
    }

    handle.send(SessionEvent::SelectLine(1));
    loop {
        match updates.recv().await.unwrap() {
            SessionUpdate::LineSelected { line, draft } => {
                assert_eq!(line, 1);
                assert!(!draft.is_empty());
                break;
            }
            SessionUpdate::TimeLeft { .. } => {}
            other => panic!("unexpected update: {other:?}"),
        }
    }
    assert!(repo.records().unwrap().is_empty());

    drop(handle);
    task.abort();
}

#[tokio::test(start_paused = true)]
async fn restart_after_completion_starts_fresh() {
    let repo = InMemoryRepository::new();
    let (_identity_tx, identity_rx) = watch::channel(Some(player()));
    let (session, handle, mut updates) = service(2, &repo).start(player(), identity_rx).await;
    let task = tokio::spawn(session.run());

    assert_eq!(play_perfectly(&handle, &mut updates).await, 200);
    handle.send(SessionEvent::Restart);
    let progress = loop {
        if let SessionUpdate::RoundStarted { progress, .. } = updates.recv().await.unwrap() {
            break progress;
        }
    };
    assert_eq!(progress.question_number, 1);
    assert_eq!(progress.score, 0);
    assert_eq!(progress.heading(), "Question 1 of 2");

    drop(handle);
    task.abort();
}

#[tokio::test(start_paused = true)]
async fn sign_out_ends_the_session() {
    let repo = InMemoryRepository::new();
    let provider = LocalIdentityProvider::new(Some("Ada".into()));
    let identity = provider.sign_in().await.unwrap();
    let (session, _handle, mut updates) = service(3, &repo)
        .start(identity, provider.subscribe())
        .await;
    let task = tokio::spawn(session.run());

    assert!(matches!(
        updates.recv().await.unwrap(),
        SessionUpdate::RoundStarted { .. }
    ));
    provider.sign_out().await.unwrap();

    assert_eq!(task.await.unwrap(), SessionExit::SignedOut);
    let mut last = None;
    while let Ok(update) = updates.try_recv() {
        last = Some(update);
    }
    assert_eq!(last, Some(SessionUpdate::SignedOut));
    assert!(repo.records().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn broken_question_source_serves_fallback() {
    let repo = InMemoryRepository::new();
    let service = SessionLoopService::new(
        Clock::fixed(fixed_now()),
        QuizSettings::default(),
        Arc::new(BrokenSource),
        Reporter::new(Arc::new(repo.clone())),
    );
    let (_identity_tx, identity_rx) = watch::channel(Some(player()));
    let (session, handle, mut updates) = service.start(player(), identity_rx).await;
    let task = tokio::spawn(session.run());

    match updates.recv().await.unwrap() {
        SessionUpdate::RoundStarted { round, .. } => {
            assert_eq!(round.question.id().as_str(), "fallback-01");
        }
        other => panic!("unexpected update: {other:?}"),
    }

    drop(handle);
    task.abort();
}

#[tokio::test]
async fn app_services_wire_memory_backend() {
    let provider: Arc<dyn IdentityProvider> =
        Arc::new(LocalIdentityProvider::new(None).with_user_id(UserId::new("u-5")));
    let services = AppServices::new(
        Clock::fixed(fixed_now()),
        QuizSettings::default(),
        Arc::new(StaticCatalogue::builtin().unwrap()),
        ResultBackend::Memory,
        provider,
    )
    .await
    .unwrap();

    let identity = services.identity().sign_in().await.unwrap();
    assert_eq!(identity.id.as_str(), "u-5");
    assert_eq!(services.session_loop().settings().total_rounds(), 10);
    assert_eq!(services.session_loop().load_catalogue().await.len(), 14);

    let log = services.result_log().expect("memory backend keeps results");
    assert!(log.recent_results(10).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn generator_supplies_a_question_per_round() {
    let repo = InMemoryRepository::new();
    let generator = Arc::new(CountingGenerator::default());
    let service = service(3, &repo).with_generator(generator.clone());
    let (_identity_tx, identity_rx) = watch::channel(Some(player()));
    let (session, handle, mut updates) = service.start(player(), identity_rx).await;
    let task = tokio::spawn(session.run());

    assert_eq!(play_perfectly(&handle, &mut updates).await, 300);
    drop(handle);
    assert_eq!(task.await.unwrap(), SessionExit::Closed);

    let mut ids: Vec<_> = repo
        .records()
        .unwrap()
        .iter()
        .map(|r| r.question_id.as_str().to_owned())
        .collect();
    ids.sort();
    assert_eq!(ids, ["gen-1", "gen-2", "gen-3"]);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn failing_generator_serves_fallback() {
    let repo = InMemoryRepository::new();
    let generator = Arc::new(CountingGenerator {
        broken: true,
        ..CountingGenerator::default()
    });
    let service = service(2, &repo).with_generator(generator);
    let (_identity_tx, identity_rx) = watch::channel(Some(player()));
    let (session, handle, mut updates) = service.start(player(), identity_rx).await;
    let task = tokio::spawn(session.run());

    match updates.recv().await.unwrap() {
        SessionUpdate::RoundStarted { round, progress } => {
            assert_eq!(round.question.id().as_str(), "fallback-01");
            assert_eq!(progress.question_number, 1);
        }
        other => panic!("unexpected update: {other:?}"),
    }

    drop(handle);
    task.abort();
}

#[tokio::test]
async fn app_services_route_rounds_through_a_generator() {
    let provider: Arc<dyn IdentityProvider> = Arc::new(LocalIdentityProvider::new(None));
    let services = AppServices::new(
        Clock::fixed(fixed_now()),
        QuizSettings::default().with_total_rounds(1).unwrap(),
        Arc::new(BrokenSource),
        ResultBackend::Memory,
        provider,
    )
    .await
    .unwrap()
    .with_question_generator(Arc::new(CountingGenerator::default()));

    let identity = services.identity().sign_in().await.unwrap();
    let (session, handle, mut updates) = services
        .session_loop()
        .start(identity, services.identity().subscribe())
        .await;
    let task = tokio::spawn(session.run());

    match updates.recv().await.unwrap() {
        SessionUpdate::RoundStarted { round, .. } => {
            assert_eq!(round.question.id().as_str(), "gen-1");
        }
        other => panic!("unexpected update: {other:?}"),
    }

    drop(handle);
    task.abort();
}
