mod args;
mod terminal;

use std::io::{self, Write};
use std::sync::Arc;

use quiz_core::model::Identity;
use services::{
    AppServices, Clock, IdentityProvider, LocalIdentityProvider, ResultBackend, SessionExit,
};
use storage::repository::{QuestionSource, StaticCatalogue};
use storage::{HttpQuestionGenerator, JsonCatalogueFile};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::args::{Args, ArgsError, print_usage};
use crate::terminal::{Command, Screen, parse_input};

/// How a played session ended, from the terminal's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayExit {
    Quit,
    SignedOut,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("QUIZ_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    // stdout belongs to the game
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn prepare_sqlite_dir(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.contains("mode=memory") {
        return Ok(());
    }
    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    if parsed.help {
        print_usage();
        return Ok(());
    }
    init_tracing(parsed.verbose);

    let settings = parsed.settings()?;
    let questions: Arc<dyn QuestionSource> = match &parsed.catalogue {
        Some(path) => Arc::new(JsonCatalogueFile::new(path.clone())),
        None => Arc::new(StaticCatalogue::builtin()?),
    };
    let backend = parsed.backend();
    if let ResultBackend::Sqlite { url } = &backend {
        prepare_sqlite_dir(url)?;
    }

    let provider: Arc<dyn IdentityProvider> =
        Arc::new(LocalIdentityProvider::new(parsed.player.clone()));
    let mut services =
        AppServices::new(Clock::default(), settings, questions, backend, provider).await?;
    if let Some(config) = parsed.generator() {
        tracing::debug!(endpoint = %config.endpoint, "generating questions over http");
        // remember two sessions' worth of ids before starting over
        let cache_limit = usize::try_from(settings.total_rounds())
            .unwrap_or(usize::MAX)
            .saturating_mul(2);
        let generator = HttpQuestionGenerator::http(config).with_id_cache_limit(cache_limit);
        services = services.with_question_generator(Arc::new(generator));
    }

    let mut stdin = terminal::spawn_stdin_reader();
    let mut out = std::io::stdout();
    loop {
        let provider = services.identity();
        let Some(identity) = sign_in(provider.as_ref(), &mut stdin, &mut out).await? else {
            break;
        };
        terminal::render_welcome(&mut out, &identity)?;

        match play(&services, identity, &mut stdin).await? {
            PlayExit::Quit => break,
            PlayExit::SignedOut => {
                writeln!(out, "Press Enter to sign in again, or :quit to leave.")?;
                out.flush()?;
                match stdin.recv().await {
                    Some(line) if parse_input(&line, Screen::Loading) != Command::Quit => {}
                    _ => break,
                }
            }
        }
    }
    Ok(())
}

/// Sign in, offering a retry after every failure. `None` means the player gave up.
async fn sign_in(
    provider: &dyn IdentityProvider,
    stdin: &mut mpsc::UnboundedReceiver<String>,
    out: &mut impl Write,
) -> io::Result<Option<Identity>> {
    loop {
        let err = match provider.sign_in().await {
            Ok(identity) => return Ok(Some(identity)),
            Err(err) => err,
        };
        tracing::warn!(error = %err, "sign-in failed");
        writeln!(out, "Could not sign in: {err}")?;
        writeln!(out, "Press Enter to retry, or :quit to leave.")?;
        out.flush()?;
        match stdin.recv().await {
            Some(line) if parse_input(&line, Screen::Loading) != Command::Quit => {}
            _ => return Ok(None),
        }
    }
}

/// Drive one session until the player quits, signs out or closes stdin.
async fn play(
    services: &AppServices,
    identity: Identity,
    stdin: &mut mpsc::UnboundedReceiver<String>,
) -> Result<PlayExit, Box<dyn std::error::Error>> {
    let (session, handle, mut updates) = services
        .session_loop()
        .start(identity.clone(), services.identity().subscribe())
        .await;
    let task = tokio::spawn(session.run());

    let mut out = std::io::stdout();
    let mut screen = Screen::Loading;
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(update) = update else { break };
                screen = terminal::render_update(&mut out, &update, screen)?;
                out.flush()?;
            }
            line = stdin.recv() => {
                let Some(line) = line else { break };
                match parse_input(&line, screen) {
                    Command::Session(events) => {
                        for event in events {
                            handle.send(event);
                        }
                    }
                    Command::Quit => break,
                    Command::SignOut => services.identity().sign_out().await?,
                    Command::History => match services.result_log() {
                        Some(log) => {
                            let rows = log.results_for_user(&identity.id).await?;
                            terminal::render_history(&mut out, &rows)?;
                        }
                        None => writeln!(out, "Results are not kept locally with this backend.")?,
                    },
                    Command::Help => terminal::render_help(&mut out)?,
                    Command::Unknown(raw) => {
                        writeln!(out, "Didn't understand {raw:?}. Type :help for commands.")?;
                    }
                }
                out.flush()?;
            }
        }
    }

    drop(handle);
    let exit = task.await?;
    tracing::debug!(?exit, "session ended");
    Ok(match exit {
        SessionExit::SignedOut => PlayExit::SignedOut,
        SessionExit::Closed => PlayExit::Quit,
    })
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use quiz_core::model::UserId;
    use services::IdentityError;
    use tokio::sync::watch;

    /// Fails the first `failures` sign-ins, then succeeds.
    struct FlakyProvider {
        failures: u32,
        attempts: AtomicU32,
        state: watch::Sender<Option<Identity>>,
    }

    impl FlakyProvider {
        fn new(failures: u32) -> Self {
            let (state, _) = watch::channel(None);
            Self {
                failures,
                attempts: AtomicU32::new(0),
                state,
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for FlakyProvider {
        async fn sign_in(&self) -> Result<Identity, IdentityError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.failures {
                return Err(IdentityError::Failed("network unreachable".into()));
            }
            let identity = Identity::new(UserId::new("u-9"), None);
            self.state.send_replace(Some(identity.clone()));
            Ok(identity)
        }

        async fn sign_out(&self) -> Result<(), IdentityError> {
            self.state.send_replace(None);
            Ok(())
        }

        fn current(&self) -> Option<Identity> {
            self.state.borrow().clone()
        }

        fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
            self.state.subscribe()
        }
    }

    #[tokio::test]
    async fn failed_sign_in_is_retried_on_enter() {
        let provider = FlakyProvider::new(2);
        let (tx, mut stdin) = mpsc::unbounded_channel();
        tx.send(String::new()).unwrap();
        tx.send(String::new()).unwrap();
        let mut out = Vec::new();

        let identity = sign_in(&provider, &mut stdin, &mut out).await.unwrap();
        assert_eq!(identity.unwrap().id.as_str(), "u-9");
        assert_eq!(provider.attempts.load(Ordering::SeqCst), 3);

        let shown = String::from_utf8(out).unwrap();
        assert_eq!(shown.matches("Press Enter to retry").count(), 2);
        assert!(shown.contains("network unreachable"));
    }

    #[tokio::test]
    async fn quitting_after_a_failed_sign_in_gives_up() {
        let provider = FlakyProvider::new(u32::MAX);
        let (tx, mut stdin) = mpsc::unbounded_channel();
        tx.send(":quit".to_owned()).unwrap();
        let mut out = Vec::new();

        assert!(sign_in(&provider, &mut stdin, &mut out).await.unwrap().is_none());
        assert_eq!(provider.attempts.load(Ordering::SeqCst), 1);

        // closed stdin also gives up
        drop(tx);
        assert!(sign_in(&provider, &mut stdin, &mut out).await.unwrap().is_none());
    }
}
