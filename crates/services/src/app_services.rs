use std::sync::Arc;

use quiz_core::model::QuizSettings;
use storage::http::{HttpResultSink, HttpSinkConfig};
use storage::QuestionGenerator;
use storage::repository::{LogSink, QuestionSource, ResultLogRepository, Storage};

use crate::Clock;
use crate::error::AppServicesError;
use crate::identity::IdentityProvider;
use crate::reporting::Reporter;
use crate::sessions::SessionLoopService;

/// Where finished-round results go.
#[derive(Debug, Clone)]
pub enum ResultBackend {
    /// Written to the log only.
    Log,
    Memory,
    Sqlite { url: String },
    Http(HttpSinkConfig),
}

/// Assembles app-facing services around one question source and result backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    identity: Arc<dyn IdentityProvider>,
    session_loop: Arc<SessionLoopService>,
}

impl AppServices {
    /// # Errors
    ///
    /// Returns `AppServicesError` if the result backend cannot be initialised.
    pub async fn new(
        clock: Clock,
        settings: QuizSettings,
        questions: Arc<dyn QuestionSource>,
        backend: ResultBackend,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, AppServicesError> {
        let storage = match backend {
            ResultBackend::Sqlite { url } => {
                tracing::debug!(%url, "recording results in sqlite");
                Storage::sqlite(&url, questions).await?
            }
            ResultBackend::Memory => Storage::in_memory(clock, questions),
            ResultBackend::Http(config) => {
                tracing::debug!(endpoint = %config.endpoint, "posting results over http");
                Storage {
                    questions,
                    results: Arc::new(HttpResultSink::new(config).with_clock(clock)),
                    result_log: None,
                }
            }
            ResultBackend::Log => Storage {
                questions,
                results: Arc::new(LogSink::new(clock)),
                result_log: None,
            },
        };

        let session_loop = Arc::new(SessionLoopService::new(
            clock,
            settings,
            Arc::clone(&storage.questions),
            Reporter::new(Arc::clone(&storage.results)),
        ));

        Ok(Self {
            storage,
            identity,
            session_loop,
        })
    }

    /// Serve every round from `generator` instead of the question source.
    #[must_use]
    pub fn with_question_generator(mut self, generator: Arc<dyn QuestionGenerator>) -> Self {
        let session_loop = (*self.session_loop).clone().with_generator(generator);
        self.session_loop = Arc::new(session_loop);
        self
    }

    #[must_use]
    pub fn identity(&self) -> Arc<dyn IdentityProvider> {
        Arc::clone(&self.identity)
    }

    #[must_use]
    pub fn session_loop(&self) -> Arc<SessionLoopService> {
        Arc::clone(&self.session_loop)
    }

    /// Read access to recorded results, when the backend keeps them.
    #[must_use]
    pub fn result_log(&self) -> Option<Arc<dyn ResultLogRepository>> {
        self.storage.result_log.clone()
    }
}
