//! Questions produced one at a time by a remote generator instead of a fixed bank.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use quiz_core::model::{QuestionDraft, QuestionId, QuestionRecord};
use reqwest::Client;
use serde::Serialize;

use crate::repository::StorageError;

/// Error categories requested in turn, so consecutive questions differ in kind.
pub const ERROR_TYPES: [&str; 10] = [
    "SyntaxError",
    "IndentationError",
    "NameError",
    "TypeError",
    "IndexError",
    "KeyError",
    "AttributeError",
    "ValueError",
    "ZeroDivisionError",
    "Logical Error",
];

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Two sessions' worth of ids at the default round count.
const DEFAULT_ID_CACHE_LIMIT: usize = 20;

/// Source that produces a fresh question on every call.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if no usable question could be produced.
    async fn generate(&self) -> Result<QuestionRecord, StorageError>;
}

/// What the generator is asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub error_type: String,
    /// Ids handed out recently; the generator should not reuse them.
    pub exclude_ids: Vec<String>,
}

/// Transport that turns one request into one unvalidated question.
#[async_trait]
pub trait GeneratorTransport: Send + Sync {
    async fn fetch(&self, request: &GenerateRequest) -> Result<QuestionDraft, StorageError>;
}

//
// ─── HTTP TRANSPORT ────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug)]
pub struct HttpGeneratorConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

/// POSTs a `GenerateRequest` and expects a question record as JSON back.
#[derive(Clone)]
pub struct HttpGeneratorTransport {
    client: Client,
    config: HttpGeneratorConfig,
}

impl HttpGeneratorTransport {
    #[must_use]
    pub fn new(config: HttpGeneratorConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl GeneratorTransport for HttpGeneratorTransport {
    async fn fetch(&self, request: &GenerateRequest) -> Result<QuestionDraft, StorageError> {
        let mut call = self.client.post(&self.config.endpoint).json(request);
        if let Some(token) = &self.config.api_key {
            call = call.bearer_auth(token);
        }
        let response = call
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if !response.status().is_success() {
            return Err(StorageError::RemoteStatus(response.status().as_u16()));
        }
        response
            .json::<QuestionDraft>()
            .await
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

//
// ─── ROTATING GENERATOR ────────────────────────────────────────────────────────
//

#[derive(Debug, Default)]
struct GeneratorState {
    next_error_type: usize,
    used_ids: HashSet<QuestionId>,
}

/// Rotates through `ERROR_TYPES`, refetches when an id repeats and keeps a
/// bounded cache of ids already served.
pub struct RotatingGenerator<T> {
    transport: T,
    state: Mutex<GeneratorState>,
    max_attempts: u32,
    id_cache_limit: usize,
}

/// Generator backed by an HTTP endpoint.
pub type HttpQuestionGenerator = RotatingGenerator<HttpGeneratorTransport>;

impl HttpQuestionGenerator {
    #[must_use]
    pub fn http(config: HttpGeneratorConfig) -> Self {
        RotatingGenerator::new(HttpGeneratorTransport::new(config))
    }
}

impl<T: GeneratorTransport> RotatingGenerator<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: Mutex::new(GeneratorState::default()),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            id_cache_limit: DEFAULT_ID_CACHE_LIMIT,
        }
    }

    /// How many fetches a single `generate` may spend on repeated ids.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// The id cache is cleared once it holds more than `limit` ids.
    #[must_use]
    pub fn with_id_cache_limit(mut self, limit: usize) -> Self {
        self.id_cache_limit = limit;
        self
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, GeneratorState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn next_request(&self) -> Result<GenerateRequest, StorageError> {
        let mut state = self.lock()?;
        let error_type = ERROR_TYPES[state.next_error_type % ERROR_TYPES.len()];
        state.next_error_type = state.next_error_type.wrapping_add(1);
        let mut exclude_ids: Vec<String> = state
            .used_ids
            .iter()
            .map(|id| id.as_str().to_owned())
            .collect();
        exclude_ids.sort();
        Ok(GenerateRequest {
            error_type: error_type.to_owned(),
            exclude_ids,
        })
    }

    /// Record `id` as served. Returns `false` if it was already in the cache.
    fn remember(&self, id: &QuestionId) -> Result<bool, StorageError> {
        let mut state = self.lock()?;
        if !state.used_ids.insert(id.clone()) {
            return Ok(false);
        }
        if state.used_ids.len() > self.id_cache_limit {
            state.used_ids.clear();
        }
        Ok(true)
    }
}

#[async_trait]
impl<T: GeneratorTransport> QuestionGenerator for RotatingGenerator<T> {
    async fn generate(&self) -> Result<QuestionRecord, StorageError> {
        for attempt in 1..=self.max_attempts {
            let request = self.next_request()?;
            let question = self
                .transport
                .fetch(&request)
                .await?
                .validate()
                .map_err(|e| StorageError::Catalogue(e.into()))?;
            if self.remember(question.id())? {
                tracing::debug!(
                    question_id = %question.id(),
                    error_type = %request.error_type,
                    "generated question"
                );
                return Ok(question);
            }
            tracing::warn!(
                question_id = %question.id(),
                attempt,
                "generator repeated a question id, fetching another"
            );
        }
        Err(StorageError::RepeatedQuestions(self.max_attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<QuestionDraft, StorageError>>>,
        requests: Mutex<Vec<GenerateRequest>>,
    }

    impl ScriptedTransport {
        fn replying(ids: &[&str]) -> Self {
            let replies = ids.iter().map(|id| Ok(draft(id))).collect();
            Self {
                replies: Mutex::new(replies),
                requests: Mutex::default(),
            }
        }
    }

    #[async_trait]
    impl GeneratorTransport for ScriptedTransport {
        async fn fetch(&self, request: &GenerateRequest) -> Result<QuestionDraft, StorageError> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(StorageError::Connection("script exhausted".into())))
        }
    }

    fn draft(id: &str) -> QuestionDraft {
        QuestionDraft {
            id: id.into(),
            code: "x = 10\nprint(x / 0)".into(),
            error_line: 2,
            correct_line_text: "print(x / 1)".into(),
            explanation: "Division by zero.".into(),
            error_type: "ZeroDivisionError".into(),
            validation_regex: None,
        }
    }

    fn requests(generator: &RotatingGenerator<ScriptedTransport>) -> Vec<GenerateRequest> {
        generator.transport.requests.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn rotates_through_error_types() {
        let generator = RotatingGenerator::new(ScriptedTransport::replying(&["a", "b", "c"]));
        for _ in 0..3 {
            generator.generate().await.unwrap();
        }
        let kinds: Vec<_> = requests(&generator)
            .into_iter()
            .map(|r| r.error_type)
            .collect();
        assert_eq!(kinds, ["SyntaxError", "IndentationError", "NameError"]);
    }

    #[tokio::test]
    async fn repeated_id_is_fetched_again() {
        let generator = RotatingGenerator::new(ScriptedTransport::replying(&["a", "a", "b"]));
        assert_eq!(generator.generate().await.unwrap().id().as_str(), "a");
        assert_eq!(generator.generate().await.unwrap().id().as_str(), "b");

        let sent = requests(&generator);
        assert_eq!(sent.len(), 3);
        assert!(sent[0].exclude_ids.is_empty());
        assert_eq!(sent[2].exclude_ids, ["a"]);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts_of_repeats() {
        let generator = RotatingGenerator::new(ScriptedTransport::replying(&["a", "a", "a"]))
            .with_max_attempts(2);
        generator.generate().await.unwrap();
        let err = generator.generate().await.unwrap_err();
        assert!(matches!(err, StorageError::RepeatedQuestions(2)));
    }

    #[tokio::test]
    async fn id_cache_is_cleared_past_its_limit() {
        let generator =
            RotatingGenerator::new(ScriptedTransport::replying(&["a", "b", "c", "a"]))
                .with_id_cache_limit(2);
        for _ in 0..3 {
            generator.generate().await.unwrap();
        }
        // the third id overflowed the cache, so "a" is fresh again
        assert_eq!(generator.generate().await.unwrap().id().as_str(), "a");
        assert!(requests(&generator)[3].exclude_ids.is_empty());
    }

    #[tokio::test]
    async fn transport_and_validation_failures_surface() {
        let generator = RotatingGenerator::new(ScriptedTransport::default());
        let err = generator.generate().await.unwrap_err();
        assert!(matches!(err, StorageError::Connection(_)));

        let mut broken = draft("bad");
        broken.error_line = 9;
        let transport = ScriptedTransport {
            replies: Mutex::new(VecDeque::from([Ok(broken)])),
            requests: Mutex::default(),
        };
        let err = RotatingGenerator::new(transport).generate().await.unwrap_err();
        assert!(matches!(err, StorageError::Catalogue(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_connection_error() {
        let generator = HttpQuestionGenerator::http(HttpGeneratorConfig {
            endpoint: "http://127.0.0.1:9/questions".into(),
            api_key: None,
        });
        let err = generator.generate().await.unwrap_err();
        assert!(matches!(err, StorageError::Connection(_)));
    }
}
