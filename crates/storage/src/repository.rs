use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::Clock;
use quiz_core::model::{Catalogue, CatalogueError, ResultRecord, UserId};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::builtin::builtin_catalogue;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("remote endpoint answered with status {0}")]
    RemoteStatus(u16),

    #[error("generator kept repeating question ids after {0} attempts")]
    RepeatedQuestions(u32),

    #[error(transparent)]
    Catalogue(#[from] CatalogueError),
}

/// A result as it was persisted, with its row id and the time it was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResult {
    pub id: i64,
    pub recorded_at: DateTime<Utc>,
    pub record: ResultRecord,
}

/// Source of the question catalogue.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Load the full catalogue.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalogue cannot be read or fails validation.
    async fn load_catalogue(&self) -> Result<Catalogue, StorageError>;
}

/// Destination for finished-round results.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Record one result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the sink could not accept the record.
    async fn submit(&self, record: &ResultRecord) -> Result<(), StorageError>;
}

/// Read access to results recorded by a sink.
#[async_trait]
pub trait ResultLogRepository: Send + Sync {
    /// Results for one player, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn results_for_user(&self, user: &UserId) -> Result<Vec<StoredResult>, StorageError>;

    /// Most recent results across all players, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn recent_results(&self, limit: u32) -> Result<Vec<StoredResult>, StorageError>;
}

/// Catalogue held in memory, e.g. the built-in question bank.
#[derive(Debug, Clone)]
pub struct StaticCatalogue {
    catalogue: Catalogue,
}

impl StaticCatalogue {
    #[must_use]
    pub fn new(catalogue: Catalogue) -> Self {
        Self { catalogue }
    }

    /// The question bank compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the embedded bank fails validation.
    pub fn builtin() -> Result<Self, StorageError> {
        Ok(Self::new(builtin_catalogue()?))
    }
}

#[async_trait]
impl QuestionSource for StaticCatalogue {
    async fn load_catalogue(&self) -> Result<Catalogue, StorageError> {
        Ok(self.catalogue.clone())
    }
}

/// Sink that only writes the result row to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink {
    clock: Clock,
}

impl LogSink {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl ResultSink for LogSink {
    async fn submit(&self, record: &ResultRecord) -> Result<(), StorageError> {
        tracing::info!(
            recorded_at = %self.clock.now().to_rfc3339(),
            user_id = %record.user_id,
            student = record.student_display_name.as_deref().unwrap_or(""),
            question_id = %record.question_id,
            error_type = %record.error_type,
            is_correct = record.is_correct,
            score = record.score,
            time_taken_ms = record.time_taken_ms,
            "recording result"
        );
        Ok(())
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    clock: Clock,
    results: Arc<Mutex<Vec<StoredResult>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Snapshot of every stored record, in submission order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn records(&self) -> Result<Vec<ResultRecord>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.iter().map(|stored| stored.record.clone()).collect())
    }
}

#[async_trait]
impl ResultSink for InMemoryRepository {
    async fn submit(&self, record: &ResultRecord) -> Result<(), StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = i64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("result id overflow".into()))?
            + 1;
        guard.push(StoredResult {
            id,
            recorded_at: self.clock.now(),
            record: record.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl ResultLogRepository for InMemoryRepository {
    async fn results_for_user(&self, user: &UserId) -> Result<Vec<StoredResult>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .filter(|stored| &stored.record.user_id == user)
            .cloned()
            .collect())
    }

    async fn recent_results(&self, limit: u32) -> Result<Vec<StoredResult>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

/// Aggregates the question source and result sink behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionSource>,
    pub results: Arc<dyn ResultSink>,
    pub result_log: Option<Arc<dyn ResultLogRepository>>,
}

impl Storage {
    /// Results kept in memory and readable back through `result_log`.
    #[must_use]
    pub fn in_memory(clock: Clock, questions: Arc<dyn QuestionSource>) -> Self {
        let repo = InMemoryRepository::new().with_clock(clock);
        let results: Arc<dyn ResultSink> = Arc::new(repo.clone());
        let result_log: Arc<dyn ResultLogRepository> = Arc::new(repo);
        Self {
            questions,
            results,
            result_log: Some(result_log),
        }
    }
}
