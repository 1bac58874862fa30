use std::sync::Arc;

use quiz_core::model::ResultRecord;
use storage::repository::ResultSink;
use tokio::task::JoinHandle;

/// Hands finished-round results to a sink without holding up the game.
///
/// Failures are logged and dropped; there is no retry.
#[derive(Clone)]
pub struct Reporter {
    sink: Arc<dyn ResultSink>,
}

impl Reporter {
    #[must_use]
    pub fn new(sink: Arc<dyn ResultSink>) -> Self {
        Self { sink }
    }

    /// Submit in the background. Must be called from within a tokio runtime.
    ///
    /// The returned handle may be awaited or ignored.
    pub fn report(&self, record: ResultRecord) -> JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if let Err(err) = sink.submit(&record).await {
                tracing::warn!(
                    error = %err,
                    question_id = %record.question_id,
                    user_id = %record.user_id,
                    "failed to record result"
                );
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quiz_core::model::{Identity, QuestionRecord, UserId};
    use storage::repository::{InMemoryRepository, StorageError};

    struct FailingSink;

    #[async_trait]
    impl ResultSink for FailingSink {
        async fn submit(&self, _record: &ResultRecord) -> Result<(), StorageError> {
            Err(StorageError::Connection("offline".into()))
        }
    }

    fn record() -> ResultRecord {
        let identity = Identity::new(UserId::new("u-1"), None);
        ResultRecord::new(&identity, &QuestionRecord::fallback(), true, 80, 4_000)
    }

    #[tokio::test]
    async fn delivers_to_sink() {
        let repo = InMemoryRepository::new();
        let reporter = Reporter::new(Arc::new(repo.clone()));
        reporter.report(record()).await.unwrap();
        assert_eq!(repo.records().unwrap(), vec![record()]);
    }

    #[tokio::test]
    async fn sink_failure_is_swallowed() {
        let reporter = Reporter::new(Arc::new(FailingSink));
        reporter.report(record()).await.unwrap();
    }
}
