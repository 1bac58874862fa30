use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::Clock;
use quiz_core::model::ResultRecord;
use reqwest::Client;
use serde::Serialize;

use crate::repository::{ResultSink, StorageError};

#[derive(Clone, Debug)]
pub struct HttpSinkConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

/// Posts each result as one JSON row to a collecting endpoint.
#[derive(Clone)]
pub struct HttpResultSink {
    client: Client,
    config: HttpSinkConfig,
    clock: Clock,
}

impl HttpResultSink {
    #[must_use]
    pub fn new(config: HttpSinkConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            clock: Clock::default(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResultRow<'a> {
    recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    record: &'a ResultRecord,
}

#[async_trait]
impl ResultSink for HttpResultSink {
    async fn submit(&self, record: &ResultRecord) -> Result<(), StorageError> {
        let row = ResultRow {
            recorded_at: self.clock.now(),
            record,
        };

        let mut request = self.client.post(&self.config.endpoint).json(&row);
        if let Some(token) = &self.config.api_key {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StorageError::RemoteStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Identity, QuestionRecord, UserId};
    use quiz_core::time::fixed_now;

    #[test]
    fn row_flattens_record_with_timestamp() {
        let identity = Identity::new(UserId::new("u-1"), None);
        let record = ResultRecord::new(&identity, &QuestionRecord::fallback(), false, 0, 20_000);
        let row = ResultRow {
            recorded_at: fixed_now(),
            record: &record,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["userId"], "u-1");
        assert_eq!(json["questionId"], "fallback-01");
        assert_eq!(json["isCorrect"], false);
        assert!(json["recordedAt"].is_string());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_connection_error() {
        let sink = HttpResultSink::new(HttpSinkConfig {
            endpoint: "http://127.0.0.1:9/results".into(),
            api_key: None,
        });
        let identity = Identity::new(UserId::new("u-1"), None);
        let record = ResultRecord::new(&identity, &QuestionRecord::fallback(), false, 0, 20_000);
        let err = sink.submit(&record).await.unwrap_err();
        assert!(matches!(err, StorageError::Connection(_)));
    }
}
