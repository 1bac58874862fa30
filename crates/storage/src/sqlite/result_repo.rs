use quiz_core::model::{ResultRecord, UserId};

use super::{
    SqliteRepository,
    mapping::{map_result_row, u64_to_i64},
};
use crate::repository::{ResultLogRepository, ResultSink, StorageError, StoredResult};

#[async_trait::async_trait]
impl ResultSink for SqliteRepository {
    async fn submit(&self, record: &ResultRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO results (
                    recorded_at, user_id, student_name, question_id,
                    error_type, is_correct, score, time_taken_ms
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(self.clock.now())
        .bind(record.user_id.as_str())
        .bind(record.student_display_name.as_deref())
        .bind(record.question_id.as_str())
        .bind(record.error_type.as_str())
        .bind(i64::from(record.is_correct))
        .bind(i64::from(record.score))
        .bind(u64_to_i64("time_taken_ms", record.time_taken_ms)?)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl ResultLogRepository for SqliteRepository {
    async fn results_for_user(&self, user: &UserId) -> Result<Vec<StoredResult>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, recorded_at, user_id, student_name, question_id,
                    error_type, is_correct, score, time_taken_ms
                FROM results
                WHERE user_id = ?1
                ORDER BY recorded_at ASC, id ASC
            ",
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_result_row).collect()
    }

    async fn recent_results(&self, limit: u32) -> Result<Vec<StoredResult>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, recorded_at, user_id, student_name, question_id,
                    error_type, is_correct, score, time_taken_ms
                FROM results
                ORDER BY recorded_at DESC, id DESC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_result_row).collect()
    }
}
