use quiz_core::model::{QuestionId, ResultRecord, UserId};
use sqlx::Row;

use crate::repository::{StorageError, StoredResult};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<StoredResult, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let recorded_at = row.try_get("recorded_at").map_err(ser)?;

    let record = ResultRecord {
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
        student_display_name: row.try_get("student_name").map_err(ser)?,
        question_id: QuestionId::new(row.try_get::<String, _>("question_id").map_err(ser)?),
        error_type: row.try_get("error_type").map_err(ser)?,
        is_correct: row.try_get::<i64, _>("is_correct").map_err(ser)? != 0,
        score: i64_to_u32("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        time_taken_ms: i64_to_u64(
            "time_taken_ms",
            row.try_get::<i64, _>("time_taken_ms").map_err(ser)?,
        )?,
    };

    Ok(StoredResult {
        id,
        recorded_at,
        record,
    })
}
