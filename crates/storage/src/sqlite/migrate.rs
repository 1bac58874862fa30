use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Ordered schema versions; each entry's statements run in one transaction.
const MIGRATIONS: &[(i64, &[&str])] = &[(
    1,
    &[
        r"
        CREATE TABLE IF NOT EXISTS results (
            id INTEGER PRIMARY KEY,
            recorded_at TEXT NOT NULL,
            user_id TEXT NOT NULL,
            student_name TEXT,
            question_id TEXT NOT NULL,
            error_type TEXT NOT NULL,
            is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
            score INTEGER NOT NULL CHECK (score >= 0),
            time_taken_ms INTEGER NOT NULL CHECK (time_taken_ms >= 0)
        );
        ",
        r"
        CREATE INDEX IF NOT EXISTS idx_results_user
        ON results (user_id, recorded_at);
        ",
    ],
)];

/// Apply every migration not yet recorded in `schema_migrations`.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    for &(version, statements) in MIGRATIONS {
        let applied = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?
            .is_some();
        if applied {
            continue;
        }

        let mut tx = pool.begin().await?;
        for statement in statements.iter().copied() {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)")
            .bind(version)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::debug!(version, "applied results schema migration");
    }

    Ok(())
}
