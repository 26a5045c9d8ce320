use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned schema migrations.
///
/// Version 1 creates destinations, users, sessions and session questions.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS destinations (
                    id INTEGER PRIMARY KEY,
                    city TEXT NOT NULL,
                    country TEXT NOT NULL,
                    clues TEXT NOT NULL,
                    fun_facts TEXT NOT NULL,
                    trivia TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY,
                    handle TEXT NOT NULL UNIQUE,
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS sessions (
                    id INTEGER PRIMARY KEY,
                    user_id INTEGER NOT NULL,
                    created_at TEXT NOT NULL,
                    total_questions INTEGER NOT NULL CHECK (total_questions > 0),
                    total_answered INTEGER NOT NULL DEFAULT 0 CHECK (total_answered >= 0),
                    total_correct INTEGER NOT NULL DEFAULT 0 CHECK (total_correct >= 0),
                    total_incorrect INTEGER NOT NULL DEFAULT 0 CHECK (total_incorrect >= 0),
                    CHECK (total_answered = total_correct + total_incorrect),
                    CHECK (total_answered <= total_questions),
                    FOREIGN KEY (user_id) REFERENCES users(id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // An unanswered row has no selection, correctness or timestamp; an answered
        // row has all three.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS session_questions (
                    id INTEGER PRIMARY KEY,
                    session_id INTEGER NOT NULL,
                    clue TEXT NOT NULL,
                    options TEXT NOT NULL,
                    correct_destination_id INTEGER NOT NULL,
                    selected_destination_id INTEGER,
                    is_correct INTEGER CHECK (is_correct IN (0, 1)),
                    answered_at TEXT,
                    CHECK (
                        (selected_destination_id IS NULL AND is_correct IS NULL AND answered_at IS NULL)
                        OR (selected_destination_id IS NOT NULL AND is_correct IS NOT NULL AND answered_at IS NOT NULL)
                    ),
                    FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE,
                    FOREIGN KEY (correct_destination_id) REFERENCES destinations(id),
                    FOREIGN KEY (selected_destination_id) REFERENCES destinations(id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_sessions_user
                    ON sessions(user_id, created_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_session_questions_session_answered
                    ON session_questions(session_id, selected_destination_id, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
