use globetrotter_core::model::{DestinationId, QuestionId, Session, SessionId, SessionQuestion};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    conn, id_i64, is_foreign_key_violation, map_question_row, map_session_row, ser,
    session_id_from_i64, to_json,
};
use crate::repository::{AnswerRecord, NewSessionRecord, SessionRepository, StorageError};

const QUESTION_COLUMNS: &str = r"
    id, session_id, clue, options, correct_destination_id,
    selected_destination_id, is_correct, answered_at
";

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn create_session(&self, record: NewSessionRecord) -> Result<SessionId, StorageError> {
        let total_questions = record.total_questions()?;
        let user_id = id_i64("user_id", record.user_id.value())?;

        // Writing first takes the write lock up front, so busy_timeout
        // applies; a deferred read upgraded to a write fails immediately.
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
                INSERT INTO sessions (user_id, created_at, total_questions)
                VALUES (?1, ?2, ?3)
            ",
        )
        .bind(user_id)
        .bind(record.created_at)
        .bind(i64::from(total_questions))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StorageError::NotFound
            } else {
                conn(e)
            }
        })?;
        let session_id = res.last_insert_rowid();

        for question in &record.questions {
            let options: Vec<DestinationId> = question.options().iter().collect();
            sqlx::query(
                r"
                    INSERT INTO session_questions (
                        session_id, clue, options, correct_destination_id
                    )
                    VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(session_id)
            .bind(question.clue())
            .bind(to_json(&options)?)
            .bind(id_i64("destination_id", question.correct().value())?)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        session_id_from_i64(session_id)
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, user_id, created_at, total_questions,
                       total_answered, total_correct, total_incorrect
                FROM sessions
                WHERE id = ?1
            ",
        )
        .bind(id_i64("session_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_session_row).transpose()
    }

    async fn next_unanswered(
        &self,
        session_id: SessionId,
    ) -> Result<Option<SessionQuestion>, StorageError> {
        let sql = format!(
            "SELECT {QUESTION_COLUMNS} FROM session_questions
             WHERE session_id = ?1 AND selected_destination_id IS NULL
             ORDER BY id ASC
             LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(id_i64("session_id", session_id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_question_row).transpose()
    }

    async fn count_unanswered(&self, session_id: SessionId) -> Result<u32, StorageError> {
        let row = sqlx::query(
            r"
                SELECT COUNT(*) AS n
                FROM session_questions
                WHERE session_id = ?1 AND selected_destination_id IS NULL
            ",
        )
        .bind(id_i64("session_id", session_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        let n: i64 = row.try_get("n").map_err(ser)?;
        u32::try_from(n).map_err(|_| StorageError::Serialization(format!("invalid count: {n}")))
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<SessionQuestion>, StorageError> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM session_questions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("question_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_question_row).transpose()
    }

    async fn record_answer(&self, answer: AnswerRecord) -> Result<(), StorageError> {
        let session_id = id_i64("session_id", answer.session_id.value())?;
        let question_id = id_i64("question_id", answer.question_id.value())?;
        let selected = id_i64("destination_id", answer.selected.value())?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        // The IS NULL guard makes the first writer win; a loser sees no row.
        let updated = sqlx::query(
            r"
                UPDATE session_questions
                SET selected_destination_id = ?1,
                    is_correct = (correct_destination_id = ?1),
                    answered_at = ?2
                WHERE id = ?3
                  AND session_id = ?4
                  AND selected_destination_id IS NULL
                RETURNING is_correct
            ",
        )
        .bind(selected)
        .bind(answer.answered_at)
        .bind(question_id)
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(conn)?;

        let Some(row) = updated else {
            let existing = sqlx::query(
                "SELECT 1 FROM session_questions WHERE id = ?1 AND session_id = ?2",
            )
            .bind(question_id)
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?;
            return Err(if existing.is_some() {
                StorageError::Conflict
            } else {
                StorageError::NotFound
            });
        };

        let is_correct: i64 = row.try_get("is_correct").map_err(ser)?;
        if (is_correct != 0) != answer.correct {
            return Err(StorageError::Serialization(
                "answer correctness disagrees with stored question".into(),
            ));
        }

        let correct = i64::from(answer.correct);
        sqlx::query(
            r"
                UPDATE sessions
                SET total_answered = total_answered + 1,
                    total_correct = total_correct + ?1,
                    total_incorrect = total_incorrect + (1 - ?1)
                WHERE id = ?2
            ",
        )
        .bind(correct)
        .bind(session_id)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn list_questions(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<SessionQuestion>, StorageError> {
        let sql = format!(
            "SELECT {QUESTION_COLUMNS} FROM session_questions
             WHERE session_id = ?1
             ORDER BY id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(id_i64("session_id", session_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_row(&row)?);
        }
        Ok(out)
    }
}
