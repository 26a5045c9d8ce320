use chrono::{DateTime, Utc};
use globetrotter_core::model::{
    AnswerStatus, Destination, DestinationDraft, DestinationId, Handle, OptionSet, QuestionId,
    Session, SessionCounters, SessionId, SessionQuestion, User, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn destination_id_from_i64(v: i64) -> Result<DestinationId, StorageError> {
    Ok(DestinationId::new(i64_to_u64("destination_id", v)?))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn session_id_from_i64(v: i64) -> Result<SessionId, StorageError> {
    Ok(SessionId::new(i64_to_u64("session_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

/// List columns (clues, fun facts, trivia, options) are stored as JSON arrays.
pub(crate) fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

fn from_json<T: serde::de::DeserializeOwned>(
    field: &'static str,
    raw: &str,
) -> Result<T, StorageError> {
    serde_json::from_str(raw)
        .map_err(|e| StorageError::Serialization(format!("invalid {field}: {e}")))
}

pub(crate) fn map_destination_row(row: &SqliteRow) -> Result<Destination, StorageError> {
    let id = destination_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let draft = DestinationDraft {
        city: row.try_get("city").map_err(ser)?,
        country: row.try_get("country").map_err(ser)?,
        clues: from_json("clues", &row.try_get::<String, _>("clues").map_err(ser)?)?,
        fun_facts: from_json(
            "fun_facts",
            &row.try_get::<String, _>("fun_facts").map_err(ser)?,
        )?,
        trivia: from_json("trivia", &row.try_get::<String, _>("trivia").map_err(ser)?)?,
    };
    draft.validate(id).map_err(ser)
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    let id = user_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let handle = Handle::new(row.try_get::<String, _>("handle").map_err(ser)?).map_err(ser)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(ser)?;
    Ok(User::new(id, handle, created_at))
}

pub(crate) fn map_session_row(row: &SqliteRow) -> Result<Session, StorageError> {
    let counters = SessionCounters::from_persisted(
        u32_from_i64(
            "total_answered",
            row.try_get::<i64, _>("total_answered").map_err(ser)?,
        )?,
        u32_from_i64(
            "total_correct",
            row.try_get::<i64, _>("total_correct").map_err(ser)?,
        )?,
        u32_from_i64(
            "total_incorrect",
            row.try_get::<i64, _>("total_incorrect").map_err(ser)?,
        )?,
    )
    .map_err(ser)?;

    Session::from_persisted(
        session_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        u32_from_i64(
            "total_questions",
            row.try_get::<i64, _>("total_questions").map_err(ser)?,
        )?,
        counters,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

fn map_answer_status(row: &SqliteRow) -> Result<AnswerStatus, StorageError> {
    let selected: Option<i64> = row.try_get("selected_destination_id").map_err(ser)?;
    let is_correct: Option<i64> = row.try_get("is_correct").map_err(ser)?;
    let answered_at: Option<DateTime<Utc>> = row.try_get("answered_at").map_err(ser)?;

    match (selected, is_correct, answered_at) {
        (None, None, None) => Ok(AnswerStatus::Unanswered),
        (Some(selected), Some(is_correct), Some(answered_at)) => Ok(AnswerStatus::Answered {
            selected: destination_id_from_i64(selected)?,
            correct: is_correct != 0,
            answered_at,
        }),
        _ => Err(StorageError::Serialization(
            "partially answered question row".into(),
        )),
    }
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<SessionQuestion, StorageError> {
    let option_ids: Vec<DestinationId> =
        from_json("options", &row.try_get::<String, _>("options").map_err(ser)?)?;
    let options = OptionSet::from_slice(&option_ids).map_err(ser)?;

    SessionQuestion::from_persisted(
        question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        session_id_from_i64(row.try_get::<i64, _>("session_id").map_err(ser)?)?,
        row.try_get("clue").map_err(ser)?,
        options,
        destination_id_from_i64(row.try_get::<i64, _>("correct_destination_id").map_err(ser)?)?,
        map_answer_status(row)?,
    )
    .map_err(ser)
}

/// True when the driver reports a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}
