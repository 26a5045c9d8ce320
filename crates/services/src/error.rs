//! Shared error types for the services crate.

use thiserror::Error;

use globetrotter_core::model::{
    DestinationError, DestinationId, Handle, HandleError, QuestionError, QuestionId, SessionId,
};
use globetrotter_core::options::OptionError;
use storage::repository::StorageError;
use storage::seed::SeedError;
use storage::sqlite::SqliteInitError;

/// Transport-neutral classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    ResourceExhausted,
    Unavailable,
}

/// Errors emitted by `ImageLookup` implementations. Never surfaced to callers;
/// the lookup logs them and falls back.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImageLookupError {
    #[error("image lookup is not configured")]
    Disabled,
    #[error("image search returned no photos")]
    EmptyResponse,
    #[error("image search failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("image search returned an invalid url: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `UserService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UserServiceError {
    #[error(transparent)]
    InvalidHandle(#[from] HandleError),
    #[error("handle already taken: {0}")]
    HandleTaken(Handle),
    #[error("user not found: {0}")]
    UserNotFound(Handle),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl UserServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidHandle(_) => ErrorKind::InvalidInput,
            Self::HandleTaken(_) => ErrorKind::Conflict,
            Self::UserNotFound(_) => ErrorKind::NotFound,
            Self::Storage(_) => ErrorKind::Unavailable,
        }
    }
}

/// Errors emitted by `GameEngine`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GameError {
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("question not found: {0}")]
    QuestionNotFound(QuestionId),
    #[error("no questions remaining in session {0}")]
    NoQuestionsRemaining(SessionId),
    #[error("question {0} already answered")]
    AlreadyAnswered(QuestionId),
    #[error("destination {selected} is not an option of question {question}")]
    InvalidOption {
        question: QuestionId,
        selected: DestinationId,
    },
    #[error("question {question} does not belong to session {session}")]
    SessionMismatch {
        session: SessionId,
        question: QuestionId,
    },
    #[error("catalog too small: need {required} distinct destinations, have {available}")]
    InsufficientCatalogSize { required: usize, available: usize },
    #[error("destination {0} is missing from the catalog")]
    CatalogMismatch(DestinationId),
    #[error(transparent)]
    Options(OptionError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<OptionError> for GameError {
    fn from(err: OptionError) -> Self {
        match err {
            OptionError::InsufficientCatalogSize {
                required,
                available,
            } => Self::InsufficientCatalogSize {
                required,
                available,
            },
            other => Self::Options(other),
        }
    }
}

impl GameError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_)
            | Self::SessionNotFound(_)
            | Self::QuestionNotFound(_)
            | Self::NoQuestionsRemaining(_) => ErrorKind::NotFound,
            Self::AlreadyAnswered(_) => ErrorKind::Conflict,
            Self::InvalidOption { .. } | Self::SessionMismatch { .. } => ErrorKind::InvalidInput,
            Self::InsufficientCatalogSize { .. } => ErrorKind::ResourceExhausted,
            Self::CatalogMismatch(_)
            | Self::Options(_)
            | Self::Question(_)
            | Self::Storage(_) => ErrorKind::Unavailable,
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error("destination catalog is empty; run the seed command first")]
    EmptyCatalog,
    #[error(transparent)]
    Catalog(#[from] DestinationError),
    #[error(transparent)]
    Seed(#[from] SeedError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_errors_map_to_kinds() {
        let q = QuestionId::new(3);
        assert_eq!(GameError::AlreadyAnswered(q).kind(), ErrorKind::Conflict);
        assert_eq!(
            GameError::NoQuestionsRemaining(SessionId::new(1)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            GameError::SessionMismatch {
                session: SessionId::new(1),
                question: q,
            }
            .kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            GameError::from(OptionError::InsufficientCatalogSize {
                required: 4,
                available: 3,
            })
            .kind(),
            ErrorKind::ResourceExhausted
        );
        assert_eq!(
            GameError::Storage(StorageError::Connection("down".into())).kind(),
            ErrorKind::Unavailable
        );
    }

    #[test]
    fn user_errors_map_to_kinds() {
        let handle = Handle::new("alice").unwrap();
        assert_eq!(
            UserServiceError::HandleTaken(handle.clone()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            UserServiceError::UserNotFound(handle).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            UserServiceError::from(HandleError::Empty).kind(),
            ErrorKind::InvalidInput
        );
    }
}
