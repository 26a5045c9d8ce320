use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::UserId;

/// Longest handle accepted, counted in characters.
pub const MAX_HANDLE_CHARS: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HandleError {
    #[error("handle cannot be empty")]
    Empty,

    #[error("handle is longer than {max} characters")]
    TooLong { max: usize },
}

/// Validated player handle (trimmed, non-empty, bounded length).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    /// Create a validated handle.
    ///
    /// # Errors
    ///
    /// Returns `HandleError::Empty` if the handle is blank after trimming, or
    /// `HandleError::TooLong` if it exceeds `MAX_HANDLE_CHARS`.
    pub fn new(value: impl Into<String>) -> Result<Self, HandleError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(HandleError::Empty);
        }
        if trimmed.chars().count() > MAX_HANDLE_CHARS {
            return Err(HandleError::TooLong {
                max: MAX_HANDLE_CHARS,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A player. Created once, then looked up by handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    id: UserId,
    handle: Handle,
    created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn new(id: UserId, handle: Handle, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            handle,
            created_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_is_trimmed() {
        let handle = Handle::new("  alice ").unwrap();
        assert_eq!(handle.as_str(), "alice");
    }

    #[test]
    fn blank_handle_is_rejected() {
        assert_eq!(Handle::new("   ").unwrap_err(), HandleError::Empty);
    }

    #[test]
    fn long_handle_is_rejected() {
        let err = Handle::new("x".repeat(MAX_HANDLE_CHARS + 1)).unwrap_err();
        assert_eq!(
            err,
            HandleError::TooLong {
                max: MAX_HANDLE_CHARS
            }
        );
        assert!(Handle::new("x".repeat(MAX_HANDLE_CHARS)).is_ok());
    }
}
