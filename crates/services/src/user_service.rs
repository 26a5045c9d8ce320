use std::sync::Arc;

use globetrotter_core::model::{Handle, User};
use storage::repository::{StorageError, UserRepository};

use crate::Clock;
use crate::error::UserServiceError;

/// Maps player handles to stable user identities.
#[derive(Clone)]
pub struct UserService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
}

impl UserService {
    #[must_use]
    pub fn new(clock: Clock, users: Arc<dyn UserRepository>) -> Self {
        Self { clock, users }
    }

    /// Register a new handle.
    ///
    /// # Errors
    ///
    /// Returns `UserServiceError::InvalidHandle` for blank or overlong handles,
    /// `UserServiceError::HandleTaken` if the handle exists.
    pub async fn create_user(&self, handle: &str) -> Result<User, UserServiceError> {
        let handle = Handle::new(handle)?;
        match self.users.insert_user(&handle, self.clock.now()).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id(), handle = %handle, "user created");
                Ok(user)
            }
            Err(StorageError::Conflict) => Err(UserServiceError::HandleTaken(handle)),
            Err(e) => Err(e.into()),
        }
    }

    /// Look up an existing handle.
    ///
    /// # Errors
    ///
    /// Returns `UserServiceError::UserNotFound` if no user owns the handle.
    pub async fn resolve_user(&self, handle: &str) -> Result<User, UserServiceError> {
        let handle = Handle::new(handle)?;
        self.users
            .get_user_by_handle(&handle)
            .await?
            .ok_or(UserServiceError::UserNotFound(handle))
    }

    /// Resolve `handle`, registering it first when unknown.
    ///
    /// # Errors
    ///
    /// Returns `UserServiceError` for invalid handles or storage failures.
    pub async fn resolve_or_create(&self, handle: &str) -> Result<User, UserServiceError> {
        match self.resolve_user(handle).await {
            Err(UserServiceError::UserNotFound(_)) => match self.create_user(handle).await {
                // Lost a race with another registration of the same handle.
                Err(UserServiceError::HandleTaken(_)) => self.resolve_user(handle).await,
                other => other,
            },
            other => other,
        }
    }
}
