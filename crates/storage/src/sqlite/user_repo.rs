use chrono::{DateTime, Utc};
use globetrotter_core::model::{Handle, User, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, is_unique_violation, map_user_row, user_id_from_i64};
use crate::repository::{StorageError, UserRepository};

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn insert_user(
        &self,
        handle: &Handle,
        created_at: DateTime<Utc>,
    ) -> Result<User, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO users (handle, created_at)
                VALUES (?1, ?2)
            ",
        )
        .bind(handle.as_str())
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::Conflict
            } else {
                conn(e)
            }
        })?;

        let id = user_id_from_i64(res.last_insert_rowid())?;
        Ok(User::new(id, handle.clone(), created_at))
    }

    async fn get_user_by_handle(&self, handle: &Handle) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, handle, created_at
                FROM users
                WHERE handle = ?1
            ",
        )
        .bind(handle.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, handle, created_at
                FROM users
                WHERE id = ?1
            ",
        )
        .bind(id_i64("user_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_user_row).transpose()
    }
}
