use globetrotter_core::model::{Destination, DestinationDraft, DestinationId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, destination_id_from_i64, map_destination_row, ser, to_json};
use crate::repository::{DestinationRepository, StorageError};

#[async_trait::async_trait]
impl DestinationRepository for SqliteRepository {
    async fn insert_destinations(
        &self,
        drafts: &[DestinationDraft],
    ) -> Result<Vec<DestinationId>, StorageError> {
        for draft in drafts {
            draft.check().map_err(ser)?;
        }

        let mut tx = self.pool.begin().await.map_err(conn)?;
        let mut ids = Vec::with_capacity(drafts.len());

        for draft in drafts {
            let res = sqlx::query(
                r"
                    INSERT INTO destinations (city, country, clues, fun_facts, trivia)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(draft.city.trim())
            .bind(draft.country.trim())
            .bind(to_json(&draft.clues)?)
            .bind(to_json(&draft.fun_facts)?)
            .bind(to_json(&draft.trivia)?)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            ids.push(destination_id_from_i64(res.last_insert_rowid())?);
        }

        tx.commit().await.map_err(conn)?;
        Ok(ids)
    }

    async fn list_destinations(&self) -> Result<Vec<Destination>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, city, country, clues, fun_facts, trivia
                FROM destinations
                ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_destination_row(&row)?);
        }
        Ok(out)
    }

    async fn count_destinations(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM destinations")
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        let n: i64 = row.try_get("n").map_err(ser)?;
        u64::try_from(n).map_err(|_| StorageError::Serialization(format!("invalid count: {n}")))
    }
}
