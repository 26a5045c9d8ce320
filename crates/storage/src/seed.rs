//! Loading the destination dataset into an empty store.

use std::path::{Path, PathBuf};

use globetrotter_core::model::DestinationDraft;
use thiserror::Error;

use crate::repository::{DestinationRepository, StorageError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SeedError {
    #[error("failed to read dataset {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dataset: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("dataset entry {index} is invalid: {reason}")]
    InvalidEntry { index: usize, reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Outcome of [`seed_if_empty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Inserted(usize),
    AlreadySeeded { existing: u64 },
}

/// Parse a dataset: a JSON array of `{city, country, clues, fun_fact, trivia}` objects.
///
/// # Errors
///
/// Returns `SeedError::Parse` for malformed JSON and `SeedError::InvalidEntry` when an
/// entry has a blank city or country.
pub fn parse_dataset(raw: &str) -> Result<Vec<DestinationDraft>, SeedError> {
    let drafts: Vec<DestinationDraft> = serde_json::from_str(raw)?;
    for (index, draft) in drafts.iter().enumerate() {
        draft.check().map_err(|e| SeedError::InvalidEntry {
            index,
            reason: e.to_string(),
        })?;
    }
    Ok(drafts)
}

/// Read and parse a dataset file.
///
/// # Errors
///
/// Returns `SeedError::Read` if the file cannot be read, otherwise as [`parse_dataset`].
pub fn read_dataset(path: &Path) -> Result<Vec<DestinationDraft>, SeedError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_dataset(&raw)
}

/// Insert `drafts` unless the destination table already has rows.
///
/// # Errors
///
/// Returns `SeedError::Storage` on repository failures.
pub async fn seed_if_empty(
    repo: &dyn DestinationRepository,
    drafts: &[DestinationDraft],
) -> Result<SeedOutcome, SeedError> {
    let existing = repo.count_destinations().await?;
    if existing > 0 {
        tracing::info!(existing, "destinations already seeded");
        return Ok(SeedOutcome::AlreadySeeded { existing });
    }

    let ids = repo.insert_destinations(drafts).await?;
    tracing::info!(inserted = ids.len(), "seeded destinations");
    Ok(SeedOutcome::Inserted(ids.len()))
}
