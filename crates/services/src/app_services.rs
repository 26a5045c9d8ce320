use std::path::Path;
use std::sync::Arc;

use globetrotter_core::model::Catalog;
use storage::repository::{DestinationRepository, Storage};
use storage::seed::{SeedOutcome, read_dataset, seed_if_empty};

use crate::Clock;
use crate::error::AppServicesError;
use crate::game::GameEngine;
use crate::images::{ImageLookup, PexelsImageLookup};
use crate::random::SharedRng;
use crate::user_service::UserService;

/// Assembles app-facing services around one loaded catalog.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<Catalog>,
    users: Arc<UserService>,
    engine: Arc<GameEngine>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, OS randomness and the Pexels lookup.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the catalog is empty.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(
            &storage,
            clock,
            SharedRng::from_os_rng(),
            Arc::new(PexelsImageLookup::from_env()),
        )
        .await
    }

    /// Build services over an existing storage aggregate.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::EmptyCatalog` when no destinations are stored.
    pub async fn from_storage(
        storage: &Storage,
        clock: Clock,
        rng: SharedRng,
        images: Arc<dyn ImageLookup>,
    ) -> Result<Self, AppServicesError> {
        let catalog = Arc::new(load_catalog(storage.destinations.as_ref()).await?);
        tracing::info!(destinations = catalog.len(), "catalog loaded");

        let users = Arc::new(UserService::new(clock, Arc::clone(&storage.users)));
        let engine = Arc::new(GameEngine::new(
            clock,
            Arc::clone(&catalog),
            rng,
            Arc::clone(&storage.users),
            Arc::clone(&storage.sessions),
            images,
        ));

        Ok(Self {
            catalog,
            users,
            engine,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn users(&self) -> Arc<UserService> {
        Arc::clone(&self.users)
    }

    #[must_use]
    pub fn engine(&self) -> Arc<GameEngine> {
        Arc::clone(&self.engine)
    }
}

/// Read every destination once. An empty store is an error.
///
/// # Errors
///
/// Returns `AppServicesError::EmptyCatalog`, or storage and catalog errors.
pub async fn load_catalog(
    destinations: &dyn DestinationRepository,
) -> Result<Catalog, AppServicesError> {
    let all = destinations.list_destinations().await?;
    if all.is_empty() {
        return Err(AppServicesError::EmptyCatalog);
    }
    Ok(Catalog::new(all)?)
}

/// Seed the destination table from `dataset` unless it already has rows.
///
/// The file is only read when seeding is needed.
///
/// # Errors
///
/// Returns `AppServicesError::Seed` if the dataset cannot be read or stored.
pub async fn ensure_seeded(
    destinations: &dyn DestinationRepository,
    dataset: &Path,
) -> Result<SeedOutcome, AppServicesError> {
    let existing = destinations.count_destinations().await?;
    if existing > 0 {
        return Ok(SeedOutcome::AlreadySeeded { existing });
    }
    let drafts = read_dataset(dataset)?;
    Ok(seed_if_empty(destinations, &drafts).await?)
}
