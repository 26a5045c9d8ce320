use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::DestinationId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DestinationError {
    #[error("destination city cannot be empty")]
    EmptyCity,

    #[error("destination country cannot be empty")]
    EmptyCountry,

    #[error("duplicate destination id in catalog: {0}")]
    DuplicateId(DestinationId),
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated destination as it appears in the seed dataset.
///
/// The dataset uses the singular `fun_fact` key for the list of fun facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationDraft {
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub clues: Vec<String>,
    #[serde(rename = "fun_fact", default)]
    pub fun_facts: Vec<String>,
    #[serde(default)]
    pub trivia: Vec<String>,
}

impl DestinationDraft {
    /// Validate the draft and attach a persisted id.
    ///
    /// City and country are trimmed; blank list entries are dropped.
    ///
    /// # Errors
    ///
    /// Returns `DestinationError::EmptyCity` / `EmptyCountry` for blank names.
    pub fn validate(self, id: DestinationId) -> Result<Destination, DestinationError> {
        self.check()?;
        Ok(Destination {
            id,
            city: self.city.trim().to_owned(),
            country: self.country.trim().to_owned(),
            clues: non_blank(self.clues),
            fun_facts: non_blank(self.fun_facts),
            trivia: non_blank(self.trivia),
        })
    }

    /// Check the draft without consuming it.
    ///
    /// # Errors
    ///
    /// Returns `DestinationError::EmptyCity` / `EmptyCountry` for blank names.
    pub fn check(&self) -> Result<(), DestinationError> {
        if self.city.trim().is_empty() {
            return Err(DestinationError::EmptyCity);
        }
        if self.country.trim().is_empty() {
            return Err(DestinationError::EmptyCountry);
        }
        Ok(())
    }
}

fn non_blank(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .filter(|item| !item.trim().is_empty())
        .collect()
}

//
// ─── DESTINATION ───────────────────────────────────────────────────────────────
//

/// A place the player has to guess. Immutable once loaded into the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Destination {
    id: DestinationId,
    city: String,
    country: String,
    clues: Vec<String>,
    fun_facts: Vec<String>,
    trivia: Vec<String>,
}

impl Destination {
    #[must_use]
    pub fn id(&self) -> DestinationId {
        self.id
    }

    #[must_use]
    pub fn city(&self) -> &str {
        &self.city
    }

    #[must_use]
    pub fn country(&self) -> &str {
        &self.country
    }

    #[must_use]
    pub fn clues(&self) -> &[String] {
        &self.clues
    }

    #[must_use]
    pub fn fun_facts(&self) -> &[String] {
        &self.fun_facts
    }

    #[must_use]
    pub fn trivia(&self) -> &[String] {
        &self.trivia
    }

    /// Display label shown next to a multiple-choice option.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }

    /// The (city, country) pair used to keep options distinguishable.
    #[must_use]
    pub fn place(&self) -> (&str, &str) {
        (self.city.as_str(), self.country.as_str())
    }

    /// Prompt used when a destination has no clues.
    #[must_use]
    pub fn fallback_clue(&self) -> String {
        format!("Where is {} located?", self.city)
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Read-only set of destinations loaded once per process.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    destinations: Vec<Destination>,
    index: HashMap<DestinationId, usize>,
}

impl Catalog {
    /// Build a catalog, preserving input order.
    ///
    /// # Errors
    ///
    /// Returns `DestinationError::DuplicateId` if two destinations share an id.
    pub fn new(destinations: Vec<Destination>) -> Result<Self, DestinationError> {
        let mut index = HashMap::with_capacity(destinations.len());
        for (pos, destination) in destinations.iter().enumerate() {
            if index.insert(destination.id(), pos).is_some() {
                return Err(DestinationError::DuplicateId(destination.id()));
            }
        }
        Ok(Self {
            destinations,
            index,
        })
    }

    #[must_use]
    pub fn get(&self, id: DestinationId) -> Option<&Destination> {
        self.index.get(&id).map(|&pos| &self.destinations[pos])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Destination> {
        self.destinations.iter()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
