//! Multiple-choice option generation.
//!
//! A question offers its target destination plus distractors drawn uniformly from
//! the rest of the catalog. No two options may name the same (city, country).

use std::collections::HashSet;

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use thiserror::Error;

use crate::model::{Catalog, Destination, DestinationId, OPTION_COUNT, OptionSet, QuestionError};

const DISTRACTORS: usize = OPTION_COUNT - 1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OptionError {
    #[error("catalog too small: need {required} distinct destinations, have {available}")]
    InsufficientCatalogSize { required: usize, available: usize },

    #[error(transparent)]
    Question(#[from] QuestionError),
}

/// Build a shuffled option set for `target`.
///
/// Distractors are drawn one at a time from the catalog (excluding `target`) and
/// rejected when their place already appears among the chosen options. The catalog is
/// checked up front so the draw loop always finds enough distinct places.
///
/// # Errors
///
/// Returns `OptionError::InsufficientCatalogSize` when fewer than `OPTION_COUNT`
/// distinct places are available.
pub fn generate_options<R: Rng + ?Sized>(
    target: &Destination,
    catalog: &Catalog,
    rng: &mut R,
) -> Result<OptionSet, OptionError> {
    let pool: Vec<&Destination> = catalog
        .iter()
        .filter(|d| d.id() != target.id())
        .collect();

    let distinct_elsewhere = pool
        .iter()
        .map(|d| d.place())
        .filter(|place| *place != target.place())
        .collect::<HashSet<_>>()
        .len();
    if distinct_elsewhere < DISTRACTORS {
        return Err(OptionError::InsufficientCatalogSize {
            required: OPTION_COUNT,
            available: distinct_elsewhere + 1,
        });
    }

    let mut chosen: Vec<DestinationId> = Vec::with_capacity(OPTION_COUNT);
    let mut places: HashSet<(&str, &str)> = HashSet::with_capacity(OPTION_COUNT);
    chosen.push(target.id());
    places.insert(target.place());

    while chosen.len() < OPTION_COUNT {
        let Some(candidate) = pool.choose(rng) else {
            break;
        };
        if places.insert(candidate.place()) {
            chosen.push(candidate.id());
        }
    }

    chosen.shuffle(rng);
    Ok(OptionSet::from_slice(&chosen)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DestinationDraft;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn destination(id: u64, city: &str, country: &str) -> Destination {
        DestinationDraft {
            city: city.into(),
            country: country.into(),
            clues: Vec::new(),
            fun_facts: Vec::new(),
            trivia: Vec::new(),
        }
        .validate(DestinationId::new(id))
        .unwrap()
    }

    fn catalog(places: &[(&str, &str)]) -> Catalog {
        let destinations = places
            .iter()
            .enumerate()
            .map(|(i, (city, country))| destination(i as u64 + 1, city, country))
            .collect();
        Catalog::new(destinations).unwrap()
    }

    #[test]
    fn options_contain_target_once_and_distinct_places() {
        let catalog = catalog(&[
            ("Paris", "France"),
            ("Rome", "Italy"),
            ("Tokyo", "Japan"),
            ("Cairo", "Egypt"),
            ("Lima", "Peru"),
            ("Oslo", "Norway"),
        ]);
        let mut rng = StdRng::seed_from_u64(7);

        for target in catalog.iter() {
            for _ in 0..50 {
                let options = generate_options(target, &catalog, &mut rng).unwrap();
                assert_eq!(options.ids().len(), OPTION_COUNT);
                assert_eq!(options.iter().filter(|id| *id == target.id()).count(), 1);

                let places: HashSet<_> = options
                    .iter()
                    .map(|id| catalog.get(id).unwrap().place())
                    .collect();
                assert_eq!(places.len(), OPTION_COUNT);
            }
        }
    }

    #[test]
    fn duplicate_places_are_never_offered_together() {
        let catalog = catalog(&[
            ("Paris", "France"),
            ("Paris", "France"),
            ("Paris", "France"),
            ("Rome", "Italy"),
            ("Rome", "Italy"),
            ("Tokyo", "Japan"),
            ("Cairo", "Egypt"),
        ]);
        let target = catalog.get(DestinationId::new(1)).unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..100 {
            let options = generate_options(target, &catalog, &mut rng).unwrap();
            let places: HashSet<_> = options
                .iter()
                .map(|id| catalog.get(id).unwrap().place())
                .collect();
            assert_eq!(places.len(), OPTION_COUNT);
        }
    }

    #[test]
    fn too_few_distinct_places_is_an_error() {
        let catalog = catalog(&[
            ("Paris", "France"),
            ("Rome", "Italy"),
            ("Tokyo", "Japan"),
            ("Tokyo", "Japan"),
        ]);
        let target = catalog.get(DestinationId::new(1)).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let err = generate_options(target, &catalog, &mut rng).unwrap_err();
        assert_eq!(
            err,
            OptionError::InsufficientCatalogSize {
                required: OPTION_COUNT,
                available: 3
            }
        );
    }

    #[test]
    fn same_seed_gives_same_options() {
        let catalog = catalog(&[
            ("Paris", "France"),
            ("Rome", "Italy"),
            ("Tokyo", "Japan"),
            ("Cairo", "Egypt"),
            ("Lima", "Peru"),
        ]);
        let target = catalog.get(DestinationId::new(2)).unwrap();

        let a = generate_options(target, &catalog, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = generate_options(target, &catalog, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }
}
