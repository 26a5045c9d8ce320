use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

use globetrotter_core::model::{Catalog, Destination, QuestionDraft};
use globetrotter_core::options::generate_options;

use crate::error::GameError;

/// Pick `count` destinations at random and build one question for each.
///
/// Pure apart from the randomness it consumes, so a failure leaves nothing behind.
pub(crate) fn plan_questions<R: Rng + ?Sized>(
    catalog: &Catalog,
    count: usize,
    rng: &mut R,
) -> Result<Vec<QuestionDraft>, GameError> {
    if catalog.len() < count {
        return Err(GameError::InsufficientCatalogSize {
            required: count,
            available: catalog.len(),
        });
    }

    let mut picks: Vec<&Destination> = catalog.iter().collect();
    picks.shuffle(rng);
    picks.truncate(count);

    let mut questions = Vec::with_capacity(count);
    for target in picks {
        let clue = target
            .clues()
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| target.fallback_clue());
        let options = generate_options(target, catalog, rng)?;
        questions.push(QuestionDraft::new(clue, options, target.id())?);
    }
    Ok(questions)
}
