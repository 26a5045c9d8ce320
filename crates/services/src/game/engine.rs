use std::sync::Arc;

use rand::seq::IndexedRandom;

use globetrotter_core::model::{
    Catalog, Destination, DestinationId, Handle, QUESTIONS_PER_SESSION, QuestionError, QuestionId,
    Session, SessionId,
};
use storage::repository::{
    AnswerRecord, NewSessionRecord, SessionRepository, StorageError, UserRepository,
};

use super::plan::plan_questions;
use super::view::{AnswerResult, NextQuestion, OptionView, SessionResult, SessionSummaryView};
use crate::Clock;
use crate::error::GameError;
use crate::images::ImageLookup;
use crate::random::SharedRng;

/// Runs quiz sessions against the loaded catalog.
///
/// Every write goes through the session repository, which keeps the session row and
/// its questions consistent; the engine itself holds no per-session state.
#[derive(Clone)]
pub struct GameEngine {
    clock: Clock,
    catalog: Arc<Catalog>,
    rng: SharedRng,
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    images: Arc<dyn ImageLookup>,
}

impl GameEngine {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<Catalog>,
        rng: SharedRng,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        images: Arc<dyn ImageLookup>,
    ) -> Self {
        Self {
            clock,
            catalog,
            rng,
            users,
            sessions,
            images,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Start a session of `QUESTIONS_PER_SESSION` questions for `handle`.
    ///
    /// # Errors
    ///
    /// Returns `GameError::UserNotFound` for an unknown or malformed handle and
    /// `GameError::InsufficientCatalogSize` when the catalog cannot fill a session.
    /// Nothing is persisted on error.
    pub async fn create_session(&self, handle: &str) -> Result<SessionId, GameError> {
        // A malformed handle can never name a registered user.
        let Ok(handle) = Handle::new(handle) else {
            return Err(GameError::UserNotFound(handle.trim().to_string()));
        };
        let user = self
            .users
            .get_user_by_handle(&handle)
            .await?
            .ok_or_else(|| GameError::UserNotFound(handle.to_string()))?;

        let count = QUESTIONS_PER_SESSION as usize;
        let questions = self
            .rng
            .with(|rng| plan_questions(&self.catalog, count, rng))?;

        let record = NewSessionRecord::new(user.id(), self.clock.now(), questions);
        let session_id = match self.sessions.create_session(record).await {
            Ok(id) => id,
            Err(StorageError::NotFound) => {
                return Err(GameError::UserNotFound(handle.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(%session_id, user_id = %user.id(), "session created");
        Ok(session_id)
    }

    /// The lowest-id unanswered question, without its answer.
    ///
    /// `has_next` is true only while more than one question is still unanswered.
    ///
    /// # Errors
    ///
    /// Returns `GameError::SessionNotFound` or `GameError::NoQuestionsRemaining`.
    pub async fn next_question(&self, session_id: SessionId) -> Result<NextQuestion, GameError> {
        let session = self.session(session_id).await?;
        let question = self
            .sessions
            .next_unanswered(session_id)
            .await?
            .ok_or(GameError::NoQuestionsRemaining(session_id))?;
        let unanswered = self.sessions.count_unanswered(session_id).await?;

        let options = question
            .options()
            .iter()
            .map(|id| self.destination(id).map(OptionView::from_destination))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NextQuestion {
            session_id,
            question_id: question.id(),
            position: session.total_questions().saturating_sub(unanswered) + 1,
            total_questions: session.total_questions(),
            clue: question.clue().to_string(),
            options,
            has_next: unanswered > 1,
        })
    }

    /// Record `selected` as the answer to `question_id`.
    ///
    /// # Errors
    ///
    /// Returns `GameError::SessionNotFound`, `GameError::QuestionNotFound`,
    /// `GameError::SessionMismatch`, `GameError::AlreadyAnswered` (also when a
    /// concurrent submission wins) or `GameError::InvalidOption`.
    pub async fn submit_answer(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
        selected: DestinationId,
    ) -> Result<AnswerResult, GameError> {
        self.session(session_id).await?;
        let question = self
            .sessions
            .get_question(question_id)
            .await?
            .ok_or(GameError::QuestionNotFound(question_id))?;
        if question.session_id() != session_id {
            return Err(GameError::SessionMismatch {
                session: session_id,
                question: question_id,
            });
        }

        let is_correct = match question.check_answer(selected) {
            Ok(correct) => correct,
            Err(QuestionError::AlreadyAnswered) => {
                return Err(GameError::AlreadyAnswered(question_id));
            }
            Err(QuestionError::InvalidOption(_)) => {
                return Err(GameError::InvalidOption {
                    question: question_id,
                    selected,
                });
            }
            Err(e) => return Err(e.into()),
        };
        let target = self.destination(question.correct())?;

        let record = AnswerRecord {
            session_id,
            question_id,
            selected,
            correct: is_correct,
            answered_at: self.clock.now(),
        };
        match self.sessions.record_answer(record).await {
            Ok(()) => {}
            Err(StorageError::Conflict) => return Err(GameError::AlreadyAnswered(question_id)),
            Err(StorageError::NotFound) => return Err(GameError::QuestionNotFound(question_id)),
            Err(e) => return Err(e.into()),
        }

        tracing::debug!(%session_id, %question_id, is_correct, "answer recorded");

        let (fun_fact, trivia) = if is_correct {
            (self.pick(target.fun_facts()), None)
        } else {
            (None, self.pick(target.trivia()))
        };

        Ok(AnswerResult {
            question_id,
            is_correct,
            correct_destination_id: target.id(),
            city: target.city().to_string(),
            country: target.country().to_string(),
            fun_fact,
            trivia,
        })
    }

    /// Totals, derived state and every question of the session.
    ///
    /// # Errors
    ///
    /// Returns `GameError::SessionNotFound`.
    pub async fn result(&self, session_id: SessionId) -> Result<SessionResult, GameError> {
        let session = self.session(session_id).await?;
        let questions = self.sessions.list_questions(session_id).await?;
        Ok(SessionResult::new(&session, &questions))
    }

    /// Owner, counts and a display image for the session.
    ///
    /// # Errors
    ///
    /// Returns `GameError::SessionNotFound`, or `GameError::UserNotFound` if the
    /// owning user row is gone.
    pub async fn summary(&self, session_id: SessionId) -> Result<SessionSummaryView, GameError> {
        let session = self.session(session_id).await?;
        let owner = self
            .users
            .get_user(session.user_id())
            .await?
            .ok_or_else(|| GameError::UserNotFound(session.user_id().to_string()))?;
        let image = self.images.fetch_display_image().await;

        let counters = session.counters();
        Ok(SessionSummaryView {
            session_id,
            handle: owner.handle().clone(),
            state: session.state(),
            total_questions: session.total_questions(),
            answered: counters.answered(),
            correct: counters.correct(),
            incorrect: counters.incorrect(),
            created_at: session.created_at(),
            image_url: image.to_string(),
        })
    }

    async fn session(&self, session_id: SessionId) -> Result<Session, GameError> {
        self.sessions
            .get_session(session_id)
            .await?
            .ok_or(GameError::SessionNotFound(session_id))
    }

    fn destination(&self, id: DestinationId) -> Result<&Destination, GameError> {
        self.catalog.get(id).ok_or(GameError::CatalogMismatch(id))
    }

    fn pick(&self, items: &[String]) -> Option<String> {
        self.rng.with(|rng| items.choose(rng).cloned())
    }
}
