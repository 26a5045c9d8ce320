use async_trait::async_trait;
use chrono::{DateTime, Utc};
use globetrotter_core::model::{
    Destination, DestinationDraft, DestinationId, Handle, QuestionDraft, QuestionId, Session,
    SessionCounters, SessionId, SessionQuestion, User, UserId,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A session and its full question set, written in one transaction.
#[derive(Debug, Clone)]
pub struct NewSessionRecord {
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<QuestionDraft>,
}

impl NewSessionRecord {
    #[must_use]
    pub fn new(user_id: UserId, created_at: DateTime<Utc>, questions: Vec<QuestionDraft>) -> Self {
        Self {
            user_id,
            created_at,
            questions,
        }
    }

    /// Question count stored on the session row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the count does not fit in `u32`.
    pub fn total_questions(&self) -> Result<u32, StorageError> {
        u32::try_from(self.questions.len())
            .map_err(|_| StorageError::Serialization("total_questions overflow".into()))
    }
}

/// Persisted shape of a single answer submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerRecord {
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub selected: DestinationId,
    pub correct: bool,
    pub answered_at: DateTime<Utc>,
}

/// Repository contract for the destination catalog.
#[async_trait]
pub trait DestinationRepository: Send + Sync {
    /// Insert destinations in one transaction, returning their ids in input order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for invalid drafts, or other storage errors.
    async fn insert_destinations(
        &self,
        drafts: &[DestinationDraft],
    ) -> Result<Vec<DestinationId>, StorageError>;

    /// Load every destination ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the rows cannot be read or decoded.
    async fn list_destinations(&self) -> Result<Vec<Destination>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn count_destinations(&self) -> Result<u64, StorageError>;
}

/// Repository contract for players.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the handle is already taken.
    async fn insert_user(
        &self,
        handle: &Handle,
        created_at: DateTime<Utc>,
    ) -> Result<User, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_user_by_handle(&self, handle: &Handle) -> Result<Option<User>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;
}

/// Repository contract for sessions and their questions.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a session together with all of its questions.
    ///
    /// Either everything is written or nothing is.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist, or other storage errors.
    async fn create_session(&self, record: NewSessionRecord) -> Result<SessionId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StorageError>;

    /// Lowest-id unanswered question of the session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn next_unanswered(
        &self,
        session_id: SessionId,
    ) -> Result<Option<SessionQuestion>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn count_unanswered(&self, session_id: SessionId) -> Result<u32, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_question(&self, id: QuestionId) -> Result<Option<SessionQuestion>, StorageError>;

    /// Mark a question answered and bump the session counters as one unit.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the question was already answered (nothing
    /// is changed), `StorageError::NotFound` if it does not belong to the session.
    async fn record_answer(&self, answer: AnswerRecord) -> Result<(), StorageError>;

    /// All questions of the session ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_questions(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<SessionQuestion>, StorageError>;
}

//
// ─── IN-MEMORY ADAPTER ─────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
struct MemorySession {
    user_id: UserId,
    total_questions: u32,
    counters: SessionCounters,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    destinations: BTreeMap<DestinationId, Destination>,
    users: BTreeMap<UserId, User>,
    sessions: BTreeMap<SessionId, MemorySession>,
    questions: BTreeMap<QuestionId, SessionQuestion>,
    last_id: u64,
}

impl MemoryState {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// All state sits behind one lock, so every write is atomic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Number of persisted sessions, handy for asserting rollback behaviour.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn session_count(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.sessions.len())
    }

    /// Number of persisted questions across all sessions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn question_count(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.questions.len())
    }
}

fn rehydrate_session(id: SessionId, s: &MemorySession) -> Result<Session, StorageError> {
    Session::from_persisted(id, s.user_id, s.total_questions, s.counters, s.created_at)
        .map_err(|e| StorageError::Serialization(e.to_string()))
}

#[async_trait]
impl DestinationRepository for InMemoryRepository {
    async fn insert_destinations(
        &self,
        drafts: &[DestinationDraft],
    ) -> Result<Vec<DestinationId>, StorageError> {
        for draft in drafts {
            draft
                .check()
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
        }

        let mut guard = self.lock()?;
        let mut ids = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let id = DestinationId::new(guard.next_id());
            let destination = draft
                .clone()
                .validate(id)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            guard.destinations.insert(id, destination);
            ids.push(id);
        }
        Ok(ids)
    }

    async fn list_destinations(&self) -> Result<Vec<Destination>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.destinations.values().cloned().collect())
    }

    async fn count_destinations(&self) -> Result<u64, StorageError> {
        let guard = self.lock()?;
        Ok(guard.destinations.len() as u64)
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn insert_user(
        &self,
        handle: &Handle,
        created_at: DateTime<Utc>,
    ) -> Result<User, StorageError> {
        let mut guard = self.lock()?;
        if guard.users.values().any(|u| u.handle() == handle) {
            return Err(StorageError::Conflict);
        }
        let user = User::new(UserId::new(guard.next_id()), handle.clone(), created_at);
        guard.users.insert(user.id(), user.clone());
        Ok(user)
    }

    async fn get_user_by_handle(&self, handle: &Handle) -> Result<Option<User>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.users.values().find(|u| u.handle() == handle).cloned())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.users.get(&id).cloned())
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn create_session(&self, record: NewSessionRecord) -> Result<SessionId, StorageError> {
        let total_questions = record.total_questions()?;
        let mut guard = self.lock()?;
        if !guard.users.contains_key(&record.user_id) {
            return Err(StorageError::NotFound);
        }

        let session_id = SessionId::new(guard.next_id());
        let session = MemorySession {
            user_id: record.user_id,
            total_questions,
            counters: SessionCounters::default(),
            created_at: record.created_at,
        };
        // Validate before touching the maps so a bad record leaves no trace.
        rehydrate_session(session_id, &session)?;
        guard.sessions.insert(session_id, session);

        for draft in record.questions {
            let question_id = QuestionId::new(guard.next_id());
            let question = draft.assign_id(question_id, session_id);
            guard.questions.insert(question_id, question);
        }
        Ok(session_id)
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StorageError> {
        let guard = self.lock()?;
        guard
            .sessions
            .get(&id)
            .map(|s| rehydrate_session(id, s))
            .transpose()
    }

    async fn next_unanswered(
        &self,
        session_id: SessionId,
    ) -> Result<Option<SessionQuestion>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .questions
            .values()
            .find(|q| q.session_id() == session_id && !q.is_answered())
            .cloned())
    }

    async fn count_unanswered(&self, session_id: SessionId) -> Result<u32, StorageError> {
        let guard = self.lock()?;
        let count = guard
            .questions
            .values()
            .filter(|q| q.session_id() == session_id && !q.is_answered())
            .count();
        u32::try_from(count).map_err(|_| StorageError::Serialization("count overflow".into()))
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<SessionQuestion>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.questions.get(&id).cloned())
    }

    async fn record_answer(&self, answer: AnswerRecord) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;

        let question = state
            .questions
            .get_mut(&answer.question_id)
            .filter(|q| q.session_id() == answer.session_id)
            .ok_or(StorageError::NotFound)?;
        let session = state
            .sessions
            .get_mut(&answer.session_id)
            .ok_or(StorageError::NotFound)?;

        if question.is_answered() {
            return Err(StorageError::Conflict);
        }
        let correct = question
            .check_answer(answer.selected)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        if correct != answer.correct {
            return Err(StorageError::Serialization(
                "answer correctness disagrees with stored question".into(),
            ));
        }
        question
            .answer(answer.selected, answer.answered_at)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        session.counters.record(correct);
        Ok(())
    }

    async fn list_questions(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<SessionQuestion>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .questions
            .values()
            .filter(|q| q.session_id() == session_id)
            .cloned()
            .collect())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub destinations: Arc<dyn DestinationRepository>,
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_memory(InMemoryRepository::new())
    }

    #[must_use]
    pub fn from_memory(repo: InMemoryRepository) -> Self {
        let destinations: Arc<dyn DestinationRepository> = Arc::new(repo.clone());
        let users: Arc<dyn UserRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo);
        Self {
            destinations,
            users,
            sessions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use globetrotter_core::model::OptionSet;
    use globetrotter_core::time::fixed_now;

    fn draft(city: &str) -> DestinationDraft {
        DestinationDraft {
            city: city.into(),
            country: "Testland".into(),
            clues: vec![format!("{city} clue")],
            fun_facts: Vec::new(),
            trivia: Vec::new(),
        }
    }

    fn question(ids: &[DestinationId]) -> QuestionDraft {
        let options = OptionSet::from_slice(&ids[..4]).unwrap();
        QuestionDraft::new("clue", options, ids[0]).unwrap()
    }

    async fn seeded() -> (InMemoryRepository, User, Vec<DestinationId>) {
        let repo = InMemoryRepository::new();
        let ids = repo
            .insert_destinations(&[draft("A"), draft("B"), draft("C"), draft("D")])
            .await
            .unwrap();
        let user = repo
            .insert_user(&Handle::new("alice").unwrap(), fixed_now())
            .await
            .unwrap();
        (repo, user, ids)
    }

    #[tokio::test]
    async fn duplicate_handle_conflicts() {
        let (repo, _user, _) = seeded().await;
        let err = repo
            .insert_user(&Handle::new("alice").unwrap(), fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn invalid_destination_draft_inserts_nothing() {
        let repo = InMemoryRepository::new();
        let err = repo
            .insert_destinations(&[draft("A"), draft("  ")])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
        assert_eq!(repo.count_destinations().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn record_answer_updates_question_and_counters_once() {
        let (repo, user, ids) = seeded().await;
        let session_id = repo
            .create_session(NewSessionRecord::new(
                user.id(),
                fixed_now(),
                vec![question(&ids), question(&ids)],
            ))
            .await
            .unwrap();

        let first = repo.next_unanswered(session_id).await.unwrap().unwrap();
        let answer = AnswerRecord {
            session_id,
            question_id: first.id(),
            selected: ids[0],
            correct: true,
            answered_at: fixed_now(),
        };
        repo.record_answer(answer).await.unwrap();
        let err = repo.record_answer(answer).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        let session = repo.get_session(session_id).await.unwrap().unwrap();
        assert_eq!(session.counters().answered(), 1);
        assert_eq!(session.counters().correct(), 1);
        assert_eq!(repo.count_unanswered(session_id).await.unwrap(), 1);

        let next = repo.next_unanswered(session_id).await.unwrap().unwrap();
        assert!(next.id() > first.id());
    }

    #[tokio::test]
    async fn session_for_unknown_user_is_not_created() {
        let (repo, _user, ids) = seeded().await;
        let err = repo
            .create_session(NewSessionRecord::new(
                UserId::new(999),
                fixed_now(),
                vec![question(&ids)],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
        assert_eq!(repo.session_count().unwrap(), 0);
        assert_eq!(repo.question_count().unwrap(), 0);
    }
}
