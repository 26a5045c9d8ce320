use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::{SessionId, UserId};

/// Every session asks exactly this many questions.
pub const QUESTIONS_PER_SESSION: u32 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionRecordError {
    #[error("answered ({answered}) does not match correct + incorrect ({sum})")]
    CountMismatch { answered: u32, sum: u32 },

    #[error("answered ({answered}) exceeds total questions ({total})")]
    TooManyAnswered { answered: u32, total: u32 },

    #[error("session must have at least one question")]
    NoQuestions,
}

/// Lifecycle of a session, derived from its counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    InProgress,
    Completed,
}

/// Running score of a session. `answered == correct + incorrect` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionCounters {
    answered: u32,
    correct: u32,
    incorrect: u32,
}

impl SessionCounters {
    /// Rehydrate counters from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionRecordError::CountMismatch` if totals do not align.
    pub fn from_persisted(
        answered: u32,
        correct: u32,
        incorrect: u32,
    ) -> Result<Self, SessionRecordError> {
        let sum = correct.saturating_add(incorrect);
        if sum != answered {
            return Err(SessionRecordError::CountMismatch { answered, sum });
        }
        Ok(Self {
            answered,
            correct,
            incorrect,
        })
    }

    /// Count one more answer.
    pub fn record(&mut self, correct: bool) {
        self.answered = self.answered.saturating_add(1);
        if correct {
            self.correct = self.correct.saturating_add(1);
        } else {
            self.incorrect = self.incorrect.saturating_add(1);
        }
    }

    #[must_use]
    pub fn answered(&self) -> u32 {
        self.answered
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.incorrect
    }
}

/// One playthrough owned by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    user_id: UserId,
    total_questions: u32,
    counters: SessionCounters,
    created_at: DateTime<Utc>,
}

impl Session {
    /// Rehydrate a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionRecordError` if the question count is zero or the counters
    /// exceed it.
    pub fn from_persisted(
        id: SessionId,
        user_id: UserId,
        total_questions: u32,
        counters: SessionCounters,
        created_at: DateTime<Utc>,
    ) -> Result<Self, SessionRecordError> {
        if total_questions == 0 {
            return Err(SessionRecordError::NoQuestions);
        }
        if counters.answered() > total_questions {
            return Err(SessionRecordError::TooManyAnswered {
                answered: counters.answered(),
                total: total_questions,
            });
        }
        Ok(Self {
            id,
            user_id,
            total_questions,
            counters,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.total_questions.saturating_sub(self.counters.answered())
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        match self.counters.answered() {
            0 => SessionState::Created,
            n if n >= self.total_questions => SessionState::Completed,
            _ => SessionState::InProgress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn session(counters: SessionCounters) -> Session {
        Session::from_persisted(
            SessionId::new(1),
            UserId::new(1),
            QUESTIONS_PER_SESSION,
            counters,
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn counters_reject_mismatched_totals() {
        let err = SessionCounters::from_persisted(3, 1, 1).unwrap_err();
        assert_eq!(err, SessionRecordError::CountMismatch { answered: 3, sum: 2 });
    }

    #[test]
    fn recording_keeps_answered_equal_to_sum() {
        let mut counters = SessionCounters::default();
        counters.record(true);
        counters.record(false);
        counters.record(false);
        assert_eq!(counters.answered(), 3);
        assert_eq!(counters.correct(), 1);
        assert_eq!(counters.incorrect(), 2);
        assert_eq!(counters.answered(), counters.correct() + counters.incorrect());
    }

    #[test]
    fn state_follows_answered_count() {
        let mut counters = SessionCounters::default();
        assert_eq!(session(counters).state(), SessionState::Created);

        counters.record(true);
        assert_eq!(session(counters).state(), SessionState::InProgress);
        assert_eq!(session(counters).remaining(), 4);

        for _ in 1..QUESTIONS_PER_SESSION {
            counters.record(false);
        }
        assert_eq!(session(counters).state(), SessionState::Completed);
        assert_eq!(session(counters).remaining(), 0);
    }

    #[test]
    fn persisted_session_cannot_overflow_question_count() {
        let counters = SessionCounters::from_persisted(6, 6, 0).unwrap();
        let err = Session::from_persisted(
            SessionId::new(1),
            UserId::new(1),
            QUESTIONS_PER_SESSION,
            counters,
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, SessionRecordError::TooManyAnswered { .. }));
    }
}
