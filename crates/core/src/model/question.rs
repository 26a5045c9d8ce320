use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::{DestinationId, QuestionId, SessionId};

/// Number of choices offered per question.
pub const OPTION_COUNT: usize = 4;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("expected 4 options, got {0}")]
    WrongOptionCount(usize),

    #[error("option {0} appears more than once")]
    DuplicateOption(DestinationId),

    #[error("correct destination {0} is not among the options")]
    CorrectNotInOptions(DestinationId),

    #[error("question clue cannot be empty")]
    EmptyClue,

    #[error("question already answered")]
    AlreadyAnswered,

    #[error("destination {0} is not one of the options")]
    InvalidOption(DestinationId),
}

//
// ─── OPTIONS ───────────────────────────────────────────────────────────────────
//

/// Ordered multiple-choice set of exactly `OPTION_COUNT` distinct destination ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OptionSet([DestinationId; OPTION_COUNT]);

impl OptionSet {
    /// # Errors
    ///
    /// Returns `QuestionError::DuplicateOption` if an id repeats.
    pub fn new(ids: [DestinationId; OPTION_COUNT]) -> Result<Self, QuestionError> {
        for (i, id) in ids.iter().enumerate() {
            if ids[..i].contains(id) {
                return Err(QuestionError::DuplicateOption(*id));
            }
        }
        Ok(Self(ids))
    }

    /// Build from a slice, as read back from storage.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::WrongOptionCount` or `QuestionError::DuplicateOption`.
    pub fn from_slice(ids: &[DestinationId]) -> Result<Self, QuestionError> {
        let array: [DestinationId; OPTION_COUNT] = ids
            .try_into()
            .map_err(|_| QuestionError::WrongOptionCount(ids.len()))?;
        Self::new(array)
    }

    #[must_use]
    pub fn ids(&self) -> &[DestinationId] {
        &self.0
    }

    #[must_use]
    pub fn contains(&self, id: DestinationId) -> bool {
        self.0.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = DestinationId> + '_ {
        self.0.iter().copied()
    }
}

//
// ─── ANSWER STATUS ─────────────────────────────────────────────────────────────
//

/// Whether a question has been answered, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerStatus {
    Unanswered,
    Answered {
        selected: DestinationId,
        correct: bool,
        answered_at: DateTime<Utc>,
    },
}

impl AnswerStatus {
    #[must_use]
    pub fn is_answered(&self) -> bool {
        matches!(self, AnswerStatus::Answered { .. })
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A question that has been planned but not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    clue: String,
    options: OptionSet,
    correct: DestinationId,
}

impl QuestionDraft {
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyClue` for a blank clue and
    /// `QuestionError::CorrectNotInOptions` if the answer is missing from the options.
    pub fn new(
        clue: impl Into<String>,
        options: OptionSet,
        correct: DestinationId,
    ) -> Result<Self, QuestionError> {
        let clue = clue.into();
        if clue.trim().is_empty() {
            return Err(QuestionError::EmptyClue);
        }
        if !options.contains(correct) {
            return Err(QuestionError::CorrectNotInOptions(correct));
        }
        Ok(Self {
            clue,
            options,
            correct,
        })
    }

    #[must_use]
    pub fn clue(&self) -> &str {
        &self.clue
    }

    #[must_use]
    pub fn options(&self) -> OptionSet {
        self.options
    }

    #[must_use]
    pub fn correct(&self) -> DestinationId {
        self.correct
    }

    /// Attach persisted ids; the question starts unanswered.
    #[must_use]
    pub fn assign_id(self, id: QuestionId, session_id: SessionId) -> SessionQuestion {
        SessionQuestion {
            id,
            session_id,
            clue: self.clue,
            options: self.options,
            correct: self.correct,
            status: AnswerStatus::Unanswered,
        }
    }
}

/// A question belonging to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionQuestion {
    id: QuestionId,
    session_id: SessionId,
    clue: String,
    options: OptionSet,
    correct: DestinationId,
    status: AnswerStatus,
}

impl SessionQuestion {
    /// Rehydrate a question from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the correct id is not among the options or the
    /// stored selection is not a valid option.
    pub fn from_persisted(
        id: QuestionId,
        session_id: SessionId,
        clue: String,
        options: OptionSet,
        correct: DestinationId,
        status: AnswerStatus,
    ) -> Result<Self, QuestionError> {
        if !options.contains(correct) {
            return Err(QuestionError::CorrectNotInOptions(correct));
        }
        if let AnswerStatus::Answered { selected, .. } = status {
            if !options.contains(selected) {
                return Err(QuestionError::InvalidOption(selected));
            }
        }
        Ok(Self {
            id,
            session_id,
            clue,
            options,
            correct,
            status,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn clue(&self) -> &str {
        &self.clue
    }

    #[must_use]
    pub fn options(&self) -> OptionSet {
        self.options
    }

    #[must_use]
    pub fn correct(&self) -> DestinationId {
        self.correct
    }

    #[must_use]
    pub fn status(&self) -> AnswerStatus {
        self.status
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.status.is_answered()
    }

    /// The correct destination, only once the question has been answered.
    #[must_use]
    pub fn revealed_correct(&self) -> Option<DestinationId> {
        self.is_answered().then_some(self.correct)
    }

    /// Validate a selection without changing state. Returns whether it is correct.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::AlreadyAnswered` or `QuestionError::InvalidOption`.
    pub fn check_answer(&self, selected: DestinationId) -> Result<bool, QuestionError> {
        if self.is_answered() {
            return Err(QuestionError::AlreadyAnswered);
        }
        if !self.options.contains(selected) {
            return Err(QuestionError::InvalidOption(selected));
        }
        Ok(selected == self.correct)
    }

    /// Record a selection. Returns whether it is correct.
    ///
    /// # Errors
    ///
    /// Same as [`SessionQuestion::check_answer`]; the question is unchanged on error.
    pub fn answer(
        &mut self,
        selected: DestinationId,
        answered_at: DateTime<Utc>,
    ) -> Result<bool, QuestionError> {
        let correct = self.check_answer(selected)?;
        self.status = AnswerStatus::Answered {
            selected,
            correct,
            answered_at,
        };
        Ok(correct)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn ids(raw: [u64; OPTION_COUNT]) -> [DestinationId; OPTION_COUNT] {
        raw.map(DestinationId::new)
    }

    fn question() -> SessionQuestion {
        let options = OptionSet::new(ids([3, 1, 4, 2])).unwrap();
        QuestionDraft::new("Eiffel Tower", options, DestinationId::new(1))
            .unwrap()
            .assign_id(QuestionId::new(10), SessionId::new(1))
    }

    #[test]
    fn option_set_rejects_duplicates() {
        let err = OptionSet::new(ids([1, 2, 2, 3])).unwrap_err();
        assert_eq!(err, QuestionError::DuplicateOption(DestinationId::new(2)));
    }

    #[test]
    fn option_set_from_slice_checks_length() {
        let err = OptionSet::from_slice(&[DestinationId::new(1)]).unwrap_err();
        assert_eq!(err, QuestionError::WrongOptionCount(1));
    }

    #[test]
    fn draft_requires_correct_among_options() {
        let options = OptionSet::new(ids([1, 2, 3, 4])).unwrap();
        let err = QuestionDraft::new("clue", options, DestinationId::new(9)).unwrap_err();
        assert_eq!(err, QuestionError::CorrectNotInOptions(DestinationId::new(9)));
    }

    #[test]
    fn answering_twice_is_rejected_and_keeps_first_answer() {
        let mut q = question();
        assert!(q.revealed_correct().is_none());

        let correct = q.answer(DestinationId::new(1), fixed_now()).unwrap();
        assert!(correct);
        assert_eq!(q.revealed_correct(), Some(DestinationId::new(1)));

        let err = q.answer(DestinationId::new(2), fixed_now()).unwrap_err();
        assert_eq!(err, QuestionError::AlreadyAnswered);
        assert!(matches!(
            q.status(),
            AnswerStatus::Answered { selected, correct: true, .. } if selected == DestinationId::new(1)
        ));
    }

    #[test]
    fn selection_outside_options_leaves_question_unanswered() {
        let mut q = question();
        let err = q.answer(DestinationId::new(99), fixed_now()).unwrap_err();
        assert_eq!(err, QuestionError::InvalidOption(DestinationId::new(99)));
        assert!(!q.is_answered());
    }

    #[test]
    fn wrong_selection_is_recorded_as_incorrect() {
        let mut q = question();
        assert!(!q.answer(DestinationId::new(4), fixed_now()).unwrap());
        assert!(q.is_answered());
    }
}
