//! Serializable payloads returned by `GameEngine`.
//!
//! Plain data: no formatting beyond the option label, so any transport can
//! marshal them as-is.

use chrono::{DateTime, Utc};
use serde::Serialize;

use globetrotter_core::model::{
    AnswerStatus, Destination, DestinationId, Handle, QuestionId, Session, SessionId,
    SessionQuestion, SessionState,
};

/// One multiple-choice entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub id: DestinationId,
    pub city: String,
    pub country: String,
    pub label: String,
}

impl OptionView {
    #[must_use]
    pub fn from_destination(destination: &Destination) -> Self {
        Self {
            id: destination.id(),
            city: destination.city().to_string(),
            country: destination.country().to_string(),
            label: destination.label(),
        }
    }
}

/// The next unanswered question with the correct answer withheld.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextQuestion {
    pub session_id: SessionId,
    pub question_id: QuestionId,
    /// 1-based position within the session.
    pub position: u32,
    pub total_questions: u32,
    pub clue: String,
    pub options: Vec<OptionView>,
    pub has_next: bool,
}

/// Outcome of a single submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerResult {
    pub question_id: QuestionId,
    pub is_correct: bool,
    pub correct_destination_id: DestinationId,
    pub city: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fun_fact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trivia: Option<String>,
}

/// Per-question line in a session result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub clue: String,
    pub options: Vec<DestinationId>,
    /// Unset until the question is answered.
    pub correct_destination_id: Option<DestinationId>,
    pub selected_destination_id: Option<DestinationId>,
    pub is_correct: Option<bool>,
    pub answered_at: Option<DateTime<Utc>>,
}

impl QuestionOutcome {
    #[must_use]
    pub fn from_question(question: &SessionQuestion) -> Self {
        let (selected, is_correct, answered_at) = match question.status() {
            AnswerStatus::Unanswered => (None, None, None),
            AnswerStatus::Answered {
                selected,
                correct,
                answered_at,
            } => (Some(selected), Some(correct), Some(answered_at)),
        };
        Self {
            question_id: question.id(),
            clue: question.clue().to_string(),
            options: question.options().ids().to_vec(),
            correct_destination_id: question.revealed_correct(),
            selected_destination_id: selected,
            is_correct,
            answered_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionResult {
    pub session_id: SessionId,
    pub state: SessionState,
    pub total_questions: u32,
    pub answered: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub questions: Vec<QuestionOutcome>,
}

impl SessionResult {
    #[must_use]
    pub fn new(session: &Session, questions: &[SessionQuestion]) -> Self {
        let counters = session.counters();
        Self {
            session_id: session.id(),
            state: session.state(),
            total_questions: session.total_questions(),
            answered: counters.answered(),
            correct: counters.correct(),
            incorrect: counters.incorrect(),
            questions: questions.iter().map(QuestionOutcome::from_question).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummaryView {
    pub session_id: SessionId,
    pub handle: Handle,
    pub state: SessionState,
    pub total_questions: u32,
    pub answered: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub created_at: DateTime<Utc>,
    pub image_url: String,
}
