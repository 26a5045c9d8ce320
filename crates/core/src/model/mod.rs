mod destination;
mod ids;
mod question;
mod session;
mod user;

pub use ids::{DestinationId, QuestionId, SessionId, UserId};

pub use destination::{Catalog, Destination, DestinationDraft, DestinationError};
pub use question::{AnswerStatus, OPTION_COUNT, OptionSet, QuestionDraft, QuestionError, SessionQuestion};
pub use session::{
    QUESTIONS_PER_SESSION, Session, SessionCounters, SessionRecordError, SessionState,
};
pub use user::{Handle, HandleError, MAX_HANDLE_CHARS, User};
