mod engine;
mod plan;
mod view;

pub use engine::GameEngine;
pub use view::{
    AnswerResult, NextQuestion, OptionView, QuestionOutcome, SessionResult, SessionSummaryView,
};
