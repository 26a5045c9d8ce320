#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod game;
pub mod images;
pub mod random;
pub mod user_service;

pub use globetrotter_core::Clock;

pub use app_services::{AppServices, ensure_seeded, load_catalog};
pub use error::{AppServicesError, ErrorKind, GameError, UserServiceError};
pub use game::{
    AnswerResult, GameEngine, NextQuestion, OptionView, QuestionOutcome, SessionResult,
    SessionSummaryView,
};
pub use images::{FixedImageLookup, ImageLookup, ImageLookupConfig, PexelsImageLookup};
pub use random::SharedRng;
pub use user_service::UserService;
