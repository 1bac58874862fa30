mod catalogue;
mod identity;
mod ids;
mod question;
mod result;
mod settings;

pub use catalogue::{Catalogue, CatalogueError};
pub use identity::Identity;
pub use ids::{QuestionId, UserId};
pub use question::{QuestionDraft, QuestionError, QuestionRecord, ValidationPattern};
pub use result::ResultRecord;
pub use settings::{
    DEFAULT_MAX_POINTS, DEFAULT_MIN_POINTS, DEFAULT_TICK_MS, DEFAULT_TIME_LIMIT_MS,
    DEFAULT_TOTAL_ROUNDS, QuizSettings, SettingsError,
};
