#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod identity;
pub mod reporting;
pub mod sampler;
pub mod sessions;
pub mod timer;

pub use quiz_core::Clock;
pub use sessions as session;

pub use app_services::{AppServices, ResultBackend};
pub use error::{AppServicesError, IdentityError, SamplerError, SessionError};
pub use identity::{IdentityProvider, LocalIdentityProvider};
pub use reporting::Reporter;
pub use sampler::QuestionSampler;
pub use timer::{RoundTimer, TickOutcome, Ticker, TimerState};

pub use sessions::{
    Feedback, FeedbackKind, RoundOutcome, RoundPrompt, RoundState, SessionController,
    SessionEvent, SessionExit, SessionHandle, SessionLoop, SessionLoopService, SessionPhase,
    SessionProgress, SessionState, SessionUpdate,
};
