mod controller;
mod feedback;
mod progress;
mod state;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{RoundOutcome, SessionController};
pub use feedback::{Feedback, FeedbackKind};
pub use progress::{RoundPrompt, SessionProgress};
pub use state::{RoundState, SessionPhase, SessionState};
pub use workflow::{
    SessionEvent, SessionExit, SessionHandle, SessionLoop, SessionLoopService, SessionUpdate,
};
