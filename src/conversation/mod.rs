//! Scripted recruiter dialogue.
//!
//! A conversation moves through a meeting check, a permission check and a
//! branching questionnaire. [`RecruiterAssistant`] drives it one user turn
//! at a time.

pub mod assistant;
pub mod nodes;
pub mod routers;
pub mod state;
pub mod templates;

pub use assistant::RecruiterAssistant;
pub use nodes::Node;
pub use state::{
    Answers, CollectedData, ConversationState, Phase, QuestionId, Speaker, TranscriptEntry,
    flag_label,
};
pub use templates::{DEFAULT_BOOKING_LINK, Templates};
