//! Phase nodes: the fixed catalogue of state-mutating dialogue steps.
//!
//! Every node appends one audit-log entry and, except `EndSuccess`, exactly
//! one assistant message. Question nodes also move `current_question`.

use tracing::debug;

use super::state::{ConversationState, QuestionId};
use super::templates::Templates;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Welcome,
    MeetingUnclear,
    SendBookingLink,
    PermissionQuestion,
    PermissionUnclear,
    PersuasionThenEnd,
    EndSuccess,
    Question(QuestionId),
    FinalMessage,
}

impl Node {
    /// Run the node against `state`.
    pub fn apply(self, state: &mut ConversationState, templates: &Templates) {
        debug!(node = ?self, "Running conversation node");
        match self {
            Self::Welcome => {
                let msg = templates.welcome_for(state.first_name());
                state.push_assistant(msg);
                state.push_log("Sent welcome + meeting question");
            }
            Self::MeetingUnclear => {
                state.push_assistant(templates.meeting_unclear.as_str());
                state.push_log("Meeting unclear → asked again");
            }
            Self::SendBookingLink => {
                state.push_assistant(templates.booking_message());
                state.push_log("Meeting not booked → sent link");
            }
            Self::PermissionQuestion => {
                state.push_assistant(templates.permission_question.as_str());
                state.push_log("Asked permission");
            }
            Self::PermissionUnclear => {
                state.push_assistant(templates.permission_unclear.as_str());
                state.push_log("Permission unclear → asked again");
            }
            Self::PersuasionThenEnd => {
                state.push_assistant(templates.persuasion.as_str());
                state.push_log("Permission denied → persuasion sent");
            }
            Self::EndSuccess => {
                state.push_log("Permission granted - starting questions");
            }
            Self::Question(id) => {
                state.push_assistant(templates.question(id));
                state.push_log(format!("Asked: {}", id.label()));
                state.set_current_question(Some(id));
            }
            Self::FinalMessage => {
                state.push_assistant(templates.final_message.as_str());
                state.push_log("Sent final thank you message");
                state.set_current_question(None);
            }
        }
    }
}
