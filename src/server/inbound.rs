//! Inbound WhatsApp message handling: chat commands, session lookup and
//! delivery of multi-message replies.

use tracing::{info, warn};

use crate::channels::OutboundSender;
use crate::conversation::flag_label;
use crate::session::SessionManager;

pub const HELP_TEXT: &str = "I'm the Linkrs Marokko recruitment assistant. I'll help you prepare \
for your interview by asking a few questions.\n\nCommands:\n- Type 'reset' to start over\n\
- Type 'status' to see your progress";

pub const NO_SESSION_TEXT: &str = "No active session. Send any message to start!";

/// Sent inline when a turn produces no assistant message.
pub const ACKNOWLEDGEMENT: &str = "Thank you for your message.";

pub const ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// Chat commands recognized before a message reaches the dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Reset,
    Help,
    Status,
}

impl Command {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "reset" | "restart" | "start over" => Some(Self::Reset),
            "help" | "info" => Some(Self::Help),
            "status" => Some(Self::Status),
            _ => None,
        }
    }
}

/// Handle one inbound message and return the replies in order.
///
/// A single reply can go back inline. When there are several, send them
/// all with [`deliver_all`] so they arrive in order.
pub async fn handle_whatsapp_message(
    sessions: &SessionManager,
    from: &str,
    body: &str,
    profile_name: &str,
) -> Vec<String> {
    let body = body.trim();

    if let Some(command) = Command::parse(body) {
        info!(from, ?command, "Chat command");
        return run_command(sessions, command, from, profile_name).await;
    }

    let handle = sessions.get_or_create(from, Some(profile_name)).await;
    let mut assistant = handle.assistant.lock().await;
    if handle.created {
        return vec![assistant.last_message().to_string()];
    }
    if body.is_empty() {
        return vec![ACKNOWLEDGEMENT.to_string()];
    }

    let replies = assistant.process_user_input(body).await;
    if replies.is_empty() {
        vec![ACKNOWLEDGEMENT.to_string()]
    } else {
        replies
    }
}

async fn run_command(
    sessions: &SessionManager,
    command: Command,
    from: &str,
    profile_name: &str,
) -> Vec<String> {
    match command {
        Command::Reset => {
            sessions.delete(from).await;
            let handle = sessions.get_or_create(from, Some(profile_name)).await;
            let assistant = handle.assistant.lock().await;
            vec![assistant.last_message().to_string()]
        }
        Command::Help => vec![HELP_TEXT.to_string()],
        Command::Status => {
            let Some(assistant) = sessions.get(from).await else {
                return vec![NO_SESSION_TEXT.to_string()];
            };
            let assistant = assistant.lock().await;
            let data = assistant.collected_data();
            let status = if assistant.is_completed() {
                "✅ Completed"
            } else {
                "📝 In Progress"
            };
            vec![format!(
                "Status: {status}\nMeeting booked: {}\nQuestions answered: {}",
                flag_label(data.meeting_booked),
                data.answers.answered_count()
            )]
        }
    }
}

/// Send replies out-of-band one after another. Failures are logged and do
/// not stop the remaining sends.
pub async fn deliver_all(sender: &dyn OutboundSender, to: &str, replies: &[String]) {
    for reply in replies {
        if let Err(e) = sender.send(to, reply).await {
            warn!(to, channel = sender.name(), error = %e, "Failed to send follow-up message");
        }
    }
}
