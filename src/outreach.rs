//! Proactive outreach: open a conversation by sending the welcome first.

use serde::Serialize;
use tracing::info;

use crate::channels::{OutboundSender, normalize_whatsapp_number};
use crate::error::ChannelError;
use crate::session::SessionManager;

/// Result of a successful [`initiate_conversation`].
#[derive(Debug, Clone, Serialize)]
pub struct OutreachOutcome {
    pub phone_number: String,
    pub first_name: String,
    pub message_sid: String,
    pub status: String,
    pub message_sent: String,
}

/// Send the welcome message to a candidate who has not written yet.
///
/// With `restart`, any existing session for the number is discarded first.
/// Otherwise an existing session is reused and its latest assistant message
/// is sent again.
pub async fn initiate_conversation(
    sessions: &SessionManager,
    sender: &dyn OutboundSender,
    first_name: &str,
    phone: &str,
    restart: bool,
) -> Result<OutreachOutcome, ChannelError> {
    let first_name = first_name.trim();
    if first_name.is_empty() {
        return Err(ChannelError::InvalidMessage("First name is required".into()));
    }
    if phone.trim().is_empty() {
        return Err(ChannelError::InvalidMessage("Phone number is required".into()));
    }

    let phone_number = normalize_whatsapp_number(phone);
    if restart && sessions.delete(&phone_number).await {
        info!(phone_number = %phone_number, "Restarting existing session");
    }

    let handle = sessions.get_or_create(&phone_number, Some(first_name)).await;
    let message = handle.assistant.lock().await.last_message().to_string();

    let receipt = sender.send(&phone_number, &message).await?;
    info!(
        phone_number = %phone_number,
        sid = %receipt.sid,
        status = %receipt.status,
        "Initiated conversation"
    );

    Ok(OutreachOutcome {
        phone_number,
        first_name: first_name.to_string(),
        message_sid: receipt.sid,
        status: receipt.status,
        message_sent: message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::channels::SendReceipt;
    use crate::classifier::{IntentClassifier, YesNo};
    use crate::conversation::Templates;
    use crate::server::handle_whatsapp_message;

    struct AlwaysYes;

    #[async_trait]
    impl IntentClassifier for AlwaysYes {
        async fn classify_yes_no(&self, _text: &str) -> YesNo {
            YesNo::Yes
        }
    }

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl OutboundSender for RecordingSender {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, to: &str, body: &str) -> Result<SendReceipt, ChannelError> {
            if self.fail {
                return Err(ChannelError::AuthFailed {
                    name: "recording".into(),
                    reason: "bad credentials".into(),
                });
            }
            self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
            Ok(SendReceipt {
                sid: "SM42".into(),
                status: "queued".into(),
            })
        }
    }

    fn sessions() -> SessionManager {
        SessionManager::new(Arc::new(AlwaysYes), Arc::new(Templates::default()))
    }

    #[tokio::test]
    async fn sends_welcome_to_normalized_number() {
        let sessions = sessions();
        let sender = RecordingSender::default();

        let outcome = initiate_conversation(&sessions, &sender, "Amal", "+212 600-000-001", false)
            .await
            .unwrap();
        assert_eq!(outcome.phone_number, "whatsapp:+212600000001");
        assert_eq!(outcome.message_sid, "SM42");
        assert_eq!(outcome.status, "queued");
        assert_eq!(outcome.message_sent, Templates::default().welcome_for("Amal"));

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "whatsapp:+212600000001");
    }

    #[tokio::test]
    async fn candidate_reply_is_routed_not_rewelcomed() {
        let sessions = sessions();
        let sender = RecordingSender::default();
        initiate_conversation(&sessions, &sender, "Amal", "212600000001", false)
            .await
            .unwrap();

        let replies =
            handle_whatsapp_message(&sessions, "whatsapp:+212600000001", "yes", "Amal W.").await;
        assert_eq!(replies, vec![Templates::default().permission_question]);
    }

    #[tokio::test]
    async fn restart_discards_progress() {
        let sessions = sessions();
        let sender = RecordingSender::default();
        let number = "whatsapp:+212600000001";
        initiate_conversation(&sessions, &sender, "Amal", number, false)
            .await
            .unwrap();
        handle_whatsapp_message(&sessions, number, "yes", "Amal").await;

        let kept = initiate_conversation(&sessions, &sender, "Amal", number, false)
            .await
            .unwrap();
        assert_eq!(kept.message_sent, Templates::default().permission_question);

        let fresh = initiate_conversation(&sessions, &sender, "Amal", number, true)
            .await
            .unwrap();
        assert_eq!(fresh.message_sent, Templates::default().welcome_for("Amal"));
        let info = sessions.info(number).await.unwrap();
        assert_eq!(info.collected_data.meeting_booked, None);
    }

    #[tokio::test]
    async fn rejects_missing_fields() {
        let sessions = sessions();
        let sender = RecordingSender::default();

        let err = initiate_conversation(&sessions, &sender, " ", "+1", false)
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::InvalidMessage(_)));

        let err = initiate_conversation(&sessions, &sender, "Amal", "", false)
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::InvalidMessage(_)));
        assert_eq!(sessions.active_count().await, 0);
    }

    #[tokio::test]
    async fn send_failure_is_returned() {
        let sessions = sessions();
        let sender = RecordingSender {
            fail: true,
            ..Default::default()
        };
        let err = initiate_conversation(&sessions, &sender, "Amal", "+1", false)
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::AuthFailed { .. }));
    }
}
