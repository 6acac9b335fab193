//! In-memory session store with idle expiry.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::classifier::IntentClassifier;
use crate::conversation::{CollectedData, RecruiterAssistant, Templates};
use crate::error::SessionError;

use super::clock::{Clock, SystemClock};

/// Name used when a new session has no profile name.
pub const DEFAULT_FIRST_NAME: &str = "there";

/// Idle minutes after which a session is dropped.
pub const DEFAULT_SESSION_TIMEOUT_MINUTES: i64 = 60;

struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    assistant: Arc<Mutex<RecruiterAssistant>>,
}

/// Result of [`SessionManager::get_or_create`].
#[derive(Clone)]
pub struct SessionHandle {
    pub assistant: Arc<Mutex<RecruiterAssistant>>,
    /// `true` if the session was created by this call and has only sent
    /// the welcome.
    pub created: bool,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    #[serde(rename = "phone_number")]
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub is_completed: bool,
    pub collected_data: CollectedData,
}

/// Owns one [`RecruiterAssistant`] per user.
///
/// Each assistant sits behind its own mutex so turns for one user are
/// serialized while different users proceed independently.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Session>>,
    clock: Arc<dyn Clock>,
    idle_timeout: Duration,
    classifier: Arc<dyn IntentClassifier>,
    templates: Arc<Templates>,
}

impl SessionManager {
    pub fn new(classifier: Arc<dyn IntentClassifier>, templates: Arc<Templates>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock: Arc::new(SystemClock),
            idle_timeout: Duration::minutes(DEFAULT_SESSION_TIMEOUT_MINUTES),
            classifier,
            templates,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Fetch the user's session, creating and starting a new assistant if
    /// there is none. Expired sessions are swept first.
    pub async fn get_or_create(&self, user_id: &str, first_name: Option<&str>) -> SessionHandle {
        self.evict_expired().await;
        let now = self.clock.now();

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(user_id) {
            session.last_activity = now;
            return SessionHandle {
                assistant: Arc::clone(&session.assistant),
                created: false,
            };
        }

        let name = first_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_FIRST_NAME);
        let mut assistant = RecruiterAssistant::new(
            name,
            Arc::clone(&self.classifier),
            Arc::clone(&self.templates),
        );
        assistant.start();

        let assistant = Arc::new(Mutex::new(assistant));
        let session = Session {
            id: Uuid::new_v4(),
            created_at: now,
            last_activity: now,
            assistant: Arc::clone(&assistant),
        };
        info!(user_id, session_id = %session.id, first_name = name, "Created session");
        sessions.insert(user_id.to_string(), session);

        SessionHandle {
            assistant,
            created: true,
        }
    }

    /// Fetch an existing session without creating or touching it.
    pub async fn get(&self, user_id: &str) -> Option<Arc<Mutex<RecruiterAssistant>>> {
        self.sessions
            .read()
            .await
            .get(user_id)
            .map(|s| Arc::clone(&s.assistant))
    }

    /// Remove a session. Returns whether one existed.
    pub async fn delete(&self, user_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(user_id).is_some();
        if removed {
            info!(user_id, "Deleted session");
        }
        removed
    }

    /// Drop sessions idle for longer than the timeout. Returns how many.
    pub async fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let timeout = self.idle_timeout;

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|user_id, s| {
            let keep = now - s.last_activity <= timeout;
            if !keep {
                info!(user_id = %user_id, "Cleaning up expired session");
            }
            keep
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "Session sweep");
        }
        evicted
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn info(&self, user_id: &str) -> Result<SessionInfo, SessionError> {
        let (id, created_at, last_activity, assistant) = {
            let sessions = self.sessions.read().await;
            let s = sessions.get(user_id).ok_or_else(|| SessionError::NotFound {
                user_id: user_id.to_string(),
            })?;
            (s.id, s.created_at, s.last_activity, Arc::clone(&s.assistant))
        };

        let assistant = assistant.lock().await;
        Ok(SessionInfo {
            id,
            user_id: user_id.to_string(),
            created_at,
            last_activity,
            is_completed: assistant.is_completed(),
            collected_data: assistant.collected_data(),
        })
    }
}

/// Spawn a background task that sweeps idle sessions every `every`.
pub fn spawn_eviction_task(
    manager: Arc<SessionManager>,
    every: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            manager.evict_expired().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::classifier::YesNo;
    use crate::session::clock::ManualClock;

    struct AlwaysYes;

    #[async_trait]
    impl IntentClassifier for AlwaysYes {
        async fn classify_yes_no(&self, _text: &str) -> YesNo {
            YesNo::Yes
        }
    }

    fn manager(clock: Arc<ManualClock>) -> SessionManager {
        SessionManager::new(Arc::new(AlwaysYes), Arc::new(Templates::default()))
            .with_clock(clock)
            .with_idle_timeout(Duration::minutes(60))
    }

    const USER: &str = "whatsapp:+212600000001";

    #[tokio::test]
    async fn create_then_reuse() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sessions = manager(clock);

        let first = sessions.get_or_create(USER, Some("Amal")).await;
        assert!(first.created);
        assert!(first.assistant.lock().await.last_message().contains("Amal"));

        let second = sessions.get_or_create(USER, Some("Other")).await;
        assert!(!second.created);
        assert!(Arc::ptr_eq(&first.assistant, &second.assistant));
        assert_eq!(sessions.active_count().await, 1);
    }

    #[tokio::test]
    async fn default_first_name() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sessions = manager(clock);

        let handle = sessions.get_or_create(USER, Some("  ")).await;
        let data = handle.assistant.lock().await.collected_data();
        assert_eq!(data.first_name, DEFAULT_FIRST_NAME);

        let handle = sessions.get_or_create("whatsapp:+2", None).await;
        let data = handle.assistant.lock().await.collected_data();
        assert_eq!(data.first_name, DEFAULT_FIRST_NAME);
    }

    #[tokio::test]
    async fn get_does_not_create() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sessions = manager(clock);
        assert!(sessions.get(USER).await.is_none());
        assert_eq!(sessions.active_count().await, 0);
    }

    #[tokio::test]
    async fn delete_then_recreate_starts_over() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sessions = manager(clock);

        let handle = sessions.get_or_create(USER, Some("Amal")).await;
        handle.assistant.lock().await.process_user_input("yes").await;

        assert!(sessions.delete(USER).await);
        assert!(!sessions.delete(USER).await);

        let fresh = sessions.get_or_create(USER, Some("Amal")).await;
        assert!(fresh.created);
        assert_eq!(fresh.assistant.lock().await.state().transcript().len(), 1);
    }

    #[tokio::test]
    async fn idle_sessions_expire() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sessions = manager(Arc::clone(&clock));

        sessions.get_or_create(USER, None).await;
        clock.advance(Duration::minutes(30));
        sessions.get_or_create("whatsapp:+2", None).await;

        clock.advance(Duration::minutes(31));
        assert_eq!(sessions.evict_expired().await, 1);
        assert!(sessions.get(USER).await.is_none());
        assert!(sessions.get("whatsapp:+2").await.is_some());
    }

    #[tokio::test]
    async fn activity_refreshes_expiry() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sessions = manager(Arc::clone(&clock));

        sessions.get_or_create(USER, None).await;
        clock.advance(Duration::minutes(50));
        assert!(!sessions.get_or_create(USER, None).await.created);
        clock.advance(Duration::minutes(50));

        let handle = sessions.get_or_create(USER, None).await;
        assert!(!handle.created);
    }

    #[tokio::test]
    async fn expired_session_is_recreated() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sessions = manager(Arc::clone(&clock));

        sessions.get_or_create(USER, None).await;
        clock.advance(Duration::minutes(61));
        assert!(sessions.get_or_create(USER, None).await.created);
    }

    #[tokio::test]
    async fn info_reports_progress() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let sessions = manager(Arc::clone(&clock));

        let err = sessions.info(USER).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound { .. }));

        let handle = sessions.get_or_create(USER, Some("Amal")).await;
        handle.assistant.lock().await.process_user_input("yes").await;
        clock.advance(Duration::minutes(2));
        sessions.get_or_create(USER, None).await;

        let info = sessions.info(USER).await.unwrap();
        assert_eq!(info.user_id, USER);
        assert_eq!(info.created_at, start);
        assert_eq!(info.last_activity, start + Duration::minutes(2));
        assert!(!info.is_completed);
        assert_eq!(info.collected_data.meeting_booked, Some(true));

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["phone_number"], USER);
        assert_eq!(json["collected_data"]["first_name"], "Amal");
    }

    #[tokio::test]
    async fn eviction_task_sweeps() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sessions = Arc::new(manager(Arc::clone(&clock)));

        sessions.get_or_create(USER, None).await;
        clock.advance(Duration::minutes(90));

        let handle = spawn_eviction_task(
            Arc::clone(&sessions),
            std::time::Duration::from_millis(10),
        );
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while sessions.active_count().await > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("session was not evicted");
        handle.abort();
    }
}
