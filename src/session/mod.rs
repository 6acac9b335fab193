//! Per-user conversation sessions keyed by WhatsApp number.

pub mod clock;
pub mod manager;

pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::{
    DEFAULT_FIRST_NAME, DEFAULT_SESSION_TIMEOUT_MINUTES, SessionHandle, SessionInfo, SessionManager,
    spawn_eviction_task,
};
