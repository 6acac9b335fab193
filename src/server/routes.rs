//! HTTP surface: the Twilio webhook plus health and session inspection.

use std::sync::Arc;

use axum::extract::{Form, Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::inbound::{ERROR_REPLY, deliver_all, handle_whatsapp_message};
use crate::channels::{OutboundSender, twiml};
use crate::error::ChannelError;
use crate::outreach::initiate_conversation;
use crate::session::SessionManager;

pub const SERVICE_NAME: &str = "recruiter-assistant-whatsapp";

const DEFAULT_PROFILE_NAME: &str = "User";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    /// Used when a turn produces more than one reply.
    pub sender: Arc<dyn OutboundSender>,
}

/// Build the router with webhook, health and session routes.
pub fn app_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook/whatsapp", post(whatsapp_webhook))
        .route("/webhook/status", post(status_callback))
        // Twilio sandbox numbers are often configured to POST to the root.
        .route("/", post(whatsapp_webhook))
        .route("/initiate", post(initiate))
        .route("/session/{phone}", get(session_info))
        .route("/sessions", get(session_count))
        .fallback(not_found)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "healthy", "service": SERVICE_NAME}))
}

// ── Webhook ─────────────────────────────────────────────────────────────

/// Form fields Twilio posts for an incoming WhatsApp message.
#[derive(Debug, Deserialize)]
struct InboundForm {
    #[serde(rename = "Body", default)]
    body: String,
    #[serde(rename = "From", default)]
    from: String,
    #[serde(rename = "ProfileName")]
    profile_name: Option<String>,
}

async fn whatsapp_webhook(
    State(state): State<AppState>,
    Form(form): Form<InboundForm>,
) -> impl IntoResponse {
    let profile_name = form
        .profile_name
        .as_deref()
        .unwrap_or(DEFAULT_PROFILE_NAME);
    info!(
        from = %form.from,
        profile_name,
        body = %form.body.trim(),
        "Received WhatsApp message"
    );

    if form.from.trim().is_empty() {
        warn!("Webhook request without a sender");
        return twiml_response(StatusCode::BAD_REQUEST, Some(ERROR_REPLY));
    }

    let replies =
        handle_whatsapp_message(&state.sessions, &form.from, &form.body, profile_name).await;

    // An inline reply leaves only when this response does, so it could
    // arrive after an out-of-band one. Multi-reply turns go out-of-band.
    if let [reply] = replies.as_slice() {
        return twiml_response(StatusCode::OK, Some(reply.as_str()));
    }

    let sender = Arc::clone(&state.sender);
    let to = form.from.clone();
    tokio::spawn(async move {
        deliver_all(sender.as_ref(), &to, &replies).await;
    });
    twiml_response(StatusCode::OK, None)
}

fn twiml_response(status: StatusCode, message: Option<&str>) -> axum::response::Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/xml")],
        twiml(message),
    )
        .into_response()
}

/// Form fields of a Twilio delivery status callback.
#[derive(Debug, Deserialize)]
struct StatusForm {
    #[serde(rename = "MessageSid", default)]
    message_sid: String,
    #[serde(rename = "MessageStatus", default)]
    message_status: String,
}

async fn status_callback(Form(form): Form<StatusForm>) -> impl IntoResponse {
    match form.message_status.as_str() {
        "failed" | "undelivered" => {
            warn!(sid = %form.message_sid, status = %form.message_status, "Message failed to deliver")
        }
        _ => info!(sid = %form.message_sid, status = %form.message_status, "Message status"),
    }
    StatusCode::NO_CONTENT
}

// ── Outreach ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct InitiateRequest {
    pub first_name: String,
    pub phone_number: String,
    #[serde(default)]
    pub restart: bool,
}

async fn initiate(
    State(state): State<AppState>,
    Json(req): Json<InitiateRequest>,
) -> impl IntoResponse {
    let result = initiate_conversation(
        &state.sessions,
        state.sender.as_ref(),
        &req.first_name,
        &req.phone_number,
        req.restart,
    )
    .await;

    match result {
        Ok(outcome) => {
            let mut body = serde_json::json!(outcome);
            body["success"] = serde_json::Value::Bool(true);
            (StatusCode::OK, Json(body))
        }
        Err(e) => {
            warn!(phone = %req.phone_number, error = %e, "Failed to initiate conversation");
            let status = match e {
                ChannelError::InvalidMessage(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            };
            (
                status,
                Json(serde_json::json!({"success": false, "error": e.to_string()})),
            )
        }
    }
}

// ── Sessions ────────────────────────────────────────────────────────────

async fn session_info(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> impl IntoResponse {
    let user_id = if phone.starts_with("whatsapp:") {
        phone
    } else {
        format!("whatsapp:{phone}")
    };

    match state.sessions.info(&user_id).await {
        Ok(session) => (
            StatusCode::OK,
            Json(serde_json::json!({"success": true, "session": session})),
        ),
        Err(e) => {
            info!(error = %e, "Session lookup failed");
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"success": false, "error": "Session not found"})),
            )
        }
    }
}

async fn session_count(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({"active_sessions": state.sessions.active_count().await}))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "Endpoint not found"})),
    )
}
