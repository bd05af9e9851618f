//! Route definitions and router setup
//!
//! Health endpoint plus the chat-platform webhook. Command dispatch lives
//! here: `/start` subscribes the sender, `/proposals` answers the on-demand
//! "what is active right now" query.

use crate::batcher::batch;
use crate::delivery::deliver;
use crate::registry::Proposal;
use crate::state::SharedState;
use crate::telegram::{parse_command, Command, Message, Update};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::{error, info, Level};

/// Separator between summary lines in one outbound message
const SUMMARY_SEPARATOR: &str = "\n\n";

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .propagate_x_request_id();

    Router::new()
        .route("/health", get(health_check))
        .route("/webhook", post(telegram_webhook))
        .layer(middleware)
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<SharedState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "message": "Relay is running fine.",
        "proposals": state.registry.count().await,
        "subscribers": state.subscribers.count().await,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Webhook entry point for chat platform updates.
///
/// Always answers 200: a failed command is the relay's problem to log, and a
/// non-2xx reply would only make the platform redeliver the update.
async fn telegram_webhook(
    State(state): State<SharedState>,
    Json(update): Json<Update>,
) -> StatusCode {
    tracing::debug!("Received update {}", update.update_id);
    if let Some(message) = update.message {
        handle_message(state, message).await;
    }
    StatusCode::OK
}

async fn handle_message(state: SharedState, message: Message) {
    let Some(text) = message.text.as_deref() else {
        return;
    };
    match parse_command(text) {
        Some(Command::Start) => handle_start(state, &message).await,
        Some(Command::Proposals) => handle_proposals(state, &message).await,
        None => {}
    }
}

/// `/start`: subscribe the sender. Private chats only; group chats are
/// silently ignored. Subscribing twice is a no-op.
async fn handle_start(state: SharedState, message: &Message) {
    if !message.chat.is_private() {
        return;
    }
    let chat_id = message.chat.id;
    if state.subscribers.subscribe(chat_id).await {
        info!("New subscriber - {}", chat_id);
        if let Err(e) = state.persist().await {
            error!("Failed to persist relay state: {}", e);
        }
    }

    let text = "Successfully subscribed for governance proposal notifications";
    if let Err(e) = state.messenger.send_message(chat_id, text).await {
        error!("Failed to confirm subscription to chat {}: {}", chat_id, e);
    }
}

/// `/proposals`: list proposals active in the current epoch, to the
/// requesting chat only.
async fn handle_proposals(state: SharedState, message: &Message) {
    let chat_id = message.chat.id;

    let current_epoch = match state.source.current_epoch().await {
        Ok(epoch) => epoch,
        Err(e) => {
            error!("Failed to get current epoch: {}", e);
            if let Err(e) = state
                .messenger
                .send_message(chat_id, "Failed to get current epoch")
                .await
            {
                error!("Failed to report epoch error to chat {}: {}", chat_id, e);
            }
            return;
        }
    };

    let active = state.registry.active_at(current_epoch).await;
    let chunks = if active.is_empty() {
        vec![format!(
            "There are no active proposals in the current ({}) epoch",
            current_epoch
        )]
    } else {
        let mut items = Vec::with_capacity(active.len() + 1);
        items.push(format!(
            "Current epoch: {}; Active proposals:",
            current_epoch
        ));
        items.extend(active.iter().map(Proposal::summary_line));
        batch(&items, state.max_message_len, SUMMARY_SEPARATOR)
    };

    deliver(state.messenger.clone(), &[chat_id], &chunks).await;
}
