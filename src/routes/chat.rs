use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Router,
};

use crate::db;
use crate::error::{AppError, AppResult};
use crate::extract::{AuthUser, Json, Path};
use crate::models::{
    AccountBrief, ChatMessage, ChatMessageDetails, SendMessageRequest, UnreadCount,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/send", post(send_message))
        .route("/conversation/{other_id}", get(conversation))
        .route("/unread", get(unread_count))
        .route("/read/{message_id}", put(mark_read))
        .route("/participants", get(participants))
}

async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<ChatMessage>)> {
    let message = req.message.as_deref().map(str::trim).unwrap_or_default();
    let image = req.image.as_deref().map(str::trim).filter(|i| !i.is_empty());
    if message.is_empty() && image.is_none() {
        return Err(AppError::bad_request("Message or image is required"));
    }

    if !db::accounts::exists(&state.pool, req.receiver_id).await? {
        return Err(AppError::not_found("Receiver not found"));
    }

    let sent = db::chat::insert(&state.pool, user.id, req.receiver_id, message, image).await?;
    tracing::debug!(message_id = sent.id, from = user.id, to = req.receiver_id, "Message sent");

    Ok((StatusCode::CREATED, Json(sent)))
}

async fn conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(other_id): Path<i64>,
) -> AppResult<Json<Vec<ChatMessageDetails>>> {
    Ok(Json(
        db::chat::conversation(&state.pool, user.id, other_id).await?,
    ))
}

async fn unread_count(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<UnreadCount>> {
    let unread_count = db::chat::unread_count(&state.pool, user.id).await?;
    Ok(Json(UnreadCount { unread_count }))
}

async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(message_id): Path<i64>,
) -> AppResult<Json<ChatMessage>> {
    db::chat::mark_read(&state.pool, message_id, user.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Message not found"))
}

async fn participants(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<AccountBrief>>> {
    Ok(Json(db::chat::participants(&state.pool, user.id).await?))
}
