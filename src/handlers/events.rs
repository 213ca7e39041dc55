use axum::{extract::State, http::StatusCode, Json};

use crate::models::event::{EventResponse, InboundEvent};
use crate::models::order::ErrorResponse;
use crate::AppState;

/// Handler for POST /api/events
/// Feeds one chat event through the conversational flow and returns the
/// replies the chat client should deliver on its behalf.
pub async fn handle_event(
    State(state): State<AppState>,
    Json(payload): Json<InboundEvent>,
) -> Result<(StatusCode, Json<EventResponse>), (StatusCode, Json<ErrorResponse>)> {
    tracing::debug!("Inbound chat event from chat {}", payload.chat_id());

    match state.flow.handle(payload).await {
        Ok(replies) => Ok((StatusCode::OK, Json(EventResponse { replies }))),
        Err(e) => {
            tracing::error!("Failed to process chat event: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to process event: {}", e),
                }),
            ))
        }
    }
}
