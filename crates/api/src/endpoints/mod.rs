//! API endpoints.

mod chat;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/communities/{community_id}/chat", chat::community_router())
        .nest("/chat/messages", chat::message_router())
}
