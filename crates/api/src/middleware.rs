//! API middleware.

#![allow(missing_docs)]

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use campus_core::{ChatService, UserService};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: ChatService,
    pub user_service: UserService,
}

/// Authentication middleware.
///
/// Resolves a bearer token to a user and attaches it to the request
/// extensions; handlers decide whether an identity is required.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(user) = state.user_service.authenticate_by_token(token).await
    {
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}
