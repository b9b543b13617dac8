//! API middleware.

#![allow(missing_docs)]

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use ripple_core::{
    CommentService, LikeService, NotificationService, PostService, UserService,
};

use crate::streaming::StreamingState;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub post_service: PostService,
    pub like_service: LikeService,
    pub comment_service: CommentService,
    pub notification_service: NotificationService,
    pub streaming: StreamingState,
}

/// Authentication middleware.
///
/// Resolves a bearer token to a user and stashes it in request extensions;
/// endpoints that require identity reject via the `AuthUser` extractor.
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
