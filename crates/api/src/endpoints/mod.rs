//! API endpoints.

use axum::{Router, routing::get};

use crate::middleware::AppState;

pub mod notifications;
pub mod posts;

/// Build the API router.
#[must_use]
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/posts", posts::router())
        .nest("/notifications", notifications::router())
        .route("/search", get(posts::search))
        .route("/users/{id}/liked", get(posts::liked_posts))
}
