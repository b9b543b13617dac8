//! Notification endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use ripple_common::{AppError, AppResult};
use ripple_core::NotificationView;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState};

/// List notifications query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsQuery {
    /// Maximum results (default: 50, max: 100)
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Cursor for pagination (before this ID)
    pub until_id: Option<String>,
}

const fn default_limit() -> u64 {
    50
}

/// Get notifications for the authenticated user, newest first.
async fn get_notifications(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListNotificationsQuery>,
) -> AppResult<Json<Vec<NotificationView>>> {
    let limit = query.limit.min(100);
    let notifications = state
        .notification_service
        .list(&user.id, limit, query.until_id.as_deref())
        .await?;

    Ok(Json(notifications))
}

/// Mark-as-read response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsReadResponse {
    pub success: bool,
    pub count: u64,
}

/// Mark the given notifications as read for the caller.
///
/// Idempotent: already-read ids stay read; ids belonging to other users are
/// ignored. The body must carry a `notificationIds` array.
async fn mark_as_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> AppResult<Json<MarkAsReadResponse>> {
    let ids = body
        .get("notificationIds")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| AppError::BadRequest("Invalid notification IDs".to_string()))?;

    let ids: Vec<String> = ids
        .iter()
        .filter_map(|v| v.as_str().map(std::string::ToString::to_string))
        .collect();

    let count = state
        .notification_service
        .mark_as_read(&user.id, &ids)
        .await?;

    Ok(Json(MarkAsReadResponse {
        success: true,
        count,
    }))
}

/// Unread count response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub count: u64,
}

/// Get the unread notification count.
///
/// Degrades to zero on store failure rather than erroring; the badge is
/// decoration, not truth.
async fn unread_count(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<UnreadCountResponse>> {
    let count = state.notification_service.count_unread(&user.id).await;
    Ok(Json(UnreadCountResponse { count }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_notifications).patch(mark_as_read))
        .route("/unread-count", get(unread_count))
}
