//! Post endpoints: feed, CRUD, and the like/comment/repost mutations.
//!
//! Every mutation applies its store writes and notification creation before
//! the realtime publish; the publish happens inside the services and is
//! best-effort, so a relay outage never turns a committed mutation into an
//! HTTP error.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use ripple_common::{AppError, AppResult};
use ripple_core::{
    ActorView, CommentDetail, CreateCommentInput, CreatePostInput, PostDetail,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
};

/// A post as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<ActorView>,
    pub like_count: i32,
    pub comment_count: i32,
    pub repost_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repost_of: Option<Box<PostResponse>>,
    pub created_at: String,
}

impl From<PostDetail> for PostResponse {
    fn from(detail: PostDetail) -> Self {
        Self {
            id: detail.post.id,
            title: detail.post.title,
            content: detail.post.content,
            author: detail.author.as_ref().map(Into::into),
            like_count: detail.post.like_count,
            comment_count: detail.post.comment_count,
            repost_count: detail.post.repost_count,
            repost_of: detail.repost_of.map(|d| Box::new(Self::from(*d))),
            created_at: detail.post.created_at.to_rfc3339(),
        }
    }
}

/// A feed entry: a post, or a repost wrapper with its original embedded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItemResponse {
    #[serde(rename = "type")]
    pub item_type: &'static str,
    pub created_at: String,
    pub post: PostResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reposted_by: Option<ActorView>,
}

impl From<PostDetail> for FeedItemResponse {
    fn from(detail: PostDetail) -> Self {
        let is_repost = detail.repost_of.is_some();
        let reposted_by = if is_repost {
            detail.author.as_ref().map(Into::into)
        } else {
            None
        };
        Self {
            item_type: if is_repost { "repost" } else { "post" },
            created_at: detail.post.created_at.to_rfc3339(),
            post: detail.into(),
            reposted_by,
        }
    }
}

/// A comment as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub content: String,
    pub post_id: String,
    pub author: ActorView,
    pub created_at: String,
}

impl From<CommentDetail> for CommentResponse {
    fn from(detail: CommentDetail) -> Self {
        Self {
            id: detail.comment.id,
            content: detail.comment.content,
            post_id: detail.comment.post_id,
            author: (&detail.author).into(),
            created_at: detail.comment.created_at.to_rfc3339(),
        }
    }
}

/// Feed pagination query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    /// Maximum results (default: 20, max: 100)
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Cursor for pagination (before this ID)
    pub until_id: Option<String>,
}

const fn default_limit() -> u64 {
    20
}

/// Get the feed, newest first.
async fn get_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> AppResult<Json<Vec<FeedItemResponse>>> {
    let limit = query.limit.min(100);
    let feed = state
        .post_service
        .feed(limit, query.until_id.as_deref())
        .await?;

    Ok(Json(feed.into_iter().map(Into::into).collect()))
}

/// Create a new post.
async fn create_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePostInput>,
) -> AppResult<Json<PostResponse>> {
    let post = state.post_service.create(&user.id, input).await?;
    let detail = state.post_service.get_detail(&post.id).await?;

    Ok(Json(detail.into()))
}

/// Get a single post.
///
/// For an authenticated caller the body carries a `liked` flag sourced from
/// the like table; the store is authoritative, not a feed projection.
async fn get_post(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let detail = state.post_service.get_detail(&id).await?;

    let mut body = serde_json::to_value(PostResponse::from(detail))
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if let Some(user) = user
        && let serde_json::Value::Object(ref mut map) = body
    {
        let liked = state.like_service.has_liked(&user.id, &id).await?;
        map.insert("liked".to_string(), json!(liked));
    }

    Ok(Json(body))
}

/// Toggle a like on a post.
///
/// Responds with `{liked, likeCount, ...post}`. The counter is the value
/// read back from the store after the write.
async fn toggle_like(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let toggle = state.like_service.toggle(&user.id, &id).await?;
    let detail = state.post_service.get_detail(&toggle.post.id).await?;

    let mut body = serde_json::to_value(PostResponse::from(detail))
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if let serde_json::Value::Object(ref mut map) = body {
        map.insert("liked".to_string(), json!(toggle.liked));
        map.insert("likeCount".to_string(), json!(toggle.post.like_count));
    }

    Ok(Json(body))
}

/// Append a comment to a post.
async fn create_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CreateCommentInput>,
) -> AppResult<Json<CommentResponse>> {
    let detail = state.comment_service.create(&user.id, &id, input).await?;

    Ok(Json(detail.into()))
}

/// Get a post's comments, creation order.
async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<CommentResponse>>> {
    // 404 for a missing post rather than an empty list
    state.post_service.get_detail(&id).await?;
    let comments = state.comment_service.list(&id).await?;

    Ok(Json(comments.into_iter().map(Into::into).collect()))
}

/// A repost descriptor: the original with reposter attribution.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepostResponse {
    #[serde(rename = "type")]
    pub item_type: &'static str,
    pub created_at: String,
    pub post: PostResponse,
    pub reposted_by: ActorView,
}

/// Repost a post.
///
/// Idempotent: reposting the same original twice returns the existing
/// descriptor with HTTP 200, never a duplicate.
async fn create_repost(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<RepostResponse>> {
    let outcome = state.post_service.repost(&user.id, &id).await?;

    Ok(Json(RepostResponse {
        item_type: "repost",
        created_at: outcome.repost.created_at.to_rfc3339(),
        post: outcome.original.into(),
        reposted_by: (&outcome.reposted_by).into(),
    }))
}

/// Search query.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Substring to match against title and content.
    #[serde(default)]
    pub q: String,
    /// Maximum results (default: 20, max: 100)
    #[serde(default = "default_limit")]
    pub limit: u64,
}

/// Naive substring search over posts.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<FeedItemResponse>>> {
    let limit = query.limit.min(100);
    let results = state.post_service.search(&query.q, limit).await?;

    Ok(Json(results.into_iter().map(Into::into).collect()))
}

/// Ids of posts the given user has liked.
///
/// The store is authoritative for the client's liked-set; it is never
/// re-derived from a feed projection.
pub async fn liked_posts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<String>>> {
    let ids = state.like_service.liked_post_ids(&id).await?;
    Ok(Json(ids))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_feed).post(create_post))
        .route("/{id}", get(get_post))
        .route("/{id}/like", post(toggle_like))
        .route("/{id}/comment", post(create_comment))
        .route("/{id}/comments", get(list_comments))
        .route("/{id}/repost", post(create_repost))
}
