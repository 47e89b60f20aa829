use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::post::PostSummary;

/// Represents the 'comments' table in the database.
///
/// `parent_id` is a self-reference: NULL marks a root comment attached directly
/// to the post, non-NULL marks a reply to another comment on the same post.
/// `is_active` is a soft-delete flag; inactive comments stay in storage but are
/// hidden from every public projection.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub is_active: bool,
    pub post_id: i64,
    pub author_id: i64,
    pub parent_id: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a new comment.
/// The author is never taken from the body; it is bound from the caller's token.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    pub post_id: i64,

    /// Optional: the ID of the comment being replied to.
    /// Must reference a comment on the same post.
    #[serde(default)]
    pub parent_id: Option<i64>,

    #[validate(length(
        min = 1,
        max = 2000,
        message = "Comment must be between 1 and 2000 characters"
    ))]
    pub content: String,
}

/// DTO for editing a comment. Only the content is mutable through this path.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(
        min = 1,
        max = 2000,
        message = "Comment must be between 1 and 2000 characters"
    ))]
    pub content: String,
}

/// A comment as served by the read projections, with author display info,
/// a live count of its active direct replies, and a reply marker.
#[derive(Debug, Serialize, FromRow)]
pub struct CommentResponse {
    pub id: i64,
    pub content: String,
    pub is_active: bool,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub author_full_name: String,
    pub author_avatar: Option<String>,
    pub parent_id: Option<i64>,
    pub replies_count: i64,
    pub is_reply: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A comment plus one eagerly-loaded level of direct replies.
/// Deeper levels are fetched on demand through the replies endpoint.
#[derive(Debug, Serialize)]
pub struct CommentDetailResponse {
    #[serde(flatten)]
    pub comment: CommentResponse,
    pub replies: Vec<CommentResponse>,
}

/// The full thread for one published post.
#[derive(Debug, Serialize)]
pub struct PostThreadResponse {
    pub post: PostSummary,
    pub comments: Vec<CommentDetailResponse>,
    /// Live count of all active comments on the post, roots and replies alike.
    pub comment_count: i64,
}

/// One comment and its direct active replies.
#[derive(Debug, Serialize)]
pub struct CommentRepliesResponse {
    pub parent_comment: CommentResponse,
    pub replies: Vec<CommentResponse>,
    pub replies_count: i64,
}

/// Query parameters for the general comment listing.
#[derive(Debug, Deserialize)]
pub struct CommentListParams {
    /// Filter by post id.
    pub post: Option<i64>,

    /// Filter by author id.
    pub author: Option<i64>,

    /// Filter by parent comment id.
    pub parent: Option<i64>,

    /// Free-text search over the comment content.
    pub search: Option<String>,

    /// 'created_at', '-created_at', 'updated_at' or '-updated_at'.
    /// Unrecognized values fall back to the default '-created_at'.
    pub ordering: Option<String>,

    /// Number of items to return (default: 50, max: 200).
    pub limit: Option<i64>,
}

/// Query parameters for the caller's own comments. Unlike the public listing,
/// visibility is caller-controlled: authors may list their deactivated comments.
#[derive(Debug, Deserialize)]
pub struct MyCommentListParams {
    pub post: Option<i64>,
    pub parent: Option<i64>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub limit: Option<i64>,
}

/// Query parameters for the moderation listing (includes inactive comments).
#[derive(Debug, Deserialize)]
pub struct ModerationListParams {
    pub post: Option<i64>,
    pub author: Option<i64>,
    pub is_active: Option<bool>,
    pub limit: Option<i64>,
}

/// DTO for bulk (de)activation of comments. Administrative scope only.
#[derive(Debug, Deserialize)]
pub struct BulkSetActiveRequest {
    pub comment_ids: Vec<i64>,
    pub is_active: bool,
}

/// Maps an `ordering` query value onto a SQL ORDER BY clause.
///
/// Only timestamp fields are orderable; anything else falls back to newest-first.
/// Ties are broken by id so projections stay deterministic when timestamps
/// collide within one write burst.
pub fn order_clause(ordering: Option<&str>) -> &'static str {
    match ordering {
        Some("created_at") => "c.created_at ASC, c.id ASC",
        Some("updated_at") => "c.updated_at ASC, c.id ASC",
        Some("-updated_at") => "c.updated_at DESC, c.id DESC",
        _ => "c.created_at DESC, c.id DESC",
    }
}
