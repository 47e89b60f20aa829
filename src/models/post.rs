use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'posts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,

    /// 'draft' or 'published'. Drafts are invisible through every public read path.
    pub status: String,

    pub views_count: i64,
    pub author_id: i64,
    pub category_id: Option<i64>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Post detail with author display info and a live active-comment count.
#[derive(Debug, Serialize, FromRow)]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status: String,
    pub views_count: i64,
    pub author_id: i64,
    pub author_username: String,
    pub category_id: Option<i64>,
    pub comments_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// The post header returned with a comment thread.
#[derive(Debug, Serialize, FromRow)]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
}

/// DTO for creating a new post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title length must be between 1 and 200 chars"
    ))]
    pub title: String,

    #[validate(length(
        min = 1,
        max = 50000,
        message = "Content length must be between 1 and 50000 chars"
    ))]
    pub content: String,

    /// 'draft' or 'published'; defaults to 'published'.
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub category_id: Option<i64>,
}

/// DTO for updating a post. Fields are optional; the slug never changes.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 50000))]
    pub content: Option<String>,
    pub status: Option<String>,
    pub category_id: Option<i64>,
}

/// Query parameters for listing posts.
#[derive(Debug, Deserialize)]
pub struct PostListParams {
    /// Cursor for pagination: the created_at timestamp of the last post in the previous page.
    pub cursor: Option<chrono::DateTime<chrono::Utc>>,

    /// Number of items to return (default: 20, max: 100).
    pub limit: Option<i64>,

    /// Filter by category id.
    pub category: Option<i64>,

    /// Filter by author id.
    pub author: Option<i64>,

    /// Search keyword for title match.
    pub q: Option<String>,
}
