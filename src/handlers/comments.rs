// src/handlers/comments.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        comment::{
            Comment, CommentDetailResponse, CommentListParams, CommentRepliesResponse,
            CommentResponse, CreateCommentRequest, MyCommentListParams, PostThreadResponse,
            UpdateCommentRequest, order_clause,
        },
        post::PostSummary,
    },
    utils::{html::clean_html, jwt::Claims},
};

/// Shared projection: a comment row joined with its author's display fields,
/// a live count of active direct replies, and the reply marker.
pub(crate) const COMMENT_SELECT: &str = "SELECT \
     c.id, c.content, c.is_active, c.post_id, c.author_id, \
     u.username AS author_username, \
     TRIM(u.first_name || ' ' || u.last_name) AS author_full_name, \
     u.avatar AS author_avatar, \
     c.parent_id, \
     (SELECT COUNT(*) FROM comments r WHERE r.parent_id = c.id AND r.is_active = 1) AS replies_count, \
     (c.parent_id IS NOT NULL) AS is_reply, \
     c.created_at, c.updated_at \
     FROM comments c \
     JOIN users u ON u.id = c.author_id";

/// Author-or-read-only: reads are open to everyone, mutations only to the
/// comment's author. Administrators go through the bulk moderation path
/// instead of bypassing this check.
fn ensure_author(comment: &Comment, claims: &Claims) -> Result<(), AppError> {
    if comment.author_id != claims.user_id() {
        return Err(AppError::Forbidden(
            "Only the comment author may modify it".to_string(),
        ));
    }
    Ok(())
}

/// Looks up an active comment row, the shape every mutation starts from.
async fn fetch_active_comment(pool: &SqlitePool, id: i64) -> Result<Comment, AppError> {
    sqlx::query_as::<_, Comment>(
        "SELECT id, content, is_active, post_id, author_id, parent_id, created_at, updated_at \
         FROM comments WHERE id = ? AND is_active = 1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Comment not found".to_string()))
}

async fn fetch_comment_response(
    pool: &SqlitePool,
    id: i64,
    active_only: bool,
) -> Result<Option<CommentResponse>, AppError> {
    let sql = if active_only {
        format!("{} WHERE c.id = ? AND c.is_active = 1", COMMENT_SELECT)
    } else {
        format!("{} WHERE c.id = ?", COMMENT_SELECT)
    };

    Ok(sqlx::query_as::<_, CommentResponse>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

async fn fetch_active_replies(
    pool: &SqlitePool,
    parent_id: i64,
) -> Result<Vec<CommentResponse>, AppError> {
    let sql = format!(
        "{} WHERE c.parent_id = ? AND c.is_active = 1 ORDER BY c.created_at ASC, c.id ASC",
        COMMENT_SELECT
    );

    Ok(sqlx::query_as::<_, CommentResponse>(&sql)
        .bind(parent_id)
        .fetch_all(pool)
        .await?)
}

/// Create a new comment (or a reply, when `parent_id` is set).
///
/// The post must exist and be published; a reply's parent must belong to the
/// same post. The author always comes from the caller's token, never from the
/// request body. Validation happens before any write, and the checks plus the
/// insert run inside one transaction.
pub async fn create_comment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let content = clean_html(&payload.content);
    if content.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Comment content cannot be empty".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    // 1. The post must exist and be published.
    let _post: i64 = sqlx::query_scalar("SELECT id FROM posts WHERE id = ? AND status = 'published'")
        .bind(payload.post_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    // 2. A reply's parent must exist on the same post. Parents always pre-exist
    //    the reply, so the relation stays an acyclic forest.
    if let Some(parent_id) = payload.parent_id {
        let parent_post_id: i64 =
            sqlx::query_scalar("SELECT post_id FROM comments WHERE id = ?")
                .bind(parent_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppError::BadRequest(
                    "Parent comment does not exist".to_string(),
                ))?;

        if parent_post_id != payload.post_id {
            return Err(AppError::BadRequest(
                "Parent comment must belong to the same post".to_string(),
            ));
        }
    }

    let now = Utc::now();
    let new_id: i64 = sqlx::query_scalar(
        "INSERT INTO comments (content, post_id, author_id, parent_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?) \
         RETURNING id",
    )
    .bind(&content)
    .bind(payload.post_id)
    .bind(claims.user_id())
    .bind(payload.parent_id)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    let comment = fetch_comment_response(&pool, new_id, false)
        .await?
        .ok_or(AppError::InternalServerError(
            "Created comment vanished".to_string(),
        ))?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// List active comments, filterable by post, author and parent, with free-text
/// search over the content and timestamp ordering.
pub async fn list_comments(
    State(pool): State<SqlitePool>,
    Query(params): Query<CommentListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("{} WHERE c.is_active = 1", COMMENT_SELECT));

    if let Some(post) = params.post {
        qb.push(" AND c.post_id = ").push_bind(post);
    }
    if let Some(author) = params.author {
        qb.push(" AND c.author_id = ").push_bind(author);
    }
    if let Some(parent) = params.parent {
        qb.push(" AND c.parent_id = ").push_bind(parent);
    }
    if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND c.content LIKE ")
            .push_bind(format!("%{}%", search));
    }

    qb.push(" ORDER BY ")
        .push(order_clause(params.ordering.as_deref()));

    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    qb.push(" LIMIT ").push_bind(limit);

    let comments = qb
        .build_query_as::<CommentResponse>()
        .fetch_all(&pool)
        .await?;

    Ok(Json(comments))
}

/// The caller's own comments. Visibility is caller-controlled here: pass
/// `is_active=false` to list deactivated comments, omit it to see everything.
pub async fn my_comments(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<MyCommentListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("{} WHERE c.author_id = ", COMMENT_SELECT));
    qb.push_bind(claims.user_id());

    if let Some(post) = params.post {
        qb.push(" AND c.post_id = ").push_bind(post);
    }
    if let Some(parent) = params.parent {
        qb.push(" AND c.parent_id = ").push_bind(parent);
    }
    if let Some(is_active) = params.is_active {
        qb.push(" AND c.is_active = ").push_bind(is_active);
    }
    if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND c.content LIKE ")
            .push_bind(format!("%{}%", search));
    }

    qb.push(" ORDER BY ")
        .push(order_clause(params.ordering.as_deref()));

    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    qb.push(" LIMIT ").push_bind(limit);

    let comments = qb
        .build_query_as::<CommentResponse>()
        .fetch_all(&pool)
        .await?;

    Ok(Json(comments))
}

/// Fetch one active comment. Root comments carry their direct active replies
/// (oldest first); a reply carries an empty list - deeper levels go through
/// the replies endpoint.
pub async fn get_comment(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let comment = fetch_comment_response(&pool, id, true)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    let replies = if comment.parent_id.is_none() {
        fetch_active_replies(&pool, comment.id).await?
    } else {
        Vec::new()
    };

    Ok(Json(CommentDetailResponse { comment, replies }))
}

/// Edit a comment's content. Author only; inactive comments are not editable.
pub async fn update_comment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let content = clean_html(&payload.content);
    if content.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Comment content cannot be empty".to_string(),
        ));
    }

    let existing = fetch_active_comment(&pool, id).await?;
    ensure_author(&existing, &claims)?;

    sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
        .bind(&content)
        .bind(Utc::now())
        .bind(existing.id)
        .execute(&pool)
        .await?;

    let comment = fetch_comment_response(&pool, id, true)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    Ok(Json(comment))
}

/// Delete a comment. Author only. This is irreversible and removes every
/// descendant reply along with it (the row cascade); use deactivation through
/// moderation when the thread should survive.
pub async fn delete_comment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let existing = fetch_active_comment(&pool, id).await?;
    ensure_author(&existing, &claims)?;

    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(existing.id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Direct active replies of one comment, oldest first.
///
/// The parent is resolved even when it has been deactivated: hiding a comment
/// must not strand its replies, so they stay reachable through its id here.
pub async fn comment_replies(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let parent_comment = fetch_comment_response(&pool, id, false)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    let replies = fetch_active_replies(&pool, parent_comment.id).await?;
    let replies_count = replies.len() as i64;

    Ok(Json(CommentRepliesResponse {
        parent_comment,
        replies,
        replies_count,
    }))
}

/// The comment thread of one published post: root comments newest first, each
/// with its direct active replies oldest first, plus the live active-comment
/// count for the whole post.
pub async fn post_thread(
    State(pool): State<SqlitePool>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = sqlx::query_as::<_, PostSummary>(
        "SELECT id, title, slug FROM posts WHERE id = ? AND status = 'published'",
    )
    .bind(post_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Post not found".to_string()))?;

    let roots_sql = format!(
        "{} WHERE c.post_id = ? AND c.parent_id IS NULL AND c.is_active = 1 \
         ORDER BY c.created_at DESC, c.id DESC",
        COMMENT_SELECT
    );
    let roots = sqlx::query_as::<_, CommentResponse>(&roots_sql)
        .bind(post_id)
        .fetch_all(&pool)
        .await?;

    // One query for every active reply on the post, grouped by parent in
    // memory. Replies whose parent is not a root stay reachable through the
    // replies endpoint but are not materialized here.
    let replies_sql = format!(
        "{} WHERE c.post_id = ? AND c.parent_id IS NOT NULL AND c.is_active = 1 \
         ORDER BY c.created_at ASC, c.id ASC",
        COMMENT_SELECT
    );
    let replies = sqlx::query_as::<_, CommentResponse>(&replies_sql)
        .bind(post_id)
        .fetch_all(&pool)
        .await?;

    let mut by_parent: HashMap<i64, Vec<CommentResponse>> = HashMap::new();
    for reply in replies {
        if let Some(parent_id) = reply.parent_id {
            by_parent.entry(parent_id).or_default().push(reply);
        }
    }

    let comments = roots
        .into_iter()
        .map(|root| {
            let replies = by_parent.remove(&root.id).unwrap_or_default();
            CommentDetailResponse {
                comment: root,
                replies,
            }
        })
        .collect();

    let comment_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = ? AND is_active = 1")
            .bind(post_id)
            .fetch_one(&pool)
            .await?;

    Ok(Json(PostThreadResponse {
        post,
        comments,
        comment_count,
    }))
}
