// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::AppError,
    handlers::comments::COMMENT_SELECT,
    models::comment::{BulkSetActiveRequest, CommentResponse, ModerationListParams},
};

/// Moderation listing: every comment, inactive ones included, newest first.
/// Admin only.
pub async fn list_comments(
    State(pool): State<SqlitePool>,
    Query(params): Query<ModerationListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!("{} WHERE 1 = 1", COMMENT_SELECT));

    if let Some(post) = params.post {
        qb.push(" AND c.post_id = ").push_bind(post);
    }
    if let Some(author) = params.author {
        qb.push(" AND c.author_id = ").push_bind(author);
    }
    if let Some(is_active) = params.is_active {
        qb.push(" AND c.is_active = ").push_bind(is_active);
    }

    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    qb.push(" ORDER BY c.created_at DESC, c.id DESC LIMIT ")
        .push_bind(limit);

    let comments = qb
        .build_query_as::<CommentResponse>()
        .fetch_all(&pool)
        .await?;

    Ok(Json(comments))
}

/// Bulk (de)activation of comments, one UPDATE in one transaction.
/// Admin only; no ownership check on this path.
/// Deactivation hides a comment from the public projections without touching
/// its replies in storage.
pub async fn bulk_set_active(
    State(pool): State<SqlitePool>,
    Json(payload): Json<BulkSetActiveRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.comment_ids.is_empty() {
        return Ok(Json(json!({ "updated": 0 })));
    }

    let mut tx = pool.begin().await?;

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE comments SET is_active = ");
    qb.push_bind(payload.is_active);
    qb.push(" WHERE id IN (");
    let mut ids = qb.separated(", ");
    for id in &payload.comment_ids {
        ids.push_bind(*id);
    }
    qb.push(")");

    let result = qb.build().execute(&mut *tx).await?;

    tx.commit().await?;

    Ok(Json(json!({ "updated": result.rows_affected() })))
}
