// src/handlers/posts.rs

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
        category::{Category, CreateCategoryRequest},
        post::{CreatePostRequest, Post, PostListParams, PostResponse, UpdatePostRequest},
    },
    utils::{html::clean_html, jwt::Claims, slug::unique_slug},
};

const POST_SELECT: &str = "SELECT \
     p.id, p.title, p.slug, p.content, p.status, p.views_count, p.author_id, \
     u.username AS author_username, \
     p.category_id, \
     (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id AND c.is_active = 1) AS comments_count, \
     p.created_at, p.updated_at \
     FROM posts p \
     JOIN users u ON u.id = p.author_id";

fn validate_status(status: &str) -> Result<(), AppError> {
    if status != "draft" && status != "published" {
        return Err(AppError::BadRequest(
            "status must be 'draft' or 'published'".to_string(),
        ));
    }
    Ok(())
}

async fn fetch_post_response(pool: &SqlitePool, id: i64) -> Result<Option<PostResponse>, AppError> {
    let sql = format!("{} WHERE p.id = ?", POST_SELECT);
    Ok(sqlx::query_as::<_, PostResponse>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

/// Looks up the raw post row, drafts included; mutation paths start here so
/// authors can keep working on unpublished posts.
async fn fetch_post_row(pool: &SqlitePool, id: i64) -> Result<Post, AppError> {
    sqlx::query_as::<_, Post>(
        "SELECT id, title, slug, content, status, views_count, author_id, category_id, \
         created_at, updated_at \
         FROM posts WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Post not found".to_string()))
}

/// Create a new post. The slug is generated from the title server-side,
/// suffixed on collision so it stays unique.
pub async fn create_post(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let status = payload.status.as_deref().unwrap_or("published");
    validate_status(status)?;

    if let Some(category_id) = payload.category_id {
        sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE id = ?")
            .bind(category_id)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::BadRequest("Unknown category".to_string()))?;
    }

    let content = clean_html(&payload.content);

    let base = slug::slugify(&payload.title);
    let taken: Vec<String> =
        sqlx::query_scalar("SELECT slug FROM posts WHERE slug = ? OR slug LIKE ?")
            .bind(&base)
            .bind(format!("{}-%", base))
            .fetch_all(&pool)
            .await?;
    let slug = unique_slug(&payload.title, &taken);

    let now = Utc::now();
    let post_id: i64 = sqlx::query_scalar(
        "INSERT INTO posts (title, slug, content, status, author_id, category_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
         RETURNING id",
    )
    .bind(&payload.title)
    .bind(&slug)
    .bind(&content)
    .bind(status)
    .bind(claims.user_id())
    .bind(payload.category_id)
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create post: {:?}", e);
        AppError::from(e)
    })?;

    let post = fetch_post_response(&pool, post_id)
        .await?
        .ok_or(AppError::InternalServerError("Created post vanished".to_string()))?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// List published posts, newest first, with cursor-based pagination and
/// category/author/title filters.
pub async fn list_posts(
    State(pool): State<SqlitePool>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("{} WHERE p.status = 'published'", POST_SELECT));

    if let Some(cursor) = params.cursor {
        qb.push(" AND p.created_at < ").push_bind(cursor);
    }
    if let Some(category) = params.category {
        qb.push(" AND p.category_id = ").push_bind(category);
    }
    if let Some(author) = params.author {
        qb.push(" AND p.author_id = ").push_bind(author);
    }
    if let Some(q) = params.q.as_deref().filter(|q| !q.is_empty()) {
        qb.push(" AND p.title LIKE ").push_bind(format!("%{}%", q));
    }

    qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
        .push_bind(limit);

    let posts = qb.build_query_as::<PostResponse>().fetch_all(&pool).await?;

    Ok(Json(posts))
}

/// Get a single published post by ID and count the view.
pub async fn get_post(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query(
        "UPDATE posts SET views_count = views_count + 1 WHERE id = ? AND status = 'published'",
    )
    .bind(id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    let post = fetch_post_response(&pool, id)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

/// Update a post. Author only. The slug never changes once assigned.
pub async fn update_post(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let existing = fetch_post_row(&pool, id).await?;

    if existing.author_id != claims.user_id() {
        return Err(AppError::Forbidden(
            "Only the post author may modify it".to_string(),
        ));
    }

    if let Some(status) = payload.status.as_deref() {
        validate_status(status)?;
    }
    if let Some(category_id) = payload.category_id {
        sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE id = ?")
            .bind(category_id)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::BadRequest("Unknown category".to_string()))?;
    }

    if let Some(title) = payload.title {
        sqlx::query("UPDATE posts SET title = ? WHERE id = ?")
            .bind(title)
            .bind(id)
            .execute(&pool)
            .await?;
    }
    if let Some(content) = payload.content {
        sqlx::query("UPDATE posts SET content = ? WHERE id = ?")
            .bind(clean_html(&content))
            .bind(id)
            .execute(&pool)
            .await?;
    }
    if let Some(status) = payload.status {
        sqlx::query("UPDATE posts SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&pool)
            .await?;
    }
    if let Some(category_id) = payload.category_id {
        sqlx::query("UPDATE posts SET category_id = ? WHERE id = ?")
            .bind(category_id)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    sqlx::query("UPDATE posts SET updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(id)
        .execute(&pool)
        .await?;

    let post = fetch_post_response(&pool, id)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

/// Delete a post. Author only. Comments cascade away with the row.
pub async fn delete_post(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let existing = fetch_post_row(&pool, id).await?;

    if existing.author_id != claims.user_id() {
        return Err(AppError::Forbidden(
            "Only the post author may delete it".to_string(),
        ));
    }

    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(existing.id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// List all categories, name-ordered.
pub async fn list_categories(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT id, name, slug, description, created_at FROM categories ORDER BY name ASC",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(categories))
}

/// Create a category. Admin only.
pub async fn create_category(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let taken: Vec<String> = sqlx::query_scalar("SELECT slug FROM categories")
        .fetch_all(&pool)
        .await?;
    let slug = unique_slug(&payload.name, &taken);

    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (name, slug, description, created_at) \
         VALUES (?, ?, ?, ?) \
         RETURNING id, name, slug, description, created_at",
    )
    .bind(&payload.name)
    .bind(&slug)
    .bind(payload.description.as_deref().unwrap_or(""))
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            AppError::Conflict(format!("Category '{}' already exists", payload.name))
        } else {
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(category)))
}
