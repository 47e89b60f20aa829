// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{
        ChangePasswordRequest, LoginRequest, MeResponse, RegisterRequest, UpdateProfileRequest,
        User,
    },
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

const USER_COLUMNS: &str =
    "id, email, username, password, first_name, last_name, bio, avatar, role, is_active, \
     created_at, updated_at";

async fn fetch_user(pool: &SqlitePool, id: i64) -> Result<User, AppError> {
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
}

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(pool): State<SqlitePool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;
    let now = Utc::now();

    let sql = format!(
        "INSERT INTO users (email, username, password, first_name, last_name, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?) \
         RETURNING {}",
        USER_COLUMNS
    );

    let user = sqlx::query_as::<_, User>(&sql)
        .bind(&payload.email)
        .bind(&payload.username)
        .bind(&hashed_password)
        .bind(payload.first_name.as_deref().unwrap_or(""))
        .bind(payload.last_name.as_deref().unwrap_or(""))
        .bind(now)
        .bind(now)
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                AppError::Conflict("Email or username already taken".to_string())
            } else {
                tracing::error!("Failed to register user: {:?}", e);
                AppError::from(e)
            }
        })?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a JWT token.
///
/// Verifies the email and password against the database.
/// If valid, signs a JWT token with the user's ID and role.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Login DB error: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let user = user.ok_or(AppError::AuthError("Invalid email or password".to_string()))?;

    let is_valid = verify_password(&payload.password, &user.password)?;

    if !is_valid {
        return Err(AppError::AuthError("Invalid email or password".to_string()));
    }

    if !user.is_active {
        return Err(AppError::AuthError("User account is disabled".to_string()));
    }

    let token = sign_jwt(
        user.id,
        &user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer"
    })))
}

/// Returns the caller's profile with live post and comment counts.
pub async fn me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = fetch_user(&pool, claims.user_id()).await?;

    let posts_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = ?")
        .bind(user.id)
        .fetch_one(&pool)
        .await?;

    let comments_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE author_id = ?")
            .bind(user.id)
            .fetch_one(&pool)
            .await?;

    let full_name = format!("{} {}", user.first_name, user.last_name)
        .trim()
        .to_string();

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        full_name,
        bio: user.bio,
        avatar: user.avatar,
        created_at: user.created_at,
        updated_at: user.updated_at,
        posts_count,
        comments_count,
    }))
}

/// Updates the caller's profile. Only display fields are editable here.
pub async fn update_profile(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id();

    // Make sure the account still exists before touching any field.
    let _user = fetch_user(&pool, user_id).await?;

    if let Some(first_name) = payload.first_name {
        sqlx::query("UPDATE users SET first_name = ? WHERE id = ?")
            .bind(first_name)
            .bind(user_id)
            .execute(&pool)
            .await?;
    }

    if let Some(last_name) = payload.last_name {
        sqlx::query("UPDATE users SET last_name = ? WHERE id = ?")
            .bind(last_name)
            .bind(user_id)
            .execute(&pool)
            .await?;
    }

    if let Some(bio) = payload.bio {
        sqlx::query("UPDATE users SET bio = ? WHERE id = ?")
            .bind(bio)
            .bind(user_id)
            .execute(&pool)
            .await?;
    }

    if let Some(avatar) = payload.avatar {
        sqlx::query("UPDATE users SET avatar = ? WHERE id = ?")
            .bind(avatar)
            .bind(user_id)
            .execute(&pool)
            .await?;
    }

    sqlx::query("UPDATE users SET updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(user_id)
        .execute(&pool)
        .await?;

    let user = fetch_user(&pool, user_id).await?;
    Ok(Json(user))
}

/// Changes the caller's password after verifying the current one.
pub async fn change_password(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = fetch_user(&pool, claims.user_id()).await?;

    if !verify_password(&payload.old_password, &user.password)? {
        return Err(AppError::BadRequest("Old password is incorrect".to_string()));
    }

    let hashed = hash_password(&payload.new_password)?;
    sqlx::query("UPDATE users SET password = ?, updated_at = ? WHERE id = ?")
        .bind(hashed)
        .bind(Utc::now())
        .bind(user.id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "message": "Password updated" })))
}
