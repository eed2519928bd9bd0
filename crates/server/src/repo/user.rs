use chrono::{Duration, Utc};
use shared_types::{AppError, User};
use sqlx::{Pool, Postgres};

use crate::auth::jwt;
use crate::error_convert::SqlxErrorExt;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, email_verified_at, onboarding_completed, \
     created_at, updated_at";

/// Insert a new user: unverified, onboarding incomplete.
pub async fn create(
    pool: &Pool<Postgres>,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, AppError> {
    let row = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (name, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING {USER_COLUMNS}
        "#,
    ))
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

pub async fn find_by_id(pool: &Pool<Postgres>, id: i64) -> Result<Option<User>, AppError> {
    let row = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1",
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

pub async fn find_by_email(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, AppError> {
    let row = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1",
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

/// Set `email_verified_at` if not already set. Returns the updated row.
pub async fn mark_verified(pool: &Pool<Postgres>, id: i64) -> Result<Option<User>, AppError> {
    let row = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET email_verified_at = COALESCE(email_verified_at, NOW()), updated_at = NOW()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#,
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

/// Mark onboarding complete. Returns the updated row.
pub async fn complete_onboarding(
    pool: &Pool<Postgres>,
    id: i64,
) -> Result<Option<User>, AppError> {
    let row = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET onboarding_completed = TRUE, updated_at = NOW()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#,
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

// --- Refresh tokens ---

#[derive(Debug, sqlx::FromRow)]
pub struct RefreshTokenRow {
    pub id: i64,
    pub revoked: bool,
}

/// Persist the SHA-256 hash of a freshly issued refresh token.
pub async fn store_refresh_token(
    pool: &Pool<Postgres>,
    user_id: i64,
    token_hash: &str,
) -> Result<(), AppError> {
    let expires_at = Utc::now() + Duration::days(jwt::refresh_token_expiry_days());
    sqlx::query(
        "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(())
}

pub async fn find_refresh_token(
    pool: &Pool<Postgres>,
    token_hash: &str,
    user_id: i64,
) -> Result<Option<RefreshTokenRow>, AppError> {
    let row = sqlx::query_as::<_, RefreshTokenRow>(
        r#"
        SELECT id, revoked FROM refresh_tokens
        WHERE token_hash = $1 AND user_id = $2 AND expires_at > NOW()
        "#,
    )
    .bind(token_hash)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

pub async fn revoke_refresh_token(pool: &Pool<Postgres>, id: i64) -> Result<(), AppError> {
    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(())
}

/// Revoke every refresh token for a user (logout).
pub async fn revoke_all_refresh_tokens(
    pool: &Pool<Postgres>,
    user_id: i64,
) -> Result<(), AppError> {
    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(())
}

// --- Email verification tokens ---

/// Store a verification token hash valid for 24 hours.
pub async fn create_email_verification(
    pool: &Pool<Postgres>,
    user_id: i64,
    token_hash: &str,
) -> Result<(), AppError> {
    let expires_at = Utc::now() + Duration::hours(24);
    sqlx::query(
        "INSERT INTO email_verifications (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(())
}

/// Consume an unused, unexpired verification token. Returns the user id it
/// belongs to, or None if the token is unknown, expired, or already used.
pub async fn consume_email_verification(
    pool: &Pool<Postgres>,
    token_hash: &str,
) -> Result<Option<i64>, AppError> {
    let user_id = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE email_verifications
        SET used_at = NOW()
        WHERE token_hash = $1 AND used_at IS NULL AND expires_at > NOW()
        RETURNING user_id
        "#,
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(user_id)
}
