use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{AppError, AuthResponse, AuthUser, LoginRequest, MessageResponse, RegisterRequest};

use crate::auth::gates::AuthRequired;
use crate::auth::{cookies, jwt, password};
use crate::config::NotificationConfig;
use crate::error_convert::ValidateRequest;
use crate::mailer::{self, Mailer};
use crate::repo;

// ---------------------------------------------------------------------------
// POST /api/auth/register
// ---------------------------------------------------------------------------

/// Register a new account and start a session. The account starts behind
/// the email verification gate; a verification link is emailed best-effort.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, session started", body = AuthResponse),
        (status = 409, description = "Email already registered", body = AppError),
        (status = 422, description = "Validation failed", body = AppError)
    ),
    tag = "auth"
)]
pub async fn register(
    State(pool): State<Pool<Postgres>>,
    State(mailer): State<std::sync::Arc<dyn Mailer>>,
    State(config): State<NotificationConfig>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), AppError> {
    body.validate_request()?;

    if repo::user::find_by_email(&pool, &body.email).await?.is_some() {
        return Err(AppError::conflict("An account with this email already exists"));
    }

    let password_hash = password::hash_password(&body.password)
        .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

    let user = repo::user::create(&pool, &body.name, &body.email, &password_hash).await?;

    send_verification_email(&pool, mailer.as_ref(), &config, &user).await;

    let headers = start_session(&pool, &user).await?;

    tracing::info!(user_id = user.id, email = %user.email, "User registered");

    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse {
            user: AuthUser::from(user),
            message: "Registration successful. Check your email for a verification link."
                .to_string(),
        }),
    ))
}

// ---------------------------------------------------------------------------
// POST /api/auth/login
// ---------------------------------------------------------------------------

/// Authenticate with email and password.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session started", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = AppError),
        (status = 429, description = "Too many attempts", body = AppError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(pool): State<Pool<Postgres>>,
    Json(body): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), AppError> {
    body.validate_request()?;

    // One generic message for both unknown email and wrong password, so the
    // endpoint does not confirm which addresses have accounts.
    let invalid = || AppError::unauthorized("Invalid email or password.");

    let user = repo::user::find_by_email(&pool, &body.email)
        .await?
        .ok_or_else(invalid)?;

    let ok = password::verify_password(&body.password, &user.password_hash)
        .map_err(|e| AppError::internal(format!("Password verification failed: {e}")))?;
    if !ok {
        return Err(invalid());
    }

    let headers = start_session(&pool, &user).await?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok((
        headers,
        Json(AuthResponse {
            user: AuthUser::from(user),
            message: "Login successful.".to_string(),
        }),
    ))
}

// ---------------------------------------------------------------------------
// POST /api/auth/logout
// ---------------------------------------------------------------------------

/// End the session: revoke every refresh token and clear both cookies.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session ended", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = AppError)
    ),
    tag = "auth"
)]
pub async fn logout(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
) -> Result<(HeaderMap, Json<MessageResponse>), AppError> {
    repo::user::revoke_all_refresh_tokens(&pool, claims.sub).await?;

    let mut headers = HeaderMap::new();
    cookies::clear_auth_cookies(&mut headers);

    tracing::info!(user_id = claims.sub, "User logged out");

    Ok((
        headers,
        Json(MessageResponse {
            message: "Logged out.".to_string(),
        }),
    ))
}

// ---------------------------------------------------------------------------
// GET /api/auth/verify-email
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct VerifyEmailParams {
    pub token: String,
}

/// Verify an email address from the emailed link. Consumes the token and
/// issues a fresh session so the verified flag takes effect immediately.
#[utoipa::path(
    get,
    path = "/api/auth/verify-email",
    params(VerifyEmailParams),
    responses(
        (status = 200, description = "Email verified", body = AuthResponse),
        (status = 400, description = "Token invalid, expired, or already used", body = AppError)
    ),
    tag = "auth"
)]
pub async fn verify_email(
    State(pool): State<Pool<Postgres>>,
    Query(params): Query<VerifyEmailParams>,
) -> Result<(HeaderMap, Json<AuthResponse>), AppError> {
    let token_hash = jwt::hash_token(&params.token);

    let user_id = repo::user::consume_email_verification(&pool, &token_hash)
        .await?
        .ok_or_else(|| {
            AppError::bad_request("This verification link is invalid or has expired.")
        })?;

    let user = repo::user::mark_verified(&pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let headers = start_session(&pool, &user).await?;

    tracing::info!(user_id = user.id, "Email verified");

    Ok((
        headers,
        Json(AuthResponse {
            user: AuthUser::from(user),
            message: "Email verified successfully.".to_string(),
        }),
    ))
}

// ---------------------------------------------------------------------------
// POST /api/auth/resend-verification
// ---------------------------------------------------------------------------

/// Send a fresh verification link to the logged-in user.
#[utoipa::path(
    post,
    path = "/api/auth/resend-verification",
    responses(
        (status = 200, description = "Verification email sent", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = AppError),
        (status = 409, description = "Already verified", body = AppError)
    ),
    tag = "auth"
)]
pub async fn resend_verification(
    State(pool): State<Pool<Postgres>>,
    State(mailer): State<std::sync::Arc<dyn Mailer>>,
    State(config): State<NotificationConfig>,
    AuthRequired(claims): AuthRequired,
) -> Result<Json<MessageResponse>, AppError> {
    let user = repo::user::find_by_id(&pool, claims.sub)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if user.is_verified() {
        return Err(AppError::conflict("This email address is already verified."));
    }

    send_verification_email(&pool, mailer.as_ref(), &config, &user).await;

    Ok(Json(MessageResponse {
        message: "Verification email sent.".to_string(),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/auth/me
// ---------------------------------------------------------------------------

/// The current user, with gate states.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = AuthUser),
        (status = 401, description = "Not authenticated", body = AppError)
    ),
    tag = "auth"
)]
pub async fn me(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
) -> Result<Json<AuthUser>, AppError> {
    let user = repo::user::find_by_id(&pool, claims.sub)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(AuthUser::from(user)))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Mint an access/refresh pair for `user`, persist the refresh hash, and
/// return headers that set both cookies. Gate flags are snapshotted from
/// the user row at mint time.
async fn start_session(
    pool: &Pool<Postgres>,
    user: &shared_types::User,
) -> Result<HeaderMap, AppError> {
    let verified = user.is_verified();
    let onboarded = user.onboarding_completed;

    let access = jwt::create_access_token(user.id, &user.email, verified, onboarded)
        .map_err(|e| AppError::internal(format!("Token creation failed: {e}")))?;
    let refresh = jwt::create_refresh_token(user.id, &user.email, verified, onboarded)
        .map_err(|e| AppError::internal(format!("Token creation failed: {e}")))?;

    repo::user::store_refresh_token(pool, user.id, &jwt::hash_token(&refresh)).await?;

    let mut headers = HeaderMap::new();
    cookies::set_auth_cookies(&mut headers, &access, &refresh);
    Ok(headers)
}

/// Issue a verification token and email the link. Best-effort: a mail or
/// storage fault logs a warning and the registration still succeeds; the
/// user can ask for a resend.
async fn send_verification_email(
    pool: &Pool<Postgres>,
    mailer: &dyn Mailer,
    config: &NotificationConfig,
    user: &shared_types::User,
) {
    let raw_token = Uuid::new_v4().to_string();

    if let Err(err) =
        repo::user::create_email_verification(pool, user.id, &jwt::hash_token(&raw_token)).await
    {
        tracing::warn!(user_id = user.id, error = %err, "Failed to store verification token");
        return;
    }

    let base_url = crate::config::app_base_url();
    let html = mailer::verification_html(&raw_token, &base_url, &config.app_name);
    let subject = format!("Verify your {} email address", config.app_name);

    match mailer.send_email(&user.email, &subject, &html).await {
        Ok(()) => {
            tracing::info!(user_id = user.id, "Verification email sent");
        }
        Err(detail) => {
            tracing::warn!(user_id = user.id, detail = %detail, "Verification email failed");
        }
    }
}
