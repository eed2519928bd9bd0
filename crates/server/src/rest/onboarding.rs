use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use sqlx::{Pool, Postgres};

use shared_types::{AppError, AuthUser, OnboardingCompleteResponse, OnboardingVideoResponse};

use crate::auth::gates::VerifiedRequired;
use crate::auth::{cookies, jwt};
use crate::config;
use crate::repo;

// ---------------------------------------------------------------------------
// GET /api/onboarding/video
// ---------------------------------------------------------------------------

/// The onboarding video page payload. Users who already finished onboarding
/// get a redirect hint to the goals dashboard instead of rewatching.
#[utoipa::path(
    get,
    path = "/api/onboarding/video",
    responses(
        (status = 200, description = "Onboarding video", body = OnboardingVideoResponse),
        (status = 401, description = "Not authenticated", body = AppError),
        (status = 403, description = "Email not verified", body = AppError)
    ),
    tag = "onboarding"
)]
pub async fn video(
    VerifiedRequired(claims): VerifiedRequired,
) -> Result<Json<OnboardingVideoResponse>, AppError> {
    let already_completed = claims.onboarded;

    Ok(Json(OnboardingVideoResponse {
        video_url: config::onboarding_video_url(),
        already_completed,
        redirect: already_completed.then(|| "/goals".to_string()),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/onboarding/complete
// ---------------------------------------------------------------------------

/// Mark onboarding as watched and unlock the goals dashboard. Idempotent:
/// completing twice is a no-op, not an error. Issues a fresh session so
/// the onboarded flag takes effect without waiting for a token refresh.
#[utoipa::path(
    post,
    path = "/api/onboarding/complete",
    responses(
        (status = 200, description = "Onboarding complete", body = OnboardingCompleteResponse),
        (status = 401, description = "Not authenticated", body = AppError),
        (status = 403, description = "Email not verified", body = AppError)
    ),
    tag = "onboarding"
)]
pub async fn complete(
    State(pool): State<Pool<Postgres>>,
    VerifiedRequired(claims): VerifiedRequired,
) -> Result<(HeaderMap, Json<OnboardingCompleteResponse>), AppError> {
    let user = repo::user::complete_onboarding(&pool, claims.sub)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let access = jwt::create_access_token(user.id, &user.email, user.is_verified(), true)
        .map_err(|e| AppError::internal(format!("Token creation failed: {e}")))?;
    let refresh = jwt::create_refresh_token(user.id, &user.email, user.is_verified(), true)
        .map_err(|e| AppError::internal(format!("Token creation failed: {e}")))?;
    repo::user::store_refresh_token(&pool, user.id, &jwt::hash_token(&refresh)).await?;

    let mut headers = HeaderMap::new();
    cookies::set_auth_cookies(&mut headers, &access, &refresh);

    tracing::info!(user_id = user.id, "Onboarding completed");

    Ok((
        headers,
        Json(OnboardingCompleteResponse {
            user: AuthUser::from(user),
            message: "Onboarding complete. Welcome to your goals dashboard.".to_string(),
        }),
    ))
}
