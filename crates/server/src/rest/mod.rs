pub mod admin;
pub mod auth;
pub mod goal;
pub mod onboarding;

use axum::{
    routing::{get, patch, post},
    Router,
};
use std::time::Duration;

use crate::db::AppState;
use crate::rate_limit::{rate_limit_middleware, RateLimitState};

/// Build the REST API router. Login gets its own fixed-window rate limit;
/// everything else is throttled upstream if at all.
pub fn api_router() -> Router<AppState> {
    let login_limiter = RateLimitState::new(5, Duration::from_secs(60));

    let login = Router::new()
        .route("/api/auth/login", post(auth::login))
        .layer(axum::middleware::from_fn_with_state(
            login_limiter,
            rate_limit_middleware,
        ));

    Router::new()
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/verify-email", get(auth::verify_email))
        .route("/api/auth/resend-verification", post(auth::resend_verification))
        .route("/api/auth/me", get(auth::me))
        .merge(login)
        // Onboarding
        .route("/api/onboarding/video", get(onboarding::video))
        .route("/api/onboarding/complete", post(onboarding::complete))
        // Goals
        .route("/api/goals", get(goal::list_goals))
        .route("/api/goals", post(goal::create_goal))
        .route("/api/goals/{id}", get(goal::get_goal))
        .route("/api/goals/{id}/complete", patch(goal::complete_goal))
        .route("/api/goals/{id}/notifications", get(goal::list_goal_notifications))
        // Ops
        .route("/api/admin/generate-recurring", post(admin::generate_recurring))
}
