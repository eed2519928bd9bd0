use axum::Router;
use shared_types::{
    AppError, AppErrorKind, AuthResponse, AuthUser, CompleteGoalResponse, CreateGoalRequest,
    CreateGoalResponse, GoalNotificationResponse, GoalResponse, LoginRequest, MessageResponse,
    NotificationOutcome, OnboardingCompleteResponse, OnboardingVideoResponse, RegisterRequest,
};
use sqlx::{Pool, Postgres};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::config::NotificationConfig;
use crate::db::AppState;
use crate::health;
use crate::mailer;
use crate::rest;

/// OpenAPI documentation for the API.
#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        rest::auth::register,
        rest::auth::login,
        rest::auth::logout,
        rest::auth::verify_email,
        rest::auth::resend_verification,
        rest::auth::me,
        // Onboarding
        rest::onboarding::video,
        rest::onboarding::complete,
        // Goals
        rest::goal::list_goals,
        rest::goal::create_goal,
        rest::goal::get_goal,
        rest::goal::complete_goal,
        rest::goal::list_goal_notifications,
        // Ops
        rest::admin::generate_recurring,
        // Health
        health::health_check,
    ),
    components(schemas(
        AppError,
        AppErrorKind,
        AuthResponse,
        AuthUser,
        RegisterRequest,
        LoginRequest,
        MessageResponse,
        OnboardingVideoResponse,
        OnboardingCompleteResponse,
        CreateGoalRequest,
        CreateGoalResponse,
        GoalResponse,
        CompleteGoalResponse,
        NotificationOutcome,
        GoalNotificationResponse,
        rest::admin::GenerateRecurringResponse,
        health::HealthResponse,
    )),
    tags(
        (name = "auth", description = "Registration, login, and email verification"),
        (name = "onboarding", description = "Onboarding video gate"),
        (name = "goals", description = "Goal management and completion"),
        (name = "admin", description = "Ops-only maintenance operations"),
        (name = "health", description = "Health check endpoint")
    ),
    info(
        title = "GoalTrack API",
        description = "Goal tracking service with gated onboarding and completion notifications",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;

/// Build the full application router: REST API under `/api/*`, health
/// probe at `/health`, interactive docs at `/docs`. The auth middleware
/// wraps everything so the gate extractors see claims on any route.
pub fn app_router(pool: Pool<Postgres>) -> Router {
    let state = AppState {
        pool: pool.clone(),
        mailer: mailer::mailer_from_env(),
        notifications: NotificationConfig::from_env(),
    };

    Router::new()
        .merge(rest::api_router())
        .route("/health", axum::routing::get(health::health_check))
        .layer(axum::middleware::from_fn_with_state(
            pool,
            crate::auth::middleware::auth_middleware,
        ))
        .with_state(state)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
}
