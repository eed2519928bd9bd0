use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    AppError, CompleteGoalResponse, CreateGoalRequest, CreateGoalResponse, Goal,
    GoalNotificationResponse, GoalResponse, GoalSchedule, GoalStatus,
};

use crate::auth::gates::OnboardedRequired;
use crate::completion;
use crate::db::AppState;
use crate::error_convert::ValidateRequest;
use crate::repo;

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct GoalListParams {
    /// Filter by status: active, completed, or cancelled.
    pub status: Option<String>,
}

// ---------------------------------------------------------------------------
// GET /api/goals
// ---------------------------------------------------------------------------

/// List the current user's goals, newest first.
#[utoipa::path(
    get,
    path = "/api/goals",
    params(GoalListParams),
    responses(
        (status = 200, description = "Goal list", body = Vec<GoalResponse>),
        (status = 400, description = "Unknown status filter", body = AppError),
        (status = 401, description = "Not authenticated", body = AppError),
        (status = 403, description = "Gate not passed", body = AppError)
    ),
    tag = "goals"
)]
pub async fn list_goals(
    State(pool): State<Pool<Postgres>>,
    OnboardedRequired(claims): OnboardedRequired,
    Query(params): Query<GoalListParams>,
) -> Result<Json<Vec<GoalResponse>>, AppError> {
    let status = match params.status.as_deref() {
        None => None,
        Some(raw) => Some(GoalStatus::parse(raw).ok_or_else(|| {
            AppError::bad_request(format!(
                "Invalid status filter: {}. Valid values: {}",
                raw,
                shared_types::GOAL_STATUSES.join(", ")
            ))
        })?),
    };

    let goals = repo::goal::list_by_user(&pool, claims.sub, status).await?;
    let response: Vec<GoalResponse> = goals.into_iter().map(GoalResponse::from).collect();
    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// POST /api/goals
// ---------------------------------------------------------------------------

/// Create a goal. A plain request makes one goal; a recurring request makes
/// a template plus its pre-scheduled instances in a single transaction.
#[utoipa::path(
    post,
    path = "/api/goals",
    request_body = CreateGoalRequest,
    responses(
        (status = 201, description = "Goal created", body = CreateGoalResponse),
        (status = 401, description = "Not authenticated", body = AppError),
        (status = 403, description = "Gate not passed", body = AppError),
        (status = 422, description = "Validation failed", body = AppError)
    ),
    tag = "goals"
)]
pub async fn create_goal(
    State(pool): State<Pool<Postgres>>,
    OnboardedRequired(claims): OnboardedRequired,
    Json(body): Json<CreateGoalRequest>,
) -> Result<(StatusCode, Json<CreateGoalResponse>), AppError> {
    body.validate_request()?;
    let schedule = body.schedule(Utc::now().date_naive())?;

    let (goal, scheduled) = match schedule {
        GoalSchedule::OneOff { end_date } => {
            let goal = repo::goal::create_one_off(
                &pool,
                claims.sub,
                &body.title,
                body.description.as_deref(),
                end_date,
            )
            .await?;
            (goal, 1)
        }
        GoalSchedule::Recurring {
            rule,
            start_date,
            count,
        } => {
            repo::goal::create_recurring_batch(
                &pool,
                claims.sub,
                &body.title,
                body.description.as_deref(),
                rule,
                start_date,
                count,
            )
            .await?
        }
    };

    tracing::info!(
        goal_id = %goal.id,
        user_id = claims.sub,
        scheduled = scheduled,
        "Goal created"
    );

    let message = if scheduled > 1 {
        format!("Goal created with {scheduled} scheduled occurrences.")
    } else {
        "Goal created.".to_string()
    };

    Ok((
        StatusCode::CREATED,
        Json(CreateGoalResponse {
            goal: GoalResponse::from(goal),
            instances_scheduled: scheduled,
            message,
        }),
    ))
}

// ---------------------------------------------------------------------------
// GET /api/goals/{id}
// ---------------------------------------------------------------------------

/// Fetch one of the current user's goals.
#[utoipa::path(
    get,
    path = "/api/goals/{id}",
    params(("id" = String, Path, description = "Goal UUID")),
    responses(
        (status = 200, description = "Goal found", body = GoalResponse),
        (status = 403, description = "Goal belongs to another user", body = AppError),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "goals"
)]
pub async fn get_goal(
    State(pool): State<Pool<Postgres>>,
    OnboardedRequired(claims): OnboardedRequired,
    Path(id): Path<String>,
) -> Result<Json<GoalResponse>, AppError> {
    let goal = load_owned_goal(&pool, claims.sub, &id).await?;
    Ok(Json(GoalResponse::from(goal)))
}

// ---------------------------------------------------------------------------
// PATCH /api/goals/{id}/complete
// ---------------------------------------------------------------------------

/// Mark a goal as completed and send the completion notification. The
/// response always reports what happened to the notification; a mail
/// failure never undoes the completion.
#[utoipa::path(
    patch,
    path = "/api/goals/{id}/complete",
    params(("id" = String, Path, description = "Goal UUID")),
    responses(
        (status = 200, description = "Goal completed", body = CompleteGoalResponse),
        (status = 403, description = "Goal belongs to another user", body = AppError),
        (status = 404, description = "Not found", body = AppError),
        (status = 409, description = "Goal is not active", body = AppError)
    ),
    tag = "goals"
)]
pub async fn complete_goal(
    State(state): State<AppState>,
    OnboardedRequired(claims): OnboardedRequired,
    Path(id): Path<String>,
) -> Result<Json<CompleteGoalResponse>, AppError> {
    let goal = load_owned_goal(&state.pool, claims.sub, &id).await?;
    completion::check_completable(&goal)?;

    let owner = repo::user::find_by_id(&state.pool, claims.sub)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let (completed, outcome) = completion::complete_goal(
        &state.pool,
        state.mailer.as_ref(),
        &state.notifications,
        &goal,
        &owner,
    )
    .await?;

    Ok(Json(CompleteGoalResponse {
        goal: GoalResponse::from(completed),
        notification: outcome,
        message: "Goal marked as completed.".to_string(),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/goals/{id}/notifications
// ---------------------------------------------------------------------------

/// Notification audit trail for one of the current user's goals.
#[utoipa::path(
    get,
    path = "/api/goals/{id}/notifications",
    params(("id" = String, Path, description = "Goal UUID")),
    responses(
        (status = 200, description = "Notification history", body = Vec<GoalNotificationResponse>),
        (status = 403, description = "Goal belongs to another user", body = AppError),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "goals"
)]
pub async fn list_goal_notifications(
    State(pool): State<Pool<Postgres>>,
    OnboardedRequired(claims): OnboardedRequired,
    Path(id): Path<String>,
) -> Result<Json<Vec<GoalNotificationResponse>>, AppError> {
    let goal = load_owned_goal(&pool, claims.sub, &id).await?;
    let rows = repo::goal_notification::list_by_goal(&pool, goal.id).await?;
    let response: Vec<GoalNotificationResponse> =
        rows.into_iter().map(GoalNotificationResponse::from).collect();
    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load a goal owned by `user_id`. A goal that exists but belongs to
/// someone else is a 403, not a 404: the id space is UUIDs, so existence
/// is not a secret worth hiding, and the distinction aids debugging.
async fn load_owned_goal(
    pool: &Pool<Postgres>,
    user_id: i64,
    raw_id: &str,
) -> Result<Goal, AppError> {
    let id = Uuid::parse_str(raw_id).map_err(|_| AppError::bad_request("Invalid UUID format"))?;

    let goal = repo::goal::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Goal {raw_id} not found")))?;

    if goal.user_id != user_id {
        return Err(AppError::forbidden("You do not have access to this goal."));
    }

    Ok(goal)
}
