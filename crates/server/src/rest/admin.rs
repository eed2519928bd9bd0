use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use sqlx::{Pool, Postgres};

use shared_types::AppError;

use crate::recurrence;

/// Response for a manually triggered generation pass.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct GenerateRecurringResponse {
    pub instances_created: u64,
}

/// Require the shared ops token. Admin routes stay disabled until
/// `ADMIN_TOKEN` is configured.
fn check_admin_token(headers: &HeaderMap) -> Result<(), AppError> {
    let expected = std::env::var("ADMIN_TOKEN")
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::forbidden("Admin operations are not enabled."))?;

    let provided = headers
        .get("x-admin-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if provided != expected {
        return Err(AppError::forbidden("Invalid admin token."));
    }

    Ok(())
}

/// Run the recurring-instance generator on demand, outside the cron
/// schedule. Same pass the `generate-recurring` binary runs.
#[utoipa::path(
    post,
    path = "/api/admin/generate-recurring",
    params(
        ("X-Admin-Token" = String, Header, description = "Ops token")
    ),
    responses(
        (status = 200, description = "Generation pass finished", body = GenerateRecurringResponse),
        (status = 403, description = "Missing or invalid token", body = AppError)
    ),
    tag = "admin"
)]
pub async fn generate_recurring(
    State(pool): State<Pool<Postgres>>,
    headers: HeaderMap,
) -> Result<Json<GenerateRecurringResponse>, AppError> {
    check_admin_token(&headers)?;

    let instances_created = recurrence::generate_recurring_goals(&pool).await?;

    Ok(Json(GenerateRecurringResponse { instances_created }))
}
