use shared_types::{AppError, GoalNotification};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

const NOTIFICATION_COLUMNS: &str =
    "id, goal_id, recipient_email, status, sent_at, created_at";

/// Record a pending notification before the send is attempted.
pub async fn create_pending(
    pool: &Pool<Postgres>,
    goal_id: Uuid,
    recipient_email: &str,
) -> Result<GoalNotification, AppError> {
    let row = sqlx::query_as::<_, GoalNotification>(&format!(
        r#"
        INSERT INTO goal_notifications (goal_id, recipient_email)
        VALUES ($1, $2)
        RETURNING {NOTIFICATION_COLUMNS}
        "#,
    ))
    .bind(goal_id)
    .bind(recipient_email)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

/// Mark a notification as sent, stamping `sent_at`.
pub async fn mark_sent(pool: &Pool<Postgres>, id: Uuid) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE goal_notifications SET status = 'sent', sent_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(())
}

/// Mark a notification as failed.
pub async fn mark_failed(pool: &Pool<Postgres>, id: Uuid) -> Result<(), AppError> {
    sqlx::query("UPDATE goal_notifications SET status = 'failed' WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(())
}

/// List the notification audit trail for a goal, newest first.
pub async fn list_by_goal(
    pool: &Pool<Postgres>,
    goal_id: Uuid,
) -> Result<Vec<GoalNotification>, AppError> {
    let rows = sqlx::query_as::<_, GoalNotification>(&format!(
        r#"
        SELECT {NOTIFICATION_COLUMNS} FROM goal_notifications
        WHERE goal_id = $1
        ORDER BY created_at DESC
        "#,
    ))
    .bind(goal_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(rows)
}
