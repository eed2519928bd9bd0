use chrono::NaiveDate;
use shared_types::{AppError, Goal, GoalStatus, RecurrenceType};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

const GOAL_COLUMNS: &str =
    "id, user_id, title, description, status, end_date, completed_at, is_recurring, \
     recurrence_type, start_date, recurrence_count, next_due_date, parent_goal_id, \
     created_at, updated_at";

/// Insert a single one-time goal.
pub async fn create_one_off(
    pool: &Pool<Postgres>,
    user_id: i64,
    title: &str,
    description: Option<&str>,
    end_date: NaiveDate,
) -> Result<Goal, AppError> {
    let row = sqlx::query_as::<_, Goal>(&format!(
        r#"
        INSERT INTO goals (user_id, title, description, end_date)
        VALUES ($1, $2, $3, $4)
        RETURNING {GOAL_COLUMNS}
        "#,
    ))
    .bind(user_id)
    .bind(title)
    .bind(description)
    .bind(end_date)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

/// Create a recurring template plus its pre-materialized instances in one
/// transaction. A failure partway through rolls the whole batch back, so a
/// partial instance set can never persist.
///
/// Returns the template and the total number of goal rows created
/// (template included).
pub async fn create_recurring_batch(
    pool: &Pool<Postgres>,
    user_id: i64,
    title: &str,
    description: Option<&str>,
    rule: RecurrenceType,
    start_date: NaiveDate,
    count: i32,
) -> Result<(Goal, i32), AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let template = sqlx::query_as::<_, Goal>(&format!(
        r#"
        INSERT INTO goals
            (user_id, title, description, end_date, is_recurring, recurrence_type,
             start_date, recurrence_count, next_due_date)
        VALUES ($1, $2, $3, $4, TRUE, $5, $4, $6, $4)
        RETURNING {GOAL_COLUMNS}
        "#,
    ))
    .bind(user_id)
    .bind(title)
    .bind(description)
    .bind(start_date)
    .bind(rule.as_str())
    .bind(count)
    .fetch_one(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let mut created = 1;
    for i in 1..count {
        let due = rule.advance(start_date, i as u32).ok_or_else(|| {
            AppError::bad_request("Recurrence schedule exceeds the supported date range")
        })?;

        sqlx::query(
            r#"
            INSERT INTO goals (user_id, title, description, end_date, start_date, parent_goal_id)
            VALUES ($1, $2, $3, $4, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(due)
        .bind(template.id)
        .execute(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

        created += 1;
    }

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    Ok((template, created))
}

pub async fn find_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<Goal>, AppError> {
    let row = sqlx::query_as::<_, Goal>(&format!(
        "SELECT {GOAL_COLUMNS} FROM goals WHERE id = $1",
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

/// List a user's goals, newest first, optionally filtered by status.
pub async fn list_by_user(
    pool: &Pool<Postgres>,
    user_id: i64,
    status: Option<GoalStatus>,
) -> Result<Vec<Goal>, AppError> {
    let rows = match status {
        Some(status) => {
            sqlx::query_as::<_, Goal>(&format!(
                r#"
                SELECT {GOAL_COLUMNS} FROM goals
                WHERE user_id = $1 AND status = $2
                ORDER BY created_at DESC
                "#,
            ))
            .bind(user_id)
            .bind(status.as_str())
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, Goal>(&format!(
                r#"
                SELECT {GOAL_COLUMNS} FROM goals
                WHERE user_id = $1
                ORDER BY created_at DESC
                "#,
            ))
            .bind(user_id)
            .fetch_all(pool)
            .await
        }
    }
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(rows)
}

/// The durable half of goal completion: a guarded single-row UPDATE that
/// only fires while the goal is still active and is not a recurring
/// template. Returns None when the guard did not match (e.g. a concurrent
/// completion won, or the id points at a template).
pub async fn complete(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<Goal>, AppError> {
    let row = sqlx::query_as::<_, Goal>(&format!(
        r#"
        UPDATE goals
        SET status = 'completed', completed_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status = 'active' AND NOT is_recurring
        RETURNING {GOAL_COLUMNS}
        "#,
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

// --- Recurring-instance generation ---

/// Templates whose next occurrence falls within the lookahead window.
pub async fn templates_due_within(
    pool: &Pool<Postgres>,
    lookahead_days: i64,
) -> Result<Vec<Goal>, AppError> {
    let rows = sqlx::query_as::<_, Goal>(&format!(
        r#"
        SELECT {GOAL_COLUMNS} FROM goals
        WHERE is_recurring
          AND recurrence_type <> 'none'
          AND next_due_date IS NOT NULL
          AND next_due_date <= CURRENT_DATE + $1::int
        ORDER BY next_due_date ASC
        "#,
    ))
    .bind(lookahead_days as i32)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(rows)
}

/// Whether an instance already exists for a template at a given due date.
pub async fn instance_exists(
    pool: &Pool<Postgres>,
    parent_id: Uuid,
    end_date: NaiveDate,
) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM goals WHERE parent_goal_id = $1 AND end_date = $2)",
    )
    .bind(parent_id)
    .bind(end_date)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(exists)
}

/// Insert a generated instance for a template. The unique index on
/// (parent_goal_id, end_date) turns a concurrent duplicate into a no-op
/// rather than a second row; None means another run got there first.
pub async fn create_instance(
    pool: &Pool<Postgres>,
    template: &Goal,
    due: NaiveDate,
) -> Result<Option<Goal>, AppError> {
    let row = sqlx::query_as::<_, Goal>(&format!(
        r#"
        INSERT INTO goals (user_id, title, description, end_date, start_date, parent_goal_id)
        VALUES ($1, $2, $3, $4, $4, $5)
        ON CONFLICT (parent_goal_id, end_date) WHERE parent_goal_id IS NOT NULL
        DO NOTHING
        RETURNING {GOAL_COLUMNS}
        "#,
    ))
    .bind(template.user_id)
    .bind(&template.title)
    .bind(template.description.as_deref())
    .bind(due)
    .bind(template.id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

/// Point the template at its next ungenerated occurrence.
pub async fn advance_next_due(
    pool: &Pool<Postgres>,
    template_id: Uuid,
    next_due: NaiveDate,
) -> Result<(), AppError> {
    sqlx::query("UPDATE goals SET next_due_date = $1, updated_at = NOW() WHERE id = $2")
        .bind(next_due)
        .bind(template_id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(())
}
