//! The single authorized path for transitioning a goal to completed.
//!
//! The durable status write and the notification email are deliberately
//! decoupled: a mail outage or missing recipient config must never block
//! the user-visible action of completing a goal. Only a failure of the
//! status write itself surfaces as an error.

use shared_types::{AppError, Goal, GoalKind, GoalStatus, NotificationOutcome, User};
use sqlx::{Pool, Postgres};

use crate::config::NotificationConfig;
use crate::mailer::{self, Mailer};
use crate::repo;

/// Check the completion guards without touching storage. Returns the
/// specific conflict so the caller can tell "already completed" apart from
/// "not active".
pub fn check_completable(goal: &Goal) -> Result<(), AppError> {
    if let GoalKind::Template { .. } = goal.kind() {
        return Err(AppError::conflict(
            "Recurring goals are completed through their scheduled instances.",
        ));
    }
    match goal.status() {
        Some(GoalStatus::Completed) => {
            Err(AppError::conflict("This goal is already completed."))
        }
        Some(GoalStatus::Active) => Ok(()),
        _ => Err(AppError::conflict(
            "Only active goals can be marked as complete.",
        )),
    }
}

/// Complete a goal and report what happened to the notification.
///
/// Preconditions (enforced by the caller): the goal passed
/// `check_completable` and the acting user owns it. The guarded UPDATE
/// re-checks the active status so a concurrent completion still loses
/// cleanly.
pub async fn complete_goal(
    pool: &Pool<Postgres>,
    mailer: &dyn Mailer,
    config: &NotificationConfig,
    goal: &Goal,
    owner: &User,
) -> Result<(Goal, NotificationOutcome), AppError> {
    let completed = repo::goal::complete(pool, goal.id)
        .await?
        .ok_or_else(|| AppError::conflict("Only active goals can be marked as complete."))?;

    let outcome = send_completion_notification(pool, mailer, config, &completed, owner).await;

    tracing::info!(
        goal_id = %completed.id,
        user_id = completed.user_id,
        title = %completed.title,
        completed_at = ?completed.completed_at,
        "Goal completed successfully"
    );

    Ok((completed, outcome))
}

/// Best-effort notification step. All transport faults are absorbed here
/// and reported as an outcome, never an error.
async fn send_completion_notification(
    pool: &Pool<Postgres>,
    mailer: &dyn Mailer,
    config: &NotificationConfig,
    goal: &Goal,
    owner: &User,
) -> NotificationOutcome {
    let recipient = match config.recipient.as_deref() {
        Some(recipient) => recipient,
        None => {
            tracing::warn!(
                goal_id = %goal.id,
                "Goal completion notification recipient not configured"
            );
            return NotificationOutcome::Skipped {
                reason: "notification recipient not configured".to_string(),
            };
        }
    };

    // Audit row: pending until the send resolves. Losing the audit row is
    // not worth failing the notification over, so insert errors only log.
    let audit = match repo::goal_notification::create_pending(pool, goal.id, recipient).await {
        Ok(row) => Some(row),
        Err(e) => {
            tracing::warn!(goal_id = %goal.id, error = %e, "Failed to record notification audit row");
            None
        }
    };

    let outcome = notify_completion(mailer, config, goal, owner, recipient).await;

    if let Some(audit) = audit {
        let result = match &outcome {
            NotificationOutcome::Sent { .. } => {
                repo::goal_notification::mark_sent(pool, audit.id).await
            }
            _ => repo::goal_notification::mark_failed(pool, audit.id).await,
        };
        if let Err(e) = result {
            tracing::warn!(
                notification_id = %audit.id,
                error = %e,
                "Failed to update notification audit row"
            );
        }
    }

    outcome
}

/// Render and send the completion email to an already-resolved recipient.
/// Pure of storage, so the transport contract is unit-testable.
pub async fn notify_completion(
    mailer: &dyn Mailer,
    config: &NotificationConfig,
    goal: &Goal,
    owner: &User,
    recipient: &str,
) -> NotificationOutcome {
    let subject = mailer::completion_subject(goal);
    let html = mailer::completion_html(goal, owner, &config.app_name);

    match mailer.send_email(recipient, &subject, &html).await {
        Ok(()) => {
            tracing::info!(
                goal_id = %goal.id,
                user_name = %owner.name,
                goal_title = %goal.title,
                recipient = recipient,
                completed_at = ?goal.completed_at,
                "Goal completion notification sent successfully"
            );
            NotificationOutcome::Sent {
                recipient: recipient.to_string(),
            }
        }
        Err(detail) => {
            tracing::error!(
                goal_id = %goal.id,
                user_name = %owner.name,
                goal_title = %goal.title,
                recipient = recipient,
                error = %detail,
                "Failed to send goal completion notification"
            );
            NotificationOutcome::Failed { detail }
        }
    }
}
