use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Valid notification status values matching the DB CHECK constraint.
pub const NOTIFICATION_STATUSES: &[&str] = &["pending", "sent", "failed"];

/// Audit record of a completion email attempt. Created pending, then marked
/// sent or failed; never blocks the goal transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct GoalNotification {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub recipient_email: String,
    pub status: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// API response shape for a notification audit row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GoalNotificationResponse {
    pub id: String,
    pub goal_id: String,
    pub recipient_email: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<String>,
    pub created_at: String,
}

impl From<GoalNotification> for GoalNotificationResponse {
    fn from(n: GoalNotification) -> Self {
        Self {
            id: n.id.to_string(),
            goal_id: n.goal_id.to_string(),
            recipient_email: n.recipient_email,
            status: n.status,
            sent_at: n.sent_at.map(|t| t.to_rfc3339()),
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

/// Outcome of the best-effort notification attempt that follows a goal
/// completion. Reported to the caller alongside the completed goal; never
/// turned into an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NotificationOutcome {
    Sent { recipient: String },
    Skipped { reason: String },
    Failed { detail: String },
}

/// Response for the completion endpoint: the completed goal plus what
/// happened to the notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CompleteGoalResponse {
    pub goal: crate::goal::GoalResponse,
    pub notification: NotificationOutcome,
    pub message: String,
}
