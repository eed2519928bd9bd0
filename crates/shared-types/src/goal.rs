use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Status / recurrence enums
// ---------------------------------------------------------------------------

/// Valid goal status values matching the DB CHECK constraint.
pub const GOAL_STATUSES: &[&str] = &["active", "completed", "cancelled"];

/// Lifecycle state of a goal. Transitions are active -> completed and
/// active -> cancelled; completed and cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Completed,
    Cancelled,
}

impl GoalStatus {
    /// Lowercase string for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Completed => "completed",
            GoalStatus::Cancelled => "cancelled",
        }
    }

    /// Strict parse from a database or query-string value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(GoalStatus::Active),
            "completed" => Some(GoalStatus::Completed),
            "cancelled" => Some(GoalStatus::Cancelled),
            _ => None,
        }
    }
}

/// Valid recurrence type values matching the DB CHECK constraint.
pub const RECURRENCE_TYPES: &[&str] = &["none", "weekly", "biweekly", "monthly"];

/// How often a recurring goal repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    None,
    Weekly,
    Biweekly,
    Monthly,
}

impl RecurrenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceType::None => "none",
            RecurrenceType::Weekly => "weekly",
            RecurrenceType::Biweekly => "biweekly",
            RecurrenceType::Monthly => "monthly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(RecurrenceType::None),
            "weekly" => Some(RecurrenceType::Weekly),
            "biweekly" => Some(RecurrenceType::Biweekly),
            "monthly" => Some(RecurrenceType::Monthly),
            _ => None,
        }
    }

    /// Advance `date` by `periods` repetitions of this recurrence.
    ///
    /// Weekly and biweekly add whole days; monthly adds calendar months with
    /// chrono's end-of-month clamping (Jan 31 + 1 month = Feb 28/29).
    /// Returns None for `RecurrenceType::None` or on date overflow.
    pub fn advance(&self, date: NaiveDate, periods: u32) -> Option<NaiveDate> {
        match self {
            RecurrenceType::None => None,
            RecurrenceType::Weekly => date.checked_add_days(Days::new(7 * periods as u64)),
            RecurrenceType::Biweekly => date.checked_add_days(Days::new(14 * periods as u64)),
            RecurrenceType::Monthly => date.checked_add_months(Months::new(periods)),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain struct
// ---------------------------------------------------------------------------

/// A goal row. Recurring templates and their generated instances share this
/// table; `kind()` gives the typed view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Goal {
    pub id: Uuid,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub end_date: NaiveDate,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_recurring: bool,
    pub recurrence_type: String,
    pub start_date: Option<NaiveDate>,
    pub recurrence_count: i32,
    pub next_due_date: Option<NaiveDate>,
    pub parent_goal_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Typed classification of a goal row.
///
/// A template defines a recurrence and never completes directly; an instance
/// is one concrete occurrence parented to its template; a one-off goal is
/// neither.
#[derive(Debug, Clone, PartialEq)]
pub enum GoalKind {
    OneOff,
    Template {
        rule: RecurrenceType,
        next_due_date: Option<NaiveDate>,
    },
    Instance {
        parent_id: Uuid,
    },
}

impl Goal {
    pub fn status(&self) -> Option<GoalStatus> {
        GoalStatus::parse(&self.status)
    }

    /// Classify this row. The completion guard and the recurrence generator
    /// only act through this view, so a template can never slip through the
    /// normal completion path.
    pub fn kind(&self) -> GoalKind {
        if self.is_recurring {
            GoalKind::Template {
                rule: RecurrenceType::parse(&self.recurrence_type)
                    .unwrap_or(RecurrenceType::None),
                next_due_date: self.next_due_date,
            }
        } else if let Some(parent_id) = self.parent_goal_id {
            GoalKind::Instance { parent_id }
        } else {
            GoalKind::OneOff
        }
    }

    /// An active goal whose end date has passed.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status() == Some(GoalStatus::Active) && self.end_date < today
    }

    /// Days until the end date, zero for non-active or past-due goals.
    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        if self.status() != Some(GoalStatus::Active) {
            return 0;
        }
        (self.end_date - today).num_days().max(0)
    }
}

// ---------------------------------------------------------------------------
// Request/response DTOs
// ---------------------------------------------------------------------------

/// API response for a goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GoalResponse {
    pub id: String,
    pub user_id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: String,
    pub end_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub is_recurring: bool,
    pub recurrence_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    pub recurrence_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_goal_id: Option<String>,
    pub days_remaining: i64,
    pub is_overdue: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Goal> for GoalResponse {
    fn from(g: Goal) -> Self {
        let today = Utc::now().date_naive();
        let days_remaining = g.days_remaining(today);
        let is_overdue = g.is_overdue(today);
        Self {
            id: g.id.to_string(),
            user_id: g.user_id,
            title: g.title,
            description: g.description,
            status: g.status,
            end_date: g.end_date.to_string(),
            completed_at: g.completed_at.map(|t| t.to_rfc3339()),
            is_recurring: g.is_recurring,
            recurrence_type: g.recurrence_type,
            start_date: g.start_date.map(|d| d.to_string()),
            recurrence_count: g.recurrence_count,
            next_due_date: g.next_due_date.map(|d| d.to_string()),
            parent_goal_id: g.parent_goal_id.map(|u| u.to_string()),
            days_remaining,
            is_overdue,
            created_at: g.created_at.to_rfc3339(),
            updated_at: g.updated_at.to_rfc3339(),
        }
    }
}

/// Request body for creating a goal (one-off or recurring).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(validator::Validate))]
pub struct CreateGoalRequest {
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, max = 255, message = "The goal title is required."))
    )]
    pub title: String,
    #[serde(default)]
    #[cfg_attr(
        feature = "validation",
        validate(length(
            max = 1000,
            message = "The description may not be greater than 1000 characters."
        ))
    )]
    pub description: Option<String>,
    #[serde(default = "default_recurrence_type")]
    pub recurrence_type: String,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub recurrence_count: Option<i32>,
}

fn default_recurrence_type() -> String {
    "none".to_string()
}

/// Validated scheduling half of a create request.
#[derive(Debug, Clone, PartialEq)]
pub enum GoalSchedule {
    OneOff {
        end_date: NaiveDate,
    },
    Recurring {
        rule: RecurrenceType,
        start_date: NaiveDate,
        count: i32,
    },
}

impl CreateGoalRequest {
    /// Resolve the conditional date/recurrence rules that the derive-based
    /// validation cannot express. One-time goals need a strictly future
    /// end date; recurring goals need a start date of today or later and a
    /// count between 1 and 52.
    pub fn schedule(&self, today: NaiveDate) -> Result<GoalSchedule, AppError> {
        let mut fields: HashMap<String, String> = HashMap::new();

        let rule = match RecurrenceType::parse(&self.recurrence_type) {
            Some(rule) => rule,
            None => {
                fields.insert(
                    "recurrence_type".to_string(),
                    format!(
                        "Invalid recurrence type: {}. Valid values: {}",
                        self.recurrence_type,
                        RECURRENCE_TYPES.join(", ")
                    ),
                );
                return Err(AppError::validation("Validation failed", fields));
            }
        };

        if rule == RecurrenceType::None {
            match self.end_date {
                None => {
                    fields.insert(
                        "end_date".to_string(),
                        "The end date is required for one-time goals.".to_string(),
                    );
                }
                Some(end_date) if end_date <= today => {
                    fields.insert(
                        "end_date".to_string(),
                        "The end date must be a future date.".to_string(),
                    );
                }
                Some(end_date) => {
                    return Ok(GoalSchedule::OneOff { end_date });
                }
            }
            return Err(AppError::validation("Validation failed", fields));
        }

        let start_date = match self.start_date {
            None => {
                fields.insert(
                    "start_date".to_string(),
                    "The start date is required for recurring goals.".to_string(),
                );
                None
            }
            Some(start_date) if start_date < today => {
                fields.insert(
                    "start_date".to_string(),
                    "The start date must be today or in the future.".to_string(),
                );
                None
            }
            Some(start_date) => Some(start_date),
        };

        let count = match self.recurrence_count {
            None => {
                fields.insert(
                    "recurrence_count".to_string(),
                    "The number of occurrences is required for recurring goals.".to_string(),
                );
                None
            }
            Some(count) if count < 1 => {
                fields.insert(
                    "recurrence_count".to_string(),
                    "At least 1 occurrence is required.".to_string(),
                );
                None
            }
            Some(count) if count > 52 => {
                fields.insert(
                    "recurrence_count".to_string(),
                    "Maximum 52 occurrences allowed.".to_string(),
                );
                None
            }
            Some(count) => Some(count),
        };

        match (start_date, count) {
            (Some(start_date), Some(count)) if fields.is_empty() => Ok(GoalSchedule::Recurring {
                rule,
                start_date,
                count,
            }),
            _ => Err(AppError::validation("Validation failed", fields)),
        }
    }
}

/// Response for goal creation: the created goal (the template, when
/// recurring) plus how many rows were scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateGoalResponse {
    pub goal: GoalResponse,
    pub instances_scheduled: i32,
    pub message: String,
}
