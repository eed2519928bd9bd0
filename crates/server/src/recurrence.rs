//! Scheduled materialization of recurring goal instances.
//!
//! For each template whose `next_due_date` falls inside a 7-day lookahead
//! window, create the next instance unless one already exists for that
//! date. The existence check keeps repeated runs idempotent; the unique
//! index on (parent_goal_id, end_date) keeps concurrent runs from racing
//! past it.

use chrono::NaiveDate;
use shared_types::{AppError, Goal, GoalKind, RecurrenceType};
use sqlx::{Pool, Postgres};

use crate::repo;

/// How far ahead of `next_due_date` the generator materializes instances.
pub const LOOKAHEAD_DAYS: i64 = 7;

/// The date of the template's next ungenerated occurrence: one period past
/// the current `next_due_date`, falling back to `end_date` when the
/// marker is absent.
pub fn next_occurrence(template: &Goal) -> Option<NaiveDate> {
    let rule = match template.kind() {
        GoalKind::Template { rule, .. } if rule != RecurrenceType::None => rule,
        _ => return None,
    };
    let base = template.next_due_date.unwrap_or(template.end_date);
    rule.advance(base, 1)
}

/// Run one generation pass. Returns the number of instances created.
pub async fn generate_recurring_goals(pool: &Pool<Postgres>) -> Result<u64, AppError> {
    let templates = repo::goal::templates_due_within(pool, LOOKAHEAD_DAYS).await?;
    let mut generated = 0u64;

    for template in &templates {
        let due_marker = match template.kind() {
            GoalKind::Template {
                next_due_date: Some(due),
                rule,
            } if rule != RecurrenceType::None => due,
            _ => continue,
        };

        // Idempotence: an instance for the marker date means this
        // occurrence was already generated (or pre-materialized at
        // creation time).
        if repo::goal::instance_exists(pool, template.id, due_marker).await? {
            tracing::debug!(
                template_id = %template.id,
                due = %due_marker,
                "Instance already exists, skipping"
            );
            continue;
        }

        let due = match next_occurrence(template) {
            Some(due) => due,
            None => {
                tracing::warn!(
                    template_id = %template.id,
                    "Could not compute next occurrence, skipping"
                );
                continue;
            }
        };

        match repo::goal::create_instance(pool, template, due).await? {
            Some(instance) => {
                repo::goal::advance_next_due(pool, template.id, due).await?;
                generated += 1;
                tracing::info!(
                    template_id = %template.id,
                    instance_id = %instance.id,
                    title = %template.title,
                    due = %due,
                    "Generated recurring goal instance"
                );
            }
            None => {
                // The occurrence already exists (pre-materialized at
                // creation, or a concurrent run hit the unique index
                // first). Move the marker past it so later passes skip
                // this template via the existence check instead of
                // re-attempting the insert.
                repo::goal::advance_next_due(pool, template.id, due).await?;
                tracing::debug!(
                    template_id = %template.id,
                    due = %due,
                    "Instance already materialized, advancing past it"
                );
            }
        }
    }

    tracing::info!(
        templates = templates.len(),
        generated = generated,
        "Recurring goal generation pass finished"
    );

    Ok(generated)
}
