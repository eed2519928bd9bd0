use axum::http::StatusCode;
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;

use crate::common;

async fn seed_goal(pool: &sqlx::PgPool, user_id: i64, title: &str) -> shared_types::Goal {
    server::repo::goal::create_one_off(
        pool,
        user_id,
        title,
        Some("details"),
        Utc::now().date_naive() + Duration::days(10),
    )
    .await
    .expect("create goal")
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn completing_an_active_goal_records_the_notification() {
    let (app, pool, _guard) = common::test_app().await;
    let (id, token) = common::seed_user(&pool, "ada@example.com", true, true).await;
    let goal = seed_goal(&pool, id, "Ship the feature").await;

    let uri = format!("/api/goals/{}/complete", goal.id);
    let (status, body) = common::patch(&app, &uri, Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["goal"]["status"], "completed");
    assert!(body["goal"]["completed_at"].is_string());
    // The env-free test mailer accepts everything, so the outcome is sent.
    assert_eq!(body["notification"]["outcome"], "sent");
    assert_eq!(body["notification"]["recipient"], "achievements@example.com");

    let audit_status: String =
        sqlx::query_scalar("SELECT status FROM goal_notifications WHERE goal_id = $1")
            .bind(goal.id)
            .fetch_one(&pool)
            .await
            .expect("audit row");
    assert_eq!(audit_status, "sent");
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn completion_without_a_recipient_skips_the_notification() {
    let (app, pool, _guard) =
        common::test_app_with(std::sync::Arc::new(server::mailer::NoopMailer), None).await;
    let (id, token) = common::seed_user(&pool, "ada@example.com", true, true).await;
    let goal = seed_goal(&pool, id, "Quiet win").await;

    let uri = format!("/api/goals/{}/complete", goal.id);
    let (status, body) = common::patch(&app, &uri, Some(&token)).await;

    // No recipient configured: the goal still completes, the outcome says
    // why no mail went out, and no audit row is written.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["goal"]["status"], "completed");
    assert_eq!(body["notification"]["outcome"], "skipped");

    let audit_rows: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM goal_notifications WHERE goal_id = $1")
            .bind(goal.id)
            .fetch_one(&pool)
            .await
            .expect("count");
    assert_eq!(audit_rows, 0);
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn completion_survives_a_failing_mail_transport() {
    let (app, pool, _guard) = common::test_app_with(
        std::sync::Arc::new(common::FailingMailer),
        Some("achievements@example.com".to_string()),
    )
    .await;
    let (id, token) = common::seed_user(&pool, "ada@example.com", true, true).await;
    let goal = seed_goal(&pool, id, "Despite the outage").await;

    let uri = format!("/api/goals/{}/complete", goal.id);
    let (status, body) = common::patch(&app, &uri, Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["goal"]["status"], "completed");
    assert_eq!(body["notification"]["outcome"], "failed");
    assert_eq!(body["notification"]["detail"], "mail relay unreachable");

    let audit_status: String =
        sqlx::query_scalar("SELECT status FROM goal_notifications WHERE goal_id = $1")
            .bind(goal.id)
            .fetch_one(&pool)
            .await
            .expect("audit row");
    assert_eq!(audit_status, "failed");
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn completing_twice_conflicts() {
    let (app, pool, _guard) = common::test_app().await;
    let (id, token) = common::seed_user(&pool, "ada@example.com", true, true).await;
    let goal = seed_goal(&pool, id, "Once only").await;

    let uri = format!("/api/goals/{}/complete", goal.id);
    let (status, _) = common::patch(&app, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = common::patch(&app, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "This goal is already completed.");
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn recurring_templates_cannot_be_completed_directly() {
    let (app, pool, _guard) = common::test_app().await;
    let (id, token) = common::seed_user(&pool, "ada@example.com", true, true).await;

    let (template, _) = server::repo::goal::create_recurring_batch(
        &pool,
        id,
        "Weekly review",
        None,
        shared_types::RecurrenceType::Weekly,
        Utc::now().date_naive() + Duration::days(1),
        4,
    )
    .await
    .expect("create template");

    let uri = format!("/api/goals/{}/complete", template.id);
    let (status, body) = common::patch(&app, &uri, Some(&token)).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["message"],
        "Recurring goals are completed through their scheduled instances."
    );
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn the_guarded_update_never_touches_templates() {
    let (_app, pool, _guard) = common::test_app().await;
    let (id, _) = common::seed_user(&pool, "ada@example.com", true, true).await;

    let (template, _) = server::repo::goal::create_recurring_batch(
        &pool,
        id,
        "Weekly review",
        None,
        shared_types::RecurrenceType::Weekly,
        Utc::now().date_naive() + Duration::days(1),
        2,
    )
    .await
    .expect("create template");

    // Even bypassing the handler guards, the UPDATE refuses templates.
    let updated = server::repo::goal::complete(&pool, template.id)
        .await
        .expect("complete");
    assert!(updated.is_none());

    let status: String = sqlx::query_scalar("SELECT status FROM goals WHERE id = $1")
        .bind(template.id)
        .fetch_one(&pool)
        .await
        .expect("status");
    assert_eq!(status, "active");
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn foreign_goals_are_forbidden_not_hidden() {
    let (app, pool, _guard) = common::test_app().await;
    let (_, ada_token) = common::seed_user(&pool, "ada@example.com", true, true).await;
    let (eva, _) = common::seed_user(&pool, "eva@example.com", true, true).await;
    let goal = seed_goal(&pool, eva, "Eva's goal").await;

    let uri = format!("/api/goals/{}", goal.id);
    let (status, _) = common::get(&app, &uri, Some(&ada_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/api/goals/{}/complete", goal.id);
    let (status, _) = common::patch(&app, &uri, Some(&ada_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn unknown_goals_are_not_found() {
    let (app, pool, _guard) = common::test_app().await;
    let (_, token) = common::seed_user(&pool, "ada@example.com", true, true).await;

    let uri = format!("/api/goals/{}", uuid::Uuid::new_v4());
    let (status, _) = common::get(&app, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = common::get(&app, "/api/goals/not-a-uuid", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn notification_history_lists_the_audit_trail() {
    let (app, pool, _guard) = common::test_app().await;
    let (id, token) = common::seed_user(&pool, "ada@example.com", true, true).await;
    let goal = seed_goal(&pool, id, "Audited").await;

    let uri = format!("/api/goals/{}/complete", goal.id);
    let (status, _) = common::patch(&app, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/api/goals/{}/notifications", goal.id);
    let (status, body) = common::get(&app, &uri, Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["status"], "sent");
    assert_eq!(rows[0]["recipient_email"], "achievements@example.com");
}
