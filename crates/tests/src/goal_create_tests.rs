use axum::http::StatusCode;
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;

use crate::common;

fn future_date(days: i64) -> String {
    (Utc::now().date_naive() + Duration::days(days)).to_string()
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn creates_a_one_time_goal() {
    let (app, pool, _guard) = common::test_app().await;
    let (_, token) = common::seed_user(&pool, "ada@example.com", true, true).await;

    let body = format!(
        r#"{{"title":"Read 12 books","description":"One a month","end_date":"{}"}}"#,
        future_date(30)
    );
    let (status, body) = common::post_json(&app, "/api/goals", &body, Some(&token)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["goal"]["title"], "Read 12 books");
    assert_eq!(body["goal"]["status"], "active");
    assert_eq!(body["goal"]["is_recurring"], false);
    assert_eq!(body["instances_scheduled"], 1);
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn rejects_a_past_end_date() {
    let (app, pool, _guard) = common::test_app().await;
    let (_, token) = common::seed_user(&pool, "ada@example.com", true, true).await;

    let body = format!(
        r#"{{"title":"Time travel","end_date":"{}"}}"#,
        future_date(-1)
    );
    let (status, body) = common::post_json(&app, "/api/goals", &body, Some(&token)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["field_errors"]["end_date"],
        "The end date must be a future date."
    );
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn rejects_a_missing_end_date_for_one_time_goals() {
    let (app, pool, _guard) = common::test_app().await;
    let (_, token) = common::seed_user(&pool, "ada@example.com", true, true).await;

    let (status, body) =
        common::post_json(&app, "/api/goals", r#"{"title":"No date"}"#, Some(&token)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["field_errors"]["end_date"],
        "The end date is required for one-time goals."
    );
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn recurring_goal_creates_template_and_instances_in_one_batch() {
    let (app, pool, _guard) = common::test_app().await;
    let (id, token) = common::seed_user(&pool, "ada@example.com", true, true).await;

    let body = format!(
        r#"{{"title":"Weekly review","recurrence_type":"weekly","start_date":"{}","recurrence_count":4}}"#,
        future_date(1)
    );
    let (status, body) = common::post_json(&app, "/api/goals", &body, Some(&token)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["goal"]["is_recurring"], true);
    assert_eq!(body["goal"]["recurrence_type"], "weekly");
    assert_eq!(body["instances_scheduled"], 4);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM goals WHERE user_id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(total, 4);

    let instances: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM goals WHERE parent_goal_id IS NOT NULL")
            .fetch_one(&pool)
            .await
            .expect("count");
    assert_eq!(instances, 3);
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn recurring_goal_collects_every_field_error() {
    let (app, pool, _guard) = common::test_app().await;
    let (_, token) = common::seed_user(&pool, "ada@example.com", true, true).await;

    let (status, body) = common::post_json(
        &app,
        "/api/goals",
        r#"{"title":"Broken","recurrence_type":"weekly"}"#,
        Some(&token),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["field_errors"]["start_date"],
        "The start date is required for recurring goals."
    );
    assert_eq!(
        body["field_errors"]["recurrence_count"],
        "The number of occurrences is required for recurring goals."
    );
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn rejects_more_than_52_occurrences() {
    let (app, pool, _guard) = common::test_app().await;
    let (_, token) = common::seed_user(&pool, "ada@example.com", true, true).await;

    let body = format!(
        r#"{{"title":"Too many","recurrence_type":"weekly","start_date":"{}","recurrence_count":53}}"#,
        future_date(1)
    );
    let (status, body) = common::post_json(&app, "/api/goals", &body, Some(&token)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["field_errors"]["recurrence_count"],
        "Maximum 52 occurrences allowed."
    );
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn list_filters_by_status() {
    let (app, pool, _guard) = common::test_app().await;
    let (id, token) = common::seed_user(&pool, "ada@example.com", true, true).await;

    let goal = server::repo::goal::create_one_off(
        &pool,
        id,
        "Done already",
        None,
        Utc::now().date_naive() + Duration::days(10),
    )
    .await
    .expect("create");
    server::repo::goal::complete(&pool, goal.id).await.expect("complete");

    server::repo::goal::create_one_off(
        &pool,
        id,
        "Still going",
        None,
        Utc::now().date_naive() + Duration::days(10),
    )
    .await
    .expect("create");

    let (status, body) = common::get(&app, "/api/goals?status=active", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["title"], "Still going");

    let (status, body) = common::get(&app, "/api/goals?status=bogus", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Invalid status filter"));
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn users_only_see_their_own_goals() {
    let (app, pool, _guard) = common::test_app().await;
    let (ada, ada_token) = common::seed_user(&pool, "ada@example.com", true, true).await;
    let (eva, _) = common::seed_user(&pool, "eva@example.com", true, true).await;

    let end = Utc::now().date_naive() + Duration::days(10);
    server::repo::goal::create_one_off(&pool, ada, "Ada's", None, end)
        .await
        .expect("create");
    server::repo::goal::create_one_off(&pool, eva, "Eva's", None, end)
        .await
        .expect("create");

    let (status, body) = common::get(&app, "/api/goals", Some(&ada_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["title"], "Ada's");
}
