use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common;

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn register_creates_account_and_starts_session() {
    let (app, _pool, _guard) = common::test_app().await;

    let (status, body) = common::post_json(
        &app,
        "/api/auth/register",
        r#"{"name":"Ada","email":"ada@example.com","password":"password123"}"#,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["email_verified"], false);
    assert_eq!(body["user"]["onboarding_completed"], false);
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn register_rejects_duplicate_email() {
    let (app, pool, _guard) = common::test_app().await;
    common::seed_user(&pool, "ada@example.com", false, false).await;

    let (status, body) = common::post_json(
        &app,
        "/api/auth/register",
        r#"{"name":"Ada","email":"ada@example.com","password":"password123"}"#,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "Conflict");
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn register_rejects_short_password() {
    let (app, _pool, _guard) = common::test_app().await;

    let (status, body) = common::post_json(
        &app,
        "/api/auth/register",
        r#"{"name":"Ada","email":"ada@example.com","password":"short"}"#,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["field_errors"]["password"]
        .as_str()
        .unwrap()
        .contains("at least 8 characters"));
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn login_uses_one_message_for_unknown_email_and_wrong_password() {
    let (app, pool, _guard) = common::test_app().await;
    common::seed_user(&pool, "ada@example.com", true, true).await;

    let (status, body) = common::post_json(
        &app,
        "/api/auth/login",
        r#"{"email":"ada@example.com","password":"wrong-password"}"#,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password.");

    let (status, body) = common::post_json(
        &app,
        "/api/auth/login",
        r#"{"email":"nobody@example.com","password":"password123"}"#,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password.");
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn login_succeeds_with_correct_credentials() {
    let (app, pool, _guard) = common::test_app().await;
    common::seed_user(&pool, "ada@example.com", true, false).await;

    let (status, body) = common::post_json(
        &app,
        "/api/auth/login",
        r#"{"email":"ada@example.com","password":"password123"}"#,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email_verified"], true);
    assert_eq!(body["user"]["onboarding_completed"], false);
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn login_is_rate_limited() {
    let (app, pool, _guard) = common::test_app().await;
    common::seed_user(&pool, "ada@example.com", true, true).await;

    let body = r#"{"email":"ada@example.com","password":"wrong-password"}"#;
    for _ in 0..5 {
        let (status, _) = common::post_json(&app, "/api/auth/login", body, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, body) = common::post_json(&app, "/api/auth/login", body, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["kind"], "RateLimited");
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn me_returns_the_current_user() {
    let (app, pool, _guard) = common::test_app().await;
    let (id, token) = common::seed_user(&pool, "ada@example.com", true, true).await;

    let (status, body) = common::get(&app, "/api/auth/me", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["email"], "ada@example.com");
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn me_without_a_session_is_unauthorized() {
    let (app, _pool, _guard) = common::test_app().await;

    let (status, body) = common::get(&app, "/api/auth/me", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["redirect"], "/login");
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn verify_email_consumes_the_token_once() {
    let (app, pool, _guard) = common::test_app().await;
    let (id, _token) = common::seed_user(&pool, "ada@example.com", false, false).await;

    let raw_token = uuid::Uuid::new_v4().to_string();
    server::repo::user::create_email_verification(
        &pool,
        id,
        &server::auth::jwt::hash_token(&raw_token),
    )
    .await
    .expect("store token");

    let uri = format!("/api/auth/verify-email?token={raw_token}");

    let (status, body) = common::get(&app, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email_verified"], true);

    // Second use fails: the token was consumed.
    let (status, _) = common::get(&app, &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
