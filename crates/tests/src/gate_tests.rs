use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common;

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn goals_require_authentication() {
    let (app, _pool, _guard) = common::test_app().await;

    let (status, body) = common::get(&app, "/api/goals", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["redirect"], "/login");
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn unverified_user_is_redirected_to_verification() {
    let (app, pool, _guard) = common::test_app().await;
    let (_, token) = common::seed_user(&pool, "ada@example.com", false, false).await;

    let (status, body) = common::get(&app, "/api/goals", Some(&token)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["redirect"], "/verify-email");
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn verified_user_without_onboarding_is_redirected_to_the_video() {
    let (app, pool, _guard) = common::test_app().await;
    let (_, token) = common::seed_user(&pool, "ada@example.com", true, false).await;

    let (status, body) = common::get(&app, "/api/goals", Some(&token)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["redirect"], "/onboarding/video");
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn onboarding_video_needs_verification_but_not_onboarding() {
    let (app, pool, _guard) = common::test_app().await;

    let (_, unverified) = common::seed_user(&pool, "eva@example.com", false, false).await;
    let (status, _) = common::get(&app, "/api/onboarding/video", Some(&unverified)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, verified) = common::seed_user(&pool, "ada@example.com", true, false).await;
    let (status, body) = common::get(&app, "/api/onboarding/video", Some(&verified)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["already_completed"], false);
    assert!(body["video_url"].as_str().unwrap().ends_with(".mp4"));
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn completing_onboarding_unlocks_the_goals_dashboard() {
    let (app, pool, _guard) = common::test_app().await;
    let (id, token) = common::seed_user(&pool, "ada@example.com", true, false).await;

    let (status, body) = common::post_json(&app, "/api/onboarding/complete", "{}", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["onboarding_completed"], true);

    // The old token still carries onboarded=false; mint a fresh one the way
    // the issued cookies would.
    let fresh = server::auth::jwt::create_access_token(id, "ada@example.com", true, true)
        .expect("token");
    let (status, _) = common::get(&app, "/api/goals", Some(&fresh)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn completing_onboarding_twice_is_a_noop() {
    let (app, pool, _guard) = common::test_app().await;
    let (_, token) = common::seed_user(&pool, "ada@example.com", true, true).await;

    let (status, _) = common::post_json(&app, "/api/onboarding/complete", "{}", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = common::post_json(&app, "/api/onboarding/complete", "{}", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires a Postgres database (set TEST_DATABASE_URL)"]
async fn already_onboarded_user_gets_a_redirect_from_the_video_page() {
    let (app, pool, _guard) = common::test_app().await;
    let (_, token) = common::seed_user(&pool, "ada@example.com", true, true).await;

    let (status, body) = common::get(&app, "/api/onboarding/video", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["already_completed"], true);
    assert_eq!(body["redirect"], "/goals");
}
