use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use sqlx::{Pool, Postgres};

use super::cookies;
use super::jwt::{self, hash_token, validate_access_token, validate_refresh_token};
use crate::repo;

/// Permissive auth middleware.
///
/// On each request:
/// 1. Validates the access token from cookies (or Bearer header fallback)
///    and inserts `Claims` into request extensions.
/// 2. If the access token is missing or expired, attempts a transparent
///    refresh using the refresh cookie: the stored hash must exist,
///    be unrevoked and unexpired. The old refresh token is revoked and a
///    new pair is issued with fresh gate flags from the user row.
///
/// Does NOT reject unauthenticated requests — the gate extractors decide
/// authorization downstream.
pub async fn auth_middleware(
    State(pool): State<Pool<Postgres>>,
    mut req: Request,
    next: Next,
) -> Response {
    let headers = req.headers().clone();
    let mut refreshed_pair: Option<(String, String)> = None;

    let access_token = cookies::extract_access_token(&headers);
    let mut needs_refresh = access_token.is_none();

    if let Some(token) = access_token {
        match validate_access_token(&token) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
            }
            Err(_) => {
                needs_refresh = true;
            }
        }
    }

    if needs_refresh {
        if let Some(refresh_token) = cookies::extract_refresh_token(&headers) {
            if let Some((new_access, new_refresh)) =
                try_transparent_refresh(&pool, &refresh_token, &mut req).await
            {
                refreshed_pair = Some((new_access, new_refresh));
            }
        }
    }

    let mut response = next.run(req).await;

    if let Some((access, refresh)) = refreshed_pair {
        cookies::set_auth_cookies(response.headers_mut(), &access, &refresh);
    }

    response
}

/// Attempt to transparently refresh the session using the refresh token.
/// On success: inserts new Claims into request extensions and returns
/// the new token pair for the middleware to set as cookies.
async fn try_transparent_refresh(
    pool: &Pool<Postgres>,
    refresh_token: &str,
    req: &mut Request,
) -> Option<(String, String)> {
    // Only tokens with typ "refresh" are accepted here.
    let claims = validate_refresh_token(refresh_token).ok()?;

    // Look up by hash, not raw token — the DB stores SHA-256 hashes.
    let token_hash = hash_token(refresh_token);
    let stored = repo::user::find_refresh_token(pool, &token_hash, claims.sub)
        .await
        .ok()??;

    if stored.revoked {
        return None;
    }

    repo::user::revoke_refresh_token(pool, stored.id).await.ok()?;

    // Gate flags come from the user row, not the old token, so a user who
    // verified or onboarded since login picks the change up on refresh.
    let user = repo::user::find_by_id(pool, claims.sub).await.ok()??;
    let verified = user.is_verified();
    let onboarded = user.onboarding_completed;

    let new_access = jwt::create_access_token(user.id, &user.email, verified, onboarded).ok()?;
    let new_refresh = jwt::create_refresh_token(user.id, &user.email, verified, onboarded).ok()?;

    repo::user::store_refresh_token(pool, user.id, &hash_token(&new_refresh))
        .await
        .ok()?;

    let new_claims = validate_access_token(&new_access).ok()?;
    req.extensions_mut().insert(new_claims);

    tracing::debug!(user_id = user.id, "Transparent token refresh");

    Some((new_access, new_refresh))
}
