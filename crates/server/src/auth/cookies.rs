use axum::http::{header, HeaderMap, HeaderValue};
use cookie::Cookie;

use super::jwt;

pub const ACCESS_COOKIE: &str = "goal_access";
pub const REFRESH_COOKIE: &str = "goal_refresh";

fn cookie_secure() -> bool {
    std::env::var("COOKIE_SECURE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false)
}

fn cookie_domain() -> Option<String> {
    std::env::var("COOKIE_DOMAIN")
        .ok()
        .filter(|d| !d.is_empty())
}

/// Build a Set-Cookie header value for the access token.
pub fn build_access_cookie(token: &str, max_age_minutes: i64) -> HeaderValue {
    let mut cookie = Cookie::build((ACCESS_COOKIE, token))
        .http_only(true)
        .same_site(cookie::SameSite::Lax)
        .path("/")
        .max_age(cookie::time::Duration::seconds(max_age_minutes * 60))
        .secure(cookie_secure());

    if let Some(domain) = cookie_domain() {
        cookie = cookie.domain(domain);
    }

    HeaderValue::from_str(&cookie.build().to_string()).expect("cookie header value should be valid")
}

/// Build a Set-Cookie header value for the refresh token.
pub fn build_refresh_cookie(token: &str, max_age_days: i64) -> HeaderValue {
    let mut cookie = Cookie::build((REFRESH_COOKIE, token))
        .http_only(true)
        .same_site(cookie::SameSite::Lax)
        .path("/")
        .max_age(cookie::time::Duration::seconds(max_age_days * 86400))
        .secure(cookie_secure());

    if let Some(domain) = cookie_domain() {
        cookie = cookie.domain(domain);
    }

    HeaderValue::from_str(&cookie.build().to_string()).expect("cookie header value should be valid")
}

/// Append Set-Cookie headers for a fresh token pair.
pub fn set_auth_cookies(headers: &mut HeaderMap, access_token: &str, refresh_token: &str) {
    headers.append(
        header::SET_COOKIE,
        build_access_cookie(access_token, jwt::access_token_expiry_minutes()),
    );
    headers.append(
        header::SET_COOKIE,
        build_refresh_cookie(refresh_token, jwt::refresh_token_expiry_days()),
    );
}

/// Append Set-Cookie headers that clear both auth cookies.
pub fn clear_auth_cookies(headers: &mut HeaderMap) {
    for name in [ACCESS_COOKIE, REFRESH_COOKIE] {
        let cookie = Cookie::build((name, ""))
            .http_only(true)
            .same_site(cookie::SameSite::Lax)
            .path("/")
            .max_age(cookie::time::Duration::ZERO)
            .build();
        if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
            headers.append(header::SET_COOKIE, value);
        }
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in Cookie::split_parse(raw).flatten() {
        if pair.name() == name {
            return Some(pair.value().to_string());
        }
    }
    None
}

/// Extract the access token from cookies, falling back to a Bearer header.
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = cookie_value(headers, ACCESS_COOKIE) {
        return Some(token);
    }
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.to_string())
}

/// Extract the refresh token from cookies.
pub fn extract_refresh_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, REFRESH_COOKIE)
}
