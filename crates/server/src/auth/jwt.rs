use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Token type discriminator — prevents using a refresh token as an access token.
const TOKEN_TYPE_ACCESS: &str = "access";
const TOKEN_TYPE_REFRESH: &str = "refresh";

/// JWT claims stored in access and refresh tokens.
///
/// The `verified` and `onboarded` flags are snapshots taken at issue time;
/// the gate extractors trust them so goal routes stay one-query. They are
/// refreshed whenever a new token pair is minted (login, transparent
/// refresh, verification, onboarding completion).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub verified: bool,
    pub onboarded: bool,
    pub exp: i64,
    pub iat: i64,
    /// Unique token identifier — prevents hash collisions when multiple
    /// tokens are issued for the same user within the same second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Token type: "access" or "refresh".
    #[serde(default)]
    pub typ: String,
}

/// Compute the SHA-256 hash of a raw JWT string, returned as a hex-encoded string.
/// Used to store refresh tokens safely — the raw token goes to the client cookie
/// while only the hash is persisted in the database.
pub fn hash_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").expect("JWT_SECRET must be set")
}

pub fn access_token_expiry_minutes() -> i64 {
    std::env::var("JWT_ACCESS_TOKEN_EXPIRY_MINUTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(15)
}

pub fn refresh_token_expiry_days() -> i64 {
    std::env::var("JWT_REFRESH_TOKEN_EXPIRY_DAYS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(7)
}

fn build_claims(
    user_id: i64,
    email: &str,
    verified: bool,
    onboarded: bool,
    typ: &str,
    lifetime: Duration,
) -> Claims {
    let now = Utc::now();
    Claims {
        sub: user_id,
        email: email.to_string(),
        verified,
        onboarded,
        iat: now.timestamp(),
        exp: (now + lifetime).timestamp(),
        jti: Some(uuid::Uuid::new_v4().to_string()),
        typ: typ.to_string(),
    }
}

pub fn create_access_token(
    user_id: i64,
    email: &str,
    verified: bool,
    onboarded: bool,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = build_claims(
        user_id,
        email,
        verified,
        onboarded,
        TOKEN_TYPE_ACCESS,
        Duration::minutes(access_token_expiry_minutes()),
    );
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret().as_bytes()),
    )
}

pub fn create_refresh_token(
    user_id: i64,
    email: &str,
    verified: bool,
    onboarded: bool,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = build_claims(
        user_id,
        email,
        verified,
        onboarded,
        TOKEN_TYPE_REFRESH,
        Duration::days(refresh_token_expiry_days()),
    );
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret().as_bytes()),
    )
}

fn validate_token(token: &str, expected_typ: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret().as_bytes()),
        &Validation::default(),
    )?;
    if data.claims.typ != expected_typ {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
    }
    Ok(data.claims)
}

/// Validate an access token. Rejects refresh tokens.
pub fn validate_access_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    validate_token(token, TOKEN_TYPE_ACCESS)
}

/// Validate a refresh token. Rejects access tokens.
pub fn validate_refresh_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    validate_token(token, TOKEN_TYPE_REFRESH)
}
