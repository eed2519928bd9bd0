use axum::{extract::FromRequestParts, http::request::Parts};
use shared_types::AppError;

use super::jwt::Claims;

/// The access gates, in the order they are evaluated. A request must pass
/// every gate up to the level a route requires; the first failing gate
/// wins and names the screen the client should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Gate {
    Authenticated,
    Verified,
    Onboarded,
}

/// One reviewable table: gate order, redirect target, user-facing message.
const GATE_CHAIN: &[(Gate, &str, &str)] = &[
    (Gate::Authenticated, "/login", "Authentication required"),
    (Gate::Verified, "/verify-email", "Email verification required"),
    (
        Gate::Onboarded,
        "/onboarding/video",
        "Onboarding must be completed first",
    ),
];

fn passes(gate: Gate, claims: &Claims) -> bool {
    match gate {
        Gate::Authenticated => true, // having claims at all is the check
        Gate::Verified => claims.verified,
        Gate::Onboarded => claims.onboarded,
    }
}

/// Evaluate the chain top-to-bottom through `required`, returning the
/// claims on success or the first failing gate's error.
pub fn check_gates(claims: Option<&Claims>, required: Gate) -> Result<Claims, AppError> {
    let claims = match claims {
        Some(claims) => claims,
        None => {
            let (_, redirect, message) = GATE_CHAIN[0];
            return Err(AppError::unauthorized(message).with_redirect(redirect));
        }
    };

    for (gate, redirect, message) in GATE_CHAIN {
        if *gate > required {
            break;
        }
        if !passes(*gate, claims) {
            return Err(AppError::forbidden(*message).with_redirect(*redirect));
        }
    }

    Ok(claims.clone())
}

/// Extractor for routes behind the authentication gate only.
pub struct AuthRequired(pub Claims);

impl<S: Send + Sync> FromRequestParts<S> for AuthRequired {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        check_gates(parts.extensions.get::<Claims>(), Gate::Authenticated).map(AuthRequired)
    }
}

/// Extractor for routes behind authentication + email verification.
pub struct VerifiedRequired(pub Claims);

impl<S: Send + Sync> FromRequestParts<S> for VerifiedRequired {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        check_gates(parts.extensions.get::<Claims>(), Gate::Verified).map(VerifiedRequired)
    }
}

/// Extractor for routes behind the full chain: authenticated, verified,
/// onboarded. All goal routes use this.
pub struct OnboardedRequired(pub Claims);

impl<S: Send + Sync> FromRequestParts<S> for OnboardedRequired {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        check_gates(parts.extensions.get::<Claims>(), Gate::Onboarded).map(OnboardedRequired)
    }
}
