//! # Caller Identity
//!
//! Turns request headers into the [`ActingIdentity`] the mutation engine
//! checks. A token may arrive as either header:
//!
//! ```text
//! Authorization: Bearer <token>
//! x-auth-token: <token>
//! ```
//!
//! A missing or failing token yields [`ActingIdentity::Anonymous`]; whether
//! that is acceptable is up to the operation and the authority policy.

use axum::http::{HeaderMap, header};
use carelink_core::{ActingIdentity, AuthService};

/// Alternate token header.
pub const TOKEN_HEADER: &str = "x-auth-token";

/// The raw token, if the request carries one.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let from_authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    from_authorization
        .or_else(|| headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Verify the request's token, if any.
pub fn acting_identity(headers: &HeaderMap, auth: &AuthService) -> ActingIdentity {
    let Some(token) = bearer_token(headers) else {
        return ActingIdentity::Anonymous;
    };

    match auth.verify_token(token) {
        Ok(identity) => ActingIdentity::Verified(identity),
        Err(_) => {
            tracing::warn!(
                event = "auth_failure",
                reason = "invalid_token",
                "Rejected token on incoming request"
            );
            ActingIdentity::Anonymous
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
