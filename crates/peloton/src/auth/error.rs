//! Authentication errors.

use thiserror::Error;

use super::Role;
use super::password::PasswordError;

/// Authentication and authorization errors.
///
/// The display strings are diagnostic. The HTTP layer decides what a client
/// sees.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No authorization header on the request.
    #[error("missing authorization header")]
    MissingCredentials,

    /// Authorization header without the bearer scheme.
    #[error("invalid authorization header format")]
    InvalidAuthHeader,

    /// Token failed signature, issuer, audience, subject or shape checks.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Token signature is valid but it is past its expiry.
    #[error("token expired")]
    TokenExpired,

    /// Unknown identifier or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Session lacks the role a route requires.
    #[error("missing required role {0}")]
    MissingRole(Role),

    /// Role check reached without a resolved session.
    #[error("role check ran without a resolved session")]
    MissingSession,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("internal auth error: {0}")]
    Internal(String),
}
