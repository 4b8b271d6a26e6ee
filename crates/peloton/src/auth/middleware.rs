//! Session resolution and role gating middleware.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use log::{debug, warn};

use super::{
    AuthConfig, AuthError, ConfigValidationError, PasswordHasher, Role, Session, TokenCodec,
};

const BEARER_PREFIX: &str = "Bearer";

/// Extract the token that follows the `Bearer` scheme.
fn bearer_token_from_header(header_value: &str) -> Result<&str, AuthError> {
    let token = header_value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::InvalidAuthHeader)?;
    Ok(token.trim_start())
}

/// Authentication state shared across handlers.
#[derive(Clone)]
pub struct AuthState {
    tokens: Arc<TokenCodec>,
    hasher: Arc<PasswordHasher>,
    dummy_hash: Arc<str>,
}

impl AuthState {
    /// Create auth state from config.
    /// Resolves `env:VAR_NAME` syntax in the JWT secret and validates every
    /// parameter up front.
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigValidationError> {
        let secret = config.validate()?;
        let hasher = PasswordHasher::new(&config.argon)
            .map_err(|e| ConfigValidationError::InvalidArgonParams(e.to_string()))?;
        let dummy_hash = hasher
            .hash(&AuthConfig::generate_jwt_secret())
            .map_err(|e| ConfigValidationError::InvalidArgonParams(e.to_string()))?;

        Ok(Self {
            tokens: Arc::new(TokenCodec::new(&secret, &config.jwt)),
            hasher: Arc::new(hasher),
            dummy_hash: dummy_hash.into(),
        })
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// Hash of a random password, verified against when no identity matches.
    pub fn dummy_hash(&self) -> &str {
        &self.dummy_hash
    }

    /// Resolve the session carried by a request's headers.
    pub fn resolve_session(&self, headers: &HeaderMap) -> Result<CurrentSession, AuthError> {
        let header_value = headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingCredentials)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = bearer_token_from_header(header_value)?;
        let claims = self.tokens.verify(token)?;

        Ok(CurrentSession {
            session: Session::from(claims),
            token: token.to_string(),
        })
    }
}

/// Session and raw token attached to an authenticated request.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub session: Session,
    pub token: String,
}

impl CurrentSession {
    pub fn identity_id(&self) -> i64 {
        self.session.identity_id
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .ok_or(AuthError::MissingSession)
    }
}

/// Authentication middleware.
///
/// Short-circuits with 401 unless the request carries a valid bearer token,
/// otherwise attaches a [`CurrentSession`] for the layers and handlers below.
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let current = auth.resolve_session(req.headers())?;

    debug!(
        "Authenticated identity {} with roles {:?}",
        current.session.identity_id, current.session.roles
    );

    req.extensions_mut().insert(current);
    Ok(next.run(req).await)
}

/// Fail with [`AuthError::MissingRole`] unless the session holds `role`.
pub fn check_role(session: &Session, role: Role) -> Result<(), AuthError> {
    if session.has_role(role) {
        Ok(())
    } else {
        warn!(
            "Identity {} lacks role {} (has {:?})",
            session.identity_id, role, session.roles
        );
        Err(AuthError::MissingRole(role))
    }
}

/// Role gate middleware. The required role is the layer state:
///
/// ```ignore
/// router.route_layer(middleware::from_fn_with_state(Role::Admin, require_role))
/// ```
///
/// Must be layered inside [`auth_middleware`].
pub async fn require_role(
    State(role): State<Role>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let current = req
        .extensions()
        .get::<CurrentSession>()
        .ok_or(AuthError::MissingSession)?;

    check_role(&current.session, role)?;
    Ok(next.run(req).await)
}

/// Owner-or-admin predicate for per-identity resources.
pub fn can_access(session: &Session, resource_owner_id: i64) -> bool {
    session.identity_id == resource_owner_id || session.is_admin()
}
