//! Credential verification and token issuance.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::{AuthError, AuthState, Role};

/// An account that can sign in with a password.
pub trait Authenticatable {
    /// Redacted view returned to clients.
    type Public: Serialize;

    fn identity_id(&self) -> i64;
    fn roles(&self) -> &[Role];
    fn password_hash(&self) -> &str;
    fn into_public(self) -> Self::Public;
}

/// Lookup of identities by their unique login identifier.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    type Identity: Authenticatable + Send;

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Self::Identity>>;
}

/// Result of a successful sign-in.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome<P> {
    pub token: String,
    pub identity: P,
}

/// Verify `email` / `password` and issue a session token.
///
/// An unknown email and a wrong password fail with the same
/// [`AuthError::InvalidCredentials`]. Both paths run one Argon2 verification.
#[instrument(skip(auth, store, password))]
pub async fn login<S>(
    auth: &AuthState,
    store: &S,
    email: &str,
    password: &str,
) -> Result<LoginOutcome<<S::Identity as Authenticatable>::Public>, AuthError>
where
    S: IdentityStore,
{
    let identity = store
        .find_by_email(email)
        .await
        .map_err(|e| AuthError::Internal(format!("{e:#}")))?;

    let Some(identity) = identity else {
        // Outcome is ignored, this only matches the cost of a real check.
        let _ = auth
            .hasher()
            .verify_blocking(password.to_string(), auth.dummy_hash().to_string())
            .await;
        warn!("Login attempt for unknown identity");
        return Err(AuthError::InvalidCredentials);
    };

    let valid = auth
        .hasher()
        .verify_blocking(password.to_string(), identity.password_hash().to_string())
        .await?;
    if !valid {
        warn!(identity_id = identity.identity_id(), "Login attempt with wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    let token = auth.tokens().issue(identity.identity_id(), identity.roles())?;
    info!(identity_id = identity.identity_id(), "Identity signed in");

    Ok(LoginOutcome {
        token,
        identity: identity.into_public(),
    })
}
