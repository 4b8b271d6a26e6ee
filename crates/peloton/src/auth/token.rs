//! Signed session tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use log::warn;

use super::{AuthError, Claims, JwtConfig, Role};

/// Subject claim carried by every session token.
pub const TOKEN_SUBJECT: &str = "auth";

/// Issues and verifies HS256 session tokens.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    expiration_interval: Duration,
}

impl TokenCodec {
    /// Build a codec from an already resolved secret.
    pub fn new(secret: &str, config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.sub = Some(TOKEN_SUBJECT.to_string());
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let expiration_secs = i64::try_from(config.expiration_interval_secs).unwrap_or(i64::MAX);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            expiration_interval: Duration::try_seconds(expiration_secs).unwrap_or(Duration::MAX),
        }
    }

    pub fn expiration_interval(&self) -> Duration {
        self.expiration_interval
    }

    /// Issue a token for an identity, valid for the configured interval.
    pub fn issue(&self, identity_id: i64, roles: &[Role]) -> Result<String, AuthError> {
        self.sign(&self.claims_at(identity_id, roles, Utc::now()))
    }

    fn claims_at(&self, identity_id: i64, roles: &[Role], now: DateTime<Utc>) -> Claims {
        Claims {
            identity_id,
            roles: roles.to_vec(),
            iat: now.timestamp(),
            exp: now
                .checked_add_signed(self.expiration_interval)
                .map_or(i64::MAX, |exp| exp.timestamp()),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            sub: TOKEN_SUBJECT.to_string(),
        }
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify signature, issuer, audience, subject and expiry in one step.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                warn!("JWT validation failed: {:?}", e);
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::InvalidToken(e.to_string()),
                }
            })?;

        let claims = token_data.claims;
        if claims.roles.is_empty() {
            warn!("JWT for identity {} carries no roles", claims.identity_id);
            return Err(AuthError::InvalidToken("token carries no roles".to_string()));
        }

        Ok(claims)
    }
}
