//! Authentication module.
//!
//! Argon2id credential hashing, HS256 session tokens, the session resolving
//! middleware and role gating.

mod claims;
mod config;
mod error;
mod login;
mod middleware;
mod password;
mod token;

pub use claims::{Claims, Role, Session};
pub use config::{ArgonConfig, AuthConfig, ConfigValidationError, JwtConfig};
pub use error::AuthError;
pub use login::{Authenticatable, IdentityStore, LoginOutcome, login};
pub use middleware::{
    AuthState, CurrentSession, auth_middleware, can_access, check_role, require_role,
};
pub use password::{PasswordError, PasswordHasher};
pub use token::{TOKEN_SUBJECT, TokenCodec};
