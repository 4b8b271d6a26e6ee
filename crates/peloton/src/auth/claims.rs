//! Token claims, roles and the per-request session.

use serde::{Deserialize, Serialize};

/// Capability tag attached to an identity.
///
/// Membership is checked by exact tag, there is no hierarchy between roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Full access to every team and the admin-only routes.
    Admin,
    /// Manages a single team account.
    TeamRepresentative,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::TeamRepresentative => "TEAM_REPRESENTATIVE",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims carried by every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Identity (team) the token was issued to.
    pub identity_id: i64,

    /// Roles of the identity at issuance time.
    pub roles: Vec<Role>,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    pub iss: String,
    pub aud: String,
    pub sub: String,
}

/// Authenticated context resolved from a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub identity_id: i64,
    pub roles: Vec<Role>,
}

impl Session {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Self {
            identity_id: claims.identity_id,
            roles: claims.roles,
        }
    }
}
