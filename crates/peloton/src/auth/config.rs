//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Minimum accepted length of the token signing secret, in bytes.
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Authentication configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Session token settings.
    pub jwt: JwtConfig,

    /// Password hashing cost parameters.
    pub argon: ArgonConfig,
}

/// Session token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// HS256 signing secret. Either the literal secret or `env:VAR_NAME`.
    /// Required, there is no built-in default.
    pub secret: Option<String>,

    pub issuer: String,

    pub audience: String,

    /// Token lifetime in seconds.
    pub expiration_interval_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: None,
            issuer: "cyclingdb.hogent.be".to_string(),
            audience: "cyclingdb.hogent.be".to_string(),
            expiration_interval_secs: 60 * 60,
        }
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgonConfig {
    /// Salt length in bytes.
    pub salt_length: usize,
    /// Digest length in bytes.
    pub hash_length: usize,
    /// Number of iterations.
    pub time_cost: u32,
    /// Memory cost in KiB.
    pub memory_cost: u32,
    /// Degree of parallelism (lanes).
    pub parallelism: u32,
}

impl Default for ArgonConfig {
    fn default() -> Self {
        Self {
            salt_length: 16,
            hash_length: 32,
            time_cost: 6,
            memory_cost: 1 << 17,
            parallelism: 1,
        }
    }
}

impl AuthConfig {
    /// Resolve the JWT secret, expanding `env:VAR_NAME` syntax.
    /// Returns the resolved secret or None if not configured.
    pub fn resolve_jwt_secret(&self) -> Result<Option<String>, ConfigValidationError> {
        match &self.jwt.secret {
            None => Ok(None),
            Some(value) => {
                if let Some(var_name) = value.strip_prefix("env:") {
                    match std::env::var(var_name) {
                        Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
                        Ok(_) => Err(ConfigValidationError::EnvVarEmpty(var_name.to_string())),
                        Err(_) => Err(ConfigValidationError::EnvVarNotFound(var_name.to_string())),
                    }
                } else {
                    Ok(Some(value.clone()))
                }
            }
        }
    }

    /// Validate the configuration and return the resolved signing secret.
    pub fn validate(&self) -> Result<String, ConfigValidationError> {
        let secret = self
            .resolve_jwt_secret()?
            .ok_or(ConfigValidationError::MissingJwtSecret)?;

        if secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigValidationError::JwtSecretTooShort);
        }

        if self.jwt.expiration_interval_secs == 0 {
            return Err(ConfigValidationError::InvalidExpiration);
        }

        self.argon.validate()?;

        Ok(secret)
    }

    /// Generate a secure random JWT secret.
    pub fn generate_jwt_secret() -> String {
        use rand::Rng;

        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        const SECRET_LENGTH: usize = 64;

        let mut rng = rand::rng();
        (0..SECRET_LENGTH)
            .map(|_| {
                let idx = rng.random_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect()
    }
}

impl ArgonConfig {
    /// Check the parameters against what the hasher accepts.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(8..=48).contains(&self.salt_length) {
            return Err(ConfigValidationError::InvalidArgonParams(format!(
                "salt_length must be between 8 and 48 bytes, got {}",
                self.salt_length
            )));
        }
        argon2::Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(self.hash_length),
        )
        .map_err(|e| ConfigValidationError::InvalidArgonParams(e.to_string()))?;
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// No JWT secret configured.
    MissingJwtSecret,
    /// JWT secret shorter than [`MIN_JWT_SECRET_LENGTH`].
    JwtSecretTooShort,
    /// Token lifetime of zero seconds.
    InvalidExpiration,
    /// Argon2 parameters rejected.
    InvalidArgonParams(String),
    /// Environment variable not found (for `env:VAR_NAME` syntax).
    EnvVarNotFound(String),
    /// Environment variable is empty (for `env:VAR_NAME` syntax).
    EnvVarEmpty(String),
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingJwtSecret => {
                write!(
                    f,
                    "JWT secret is required. Set PELOTON__AUTH__JWT__SECRET or auth.jwt.secret in config."
                )
            }
            Self::JwtSecretTooShort => {
                write!(
                    f,
                    "JWT secret must be at least {} characters long.",
                    MIN_JWT_SECRET_LENGTH
                )
            }
            Self::InvalidExpiration => {
                write!(f, "auth.jwt.expiration_interval_secs must be greater than zero.")
            }
            Self::InvalidArgonParams(msg) => write!(f, "Invalid argon2 parameters: {}", msg),
            Self::EnvVarNotFound(var) => {
                write!(
                    f,
                    "Environment variable '{}' not found (referenced via env:{} in config).",
                    var, var
                )
            }
            Self::EnvVarEmpty(var) => {
                write!(
                    f,
                    "Environment variable '{}' is empty (referenced via env:{} in config).",
                    var, var
                )
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}
