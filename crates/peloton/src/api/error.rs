//! Unified API error handling with structured responses.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, error};

use crate::auth::AuthError;
use crate::db::StoreError;

const INTERNAL_MESSAGE: &str = "Internal server error";
const FORBIDDEN_MESSAGE: &str = "you are not allowed to view this part of the application";

/// Closed set of error kinds exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ValidationFailed,
    Unauthorized,
    Forbidden,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::ValidationFailed => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Internal => "INTERNAL_SERVER_ERROR",
        }
    }
}

/// API error type with structured responses.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    details: Value,
    /// Internal diagnostic, only ever sent as `stack` outside production.
    trace: Option<String>,
}

impl ApiError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: json!({}),
            trace: None,
        }
    }

    pub fn validation_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationFailed, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }

    /// Internal error. The client only sees a generic message.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, INTERNAL_MESSAGE).with_trace(detail)
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &Value {
        &self.details
    }

    fn stack(&self) -> String {
        match &self.trace {
            Some(trace) => trace.clone(),
            None => format!("{:?}: {}", self.kind, self.message),
        }
    }
}

/// Structured error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// Error body including the diagnostic stack, attached to every error
/// response as an extension. The router decides whether to expose it.
#[derive(Debug, Clone)]
pub struct ErrorDiagnostics {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();
        let code = self.kind.code();
        let stack = self.stack();

        match self.kind {
            ErrorKind::Internal => {
                error!(error_code = code, trace = %stack, "API error");
            }
            _ => {
                debug!(error_code = code, message = %self.message, "Client error");
            }
        }

        let body = ErrorResponse {
            code,
            message: self.message,
            details: self.details,
            stack: None,
        };
        let diagnostics = ErrorDiagnostics {
            status,
            body: ErrorResponse {
                stack: Some(stack),
                ..body.clone()
            },
        };

        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(diagnostics);
        response
    }
}

/// Anything that reaches the API as an `anyhow::Error` is unexpected.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(format!("{err:?}"))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let trace = format!("{err:?}");
        let api_err = match err {
            AuthError::MissingCredentials => ApiError::unauthorized("You need to be signed in"),
            AuthError::InvalidAuthHeader
            | AuthError::InvalidToken(_)
            | AuthError::TokenExpired => ApiError::unauthorized("Invalid authentication token"),
            AuthError::InvalidCredentials => {
                ApiError::unauthorized("The given email or password do not match")
            }
            AuthError::MissingRole(_) => ApiError::forbidden(FORBIDDEN_MESSAGE),
            AuthError::MissingSession
            | AuthError::Password(_)
            | AuthError::Signing(_)
            | AuthError::Internal(_) => ApiError::new(ErrorKind::Internal, INTERNAL_MESSAGE),
        };
        api_err.with_trace(trace)
    }
}

/// Fallback for constraint failures a service did not translate itself.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(column) => ApiError::validation_failed("This item already exists")
                .with_details(json!({ "field": column })),
            StoreError::ForeignKey => ApiError::not_found("A referenced item does not exist"),
            StoreError::Other(err) => ApiError::from(err),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation_failed(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation_failed(rejection.body_text())
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    async fn body_json(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn test_error_response_status_codes() {
        assert_eq!(
            ApiError::validation_failed("").kind().status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::unauthorized("").kind().status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::forbidden("").kind().status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("").kind().status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::internal("").kind().status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_error_mapping() {
        let err = ApiError::from(AuthError::MissingCredentials);
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(err.message(), "You need to be signed in");

        for auth_err in [
            AuthError::InvalidAuthHeader,
            AuthError::InvalidToken("InvalidSignature".to_string()),
            AuthError::TokenExpired,
        ] {
            let err = ApiError::from(auth_err);
            assert_eq!(err.kind(), ErrorKind::Unauthorized);
            assert_eq!(err.message(), "Invalid authentication token");
        }

        let err = ApiError::from(AuthError::InvalidCredentials);
        assert_eq!(err.message(), "The given email or password do not match");

        let err = ApiError::from(AuthError::MissingRole(Role::Admin));
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert_eq!(err.message(), FORBIDDEN_MESSAGE);

        let err = ApiError::from(AuthError::Signing("key rejected".to_string()));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.message(), INTERNAL_MESSAGE);
    }

    #[test]
    fn test_anyhow_is_internal_and_hidden() {
        let err = ApiError::from(anyhow::anyhow!("connection refused").context("loading team"));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.message(), INTERNAL_MESSAGE);
        assert!(err.stack().contains("connection refused"));
    }

    #[test]
    fn test_store_error_fallback() {
        let err = ApiError::from(StoreError::Duplicate("name".to_string()));
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert_eq!(err.details()["field"], "name");

        assert_eq!(ApiError::from(StoreError::ForeignKey).kind(), ErrorKind::NotFound);

        let err = ApiError::from(StoreError::Other(anyhow::anyhow!("disk I/O error")));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.stack().contains("disk I/O error"));
    }

    #[tokio::test]
    async fn test_auth_error_renders_as_envelope() {
        let response = AuthError::TokenExpired.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["code"], "UNAUTHORIZED");
        assert_eq!(json["message"], "Invalid authentication token");
    }

    #[tokio::test]
    async fn test_envelope_shape() {
        let response = ApiError::not_found("No team with id 4 exists")
            .with_details(json!({ "id": 4 }))
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<ErrorDiagnostics>().is_some());

        let json = body_json(response).await;
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "No team with id 4 exists");
        assert_eq!(json["details"]["id"], 4);
        assert!(json.get("stack").is_none());
    }

    #[tokio::test]
    async fn test_envelope_details_default_to_empty_object() {
        let json = body_json(ApiError::unauthorized("You need to be signed in").into_response()).await;
        assert_eq!(json["details"], json!({}));
    }

    #[test]
    fn test_diagnostics_carry_stack() {
        let response = ApiError::internal("signer exploded").into_response();
        let diagnostics = response.extensions().get::<ErrorDiagnostics>().unwrap();
        assert_eq!(diagnostics.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(diagnostics.body.stack.as_deref(), Some("signer exploded"));
        assert_eq!(diagnostics.body.message, INTERNAL_MESSAGE);
    }
}
