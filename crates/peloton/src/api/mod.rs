//! HTTP API module.
//!
//! REST endpoints for teams, riders and sponsors plus the shared error
//! envelope.

mod error;
mod handlers;
mod routes;
mod state;
pub mod validation;

pub use error::{ApiError, ApiResult, ErrorDiagnostics, ErrorKind, ErrorResponse};
pub use routes::create_router;
pub use state::{AppState, HttpState};
