//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthState;
use crate::rider::RiderService;
use crate::sponsor::SponsorService;
use crate::team::TeamService;

/// HTTP surface settings for the API layer.
#[derive(Clone, Debug)]
pub struct HttpState {
    /// Origins allowed to make cross-origin requests.
    pub allowed_origins: Vec<String>,
    /// How long browsers may cache a CORS preflight.
    pub cors_max_age: Duration,
    /// Include the internal `stack` in error bodies. Off in production.
    pub expose_error_stack: bool,
}

impl Default for HttpState {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:5173".to_string()],
            cors_max_age: Duration::from_secs(3 * 60 * 60),
            expose_error_stack: false,
        }
    }
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Team service for team management and sign in.
    pub teams: Arc<TeamService>,
    pub riders: Arc<RiderService>,
    pub sponsors: Arc<SponsorService>,
    /// Authentication state.
    pub auth: AuthState,
    /// HTTP settings.
    pub http: HttpState,
}

impl AppState {
    pub fn new(
        teams: TeamService,
        riders: RiderService,
        sponsors: SponsorService,
        auth: AuthState,
        http: HttpState,
    ) -> Self {
        Self {
            teams: Arc::new(teams),
            riders: Arc::new(riders),
            sponsors: Arc::new(sponsors),
            auth,
            http,
        }
    }
}
