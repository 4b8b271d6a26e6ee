//! API route definitions.

use axum::http::{HeaderValue, Method, header};
use axum::{
    Json, Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::auth::{Role, auth_middleware, require_role};

use super::error::ErrorDiagnostics;
use super::handlers;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state);

    // Tracing layer with request IDs and timing
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let auth_state = state.auth.clone();

    // Admin-only routes
    let admin_routes = Router::new()
        .route("/api/teams", post(handlers::create_team))
        .route("/api/teams/info", get(handlers::list_team_financials))
        .route("/api/teams/{team_id}", delete(handlers::delete_team))
        .route("/api/riders", post(handlers::create_rider))
        .route("/api/riders/{rider_id}", delete(handlers::delete_rider))
        .route("/api/sponsors", post(handlers::create_sponsor))
        .route("/api/sponsors/{sponsor_id}", delete(handlers::delete_sponsor))
        .route_layer(middleware::from_fn_with_state(Role::Admin, require_role));

    // Protected routes (require authentication)
    let protected_routes = Router::new()
        .route("/api/teams", get(handlers::list_teams))
        .route(
            "/api/teams/{team_id}",
            get(handlers::get_team).put(handlers::update_team),
        )
        .route("/api/teams/name/{name}", get(handlers::get_team_by_name))
        .route("/api/teams/{team_id}/details", get(handlers::get_team_details))
        .route("/api/teams/{team_id}/riders", get(handlers::list_team_riders))
        .route("/api/teams/{team_id}/sponsors", get(handlers::list_team_sponsors))
        .route("/api/riders", get(handlers::list_riders))
        .route(
            "/api/riders/{rider_id}",
            get(handlers::get_rider).put(handlers::update_rider),
        )
        .route(
            "/api/riders/name/{first_name}/{last_name}",
            get(handlers::get_rider_by_full_name),
        )
        .route("/api/sponsors", get(handlers::list_sponsors))
        .route(
            "/api/sponsors/{sponsor_id}",
            get(handlers::get_sponsor).put(handlers::update_sponsor),
        )
        .route("/api/sponsors/name/{name}", get(handlers::list_sponsors_by_name))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state.clone());

    // Public routes (no authentication)
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/teams/login", post(handlers::login))
        .with_state(state.clone());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(handlers::unknown_resource)
        .layer(middleware::from_fn_with_state(
            state.http.expose_error_stack,
            error_stack_middleware,
        ))
        .layer(cors)
        .layer(trace_layer)
}

/// Re-render error responses with their diagnostic `stack` when enabled.
async fn error_stack_middleware(
    State(expose): State<bool>,
    req: Request,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;
    let diagnostics = response.extensions_mut().remove::<ErrorDiagnostics>();

    match diagnostics {
        Some(diagnostics) if expose => {
            (diagnostics.status, Json(diagnostics.body)).into_response()
        }
        _ => response,
    }
}

/// Build the CORS layer from the configured origins.
///
/// With no configured origins every cross-origin request is denied.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let headers = [header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT];

    let origins: Vec<HeaderValue> = state
        .http
        .allowed_origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("CORS: Invalid origin in config: {}", origin);
                None
            })
        })
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS: No origins configured, denying all cross-origin requests");
        return CorsLayer::new().allow_origin(AllowOrigin::exact(HeaderValue::from_static(
            "null",
        )));
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .max_age(state.http.cors_max_age)
}
