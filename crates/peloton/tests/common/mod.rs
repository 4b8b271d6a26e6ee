//! Test utilities and common setup.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use peloton::api::{self, HttpState};
use peloton::auth::{ArgonConfig, AuthConfig, AuthState};
use peloton::db::Database;
use peloton::rider::{Rider, RiderFields, RiderRepository, RiderService};
use peloton::sponsor::{Sponsor, SponsorFields, SponsorRepository, SponsorService};
use peloton::team::{CreateTeamRequest, TeamFields, TeamInfo, TeamRepository, TeamService};
use serde_json::{Value, json};
use tower::ServiceExt;

/// Password every seeded team signs in with.
pub const PASSWORD: &str = "12345678";

/// A router plus direct access to the services for seeding.
pub struct TestApp {
    pub router: Router,
    pub teams: TeamService,
    pub riders: RiderService,
    pub sponsors: SponsorService,
}

/// Create a test AuthConfig with a JWT secret and cheap Argon2 parameters.
pub fn test_auth_config() -> AuthConfig {
    let mut config = AuthConfig::default();
    config.jwt.secret = Some("test-secret-for-integration-tests-minimum-32-chars".to_string());
    config.argon = ArgonConfig {
        time_cost: 1,
        memory_cost: 1024,
        ..ArgonConfig::default()
    };
    config
}

/// Create a test application with the default HTTP settings.
pub async fn test_app() -> TestApp {
    test_app_with(HttpState::default()).await
}

/// Create a test application backed by an in-memory database.
pub async fn test_app_with(http: HttpState) -> TestApp {
    let db = Database::in_memory().await.unwrap();
    let auth_state = AuthState::new(&test_auth_config()).unwrap();

    let team_repo = TeamRepository::new(db.pool().clone());
    let teams = TeamService::new(team_repo, auth_state.hasher().clone());
    let riders = RiderService::new(RiderRepository::new(db.pool().clone()));
    let sponsors = SponsorService::new(SponsorRepository::new(db.pool().clone()));

    let state = api::AppState::new(
        teams.clone(),
        riders.clone(),
        sponsors.clone(),
        auth_state,
        http,
    );
    TestApp {
        router: api::create_router(state),
        teams,
        riders,
        sponsors,
    }
}

/// Valid team attributes, unique per name.
pub fn team_fields(name: &str, email: &str) -> TeamFields {
    TeamFields {
        name: name.to_string(),
        country: "Belgium".to_string(),
        victories: 5,
        points: 2500,
        team_status: "WTT".to_string(),
        abbreviation: "TST".to_string(),
        director: "Patrick Lefevere".to_string(),
        assistant: "Wilfried Peeters".to_string(),
        representative: "Tom Steels".to_string(),
        bike: "Specialized".to_string(),
        overhead_cost: 1_000_000.0,
        email: email.to_string(),
    }
}

/// JSON body for creating a team over HTTP.
pub fn team_payload(name: &str, email: &str) -> Value {
    let mut payload = serde_json::to_value(team_fields(name, email)).unwrap();
    payload["password"] = json!(PASSWORD);
    payload
}

/// Insert a team directly through the service.
pub async fn seed_team(app: &TestApp, name: &str, email: &str, admin: bool) -> TeamInfo {
    let request = CreateTeamRequest {
        fields: team_fields(name, email),
        password: PASSWORD.to_string(),
    };
    if admin {
        app.teams.create_admin(request).await.unwrap()
    } else {
        app.teams.create(request).await.unwrap()
    }
}

/// Rider attributes with the given monthly wage.
pub fn rider_fields(team_id: i64, first_name: &str, last_name: &str, wage: f64) -> RiderFields {
    RiderFields {
        team_id,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        nationality: "Belgium".to_string(),
        birthday: chrono::NaiveDate::from_ymd_opt(1998, 6, 14).unwrap(),
        points: 1500,
        monthly_wage: wage,
    }
}

pub async fn seed_rider(app: &TestApp, team_id: i64, first_name: &str, last_name: &str, wage: f64) -> Rider {
    app.riders
        .create(rider_fields(team_id, first_name, last_name, wage))
        .await
        .unwrap()
}

pub fn sponsor_fields(team_id: i64, name: &str, contribution: i64) -> SponsorFields {
    SponsorFields {
        team_id,
        name: name.to_string(),
        industry: "Energy".to_string(),
        contribution,
    }
}

pub async fn seed_sponsor(app: &TestApp, team_id: i64, name: &str, contribution: i64) -> Sponsor {
    app.sponsors
        .create(sponsor_fields(team_id, name, contribution))
        .await
        .unwrap()
}

/// Sign in over HTTP and return the session token.
pub async fn login_token(app: &TestApp, email: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            "/api/teams/login",
            None,
            json!({ "email": email, "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

/// Build a request without a body.
pub fn request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).method(method);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

/// Build a request with a JSON body.
pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method(method)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

/// Send a request and decode the JSON body (`Null` when empty).
pub async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}
