//! API integration tests.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use peloton::api::HttpState;
use serde_json::{Value, json};

mod common;
use common::{
    PASSWORD, json_request, login_token, request, seed_team, send, team_payload, test_app,
    test_app_with,
};

/// Test that health endpoint works without authentication.
#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app().await;

    let (status, json) = send(&app, request(Method::GET, "/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_login_success_returns_token_and_redacted_team() {
    let app = test_app().await;
    let team = seed_team(&app, "Lotto Dstny", "lotto@example.com", false).await;

    let (status, json) = send(
        &app,
        json_request(
            Method::POST,
            "/api/teams/login",
            None,
            json!({ "email": "lotto@example.com", "password": PASSWORD }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["token"].is_string());
    assert_eq!(json["team"]["team_id"], team.team_id);
    assert_eq!(json["team"]["roles"], json!(["TEAM_REPRESENTATIVE"]));
    assert!(json["team"].get("password_hash").is_none());
    assert!(json["team"].get("password").is_none());
}

/// Unknown email and wrong password must be indistinguishable.
#[tokio::test]
async fn test_login_failures_are_identical() {
    let app = test_app().await;
    seed_team(&app, "Lotto Dstny", "lotto@example.com", false).await;

    let (wrong_status, wrong_password) = send(
        &app,
        json_request(
            Method::POST,
            "/api/teams/login",
            None,
            json!({ "email": "lotto@example.com", "password": "not-the-password" }),
        ),
    )
    .await;
    let (unknown_status, unknown_email) = send(
        &app,
        json_request(
            Method::POST,
            "/api/teams/login",
            None,
            json!({ "email": "nobody@example.com", "password": PASSWORD }),
        ),
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_email);
    assert_eq!(wrong_password["code"], "UNAUTHORIZED");
    assert_eq!(
        wrong_password["message"],
        "The given email or password do not match"
    );
}

#[tokio::test]
async fn test_login_rejects_malformed_body() {
    let app = test_app().await;

    let (status, json) = send(
        &app,
        Request::builder()
            .uri("/api/teams/login")
            .method(Method::POST)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_missing_authorization_header() {
    let app = test_app().await;

    let (status, json) = send(&app, request(Method::GET, "/api/teams", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");
    assert_eq!(json["message"], "You need to be signed in");
    assert_eq!(json["details"], json!({}));
}

#[tokio::test]
async fn test_non_bearer_authorization_header() {
    let app = test_app().await;

    let (status, json) = send(
        &app,
        Request::builder()
            .uri("/api/teams")
            .method(Method::GET)
            .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["message"], "Invalid authentication token");
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let app = test_app().await;

    let (status, json) = send(
        &app,
        request(Method::GET, "/api/teams", Some("not.a.token")),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["message"], "Invalid authentication token");
}

#[tokio::test]
async fn test_list_teams_with_token() {
    let app = test_app().await;
    seed_team(&app, "Lotto Dstny", "lotto@example.com", false).await;
    seed_team(&app, "Alpecin", "alpecin@example.com", false).await;
    let token = login_token(&app, "lotto@example.com").await;

    let (status, json) = send(&app, request(Method::GET, "/api/teams", Some(&token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    let names: Vec<&str> = json["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Alpecin", "Lotto Dstny"]);
}

#[tokio::test]
async fn test_get_team_owner_or_admin() {
    let app = test_app().await;
    let own = seed_team(&app, "Lotto Dstny", "lotto@example.com", false).await;
    let other = seed_team(&app, "Alpecin", "alpecin@example.com", false).await;
    seed_team(&app, "UCI", "uci@example.com", true).await;

    let token = login_token(&app, "lotto@example.com").await;

    let (status, json) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/teams/{}", own.team_id),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Lotto Dstny");

    let (status, json) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/teams/{}", other.team_id),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        json["message"],
        "You are not allowed to view this team's information"
    );

    let admin_token = login_token(&app, "uci@example.com").await;
    let (status, json) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/teams/{}", other.team_id),
            Some(&admin_token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Alpecin");
}

#[tokio::test]
async fn test_get_missing_team_for_admin() {
    let app = test_app().await;
    seed_team(&app, "UCI", "uci@example.com", true).await;
    let token = login_token(&app, "uci@example.com").await;

    let (status, json) = send(&app, request(Method::GET, "/api/teams/999", Some(&token))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["message"], "No team with id 999 exists");
    assert_eq!(json["details"]["id"], 999);
}

#[tokio::test]
async fn test_non_numeric_team_id_is_a_validation_error() {
    let app = test_app().await;
    seed_team(&app, "UCI", "uci@example.com", true).await;
    let token = login_token(&app, "uci@example.com").await;

    let (status, json) = send(&app, request(Method::GET, "/api/teams/abc", Some(&token))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_get_team_by_name() {
    let app = test_app().await;
    seed_team(&app, "Lotto Dstny", "lotto@example.com", false).await;
    let token = login_token(&app, "lotto@example.com").await;

    let (status, json) = send(
        &app,
        request(Method::GET, "/api/teams/name/Lotto%20Dstny", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["email"], "lotto@example.com");

    let (status, _) = send(
        &app,
        request(Method::GET, "/api/teams/name/Nobody", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_team_requires_admin() {
    let app = test_app().await;
    seed_team(&app, "Lotto Dstny", "lotto@example.com", false).await;
    let token = login_token(&app, "lotto@example.com").await;

    let (status, json) = send(
        &app,
        json_request(
            Method::POST,
            "/api/teams",
            Some(&token),
            team_payload("Alpecin", "alpecin@example.com"),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "FORBIDDEN");
    assert_eq!(
        json["message"],
        "you are not allowed to view this part of the application"
    );
}

#[tokio::test]
async fn test_admin_creates_team_that_can_sign_in() {
    let app = test_app().await;
    seed_team(&app, "UCI", "uci@example.com", true).await;
    let token = login_token(&app, "uci@example.com").await;

    let (status, json) = send(
        &app,
        json_request(
            Method::POST,
            "/api/teams",
            Some(&token),
            team_payload("Alpecin", "alpecin@example.com"),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["name"], "Alpecin");
    assert_eq!(json["roles"], json!(["TEAM_REPRESENTATIVE"]));
    assert!(json.get("password_hash").is_none());

    let new_token = login_token(&app, "alpecin@example.com").await;
    assert!(!new_token.is_empty());
}

#[tokio::test]
async fn test_create_team_validation() {
    let app = test_app().await;
    seed_team(&app, "UCI", "uci@example.com", true).await;
    let token = login_token(&app, "uci@example.com").await;

    let mut payload = team_payload("Alpecin", "alpecin@example.com");
    payload["abbreviation"] = json!("TOOLONG");

    let (status, json) = send(
        &app,
        json_request(Method::POST, "/api/teams", Some(&token), payload),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_FAILED");
    assert_eq!(json["details"]["field"], "abbreviation");

    let (status, json) = send(
        &app,
        json_request(
            Method::POST,
            "/api/teams",
            Some(&token),
            team_payload("UCI", "other@example.com"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "A team with this name already exists");
}

#[tokio::test]
async fn test_owner_updates_own_team() {
    let app = test_app().await;
    let own = seed_team(&app, "Lotto Dstny", "lotto@example.com", false).await;
    let other = seed_team(&app, "Alpecin", "alpecin@example.com", false).await;
    let token = login_token(&app, "lotto@example.com").await;

    let mut payload = team_payload("Lotto Dstny", "lotto@example.com");
    payload["points"] = json!(9000);

    let (status, json) = send(
        &app,
        json_request(
            Method::PUT,
            &format!("/api/teams/{}", own.team_id),
            Some(&token),
            payload.clone(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["points"], 9000);

    let (status, _) = send(
        &app,
        json_request(
            Method::PUT,
            &format!("/api/teams/{}", other.team_id),
            Some(&token),
            payload,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_team() {
    let app = test_app().await;
    let target = seed_team(&app, "Lotto Dstny", "lotto@example.com", false).await;
    seed_team(&app, "UCI", "uci@example.com", true).await;

    let rep_token = login_token(&app, "lotto@example.com").await;
    let uri = format!("/api/teams/{}", target.team_id);

    let (status, _) = send(&app, request(Method::DELETE, &uri, Some(&rep_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin_token = login_token(&app, "uci@example.com").await;
    let (status, body) = send(&app, request(Method::DELETE, &uri, Some(&admin_token))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, request(Method::DELETE, &uri, Some(&admin_token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = test_app().await;

    let (status, json) = send(&app, request(Method::GET, "/nope", None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["message"], "Unknown resource: /nope");
}

#[tokio::test]
async fn test_error_stack_hidden_by_default() {
    let app = test_app().await;

    let (_, json) = send(&app, request(Method::GET, "/api/teams", None)).await;

    assert!(json.get("stack").is_none());
}

#[tokio::test]
async fn test_error_stack_exposed_outside_production() {
    let app = test_app_with(HttpState {
        expose_error_stack: true,
        ..HttpState::default()
    })
    .await;

    let (status, json) = send(&app, request(Method::GET, "/api/teams", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["message"], "You need to be signed in");
    assert!(json["stack"].as_str().unwrap().contains("MissingCredentials"));
}

#[tokio::test]
async fn test_cors_preflight_for_configured_origin() {
    let app = test_app().await;

    let (status, _) = send(
        &app,
        Request::builder()
            .uri("/api/teams")
            .method(Method::OPTIONS)
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    // Answered by the CORS layer before authentication runs
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cors_allow_origin_header() {
    use tower::ServiceExt;

    let app = test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .method(Method::GET)
                .header(header::ORIGIN, "http://localhost:5173")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
}
