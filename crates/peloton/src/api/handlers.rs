//! HTTP request handlers.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::IntoResponse,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::auth::{CurrentSession, can_access};
use crate::rider::{Rider, RiderFields, RiderList};
use crate::sponsor::{Sponsor, SponsorFields, SponsorList};
use crate::team::{
    CreateTeamRequest, LoginRequest, TeamFinancials, TeamFinancialsList, TeamInfo, TeamList,
    UpdateTeamRequest,
};

use super::error::{ApiError, ApiResult};
use super::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub team: TeamInfo,
}

/// Login endpoint.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(request) = payload?;
    let outcome = state.teams.login(&state.auth, request).await?;

    info!(team_id = outcome.identity.team_id, "Team logged in successfully");

    Ok(Json(LoginResponse {
        token: outcome.token,
        team: outcome.identity,
    }))
}

/// Reject access to another team's resource unless the caller is an admin.
///
/// `resource` names what is being protected in the error message.
fn ensure_can_access(current: &CurrentSession, team_id: i64, resource: &str) -> ApiResult<()> {
    if can_access(&current.session, team_id) {
        return Ok(());
    }
    warn!(
        identity_id = current.identity_id(),
        team_id, resource, "Denied access to another team's information"
    );
    Err(ApiError::forbidden(format!(
        "You are not allowed to view this {resource}'s information"
    )))
}

/// List all teams.
#[instrument(skip(state, _current))]
pub async fn list_teams(
    State(state): State<AppState>,
    _current: CurrentSession,
) -> ApiResult<Json<TeamList>> {
    Ok(Json(state.teams.list().await?))
}

/// Get a team by ID.
#[instrument(skip(state, current))]
pub async fn get_team(
    State(state): State<AppState>,
    current: CurrentSession,
    team_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<TeamInfo>> {
    let Path(team_id) = team_id?;
    ensure_can_access(&current, team_id, "team")?;
    Ok(Json(state.teams.get(team_id).await?))
}

/// Get a team by its unique name.
#[instrument(skip(state, _current))]
pub async fn get_team_by_name(
    State(state): State<AppState>,
    _current: CurrentSession,
    Path(name): Path<String>,
) -> ApiResult<Json<TeamInfo>> {
    Ok(Json(state.teams.get_by_name(&name).await?))
}

/// Create a team (admin only).
#[instrument(skip(state, current, payload))]
pub async fn create_team(
    State(state): State<AppState>,
    current: CurrentSession,
    payload: Result<Json<CreateTeamRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let team = state.teams.create(request).await?;

    info!(
        admin_id = current.identity_id(),
        team_id = team.team_id,
        "Team created"
    );

    Ok((StatusCode::CREATED, Json(team)))
}

/// Update a team (owner or admin).
#[instrument(skip(state, current, payload))]
pub async fn update_team(
    State(state): State<AppState>,
    current: CurrentSession,
    team_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateTeamRequest>, JsonRejection>,
) -> ApiResult<Json<TeamInfo>> {
    let Path(team_id) = team_id?;
    ensure_can_access(&current, team_id, "team")?;
    let Json(request) = payload?;
    Ok(Json(state.teams.update(team_id, request).await?))
}

/// Delete a team (admin only).
#[instrument(skip(state, current))]
pub async fn delete_team(
    State(state): State<AppState>,
    current: CurrentSession,
    team_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(team_id) = team_id?;
    state.teams.delete(team_id).await?;

    info!(admin_id = current.identity_id(), team_id, "Team deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Team with its riders, sponsors and financial aggregates.
#[derive(Debug, Serialize)]
pub struct TeamDetails {
    #[serde(flatten)]
    pub team: TeamFinancials,
    pub riders: Vec<Rider>,
    pub sponsors: Vec<Sponsor>,
}

/// Get a team with its riders, sponsors, budget and rider cost (owner or
/// admin).
#[instrument(skip(state, current))]
pub async fn get_team_details(
    State(state): State<AppState>,
    current: CurrentSession,
    team_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<TeamDetails>> {
    let Path(team_id) = team_id?;
    ensure_can_access(&current, team_id, "team")?;

    let team = state.teams.get_financials(team_id).await?;
    let riders = state.riders.list_for_team(team_id).await?;
    let sponsors = state.sponsors.list_for_team(team_id).await?;

    Ok(Json(TeamDetails {
        team,
        riders: riders.items,
        sponsors: sponsors.items,
    }))
}

/// All teams with budget and rider cost (admin only).
#[instrument(skip(state, _current))]
pub async fn list_team_financials(
    State(state): State<AppState>,
    _current: CurrentSession,
) -> ApiResult<Json<TeamFinancialsList>> {
    Ok(Json(state.teams.list_financials().await?))
}

/// Riders of one team (owner or admin).
#[instrument(skip(state, current))]
pub async fn list_team_riders(
    State(state): State<AppState>,
    current: CurrentSession,
    team_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<RiderList>> {
    let Path(team_id) = team_id?;
    ensure_can_access(&current, team_id, "team")?;
    state.teams.ensure_exists(team_id).await?;
    Ok(Json(state.riders.list_for_team(team_id).await?))
}

/// Sponsors of one team (owner or admin).
#[instrument(skip(state, current))]
pub async fn list_team_sponsors(
    State(state): State<AppState>,
    current: CurrentSession,
    team_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<SponsorList>> {
    let Path(team_id) = team_id?;
    ensure_can_access(&current, team_id, "team")?;
    state.teams.ensure_exists(team_id).await?;
    Ok(Json(state.sponsors.list_for_team(team_id).await?))
}

#[instrument(skip(state, _current))]
pub async fn list_riders(
    State(state): State<AppState>,
    _current: CurrentSession,
) -> ApiResult<Json<RiderList>> {
    Ok(Json(state.riders.list().await?))
}

/// Get a rider by ID (owner of the rider's team or admin).
#[instrument(skip(state, current))]
pub async fn get_rider(
    State(state): State<AppState>,
    current: CurrentSession,
    rider_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Rider>> {
    let Path(rider_id) = rider_id?;
    let rider = state.riders.get(rider_id).await?;
    ensure_can_access(&current, rider.team_id, "rider")?;
    Ok(Json(rider))
}

#[instrument(skip(state, _current))]
pub async fn get_rider_by_full_name(
    State(state): State<AppState>,
    _current: CurrentSession,
    names: Result<Path<(String, String)>, PathRejection>,
) -> ApiResult<Json<Rider>> {
    let Path((first_name, last_name)) = names?;
    Ok(Json(state.riders.get_by_full_name(&first_name, &last_name).await?))
}

/// Create a rider (admin only).
#[instrument(skip(state, current, payload))]
pub async fn create_rider(
    State(state): State<AppState>,
    current: CurrentSession,
    payload: Result<Json<RiderFields>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let rider = state.riders.create(request).await?;

    info!(
        admin_id = current.identity_id(),
        rider_id = rider.rider_id,
        "Rider created"
    );

    Ok((StatusCode::CREATED, Json(rider)))
}

/// Update a rider (owner or admin). Moving a rider requires access to the
/// receiving team as well.
#[instrument(skip(state, current, payload))]
pub async fn update_rider(
    State(state): State<AppState>,
    current: CurrentSession,
    rider_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<RiderFields>, JsonRejection>,
) -> ApiResult<Json<Rider>> {
    let Path(rider_id) = rider_id?;
    let existing = state.riders.get(rider_id).await?;
    ensure_can_access(&current, existing.team_id, "rider")?;
    let Json(request) = payload?;
    ensure_can_access(&current, request.team_id, "team")?;
    Ok(Json(state.riders.update(rider_id, request).await?))
}

/// Delete a rider (admin only).
#[instrument(skip(state, current))]
pub async fn delete_rider(
    State(state): State<AppState>,
    current: CurrentSession,
    rider_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(rider_id) = rider_id?;
    state.riders.delete(rider_id).await?;

    info!(admin_id = current.identity_id(), rider_id, "Rider deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, _current))]
pub async fn list_sponsors(
    State(state): State<AppState>,
    _current: CurrentSession,
) -> ApiResult<Json<SponsorList>> {
    Ok(Json(state.sponsors.list().await?))
}

/// Get a sponsor by ID (owner of the sponsored team or admin).
#[instrument(skip(state, current))]
pub async fn get_sponsor(
    State(state): State<AppState>,
    current: CurrentSession,
    sponsor_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Sponsor>> {
    let Path(sponsor_id) = sponsor_id?;
    let sponsor = state.sponsors.get(sponsor_id).await?;
    ensure_can_access(&current, sponsor.team_id, "sponsor")?;
    Ok(Json(sponsor))
}

#[instrument(skip(state, _current))]
pub async fn list_sponsors_by_name(
    State(state): State<AppState>,
    _current: CurrentSession,
    Path(name): Path<String>,
) -> ApiResult<Json<SponsorList>> {
    Ok(Json(state.sponsors.list_by_name(&name).await?))
}

/// Create a sponsor (admin only).
#[instrument(skip(state, current, payload))]
pub async fn create_sponsor(
    State(state): State<AppState>,
    current: CurrentSession,
    payload: Result<Json<SponsorFields>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let sponsor = state.sponsors.create(request).await?;

    info!(
        admin_id = current.identity_id(),
        sponsor_id = sponsor.sponsor_id,
        "Sponsor created"
    );

    Ok((StatusCode::CREATED, Json(sponsor)))
}

/// Update a sponsor (owner or admin).
#[instrument(skip(state, current, payload))]
pub async fn update_sponsor(
    State(state): State<AppState>,
    current: CurrentSession,
    sponsor_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<SponsorFields>, JsonRejection>,
) -> ApiResult<Json<Sponsor>> {
    let Path(sponsor_id) = sponsor_id?;
    let existing = state.sponsors.get(sponsor_id).await?;
    ensure_can_access(&current, existing.team_id, "sponsor")?;
    let Json(request) = payload?;
    ensure_can_access(&current, request.team_id, "team")?;
    Ok(Json(state.sponsors.update(sponsor_id, request).await?))
}

/// Delete a sponsor (admin only).
#[instrument(skip(state, current))]
pub async fn delete_sponsor(
    State(state): State<AppState>,
    current: CurrentSession,
    sponsor_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(sponsor_id) = sponsor_id?;
    state.sponsors.delete(sponsor_id).await?;

    info!(admin_id = current.identity_id(), sponsor_id, "Sponsor deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Fallback for unmatched routes.
pub async fn unknown_resource(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Unknown resource: {}", uri.path()))
}
