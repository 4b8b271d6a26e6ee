//! Team service for business logic.

use serde_json::json;
use tracing::{info, instrument, warn};

use super::models::{
    CreateTeamRequest, LoginRequest, NewTeam, RoleSet, Team, TeamFields, TeamFinancials,
    TeamFinancialsList, TeamInfo, TeamList, UpdateTeamRequest,
};
use super::repository::TeamRepository;
use crate::api::validation::{
    field_error, is_valid_email, validate_amount, validate_id, validate_len, validate_range,
};
use crate::api::{ApiError, ApiResult};
use crate::auth::{self, AuthState, LoginOutcome, PasswordHasher};
use crate::db::StoreError;

/// Service for team management operations.
#[derive(Debug, Clone)]
pub struct TeamService {
    repo: TeamRepository,
    hasher: PasswordHasher,
}

impl TeamService {
    pub fn new(repo: TeamRepository, hasher: PasswordHasher) -> Self {
        Self { repo, hasher }
    }

    /// Sign a team in with its email and password.
    #[instrument(skip(self, auth, request), fields(email = %request.email))]
    pub async fn login(
        &self,
        auth: &AuthState,
        request: LoginRequest,
    ) -> ApiResult<LoginOutcome<TeamInfo>> {
        if !is_valid_email(&request.email) {
            return Err(field_error("email", "email must be a valid email"));
        }
        if request.password.is_empty() {
            return Err(field_error("password", "password is required"));
        }

        Ok(auth::login(auth, &self.repo, &request.email, &request.password).await?)
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> ApiResult<TeamList> {
        let items: Vec<TeamInfo> = self
            .repo
            .list()
            .await?
            .into_iter()
            .map(TeamInfo::from)
            .collect();
        Ok(TeamList {
            count: items.len(),
            items,
        })
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> ApiResult<TeamInfo> {
        validate_id("team_id", id)?;
        self.repo
            .get(id)
            .await?
            .map(TeamInfo::from)
            .ok_or_else(|| team_not_found(id))
    }

    #[instrument(skip(self))]
    pub async fn get_by_name(&self, name: &str) -> ApiResult<TeamInfo> {
        self.repo
            .get_by_name(name)
            .await?
            .map(TeamInfo::from)
            .ok_or_else(|| {
                ApiError::not_found(format!("No team with name {} exists", name))
                    .with_details(json!({ "name": name }))
            })
    }

    /// A team with its sponsor budget and yearly rider cost.
    #[instrument(skip(self))]
    pub async fn get_financials(&self, id: i64) -> ApiResult<TeamFinancials> {
        validate_id("team_id", id)?;
        self.repo
            .get_with_financials(id)
            .await?
            .map(TeamFinancials::from)
            .ok_or_else(|| team_not_found(id))
    }

    /// Every team with its sponsor budget and yearly rider cost.
    #[instrument(skip(self))]
    pub async fn list_financials(&self) -> ApiResult<TeamFinancialsList> {
        let items: Vec<TeamFinancials> = self
            .repo
            .list_with_financials()
            .await?
            .into_iter()
            .map(TeamFinancials::from)
            .collect();
        Ok(TeamFinancialsList {
            count: items.len(),
            items,
        })
    }

    /// Fails with not found unless the team exists.
    pub async fn ensure_exists(&self, id: i64) -> ApiResult<()> {
        validate_id("team_id", id)?;
        match self.repo.get(id).await? {
            Some(_) => Ok(()),
            None => Err(team_not_found(id)),
        }
    }

    /// Create a team account with the representative role.
    #[instrument(skip(self, request), fields(name = %request.fields.name))]
    pub async fn create(&self, request: CreateTeamRequest) -> ApiResult<TeamInfo> {
        let team = self.create_with_roles(request, RoleSet::representative()).await?;
        Ok(TeamInfo::from(team))
    }

    /// Create a team account holding the admin role as well.
    #[instrument(skip(self, request), fields(name = %request.fields.name))]
    pub async fn create_admin(&self, request: CreateTeamRequest) -> ApiResult<TeamInfo> {
        let team = self.create_with_roles(request, RoleSet::admin()).await?;
        Ok(TeamInfo::from(team))
    }

    async fn create_with_roles(&self, request: CreateTeamRequest, roles: RoleSet) -> ApiResult<Team> {
        validate_fields(&request.fields)?;
        validate_password(&request.password)?;
        self.ensure_unique(&request.fields, None).await?;

        let password_hash = self
            .hasher
            .hash_blocking(request.password)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;

        // The lookup above races with concurrent writers, the unique
        // indexes have the final say.
        let team = self
            .repo
            .create(NewTeam {
                fields: request.fields,
                password_hash,
                roles,
            })
            .await
            .map_err(team_store_error)?;
        info!(team_id = team.team_id, name = %team.name, "Created new team");

        Ok(team)
    }

    #[instrument(skip(self, request))]
    pub async fn update(&self, id: i64, request: UpdateTeamRequest) -> ApiResult<TeamInfo> {
        validate_id("team_id", id)?;
        validate_fields(&request)?;
        if self.repo.get(id).await?.is_none() {
            return Err(team_not_found(id));
        }
        self.ensure_unique(&request, Some(id)).await?;

        let team = self
            .repo
            .update(id, &request)
            .await
            .map_err(team_store_error)?
            .ok_or_else(|| team_not_found(id))?;
        info!(team_id = id, "Updated team");

        Ok(TeamInfo::from(team))
    }

    /// Delete a team. Teams that still have riders or sponsors are kept.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        validate_id("team_id", id)?;
        let deleted = self.repo.delete(id).await.map_err(|err| match err {
            StoreError::ForeignKey => {
                warn!(team_id = id, "Refusing to delete team with riders or sponsors");
                ApiError::validation_failed("This team still has riders or sponsors")
                    .with_details(json!({ "id": id }))
            }
            other => team_store_error(other),
        })?;
        if !deleted {
            return Err(team_not_found(id));
        }
        info!(team_id = id, "Deleted team");
        Ok(())
    }

    /// Name and email are unique across teams, `current` excludes the team
    /// being updated.
    async fn ensure_unique(&self, fields: &TeamFields, current: Option<i64>) -> ApiResult<()> {
        if let Some(existing) = self.repo.get_by_name(&fields.name).await? {
            if Some(existing.team_id) != current {
                return Err(duplicate_error("name"));
            }
        }
        if let Some(existing) = self.repo.get_by_email(&fields.email).await? {
            if Some(existing.team_id) != current {
                return Err(duplicate_error("email"));
            }
        }
        Ok(())
    }
}

fn team_not_found(id: i64) -> ApiError {
    ApiError::not_found(format!("No team with id {} exists", id)).with_details(json!({ "id": id }))
}

fn duplicate_error(field: &str) -> ApiError {
    field_error(field, format!("A team with this {field} already exists"))
}

fn team_store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::Duplicate(column) if column == "email" => duplicate_error("email"),
        StoreError::Duplicate(_) => duplicate_error("name"),
        other => ApiError::from(other),
    }
}

fn validate_fields(fields: &TeamFields) -> ApiResult<()> {
    validate_len("name", &fields.name, 1, 99)?;
    validate_len("country", &fields.country, 1, 50)?;
    validate_range("victories", fields.victories, 0, 250)?;
    validate_range("points", fields.points, 0, 1_000_000)?;
    validate_len("team_status", &fields.team_status, 3, 3)?;
    validate_len("abbreviation", &fields.abbreviation, 3, 3)?;
    validate_len("director", &fields.director, 1, 99)?;
    validate_len("assistant", &fields.assistant, 1, 99)?;
    validate_len("representative", &fields.representative, 1, 99)?;
    validate_len("bike", &fields.bike, 1, 50)?;
    validate_amount("overhead_cost", fields.overhead_cost, 100_000.0, 50_000_000.0)?;
    if !is_valid_email(&fields.email) {
        return Err(field_error("email", "email must be a valid email"));
    }
    Ok(())
}

fn validate_password(password: &str) -> ApiResult<()> {
    let len = password.chars().count();
    if !(8..=60).contains(&len) {
        return Err(field_error(
            "password",
            "password must be between 8 and 60 characters",
        ));
    }
    Ok(())
}
