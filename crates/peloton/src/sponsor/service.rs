//! Sponsor service for business logic.

use serde_json::json;
use tracing::{info, instrument};

use super::models::{Sponsor, SponsorFields, SponsorList};
use super::repository::SponsorRepository;
use crate::api::validation::{field_error, validate_id, validate_len, validate_range};
use crate::api::{ApiError, ApiResult};
use crate::db::StoreError;

/// Service for sponsor management operations.
#[derive(Debug, Clone)]
pub struct SponsorService {
    repo: SponsorRepository,
}

impl SponsorService {
    pub fn new(repo: SponsorRepository) -> Self {
        Self { repo }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> ApiResult<SponsorList> {
        Ok(into_list(self.repo.list().await?))
    }

    #[instrument(skip(self))]
    pub async fn list_for_team(&self, team_id: i64) -> ApiResult<SponsorList> {
        validate_id("team_id", team_id)?;
        Ok(into_list(self.repo.list_for_team(team_id).await?))
    }

    /// Every sponsor going by `name`. Not found when there is none.
    #[instrument(skip(self))]
    pub async fn list_by_name(&self, name: &str) -> ApiResult<SponsorList> {
        let sponsors = self.repo.list_by_name(name).await?;
        if sponsors.is_empty() {
            return Err(ApiError::not_found(format!("No sponsor with name {name} exists"))
                .with_details(json!({ "name": name })));
        }
        Ok(into_list(sponsors))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> ApiResult<Sponsor> {
        validate_id("sponsor_id", id)?;
        self.repo.get(id).await?.ok_or_else(|| sponsor_not_found(id))
    }

    #[instrument(skip(self, fields), fields(team_id = fields.team_id))]
    pub async fn create(&self, fields: SponsorFields) -> ApiResult<Sponsor> {
        validate_fields(&fields)?;
        let sponsor = self
            .repo
            .create(&fields)
            .await
            .map_err(|e| sponsor_store_error(e, fields.team_id))?;
        info!(sponsor_id = sponsor.sponsor_id, team_id = sponsor.team_id, "Created new sponsor");

        Ok(sponsor)
    }

    #[instrument(skip(self, fields))]
    pub async fn update(&self, id: i64, fields: SponsorFields) -> ApiResult<Sponsor> {
        validate_id("sponsor_id", id)?;
        validate_fields(&fields)?;
        let sponsor = self
            .repo
            .update(id, &fields)
            .await
            .map_err(|e| sponsor_store_error(e, fields.team_id))?
            .ok_or_else(|| sponsor_not_found(id))?;
        info!(sponsor_id = id, "Updated sponsor");

        Ok(sponsor)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        validate_id("sponsor_id", id)?;
        if !self.repo.delete(id).await? {
            return Err(sponsor_not_found(id));
        }
        info!(sponsor_id = id, "Deleted sponsor");
        Ok(())
    }
}

fn into_list(items: Vec<Sponsor>) -> SponsorList {
    SponsorList {
        count: items.len(),
        items,
    }
}

fn sponsor_not_found(id: i64) -> ApiError {
    ApiError::not_found(format!("No sponsor with id {} exists", id))
        .with_details(json!({ "id": id }))
}

fn sponsor_store_error(err: StoreError, team_id: i64) -> ApiError {
    match err {
        StoreError::Duplicate(_) => field_error("name", "This sponsor already sponsors this team"),
        StoreError::ForeignKey => ApiError::not_found(format!("No team with id {team_id} exists"))
            .with_details(json!({ "id": team_id })),
        other => ApiError::from(other),
    }
}

fn validate_fields(fields: &SponsorFields) -> ApiResult<()> {
    validate_id("team_id", fields.team_id)?;
    validate_len("name", &fields.name, 1, 99)?;
    validate_len("industry", &fields.industry, 1, 99)?;
    validate_range("contribution", fields.contribution, 100_000, 100_000_000)?;
    Ok(())
}
