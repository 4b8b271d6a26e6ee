//! Rider service for business logic.

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tracing::{info, instrument};

use super::models::{Rider, RiderFields, RiderList};
use super::repository::RiderRepository;
use crate::api::validation::{
    field_error, validate_amount, validate_id, validate_len, validate_range,
};
use crate::api::{ApiError, ApiResult};
use crate::db::StoreError;

/// Service for rider management operations.
#[derive(Debug, Clone)]
pub struct RiderService {
    repo: RiderRepository,
}

impl RiderService {
    pub fn new(repo: RiderRepository) -> Self {
        Self { repo }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> ApiResult<RiderList> {
        Ok(into_list(self.repo.list().await?))
    }

    #[instrument(skip(self))]
    pub async fn list_for_team(&self, team_id: i64) -> ApiResult<RiderList> {
        validate_id("team_id", team_id)?;
        Ok(into_list(self.repo.list_for_team(team_id).await?))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> ApiResult<Rider> {
        validate_id("rider_id", id)?;
        self.repo.get(id).await?.ok_or_else(|| rider_not_found(id))
    }

    #[instrument(skip(self))]
    pub async fn get_by_full_name(&self, first_name: &str, last_name: &str) -> ApiResult<Rider> {
        self.repo
            .get_by_full_name(first_name, last_name)
            .await?
            .ok_or_else(|| {
                ApiError::not_found(format!("No rider called {first_name} {last_name} exists"))
                    .with_details(json!({ "first_name": first_name, "last_name": last_name }))
            })
    }

    #[instrument(skip(self, fields), fields(team_id = fields.team_id))]
    pub async fn create(&self, fields: RiderFields) -> ApiResult<Rider> {
        validate_fields(&fields, today())?;
        let rider = self
            .repo
            .create(&fields)
            .await
            .map_err(|e| rider_store_error(e, fields.team_id))?;
        info!(rider_id = rider.rider_id, team_id = rider.team_id, "Created new rider");

        Ok(rider)
    }

    #[instrument(skip(self, fields))]
    pub async fn update(&self, id: i64, fields: RiderFields) -> ApiResult<Rider> {
        validate_id("rider_id", id)?;
        validate_fields(&fields, today())?;
        let rider = self
            .repo
            .update(id, &fields)
            .await
            .map_err(|e| rider_store_error(e, fields.team_id))?
            .ok_or_else(|| rider_not_found(id))?;
        info!(rider_id = id, "Updated rider");

        Ok(rider)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        validate_id("rider_id", id)?;
        if !self.repo.delete(id).await? {
            return Err(rider_not_found(id));
        }
        info!(rider_id = id, "Deleted rider");
        Ok(())
    }
}

fn into_list(items: Vec<Rider>) -> RiderList {
    RiderList {
        count: items.len(),
        items,
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn rider_not_found(id: i64) -> ApiError {
    ApiError::not_found(format!("No rider with id {} exists", id)).with_details(json!({ "id": id }))
}

fn rider_store_error(err: StoreError, team_id: i64) -> ApiError {
    match err {
        StoreError::ForeignKey => ApiError::not_found(format!("No team with id {team_id} exists"))
            .with_details(json!({ "id": team_id })),
        other => ApiError::from(other),
    }
}

fn validate_fields(fields: &RiderFields, today: NaiveDate) -> ApiResult<()> {
    validate_id("team_id", fields.team_id)?;
    validate_len("first_name", &fields.first_name, 1, 50)?;
    validate_len("last_name", &fields.last_name, 1, 50)?;
    validate_len("nationality", &fields.nationality, 1, 50)?;
    // NaiveDate's default is 1970-01-01.
    if fields.birthday <= NaiveDate::default() || fields.birthday > today {
        return Err(field_error(
            "birthday",
            "birthday must be after 1970-01-01 and not in the future",
        ));
    }
    validate_range("points", fields.points, 0, 1_000_000)?;
    validate_amount("monthly_wage", fields.monthly_wage, 0.0, 1_000_000.0)?;
    Ok(())
}
