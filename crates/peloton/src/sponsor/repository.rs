//! Sponsor repository for database operations.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::models::{Sponsor, SponsorFields};
use crate::db::StoreError;

const SPONSOR_COLUMNS: &str = "sponsor_id, team_id, name, industry, contribution";

/// Repository for sponsor database operations.
#[derive(Debug, Clone)]
pub struct SponsorRepository {
    pool: SqlitePool,
}

impl SponsorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a sponsor. A name already sponsoring the team is
    /// [`StoreError::Duplicate`], an unknown team [`StoreError::ForeignKey`].
    #[instrument(skip(self, fields), fields(team_id = fields.team_id))]
    pub async fn create(&self, fields: &SponsorFields) -> Result<Sponsor, StoreError> {
        debug!("Creating sponsor: {}", fields.name);

        let result = sqlx::query(
            "INSERT INTO sponsors (team_id, name, industry, contribution) VALUES (?, ?, ?, ?)",
        )
        .bind(fields.team_id)
        .bind(&fields.name)
        .bind(&fields.industry)
        .bind(fields.contribution)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_write(e, "Failed to insert sponsor"))?;

        let id = result.last_insert_rowid();
        let created = self
            .get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Sponsor not found after creation"))?;
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<Sponsor>> {
        let query = format!("SELECT {SPONSOR_COLUMNS} FROM sponsors WHERE sponsor_id = ?");
        let sponsor = sqlx::query_as::<_, Sponsor>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch sponsor")?;

        Ok(sponsor)
    }

    /// Sponsors with this exact name, across teams.
    #[instrument(skip(self))]
    pub async fn list_by_name(&self, name: &str) -> Result<Vec<Sponsor>> {
        let query = format!(
            "SELECT {SPONSOR_COLUMNS} FROM sponsors WHERE name = ? ORDER BY team_id ASC"
        );
        let sponsors = sqlx::query_as::<_, Sponsor>(&query)
            .bind(name)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch sponsors by name")?;

        Ok(sponsors)
    }

    /// All sponsors ordered by name.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Sponsor>> {
        let query = format!("SELECT {SPONSOR_COLUMNS} FROM sponsors ORDER BY name ASC");
        let sponsors = sqlx::query_as::<_, Sponsor>(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list sponsors")?;

        Ok(sponsors)
    }

    #[instrument(skip(self))]
    pub async fn list_for_team(&self, team_id: i64) -> Result<Vec<Sponsor>> {
        let query = format!(
            "SELECT {SPONSOR_COLUMNS} FROM sponsors WHERE team_id = ? ORDER BY name ASC"
        );
        let sponsors = sqlx::query_as::<_, Sponsor>(&query)
            .bind(team_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list team sponsors")?;

        Ok(sponsors)
    }

    /// Replace every attribute of a sponsor. Returns `None` when the sponsor
    /// does not exist.
    #[instrument(skip(self, fields))]
    pub async fn update(
        &self,
        id: i64,
        fields: &SponsorFields,
    ) -> Result<Option<Sponsor>, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE sponsors
            SET team_id = ?, name = ?, industry = ?, contribution = ?,
                updated_at = datetime('now')
            WHERE sponsor_id = ?
            "#,
        )
        .bind(fields.team_id)
        .bind(&fields.name)
        .bind(&fields.industry)
        .bind(fields.contribution)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_write(e, "Failed to update sponsor"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(self.get(id).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sponsors WHERE sponsor_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete sponsor")?;

        Ok(result.rows_affected() > 0)
    }
}
