//! Rider repository for database operations.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::models::{Rider, RiderFields};
use crate::db::StoreError;

const RIDER_COLUMNS: &str = r#"
    rider_id, team_id, first_name, last_name, nationality, birthday, points, monthly_wage
"#;

/// Repository for rider database operations.
#[derive(Debug, Clone)]
pub struct RiderRepository {
    pool: SqlitePool,
}

impl RiderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a rider. An unknown team is [`StoreError::ForeignKey`].
    #[instrument(skip(self, fields), fields(team_id = fields.team_id))]
    pub async fn create(&self, fields: &RiderFields) -> Result<Rider, StoreError> {
        debug!("Creating rider: {} {}", fields.first_name, fields.last_name);

        let result = sqlx::query(
            r#"
            INSERT INTO riders (team_id, first_name, last_name, nationality, birthday,
                                points, monthly_wage)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(fields.team_id)
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.nationality)
        .bind(fields.birthday.to_string())
        .bind(fields.points)
        .bind(fields.monthly_wage)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_write(e, "Failed to insert rider"))?;

        let id = result.last_insert_rowid();
        let created = self
            .get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Rider not found after creation"))?;
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<Rider>> {
        let query = format!("SELECT {RIDER_COLUMNS} FROM riders WHERE rider_id = ?");
        let rider = sqlx::query_as::<_, Rider>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch rider")?;

        Ok(rider)
    }

    #[instrument(skip(self))]
    pub async fn get_by_full_name(&self, first_name: &str, last_name: &str) -> Result<Option<Rider>> {
        let query = format!(
            "SELECT {RIDER_COLUMNS} FROM riders WHERE first_name = ? AND last_name = ? \
             ORDER BY rider_id LIMIT 1"
        );
        let rider = sqlx::query_as::<_, Rider>(&query)
            .bind(first_name)
            .bind(last_name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch rider by name")?;

        Ok(rider)
    }

    /// All riders ordered by last then first name.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Rider>> {
        let query =
            format!("SELECT {RIDER_COLUMNS} FROM riders ORDER BY last_name ASC, first_name ASC");
        let riders = sqlx::query_as::<_, Rider>(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list riders")?;

        Ok(riders)
    }

    #[instrument(skip(self))]
    pub async fn list_for_team(&self, team_id: i64) -> Result<Vec<Rider>> {
        let query = format!(
            "SELECT {RIDER_COLUMNS} FROM riders WHERE team_id = ? \
             ORDER BY last_name ASC, first_name ASC"
        );
        let riders = sqlx::query_as::<_, Rider>(&query)
            .bind(team_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list team riders")?;

        Ok(riders)
    }

    /// Replace every attribute of a rider. Returns `None` when the rider does
    /// not exist.
    #[instrument(skip(self, fields))]
    pub async fn update(&self, id: i64, fields: &RiderFields) -> Result<Option<Rider>, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE riders
            SET team_id = ?, first_name = ?, last_name = ?, nationality = ?, birthday = ?,
                points = ?, monthly_wage = ?, updated_at = datetime('now')
            WHERE rider_id = ?
            "#,
        )
        .bind(fields.team_id)
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.nationality)
        .bind(fields.birthday.to_string())
        .bind(fields.points)
        .bind(fields.monthly_wage)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_write(e, "Failed to update rider"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(self.get(id).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM riders WHERE rider_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete rider")?;

        Ok(result.rows_affected() > 0)
    }
}
