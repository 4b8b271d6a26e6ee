//! Team repository for database operations.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::models::{NewTeam, Team, TeamFields, TeamWithFinancials};
use crate::auth::IdentityStore;
use crate::db::StoreError;

const TEAM_COLUMNS: &str = r#"
    team_id, name, country, victories, points, team_status, abbreviation,
    director, assistant, representative, bike, overhead_cost, email,
    password_hash, roles, created_at, updated_at
"#;

const FINANCIALS_SELECT: &str = r#"
    SELECT t.team_id, t.name, t.country, t.victories, t.points, t.team_status,
           t.abbreviation, t.director, t.assistant, t.representative, t.bike,
           t.overhead_cost, t.email, t.password_hash, t.roles, t.created_at, t.updated_at,
           CAST(COALESCE((SELECT SUM(s.contribution) FROM sponsors s
                          WHERE s.team_id = t.team_id), 0) AS INTEGER) AS budget,
           CAST(COALESCE((SELECT SUM(r.monthly_wage * 12) FROM riders r
                          WHERE r.team_id = t.team_id), 0) AS REAL) AS rider_cost
    FROM teams t
"#;

/// Repository for team database operations.
#[derive(Debug, Clone)]
pub struct TeamRepository {
    pool: SqlitePool,
}

impl TeamRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a team and return the stored row.
    ///
    /// A taken name or email is [`StoreError::Duplicate`], also when a
    /// concurrent insert won the race.
    #[instrument(skip(self, team), fields(name = %team.fields.name))]
    pub async fn create(&self, team: NewTeam) -> Result<Team, StoreError> {
        let fields = &team.fields;
        debug!("Creating team: {}", fields.name);

        let result = sqlx::query(
            r#"
            INSERT INTO teams (name, country, victories, points, team_status, abbreviation,
                               director, assistant, representative, bike, overhead_cost,
                               email, password_hash, roles)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.country)
        .bind(fields.victories)
        .bind(fields.points)
        .bind(&fields.team_status)
        .bind(&fields.abbreviation)
        .bind(&fields.director)
        .bind(&fields.assistant)
        .bind(&fields.representative)
        .bind(&fields.bike)
        .bind(fields.overhead_cost)
        .bind(&fields.email)
        .bind(&team.password_hash)
        .bind(team.roles.to_json())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_write(e, "Failed to insert team"))?;

        let id = result.last_insert_rowid();
        let created = self
            .get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Team not found after creation"))?;
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<Team>> {
        let query = format!("SELECT {TEAM_COLUMNS} FROM teams WHERE team_id = ?");
        let team = sqlx::query_as::<_, Team>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch team")?;

        Ok(team)
    }

    #[instrument(skip(self))]
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Team>> {
        let query = format!("SELECT {TEAM_COLUMNS} FROM teams WHERE name = ?");
        let team = sqlx::query_as::<_, Team>(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch team by name")?;

        Ok(team)
    }

    #[instrument(skip(self))]
    pub async fn get_by_email(&self, email: &str) -> Result<Option<Team>> {
        let query = format!("SELECT {TEAM_COLUMNS} FROM teams WHERE email = ?");
        let team = sqlx::query_as::<_, Team>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch team by email")?;

        Ok(team)
    }

    /// All teams ordered by name.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Team>> {
        let query = format!("SELECT {TEAM_COLUMNS} FROM teams ORDER BY name ASC");
        let teams = sqlx::query_as::<_, Team>(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list teams")?;

        Ok(teams)
    }

    /// One team with its sponsor budget and yearly rider cost.
    #[instrument(skip(self))]
    pub async fn get_with_financials(&self, id: i64) -> Result<Option<TeamWithFinancials>> {
        let query = format!("{FINANCIALS_SELECT} WHERE t.team_id = ?");
        let team = sqlx::query_as::<_, TeamWithFinancials>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch team financials")?;

        Ok(team)
    }

    /// Every team with its sponsor budget and yearly rider cost, ordered by
    /// name.
    #[instrument(skip(self))]
    pub async fn list_with_financials(&self) -> Result<Vec<TeamWithFinancials>> {
        let query = format!("{FINANCIALS_SELECT} ORDER BY t.name ASC");
        let teams = sqlx::query_as::<_, TeamWithFinancials>(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list team financials")?;

        Ok(teams)
    }

    /// Replace the editable attributes of a team. Returns `None` when the
    /// team does not exist.
    #[instrument(skip(self, fields))]
    pub async fn update(&self, id: i64, fields: &TeamFields) -> Result<Option<Team>, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE teams
            SET name = ?, country = ?, victories = ?, points = ?, team_status = ?,
                abbreviation = ?, director = ?, assistant = ?, representative = ?,
                bike = ?, overhead_cost = ?, email = ?, updated_at = datetime('now')
            WHERE team_id = ?
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.country)
        .bind(fields.victories)
        .bind(fields.points)
        .bind(&fields.team_status)
        .bind(&fields.abbreviation)
        .bind(&fields.director)
        .bind(&fields.assistant)
        .bind(&fields.representative)
        .bind(&fields.bike)
        .bind(fields.overhead_cost)
        .bind(&fields.email)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_write(e, "Failed to update team"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(self.get(id).await?)
    }

    /// Delete a team. Returns whether a row was removed, a team that still
    /// has riders or sponsors is [`StoreError::ForeignKey`].
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM teams WHERE team_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_write(e, "Failed to delete team"))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM teams")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count teams")?;

        Ok(count.0)
    }
}

#[async_trait]
impl IdentityStore for TeamRepository {
    type Identity = Team;

    async fn find_by_email(&self, email: &str) -> Result<Option<Team>> {
        self.get_by_email(email).await
    }
}
