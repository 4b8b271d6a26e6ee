//! Team data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::auth::{Authenticatable, Role};

/// Non-empty set of roles as stored in the `teams.roles` JSON column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Role>", into = "Vec<Role>")]
pub struct RoleSet(Vec<Role>);

impl RoleSet {
    pub fn new(roles: Vec<Role>) -> Result<Self, String> {
        if roles.is_empty() {
            return Err("role set must not be empty".to_string());
        }
        let mut deduped: Vec<Role> = Vec::with_capacity(roles.len());
        for role in roles {
            if !deduped.contains(&role) {
                deduped.push(role);
            }
        }
        Ok(Self(deduped))
    }

    pub fn representative() -> Self {
        Self(vec![Role::TeamRepresentative])
    }

    pub fn admin() -> Self {
        Self(vec![Role::TeamRepresentative, Role::Admin])
    }

    pub fn as_slice(&self) -> &[Role] {
        &self.0
    }

    /// JSON text for the database column.
    pub fn to_json(&self) -> String {
        // A Vec of unit enum variants always serializes.
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }
}

impl TryFrom<Vec<Role>> for RoleSet {
    type Error = String;

    fn try_from(roles: Vec<Role>) -> Result<Self, Self::Error> {
        Self::new(roles)
    }
}

impl From<RoleSet> for Vec<Role> {
    fn from(set: RoleSet) -> Self {
        set.0
    }
}

impl TryFrom<String> for RoleSet {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let roles: Vec<Role> =
            serde_json::from_str(&s).map_err(|e| format!("invalid roles {s}: {e}"))?;
        Self::new(roles)
    }
}

/// Team entity from database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Team {
    pub team_id: i64,
    pub name: String,
    pub country: String,
    pub victories: i64,
    pub points: i64,
    pub team_status: String,
    pub abbreviation: String,
    pub director: String,
    pub assistant: String,
    pub representative: String,
    pub bike: String,
    pub overhead_cost: f64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub roles: RoleSet,
    pub created_at: String,
    pub updated_at: String,
}

impl Authenticatable for Team {
    type Public = TeamInfo;

    fn identity_id(&self) -> i64 {
        self.team_id
    }

    fn roles(&self) -> &[Role] {
        self.roles.as_slice()
    }

    fn password_hash(&self) -> &str {
        &self.password_hash
    }

    fn into_public(self) -> TeamInfo {
        TeamInfo::from(self)
    }
}

/// Public team info (safe to return to clients).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamInfo {
    pub team_id: i64,
    pub name: String,
    pub country: String,
    pub victories: i64,
    pub points: i64,
    pub team_status: String,
    pub abbreviation: String,
    pub director: String,
    pub assistant: String,
    pub representative: String,
    pub bike: String,
    pub overhead_cost: f64,
    pub email: String,
    pub roles: Vec<Role>,
}

impl From<Team> for TeamInfo {
    fn from(team: Team) -> Self {
        Self {
            team_id: team.team_id,
            name: team.name,
            country: team.country,
            victories: team.victories,
            points: team.points,
            team_status: team.team_status,
            abbreviation: team.abbreviation,
            director: team.director,
            assistant: team.assistant,
            representative: team.representative,
            bike: team.bike,
            overhead_cost: team.overhead_cost,
            email: team.email,
            roles: team.roles.into(),
        }
    }
}

/// List response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamList {
    pub items: Vec<TeamInfo>,
    pub count: usize,
}

/// Team row joined with its sponsor budget and yearly rider cost.
#[derive(Debug, Clone, FromRow)]
pub struct TeamWithFinancials {
    #[sqlx(flatten)]
    pub team: Team,
    pub budget: i64,
    pub rider_cost: f64,
}

/// Public team info with its financial aggregates.
///
/// `budget` is the sum of sponsor contributions, `rider_cost` the yearly
/// wage bill (twelve monthly wages per rider).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamFinancials {
    #[serde(flatten)]
    pub team: TeamInfo,
    pub budget: i64,
    pub rider_cost: f64,
}

impl From<TeamWithFinancials> for TeamFinancials {
    fn from(row: TeamWithFinancials) -> Self {
        Self {
            team: TeamInfo::from(row.team),
            budget: row.budget,
            rider_cost: row.rider_cost,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamFinancialsList {
    pub items: Vec<TeamFinancials>,
    pub count: usize,
}

/// Editable team attributes, shared by create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamFields {
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub victories: i64,
    #[serde(default)]
    pub points: i64,
    pub team_status: String,
    pub abbreviation: String,
    pub director: String,
    pub assistant: String,
    pub representative: String,
    pub bike: String,
    pub overhead_cost: f64,
    pub email: String,
}

/// Request to create a new team account.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTeamRequest {
    #[serde(flatten)]
    pub fields: TeamFields,
    pub password: String,
}

/// Request to update a team. Every attribute is replaced.
pub type UpdateTeamRequest = TeamFields;

/// Row to insert, with the password already hashed.
#[derive(Debug, Clone)]
pub struct NewTeam {
    pub fields: TeamFields,
    pub password_hash: String,
    pub roles: RoleSet,
}

/// Login request body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}
