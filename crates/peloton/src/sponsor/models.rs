//! Sponsor data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Sponsor entity from database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Sponsor {
    pub sponsor_id: i64,
    pub team_id: i64,
    pub name: String,
    pub industry: String,
    /// Yearly contribution, counted towards the team budget.
    pub contribution: i64,
}

/// List response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SponsorList {
    pub items: Vec<Sponsor>,
    pub count: usize,
}

/// Editable sponsor attributes, shared by create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SponsorFields {
    pub team_id: i64,
    pub name: String,
    pub industry: String,
    pub contribution: i64,
}
