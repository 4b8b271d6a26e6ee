//! Team accounts.
//!
//! Teams are the identities of the system: each one signs in with its email
//! and is authorized by the roles stored alongside it.

mod models;
mod repository;
mod service;

pub use models::{
    CreateTeamRequest, LoginRequest, NewTeam, RoleSet, Team, TeamFields, TeamFinancials,
    TeamFinancialsList, TeamInfo, TeamList, TeamWithFinancials, UpdateTeamRequest,
};
pub use repository::TeamRepository;
pub use service::TeamService;
