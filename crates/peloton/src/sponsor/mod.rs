//! Sponsors funding a team.

mod models;
mod repository;
mod service;

pub use models::{Sponsor, SponsorFields, SponsorList};
pub use repository::SponsorRepository;
pub use service::SponsorService;
