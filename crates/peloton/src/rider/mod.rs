//! Riders under contract with a team.

mod models;
mod repository;
mod service;

pub use models::{Rider, RiderFields, RiderList};
pub use repository::RiderRepository;
pub use service::RiderService;
