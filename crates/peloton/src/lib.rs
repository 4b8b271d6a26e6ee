//! Peloton backend library.
//!
//! Cycling team management API: teams sign in with Argon2id credentials and
//! manage their riders and sponsors behind signed session tokens and role
//! based authorization.

pub mod api;
pub mod auth;
pub mod db;
pub mod rider;
pub mod sponsor;
pub mod team;
