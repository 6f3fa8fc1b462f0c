//! Reviewer Assigner - assigns pull request reviewers within teams.
//!
//! Teams and users live in SQLite; opening a pull request picks up to two
//! active teammates of the author as reviewers. The HTTP API is served by
//! axum from `services::http_server`.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::AppError;
