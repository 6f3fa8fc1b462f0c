//! Business logic services.
//!
//! Services validate input, call the query functions in `crate::db` and log
//! what they changed. The HTTP layer in `http_api` is a thin mapping on top.

pub mod assignment;
pub mod http_api;
pub mod http_server;
pub mod reviewer_selection;
pub mod stats_service;
pub mod team_service;
pub mod user_service;

pub use assignment::ReviewAssignmentEngine;
pub use reviewer_selection::{RandomPicker, ReviewerPicker};
