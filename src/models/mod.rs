//! Data models for the application.
//!
//! `*Row` types mirror SQLite rows and derive `FromRow`; the rest are the
//! domain values the services hand to callers.

pub mod pull_request;
pub mod stats;
pub mod team;
pub mod user_id;

// Re-exports for convenient access
pub use pull_request::{
    NewPullRequest, PullRequest, PullRequestRow, PullRequestShort, PullRequestStatus,
    PullRequestWithReviewers,
};
pub use stats::PrStats;
pub use team::{MemberRecord, NewMember, Team, User, UserRow};
pub use user_id::UserId;
