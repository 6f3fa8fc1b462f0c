//! Application error types.
//!
//! Every failure a service operation can report is a variant of [`AppError`].
//! Callers branch on the variant, never on the message text. The HTTP layer
//! maps variants to status codes in `services::http_api`.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Kind of record a uniqueness conflict was reported for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Resource {
    Team,
    PullRequest,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Team => "Team",
            Self::PullRequest => "PR",
        })
    }
}

/// Application-level errors returned by every service operation.
///
/// All variants serialize to a structured JSON object (`type` + `details`).
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum AppError {
    /// A mandatory field was missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    /// A team or pull request with this key already exists.
    #[error("{resource} already exists: {id}")]
    AlreadyExists { resource: Resource, id: String },

    /// Requested resource not found.
    #[error("Not found: {resource}")]
    NotFound {
        resource: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// The pull request author is not a known user.
    #[error("PR author not found: {author_id}")]
    AuthorNotFound { author_id: String },

    /// The eligible reviewer pool was empty after exclusions.
    #[error("no active reviewer candidate in team {team_name}")]
    NoReviewerCandidates { team_name: String },

    /// The reviewer is not (or no longer) assigned to the pull request.
    #[error("reviewer {reviewer_id} is not assigned to PR {pr_id}")]
    ReviewerNotAssigned { pr_id: String, reviewer_id: String },

    /// A concurrent reassignment took the chosen replacement first.
    #[error("reviewer set of PR {pr_id} changed concurrently, retry")]
    ReassignConflict { pr_id: String },

    /// The pull request is merged and its reviewer set is frozen.
    #[error("PR already merged: {pr_id}")]
    AlreadyMerged { pr_id: String },

    /// An external user identifier did not have the `u<digits>` shape.
    #[error("invalid user_id format: {value}")]
    InvalidIdentifier { value: String },

    /// Invalid input provided.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        operation: Option<String>,
    },

    /// Internal application error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Create a required-field error.
    pub fn required(field: impl Into<String>) -> Self {
        Self::Required {
            field: field.into(),
        }
    }

    pub fn already_exists(resource: Resource, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            resource,
            id: id.into(),
        }
    }

    /// Create a not found error with ID.
    pub fn not_found_with_id(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: Some(id.into()),
        }
    }

    pub fn author_not_found(author_id: impl Into<String>) -> Self {
        Self::AuthorNotFound {
            author_id: author_id.into(),
        }
    }

    pub fn no_reviewer_candidates(team_name: impl Into<String>) -> Self {
        Self::NoReviewerCandidates {
            team_name: team_name.into(),
        }
    }

    pub fn reviewer_not_assigned(pr_id: impl Into<String>, reviewer_id: impl Into<String>) -> Self {
        Self::ReviewerNotAssigned {
            pr_id: pr_id.into(),
            reviewer_id: reviewer_id.into(),
        }
    }

    pub fn reassign_conflict(pr_id: impl Into<String>) -> Self {
        Self::ReassignConflict {
            pr_id: pr_id.into(),
        }
    }

    pub fn already_merged(pr_id: impl Into<String>) -> Self {
        Self::AlreadyMerged {
            pr_id: pr_id.into(),
        }
    }

    pub fn invalid_identifier(value: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            value: value.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid input error with field name.
    pub fn invalid_input_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a database error with operation context.
    pub fn database_with_op(message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            operation: Some(operation.into()),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the caller caused this error (4xx) rather than the server (5xx).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Database { .. } | Self::Internal { .. })
    }

    /// Whether this error reports a unique-key violation from SQLite.
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
    }
}

/// Wrap a storage error with the name of the operation that produced it.
///
/// Used as `.map_err(db_op("teams::create_team"))`.
pub fn db_op(operation: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |err| AppError::database_with_op(err.to_string(), operation)
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            operation: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON error: {}", err))
    }
}

impl From<crate::db::DbError> for AppError {
    fn from(err: crate::db::DbError) -> Self {
        Self::database_with_op(err.to_string(), "db::initialize")
    }
}
