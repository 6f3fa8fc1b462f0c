//! REST routes for teams, users, pull requests and statistics.
//!
//! Handlers validate nothing themselves beyond body shape; the services own
//! validation and report failures as [`AppError`], which [`ApiErr`] maps to a
//! status code and a stable error code.

use crate::db::pool::DbPool;
use crate::error::{AppError, Resource};
use crate::models::{NewMember, NewPullRequest, PrStats, PullRequestShort, PullRequestWithReviewers, Team, User, UserId};
use crate::services::assignment::{Reassignment, ReviewAssignmentEngine};
use crate::services::{stats_service, team_service, user_service};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

/// Shared state for all API routes.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub engine: ReviewAssignmentEngine,
}

impl AppState {
    pub fn new(db: DbPool, engine: ReviewAssignmentEngine) -> Self {
        Self { db, engine }
    }
}

// ── Error handling ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// Wrapper to make AppError usable as an axum error response.
pub struct ApiErr(AppError);

impl ApiErr {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            AppError::Required { field } => (StatusCode::BAD_REQUEST, required_code(field)),
            AppError::AlreadyExists { resource, .. } => match resource {
                Resource::Team => (StatusCode::BAD_REQUEST, "TEAM_EXISTS"),
                Resource::PullRequest => (StatusCode::CONFLICT, "PR_EXISTS"),
            },
            AppError::NotFound { .. } | AppError::AuthorNotFound { .. } => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            AppError::NoReviewerCandidates { .. } => (StatusCode::CONFLICT, "NO_CANDIDATE"),
            AppError::ReviewerNotAssigned { .. } => (StatusCode::CONFLICT, "NOT_ASSIGNED"),
            AppError::ReassignConflict { .. } => (StatusCode::CONFLICT, "REASSIGN_CONFLICT"),
            AppError::AlreadyMerged { .. } => (StatusCode::CONFLICT, "PR_MERGED"),
            AppError::InvalidIdentifier { .. } => (StatusCode::BAD_REQUEST, "INVALID_IDENTIFIER"),
            AppError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            AppError::Database { .. } | AppError::Internal { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

fn required_code(field: &str) -> &'static str {
    match field {
        "pull_request_id" => "PR_ID_REQUIRED",
        "pull_request_name" => "PR_NAME_REQUIRED",
        "author_id" => "AUTHOR_REQUIRED",
        "old_reviewer_id" => "OLD_REVIEWER_REQUIRED",
        "team_name" => "TEAM_NAME_REQUIRED",
        "members" => "MEMBERS_REQUIRED",
        "user_id" => "USER_ID_REQUIRED",
        "username" => "USERNAME_REQUIRED",
        _ => "FIELD_REQUIRED",
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if self.0.is_client_error() {
            log::warn!("[http] {}: {}", code, self.0);
            self.0.to_string()
        } else {
            log::error!("[http] {:?}", self.0);
            "internal server error".to_string()
        };

        (
            status,
            Json(ErrorBody {
                error: ErrorDetail { code, message },
            }),
        )
            .into_response()
    }
}

impl From<AppError> for ApiErr {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiErr {
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::invalid_input(rejection.body_text()))
    }
}

type ApiResult<T> = Result<T, ApiErr>;

// ── DTOs ─────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CreateTeamRequest {
    #[serde(default)]
    team_name: String,
    #[serde(default)]
    members: Vec<NewMember>,
}

#[derive(Deserialize)]
struct TeamQuery {
    team_name: Option<String>,
}

#[derive(Serialize)]
struct TeamMemberResponse {
    user_id: UserId,
    username: String,
    is_active: bool,
}

#[derive(Serialize)]
struct TeamResponse {
    team_name: String,
    members: Vec<TeamMemberResponse>,
}

impl From<Team> for TeamResponse {
    fn from(team: Team) -> Self {
        Self {
            team_name: team.team_name,
            members: team
                .members
                .into_iter()
                .map(|m| TeamMemberResponse {
                    user_id: m.user_id,
                    username: m.username,
                    is_active: m.is_active,
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct DeactivateResponse {
    team_name: String,
    deactivated_users: u64,
}

#[derive(Deserialize)]
struct SetIsActiveRequest {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    is_active: bool,
}

#[derive(Serialize)]
struct UserResponse {
    user: User,
}

#[derive(Deserialize)]
struct UserQuery {
    user_id: Option<String>,
}

#[derive(Serialize)]
struct ReviewsResponse {
    user_id: UserId,
    pull_requests: Vec<PullRequestShort>,
}

#[derive(Deserialize)]
struct MergeRequest {
    #[serde(default)]
    pull_request_id: String,
}

#[derive(Deserialize)]
struct ReassignRequest {
    #[serde(default)]
    pull_request_id: String,
    #[serde(default)]
    old_reviewer_id: String,
}

/// A pull request as rendered on the wire.
#[derive(Serialize)]
struct PrResponse {
    pull_request_id: String,
    pull_request_name: String,
    author_id: UserId,
    status: String,
    assigned_reviewers: Vec<UserId>,
    #[serde(rename = "createdAt")]
    created_at: String,
    #[serde(rename = "mergedAt", skip_serializing_if = "Option::is_none")]
    merged_at: Option<String>,
}

impl TryFrom<PullRequestWithReviewers> for PrResponse {
    type Error = AppError;

    fn try_from(item: PullRequestWithReviewers) -> Result<Self, AppError> {
        let pr = item.pr;
        Ok(Self {
            pull_request_id: pr.pull_request_id,
            pull_request_name: pr.pull_request_name,
            author_id: pr.author_id,
            status: pr.status.to_string(),
            assigned_reviewers: item.reviewers,
            created_at: rfc3339(pr.created_at)?,
            merged_at: pr.merged_at.map(rfc3339).transpose()?,
        })
    }
}

#[derive(Serialize)]
struct PrEnvelope {
    pr: PrResponse,
}

#[derive(Serialize)]
struct ReassignResponse {
    pr: PrResponse,
    replaced_by: UserId,
}

#[derive(Serialize)]
struct StatsResponse {
    stats: PrStats,
}

/// Unix seconds as an RFC 3339 UTC timestamp.
///
/// Fails for values outside chrono's representable range, which only a
/// corrupted row can hold.
fn rfc3339(secs: i64) -> Result<String, AppError> {
    DateTime::from_timestamp(secs, 0)
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
        .ok_or_else(|| AppError::internal(format!("timestamp out of range: {secs}")))
}

// ── Route builder ────────────────────────────────────────────────────────────

/// Build the API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/team/add", post(create_team))
        .route("/team/get", get(get_team))
        .route("/team/deactivateUsers", post(deactivate_team_users))
        .route("/users/setIsActive", post(set_is_active))
        .route("/users/getReview", get(get_review))
        .route("/pullRequest/create", post(create_pull_request))
        .route("/pullRequest/merge", post(merge_pull_request))
        .route("/pullRequest/reassign", post(reassign_reviewer))
        .route("/stats/prs", get(get_stats))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /health: liveness check.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /team/add: create a team with its members.
async fn create_team(
    State(state): State<AppState>,
    body: Result<Json<CreateTeamRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TeamResponse>)> {
    let Json(req) = body?;
    let team = team_service::create_team_with_members(&state.db, &req.team_name, req.members).await?;
    Ok((StatusCode::CREATED, Json(team.into())))
}

/// GET /team/get?team_name=X
async fn get_team(
    State(state): State<AppState>,
    Query(query): Query<TeamQuery>,
) -> ApiResult<Json<TeamResponse>> {
    let team_name = query.team_name.unwrap_or_default();
    let team = team_service::get_team(&state.db, &team_name).await?;
    Ok(Json(team.into()))
}

/// POST /team/deactivateUsers?team_name=X
async fn deactivate_team_users(
    State(state): State<AppState>,
    Query(query): Query<TeamQuery>,
) -> ApiResult<Json<DeactivateResponse>> {
    let team_name = query.team_name.unwrap_or_default();
    let deactivated_users = team_service::deactivate_team_users(&state.db, &team_name).await?;
    Ok(Json(DeactivateResponse {
        team_name: team_name.trim().to_string(),
        deactivated_users,
    }))
}

/// POST /users/setIsActive
async fn set_is_active(
    State(state): State<AppState>,
    body: Result<Json<SetIsActiveRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let Json(req) = body?;
    let user = user_service::set_user_active(&state.db, &req.user_id, req.is_active).await?;
    Ok(Json(UserResponse { user }))
}

/// GET /users/getReview?user_id=X: pull requests the user reviews.
async fn get_review(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<ReviewsResponse>> {
    let user_id = query.user_id.unwrap_or_default();
    let (user_id, pull_requests) = user_service::get_user_reviews(&state.db, &user_id).await?;
    Ok(Json(ReviewsResponse {
        user_id,
        pull_requests,
    }))
}

/// POST /pullRequest/create: open a PR and assign reviewers.
async fn create_pull_request(
    State(state): State<AppState>,
    body: Result<Json<NewPullRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PrEnvelope>)> {
    let Json(req) = body?;
    let created = state.engine.create_with_reviewers(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(PrEnvelope {
            pr: created.try_into()?,
        }),
    ))
}

/// POST /pullRequest/merge: idempotent.
async fn merge_pull_request(
    State(state): State<AppState>,
    body: Result<Json<MergeRequest>, JsonRejection>,
) -> ApiResult<Json<PrEnvelope>> {
    let Json(req) = body?;
    let merged = state.engine.merge(&req.pull_request_id).await?;
    Ok(Json(PrEnvelope { pr: merged.try_into()? }))
}

/// POST /pullRequest/reassign
async fn reassign_reviewer(
    State(state): State<AppState>,
    body: Result<Json<ReassignRequest>, JsonRejection>,
) -> ApiResult<Json<ReassignResponse>> {
    let Json(req) = body?;
    let Reassignment { pr, replaced_by } = state
        .engine
        .reassign(&req.pull_request_id, &req.old_reviewer_id)
        .await?;
    Ok(Json(ReassignResponse {
        pr: pr.try_into()?,
        replaced_by,
    }))
}

/// GET /stats/prs
async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let stats = stats_service::get_stats(&state.db).await?;
    Ok(Json(StatsResponse { stats }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PullRequest, PullRequestStatus};

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::required("pull_request_id"), StatusCode::BAD_REQUEST, "PR_ID_REQUIRED"),
            (AppError::required("members"), StatusCode::BAD_REQUEST, "MEMBERS_REQUIRED"),
            (AppError::already_exists(Resource::Team, "Backend"), StatusCode::BAD_REQUEST, "TEAM_EXISTS"),
            (AppError::already_exists(Resource::PullRequest, "pr-1"), StatusCode::CONFLICT, "PR_EXISTS"),
            (AppError::author_not_found("u9"), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (AppError::no_reviewer_candidates("Backend"), StatusCode::CONFLICT, "NO_CANDIDATE"),
            (AppError::reviewer_not_assigned("pr-1", "u2"), StatusCode::CONFLICT, "NOT_ASSIGNED"),
            (AppError::reassign_conflict("pr-1"), StatusCode::CONFLICT, "REASSIGN_CONFLICT"),
            (AppError::already_merged("pr-1"), StatusCode::CONFLICT, "PR_MERGED"),
            (AppError::invalid_identifier("x"), StatusCode::BAD_REQUEST, "INVALID_IDENTIFIER"),
            (AppError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        ];

        for (err, status, code) in cases {
            assert_eq!(ApiErr(err).status_and_code(), (status, code));
        }
    }

    #[test]
    fn test_rfc3339() {
        assert_eq!(rfc3339(0).unwrap(), "1970-01-01T00:00:00Z");
        assert_eq!(rfc3339(1_700_000_000).unwrap(), "2023-11-14T22:13:20Z");
        assert!(matches!(rfc3339(i64::MAX), Err(AppError::Internal { .. })));
    }

    #[test]
    fn test_out_of_range_timestamp_is_not_rendered_as_epoch() {
        let item = PullRequestWithReviewers {
            pr: PullRequest {
                pull_request_id: "pr-1".to_string(),
                pull_request_name: "Add search".to_string(),
                author_id: UserId::new(1),
                status: PullRequestStatus::Merged,
                created_at: 1_700_000_000,
                merged_at: Some(i64::MAX),
            },
            reviewers: vec![UserId::new(2)],
        };

        let err = PrResponse::try_from(item).err().unwrap();
        assert!(matches!(err, AppError::Internal { .. }));
        assert_eq!(
            ApiErr(err).status_and_code(),
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        );
    }
}
