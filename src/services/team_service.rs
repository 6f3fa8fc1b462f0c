//! Team directory service.
//!
//! Validates team payloads and runs team writes through `db::teams`.

use crate::db::pool::DbPool;
use crate::db::teams;
use crate::error::{db_op, AppError, Resource};
use crate::models::user_id::parse_required;
use crate::models::{MemberRecord, NewMember, Team};
use sqlx::Connection;

/// Create a team and upsert its members in one transaction.
///
/// # Arguments
/// * `pool` - Database connection pool
/// * `team_name` - Name of the new team
/// * `members` - At least one member; ids must have the `u<digits>` shape
///
/// # Returns
/// The stored team with all of its members
pub async fn create_team_with_members(
    pool: &DbPool,
    team_name: &str,
    members: Vec<NewMember>,
) -> Result<Team, AppError> {
    let team_name = team_name.trim();
    if team_name.is_empty() {
        return Err(AppError::required("team_name"));
    }
    if members.is_empty() {
        return Err(AppError::required("members"));
    }

    let records = members
        .into_iter()
        .map(validate_member)
        .collect::<Result<Vec<_>, _>>()?;

    let mut conn = pool.acquire().await.map_err(db_op("teams::acquire"))?;

    if teams::team_exists(&mut conn, team_name).await? {
        log::warn!("[teams] Team {} already exists", team_name);
        return Err(AppError::already_exists(Resource::Team, team_name));
    }

    let mut tx = conn
        .begin()
        .await
        .map_err(db_op("teams::create_team_with_members.begin"))?;
    teams::create_team(&mut tx, team_name).await?;
    teams::add_members(&mut tx, team_name, &records).await?;
    tx.commit()
        .await
        .map_err(db_op("teams::create_team_with_members.commit"))?;

    log::info!("[teams] Created team {} with {} member(s)", team_name, records.len());

    teams::get_team_with_members(&mut conn, team_name).await
}

fn validate_member(member: NewMember) -> Result<MemberRecord, AppError> {
    let user_id = parse_required(&member.user_id, "user_id")?;
    let username = member.username.trim();
    if username.is_empty() {
        return Err(AppError::required("username"));
    }

    Ok(MemberRecord {
        user_id,
        username: username.to_string(),
        is_active: member.is_active,
    })
}

/// Load a team with its members.
pub async fn get_team(pool: &DbPool, team_name: &str) -> Result<Team, AppError> {
    let team_name = team_name.trim();
    if team_name.is_empty() {
        return Err(AppError::required("team_name"));
    }

    let mut conn = pool.acquire().await.map_err(db_op("teams::acquire"))?;
    teams::get_team_with_members(&mut conn, team_name).await
}

/// Deactivate every active member of a team, returning how many changed.
pub async fn deactivate_team_users(pool: &DbPool, team_name: &str) -> Result<u64, AppError> {
    let team_name = team_name.trim();
    if team_name.is_empty() {
        return Err(AppError::required("team_name"));
    }

    let mut conn = pool.acquire().await.map_err(db_op("teams::acquire"))?;
    let count = teams::deactivate_all_members(&mut conn, team_name).await?;

    log::info!("[teams] Deactivated {} user(s) in team {}", count, team_name);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::UserId;
    use tempfile::tempdir;

    fn member(id: &str, name: &str) -> NewMember {
        NewMember {
            user_id: id.to_string(),
            username: name.to_string(),
            is_active: true,
        }
    }

    async fn setup() -> (tempfile::TempDir, DbPool) {
        let dir = tempdir().unwrap();
        let pool = db::initialize(&dir.path().join("test.db")).await.unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn test_create_and_get_team() {
        let (_dir, pool) = setup().await;

        let created = create_team_with_members(
            &pool,
            " Backend ",
            vec![member("u2", "Bob"), member("u1", "Alice")],
        )
        .await
        .unwrap();

        assert_eq!(created.team_name, "Backend");
        let ids: Vec<UserId> = created.members.iter().map(|m| m.user_id).collect();
        assert_eq!(ids, vec![UserId::new(1), UserId::new(2)]);

        let loaded = get_team(&pool, "Backend").await.unwrap();
        assert_eq!(loaded.members, created.members);
    }

    #[tokio::test]
    async fn test_create_team_validation() {
        let (_dir, pool) = setup().await;

        assert!(matches!(
            create_team_with_members(&pool, "", vec![member("u1", "Alice")]).await,
            Err(AppError::Required { ref field }) if field == "team_name"
        ));
        assert!(matches!(
            create_team_with_members(&pool, "Backend", vec![]).await,
            Err(AppError::Required { ref field }) if field == "members"
        ));
        assert!(matches!(
            create_team_with_members(&pool, "Backend", vec![member("u1", " ")]).await,
            Err(AppError::Required { ref field }) if field == "username"
        ));
        assert!(matches!(
            create_team_with_members(&pool, "Backend", vec![member("alice", "Alice")]).await,
            Err(AppError::InvalidIdentifier { .. })
        ));

        // Nothing was written by the rejected requests.
        assert!(matches!(get_team(&pool, "Backend").await, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_create_existing_team_fails() {
        let (_dir, pool) = setup().await;

        create_team_with_members(&pool, "Backend", vec![member("u1", "Alice")])
            .await
            .unwrap();
        let err = create_team_with_members(&pool, "Backend", vec![member("u2", "Bob")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists { resource: Resource::Team, .. }));

        let team = get_team(&pool, "Backend").await.unwrap();
        assert_eq!(team.members.len(), 1);
    }

    #[tokio::test]
    async fn test_deactivate_team_users() {
        let (_dir, pool) = setup().await;
        create_team_with_members(
            &pool,
            "Backend",
            vec![member("u1", "Alice"), member("u2", "Bob")],
        )
        .await
        .unwrap();

        assert_eq!(deactivate_team_users(&pool, "Backend").await.unwrap(), 2);
        assert_eq!(deactivate_team_users(&pool, "Backend").await.unwrap(), 0);
        assert_eq!(get_team(&pool, "Backend").await.unwrap().active_members().count(), 0);

        assert!(matches!(
            deactivate_team_users(&pool, "Ghost").await,
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(
            deactivate_team_users(&pool, "  ").await,
            Err(AppError::Required { .. })
        ));
    }
}
