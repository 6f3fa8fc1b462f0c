//! Team directory queries: teams, membership and member activity.

use crate::error::{db_op, AppError, Resource};
use crate::models::{MemberRecord, Team, User, UserId, UserRow};
use sqlx::SqliteConnection;
use std::collections::HashSet;

/// Insert a team with no members.
///
/// Fails with `AlreadyExists` if the name is taken.
pub async fn create_team(conn: &mut SqliteConnection, team_name: &str) -> Result<(), AppError> {
    sqlx::query("INSERT INTO teams (team_name) VALUES (?)")
        .bind(team_name)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if AppError::is_unique_violation(&e) {
                AppError::already_exists(Resource::Team, team_name)
            } else {
                db_op("teams::create_team")(e)
            }
        })?;

    Ok(())
}

/// Check whether a team exists.
pub async fn team_exists(conn: &mut SqliteConnection, team_name: &str) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teams WHERE team_name = ?")
        .bind(team_name)
        .fetch_one(&mut *conn)
        .await
        .map_err(db_op("teams::team_exists"))?;

    Ok(count > 0)
}

/// Upsert users into a team and record their membership.
///
/// Username, active flag and owning team are last-write-wins. A user moving
/// from another team loses that membership row; duplicate membership rows
/// are ignored. Run inside a transaction to make the batch atomic.
pub async fn add_members(
    conn: &mut SqliteConnection,
    team_name: &str,
    members: &[MemberRecord],
) -> Result<(), AppError> {
    for member in members {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, team_name, is_active)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                username = excluded.username,
                team_name = excluded.team_name,
                is_active = excluded.is_active
            "#,
        )
        .bind(member.user_id.key())
        .bind(&member.username)
        .bind(team_name)
        .bind(member.is_active)
        .execute(&mut *conn)
        .await
        .map_err(db_op("teams::add_members.upsert_user"))?;

        sqlx::query("DELETE FROM team_members WHERE user_id = ? AND team_name != ?")
            .bind(member.user_id.key())
            .bind(team_name)
            .execute(&mut *conn)
            .await
            .map_err(db_op("teams::add_members.drop_stale_membership"))?;

        sqlx::query(
            "INSERT INTO team_members (team_name, user_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(team_name)
        .bind(member.user_id.key())
        .execute(&mut *conn)
        .await
        .map_err(db_op("teams::add_members.insert_membership"))?;
    }

    Ok(())
}

/// Load a team and all of its members, ordered by user id.
///
/// Fails with `NotFound` if the team does not exist.
pub async fn get_team_with_members(
    conn: &mut SqliteConnection,
    team_name: &str,
) -> Result<Team, AppError> {
    if !team_exists(conn, team_name).await? {
        return Err(AppError::not_found_with_id("Team", team_name));
    }

    let rows: Vec<UserRow> = sqlx::query_as(
        r#"
        SELECT u.user_id, u.username, u.team_name, u.is_active
        FROM users u
        JOIN team_members tm ON tm.user_id = u.user_id
        WHERE tm.team_name = ?
        ORDER BY u.user_id
        "#,
    )
    .bind(team_name)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_op("teams::get_team_with_members"))?;

    Ok(Team {
        team_name: team_name.to_string(),
        members: rows.into_iter().map(User::from).collect(),
    })
}

/// Deactivate every active user of a team, returning how many changed.
///
/// Fails with `NotFound` if the team does not exist. A second call returns 0.
pub async fn deactivate_all_members(
    conn: &mut SqliteConnection,
    team_name: &str,
) -> Result<u64, AppError> {
    if !team_exists(conn, team_name).await? {
        return Err(AppError::not_found_with_id("Team", team_name));
    }

    let result = sqlx::query("UPDATE users SET is_active = 0 WHERE team_name = ? AND is_active = 1")
        .bind(team_name)
        .execute(&mut *conn)
        .await
        .map_err(db_op("teams::deactivate_all_members"))?;

    Ok(result.rows_affected())
}

/// Active members of a team, minus any id in `exclude`.
pub async fn get_active_members(
    conn: &mut SqliteConnection,
    team_name: &str,
    exclude: &HashSet<UserId>,
) -> Result<Vec<UserId>, AppError> {
    let keys: Vec<i64> = sqlx::query_scalar(
        "SELECT user_id FROM users WHERE team_name = ? AND is_active = 1 ORDER BY user_id",
    )
    .bind(team_name)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_op("teams::get_active_members"))?;

    Ok(keys
        .into_iter()
        .map(UserId::new)
        .filter(|id| !exclude.contains(id))
        .collect())
}

/// The team a user belongs to.
///
/// Fails with `AuthorNotFound` if the user is unknown.
pub async fn get_author_team(
    conn: &mut SqliteConnection,
    user_id: UserId,
) -> Result<String, AppError> {
    sqlx::query_scalar::<_, String>("SELECT team_name FROM users WHERE user_id = ?")
        .bind(user_id.key())
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_op("teams::get_author_team"))?
        .ok_or_else(|| AppError::author_not_found(user_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use sqlx::Connection;
    use tempfile::tempdir;

    fn member(key: i64, name: &str, active: bool) -> MemberRecord {
        MemberRecord {
            user_id: UserId::new(key),
            username: name.to_string(),
            is_active: active,
        }
    }

    async fn setup() -> (tempfile::TempDir, db::pool::DbPool) {
        let dir = tempdir().unwrap();
        let pool = db::initialize(&dir.path().join("test.db")).await.unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn test_create_team_twice_fails() {
        let (_dir, pool) = setup().await;
        let mut conn = pool.acquire().await.unwrap();

        create_team(&mut conn, "Backend").await.unwrap();
        assert!(team_exists(&mut conn, "Backend").await.unwrap());

        let err = create_team(&mut conn, "Backend").await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists { resource: Resource::Team, .. }));
    }

    #[tokio::test]
    async fn test_add_members_is_idempotent_and_last_write_wins() {
        let (_dir, pool) = setup().await;
        let mut conn = pool.acquire().await.unwrap();
        create_team(&mut conn, "Backend").await.unwrap();

        add_members(&mut conn, "Backend", &[member(1, "Alice", true), member(2, "Bob", true)])
            .await
            .unwrap();
        add_members(&mut conn, "Backend", &[member(2, "Robert", false)])
            .await
            .unwrap();

        let team = get_team_with_members(&mut conn, "Backend").await.unwrap();
        assert_eq!(team.members.len(), 2);
        assert_eq!(team.members[1].username, "Robert");
        assert!(!team.members[1].is_active);
        assert_eq!(team.active_members().count(), 1);
    }

    #[tokio::test]
    async fn test_re_adding_user_to_other_team_moves_it() {
        let (_dir, pool) = setup().await;
        let mut conn = pool.acquire().await.unwrap();
        create_team(&mut conn, "Backend").await.unwrap();
        create_team(&mut conn, "Frontend").await.unwrap();

        add_members(&mut conn, "Backend", &[member(1, "Alice", true)]).await.unwrap();
        add_members(&mut conn, "Frontend", &[member(1, "Alice", true)]).await.unwrap();

        assert!(get_team_with_members(&mut conn, "Backend").await.unwrap().members.is_empty());
        assert_eq!(
            get_author_team(&mut conn, UserId::new(1)).await.unwrap(),
            "Frontend"
        );
    }

    #[tokio::test]
    async fn test_add_members_rolls_back_with_transaction() {
        let (_dir, pool) = setup().await;
        let mut conn = pool.acquire().await.unwrap();

        {
            let mut tx = conn.begin().await.unwrap();
            create_team(&mut tx, "Backend").await.unwrap();
            add_members(&mut tx, "Backend", &[member(1, "Alice", true)]).await.unwrap();
            // dropped without commit
        }

        assert!(!team_exists(&mut conn, "Backend").await.unwrap());
        let err = get_author_team(&mut conn, UserId::new(1)).await.unwrap_err();
        assert!(matches!(err, AppError::AuthorNotFound { .. }));
    }

    #[tokio::test]
    async fn test_get_missing_team_is_not_found() {
        let (_dir, pool) = setup().await;
        let mut conn = pool.acquire().await.unwrap();

        assert!(matches!(
            get_team_with_members(&mut conn, "Ghost").await,
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(
            deactivate_all_members(&mut conn, "Ghost").await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_deactivate_all_members_is_idempotent() {
        let (_dir, pool) = setup().await;
        let mut conn = pool.acquire().await.unwrap();
        create_team(&mut conn, "Backend").await.unwrap();
        add_members(
            &mut conn,
            "Backend",
            &[member(1, "Alice", true), member(2, "Bob", true), member(3, "Carol", false)],
        )
        .await
        .unwrap();

        assert_eq!(deactivate_all_members(&mut conn, "Backend").await.unwrap(), 2);
        assert_eq!(deactivate_all_members(&mut conn, "Backend").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_active_members_applies_exclusions() {
        let (_dir, pool) = setup().await;
        let mut conn = pool.acquire().await.unwrap();
        create_team(&mut conn, "Backend").await.unwrap();
        add_members(
            &mut conn,
            "Backend",
            &[member(1, "Alice", true), member(2, "Bob", false), member(3, "Carol", true), member(4, "Dan", true)],
        )
        .await
        .unwrap();

        let exclude: HashSet<UserId> = [UserId::new(1), UserId::new(4)].into_iter().collect();
        let active = get_active_members(&mut conn, "Backend", &exclude).await.unwrap();
        assert_eq!(active, vec![UserId::new(3)]);
    }
}
