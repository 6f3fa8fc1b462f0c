//! Team and user models.

use super::UserId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user row as stored in SQLite.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub user_id: i64,
    pub username: String,
    pub team_name: String,
    pub is_active: bool,
}

/// A team member as exposed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub team_name: String,
    pub is_active: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            user_id: UserId::new(row.user_id),
            username: row.username,
            team_name: row.team_name,
            is_active: row.is_active,
        }
    }
}

/// Member entry supplied when creating a team.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMember {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// A validated member ready to be upserted.
#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub user_id: UserId,
    pub username: String,
    pub is_active: bool,
}

/// A team with its members.
#[derive(Debug, Clone, Serialize)]
pub struct Team {
    pub team_name: String,
    pub members: Vec<User>,
}

impl Team {
    /// Members that are currently active.
    pub fn active_members(&self) -> impl Iterator<Item = &User> {
        self.members.iter().filter(|m| m.is_active)
    }
}
