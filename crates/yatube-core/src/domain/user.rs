use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role every authenticated user carries.
pub const ROLE_USER: &str = "user";
/// Role granting access to the admin screens.
pub const ROLE_ADMIN: &str = "admin";

/// User entity - an author, commenter and follower.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with generated ID and timestamps.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            is_staff: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Roles embedded in issued tokens.
    pub fn roles(&self) -> Vec<String> {
        let mut roles = vec![ROLE_USER.to_string()];
        if self.is_staff {
            roles.push(ROLE_ADMIN.to_string());
        }
        roles
    }
}
