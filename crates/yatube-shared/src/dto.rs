//! Data Transfer Objects - request bodies and the views pages render.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to register a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request to login. `next` is where to go afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Response containing a user's public information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub roles: Vec<String>,
}

/// Response containing authentication tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Author as shown next to posts and comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorView {
    pub id: Uuid,
    pub username: String,
}

/// Group as shown on its feed and next to posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupView {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// A post with its author and group resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub id: Uuid,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author: AuthorView,
    pub group: Option<GroupView>,
    /// Public URL of the attached image.
    pub image: Option<String>,
}

/// A comment with its author resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub id: Uuid,
    pub text: String,
    pub created: DateTime<Utc>,
    pub author: AuthorView,
}
