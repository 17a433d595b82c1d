use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Follow edge - `user_id` subscribes to posts of `author_id`.
///
/// The (user, author) pair is unique in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author_id: Uuid,
}

impl Follow {
    pub fn new(user_id: Uuid, author_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            author_id,
        }
    }
}
