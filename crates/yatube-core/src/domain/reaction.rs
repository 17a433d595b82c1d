use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which reaction table an edge lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReactionKind::Like => f.write_str("like"),
            ReactionKind::Dislike => f.write_str("dislike"),
        }
    }
}

/// A per-user reaction on a post. Likes and dislikes are independent
/// relations, each unique per (post, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: Uuid,
    pub kind: ReactionKind,
    pub post_id: Uuid,
    pub user_id: Uuid,
}

impl Reaction {
    pub fn new(kind: ReactionKind, post_id: Uuid, user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            post_id,
            user_id,
        }
    }
}
