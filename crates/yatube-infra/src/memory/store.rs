use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use yatube_core::domain::{Comment, Follow, Group, Post, Reaction, ReactionKind, User};

/// Rows of every table, in insertion order.
#[derive(Default)]
pub(crate) struct Tables {
    pub users: Vec<User>,
    pub groups: Vec<Group>,
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
    pub follows: Vec<Follow>,
    pub likes: Vec<Reaction>,
    pub dislikes: Vec<Reaction>,
}

impl Tables {
    pub fn reactions(&self, kind: ReactionKind) -> &Vec<Reaction> {
        match kind {
            ReactionKind::Like => &self.likes,
            ReactionKind::Dislike => &self.dislikes,
        }
    }

    pub fn reactions_mut(&mut self, kind: ReactionKind) -> &mut Vec<Reaction> {
        match kind {
            ReactionKind::Like => &mut self.likes,
            ReactionKind::Dislike => &mut self.dislikes,
        }
    }

    pub fn user_exists(&self, id: Uuid) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    pub fn group_exists(&self, id: Uuid) -> bool {
        self.groups.iter().any(|g| g.id == id)
    }

    pub fn post_exists(&self, id: Uuid) -> bool {
        self.posts.iter().any(|p| p.id == id)
    }

    /// Remove a post and everything hanging off it.
    pub fn cascade_post(&mut self, post_id: Uuid) {
        self.posts.retain(|p| p.id != post_id);
        self.comments.retain(|c| c.post_id != post_id);
        self.likes.retain(|r| r.post_id != post_id);
        self.dislikes.retain(|r| r.post_id != post_id);
    }

    /// Remove a user and everything they own.
    pub fn cascade_user(&mut self, user_id: Uuid) {
        let authored: Vec<Uuid> = self
            .posts
            .iter()
            .filter(|p| p.author_id == user_id)
            .map(|p| p.id)
            .collect();
        for post_id in authored {
            self.cascade_post(post_id);
        }

        self.users.retain(|u| u.id != user_id);
        self.comments.retain(|c| c.author_id != user_id);
        self.follows
            .retain(|f| f.user_id != user_id && f.author_id != user_id);
        self.likes.retain(|r| r.user_id != user_id);
        self.dislikes.retain(|r| r.user_id != user_id);
    }

    /// Remove a group, detaching its posts.
    pub fn cascade_group(&mut self, group_id: Uuid) {
        self.groups.retain(|g| g.id != group_id);
        for post in self.posts.iter_mut().filter(|p| p.group_id == Some(group_id)) {
            post.group_id = None;
        }
    }
}

/// Shared backing store for the in-memory repositories.
#[derive(Default)]
pub struct InMemoryStore {
    pub(crate) tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}
