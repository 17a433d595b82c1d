use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Comment, Follow, Group, Post, Reaction, ReactionKind, User};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert a new entity. Unique-constraint violations yield [`RepoError::Constraint`],
    /// dangling references [`RepoError::ForeignKey`].
    async fn create(&self, entity: T) -> Result<T, RepoError>;

    /// Overwrite an existing entity.
    async fn update(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID, cascading to dependent rows.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError>;
}

/// Group repository.
#[async_trait]
pub trait GroupRepository: BaseRepository<Group, Uuid> {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Group>, RepoError>;

    /// All groups ordered by title.
    async fn list(&self) -> Result<Vec<Group>, RepoError>;

    /// Groups whose description contains `needle`, case-insensitively.
    async fn search(&self, needle: &str) -> Result<Vec<Group>, RepoError>;
}

/// Which posts a feed shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(Uuid),
    Author(Uuid),
    /// Posts by every author the given user follows.
    FollowedBy(Uuid),
}

/// Admin search over posts.
#[derive(Debug, Clone, Default)]
pub struct PostSearch {
    /// Case-insensitive substring of the text.
    pub text: Option<String>,
    pub published_since: Option<DateTime<Utc>>,
}

/// Post repository. Listings are newest-first.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Post>, RepoError>;

    async fn count(&self, filter: PostFilter) -> Result<u64, RepoError>;

    async fn list(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError>;

    async fn search(&self, query: &PostSearch) -> Result<Vec<Post>, RepoError>;
}

/// Comment repository. Listings are newest-first.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError>;

    /// Comments whose text contains `needle`, case-insensitively.
    async fn search(&self, needle: &str) -> Result<Vec<Comment>, RepoError>;
}

/// Follow edges. The (user, author) pair is unique in storage.
#[async_trait]
pub trait FollowRepository: Send + Sync {
    async fn exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;

    async fn create(&self, follow: Follow) -> Result<Follow, RepoError>;

    /// Remove the edge, returning how many rows went away.
    async fn delete_pair(&self, user_id: Uuid, author_id: Uuid) -> Result<u64, RepoError>;

    async fn list(&self) -> Result<Vec<Follow>, RepoError>;
}

/// Like and dislike edges. Each (post, user) pair is unique per kind.
#[async_trait]
pub trait ReactionRepository: Send + Sync {
    async fn exists(
        &self,
        kind: ReactionKind,
        post_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, RepoError>;

    async fn create(&self, reaction: Reaction) -> Result<Reaction, RepoError>;

    async fn delete_pair(
        &self,
        kind: ReactionKind,
        post_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, RepoError>;

    async fn count_for_post(&self, kind: ReactionKind, post_id: Uuid) -> Result<u64, RepoError>;

    async fn list(&self, kind: ReactionKind) -> Result<Vec<Reaction>, RepoError>;
}
