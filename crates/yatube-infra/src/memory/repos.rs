use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use yatube_core::domain::{Comment, Follow, Group, Post, Reaction, ReactionKind, User};
use yatube_core::error::RepoError;
use yatube_core::ports::{
    BaseRepository, CommentRepository, FollowRepository, GroupRepository, PostFilter,
    PostRepository, PostSearch, ReactionRepository, UserRepository,
};

use super::store::{InMemoryStore, Tables};

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn foreign_key(what: &str) -> RepoError {
    RepoError::ForeignKey(format!("{what} does not exist"))
}

/// Replace the row matching `id`, or report it missing.
fn replace<T: Clone>(
    rows: &mut [T],
    entity: T,
    id_of: impl Fn(&T) -> Uuid,
) -> Result<T, RepoError> {
    let id = id_of(&entity);
    let slot = rows
        .iter_mut()
        .find(|row| id_of(row) == id)
        .ok_or(RepoError::NotFound)?;
    *slot = entity.clone();
    Ok(entity)
}

// ---------------------------------------------------------------- users

pub struct InMemoryUserRepository {
    store: Arc<InMemoryStore>,
}

impl InMemoryUserRepository {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.store.tables.write().await;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(RepoError::Constraint(format!(
                "username {} already exists",
                user.username
            )));
        }
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.store.tables.write().await;
        if tables
            .users
            .iter()
            .any(|u| u.username == user.username && u.id != user.id)
        {
            return Err(RepoError::Constraint(format!(
                "username {} already exists",
                user.username
            )));
        }
        replace(&mut tables.users, user, |u| u.id)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        if !tables.user_exists(id) {
            return Err(RepoError::NotFound);
        }
        tables.cascade_user(id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }
}

// --------------------------------------------------------------- groups

pub struct InMemoryGroupRepository {
    store: Arc<InMemoryStore>,
}

impl InMemoryGroupRepository {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BaseRepository<Group, Uuid> for InMemoryGroupRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Group>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.groups.iter().find(|g| g.id == id).cloned())
    }

    async fn create(&self, group: Group) -> Result<Group, RepoError> {
        let mut tables = self.store.tables.write().await;
        if tables.groups.iter().any(|g| g.slug == group.slug) {
            return Err(RepoError::Constraint(format!(
                "slug {} already exists",
                group.slug
            )));
        }
        tables.groups.push(group.clone());
        Ok(group)
    }

    async fn update(&self, group: Group) -> Result<Group, RepoError> {
        let mut tables = self.store.tables.write().await;
        if tables
            .groups
            .iter()
            .any(|g| g.slug == group.slug && g.id != group.id)
        {
            return Err(RepoError::Constraint(format!(
                "slug {} already exists",
                group.slug
            )));
        }
        replace(&mut tables.groups, group, |g| g.id)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        if !tables.group_exists(id) {
            return Err(RepoError::NotFound);
        }
        tables.cascade_group(id);
        Ok(())
    }
}

#[async_trait]
impl GroupRepository for InMemoryGroupRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.groups.iter().find(|g| g.slug == slug).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Group>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .groups
            .iter()
            .filter(|g| ids.contains(&g.id))
            .cloned()
            .collect())
    }

    async fn list(&self) -> Result<Vec<Group>, RepoError> {
        let tables = self.store.tables.read().await;
        let mut groups = tables.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn search(&self, needle: &str) -> Result<Vec<Group>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .groups
            .iter()
            .filter(|g| contains_ci(&g.description, needle))
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------- posts

pub struct InMemoryPostRepository {
    store: Arc<InMemoryStore>,
}

impl InMemoryPostRepository {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }
}

fn post_matches(tables: &Tables, filter: PostFilter, post: &Post) -> bool {
    match filter {
        PostFilter::All => true,
        PostFilter::Group(group_id) => post.group_id == Some(group_id),
        PostFilter::Author(author_id) => post.author_id == author_id,
        PostFilter::FollowedBy(user_id) => tables
            .follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == post.author_id),
    }
}

/// Newest `pub_date` first; equal timestamps keep the latest insert first.
fn newest_first<'a>(posts: impl DoubleEndedIterator<Item = &'a Post>) -> Vec<Post> {
    let mut sorted: Vec<Post> = posts.rev().cloned().collect();
    sorted.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
    sorted
}

impl InMemoryPostRepository {
    fn check_references(tables: &Tables, post: &Post) -> Result<(), RepoError> {
        if !tables.user_exists(post.author_id) {
            return Err(foreign_key("author"));
        }
        if let Some(group_id) = post.group_id {
            if !tables.group_exists(group_id) {
                return Err(foreign_key("group"));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn create(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.store.tables.write().await;
        Self::check_references(&tables, &post)?;
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.store.tables.write().await;
        Self::check_references(&tables, &post)?;
        replace(&mut tables.posts, post, |p| p.id)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        if !tables.post_exists(id) {
            return Err(RepoError::NotFound);
        }
        tables.cascade_post(id);
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Post>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn count(&self, filter: PostFilter) -> Result<u64, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .filter(|p| post_matches(&tables, filter, p))
            .count() as u64)
    }

    async fn list(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.store.tables.read().await;
        let matching = tables
            .posts
            .iter()
            .filter(|p| post_matches(&tables, filter, p));
        Ok(newest_first(matching)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn search(&self, query: &PostSearch) -> Result<Vec<Post>, RepoError> {
        let tables = self.store.tables.read().await;
        let matching = tables.posts.iter().filter(|p| {
            query
                .text
                .as_deref()
                .is_none_or(|needle| contains_ci(&p.text, needle))
                && query.published_since.is_none_or(|since| p.pub_date >= since)
        });
        Ok(newest_first(matching))
    }
}

// ------------------------------------------------------------- comments

pub struct InMemoryCommentRepository {
    store: Arc<InMemoryStore>,
}

impl InMemoryCommentRepository {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }
}

fn comments_newest_first<'a>(comments: impl DoubleEndedIterator<Item = &'a Comment>) -> Vec<Comment> {
    let mut sorted: Vec<Comment> = comments.rev().cloned().collect();
    sorted.sort_by(|a, b| b.created.cmp(&a.created));
    sorted
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryCommentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn create(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.store.tables.write().await;
        if !tables.post_exists(comment.post_id) {
            return Err(foreign_key("post"));
        }
        if !tables.user_exists(comment.author_id) {
            return Err(foreign_key("author"));
        }
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn update(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.store.tables.write().await;
        replace(&mut tables.comments, comment, |c| c.id)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        let before = tables.comments.len();
        tables.comments.retain(|c| c.id != id);
        if tables.comments.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(comments_newest_first(
            tables.comments.iter().filter(|c| c.post_id == post_id),
        ))
    }

    async fn search(&self, needle: &str) -> Result<Vec<Comment>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(comments_newest_first(
            tables.comments.iter().filter(|c| contains_ci(&c.text, needle)),
        ))
    }
}

// -------------------------------------------------------------- follows

pub struct InMemoryFollowRepository {
    store: Arc<InMemoryStore>,
}

impl InMemoryFollowRepository {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl FollowRepository for InMemoryFollowRepository {
    async fn exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == author_id))
    }

    async fn create(&self, follow: Follow) -> Result<Follow, RepoError> {
        let mut tables = self.store.tables.write().await;
        if !tables.user_exists(follow.user_id) || !tables.user_exists(follow.author_id) {
            return Err(foreign_key("user"));
        }
        if tables
            .follows
            .iter()
            .any(|f| f.user_id == follow.user_id && f.author_id == follow.author_id)
        {
            return Err(RepoError::Constraint(
                "unique user-author pair".to_string(),
            ));
        }
        tables.follows.push(follow.clone());
        Ok(follow)
    }

    async fn delete_pair(&self, user_id: Uuid, author_id: Uuid) -> Result<u64, RepoError> {
        let mut tables = self.store.tables.write().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|f| !(f.user_id == user_id && f.author_id == author_id));
        Ok((before - tables.follows.len()) as u64)
    }

    async fn list(&self) -> Result<Vec<Follow>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.follows.clone())
    }
}

// ------------------------------------------------------------ reactions

pub struct InMemoryReactionRepository {
    store: Arc<InMemoryStore>,
}

impl InMemoryReactionRepository {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ReactionRepository for InMemoryReactionRepository {
    async fn exists(
        &self,
        kind: ReactionKind,
        post_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .reactions(kind)
            .iter()
            .any(|r| r.post_id == post_id && r.user_id == user_id))
    }

    async fn create(&self, reaction: Reaction) -> Result<Reaction, RepoError> {
        let mut tables = self.store.tables.write().await;
        if !tables.post_exists(reaction.post_id) {
            return Err(foreign_key("post"));
        }
        if !tables.user_exists(reaction.user_id) {
            return Err(foreign_key("user"));
        }
        let rows = tables.reactions_mut(reaction.kind);
        if rows
            .iter()
            .any(|r| r.post_id == reaction.post_id && r.user_id == reaction.user_id)
        {
            return Err(RepoError::Constraint(format!(
                "unique post-user {} pair",
                reaction.kind
            )));
        }
        rows.push(reaction.clone());
        Ok(reaction)
    }

    async fn delete_pair(
        &self,
        kind: ReactionKind,
        post_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, RepoError> {
        let mut tables = self.store.tables.write().await;
        let rows = tables.reactions_mut(kind);
        let before = rows.len();
        rows.retain(|r| !(r.post_id == post_id && r.user_id == user_id));
        Ok((before - rows.len()) as u64)
    }

    async fn count_for_post(&self, kind: ReactionKind, post_id: Uuid) -> Result<u64, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .reactions(kind)
            .iter()
            .filter(|r| r.post_id == post_id)
            .count() as u64)
    }

    async fn list(&self, kind: ReactionKind) -> Result<Vec<Reaction>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.reactions(kind).clone())
    }
}
