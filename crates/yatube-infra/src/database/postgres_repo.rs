//! PostgreSQL repository implementations.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func, LikeExpr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbConn, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use uuid::Uuid;

use yatube_core::domain::{Comment, Follow, Group, Post, Reaction, ReactionKind, User};
use yatube_core::error::RepoError;
use yatube_core::ports::{
    CommentRepository, FollowRepository, GroupRepository, PostFilter, PostRepository, PostSearch,
    ReactionRepository, UserRepository,
};

use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::follow::{self, Entity as FollowEntity};
use super::entity::group::{self, Entity as GroupEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, read_error, write_error};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL group repository.
pub type PostgresGroupRepository = PostgresBaseRepository<GroupEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// PostgreSQL comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<CommentEntity>;

/// PostgreSQL follow repository.
pub type PostgresFollowRepository = PostgresBaseRepository<FollowEntity>;

/// `%needle%` with the LIKE wildcards in `needle` escaped by `\`.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// `lower(column) LIKE '%needle%' ESCAPE '\'`.
fn icontains<C: ColumnTrait>(column: C, needle: &str) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column)))
        .like(LikeExpr::new(contains_pattern(needle)).escape('\\'))
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(username = %username, "Finding user by username");

        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(self.db.as_ref())
            .await
            .map_err(read_error)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let result = UserEntity::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(read_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl GroupRepository for PostgresGroupRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let result = GroupEntity::find()
            .filter(group::Column::Slug.eq(slug))
            .one(self.db.as_ref())
            .await
            .map_err(read_error)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Group>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let result = GroupEntity::find()
            .filter(group::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(read_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn list(&self) -> Result<Vec<Group>, RepoError> {
        let result = GroupEntity::find()
            .order_by_asc(group::Column::Title)
            .all(self.db.as_ref())
            .await
            .map_err(read_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn search(&self, needle: &str) -> Result<Vec<Group>, RepoError> {
        let result = GroupEntity::find()
            .filter(icontains(group::Column::Description, needle))
            .order_by_asc(group::Column::Title)
            .all(self.db.as_ref())
            .await
            .map_err(read_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

fn post_condition(filter: PostFilter) -> Condition {
    match filter {
        PostFilter::All => Condition::all(),
        PostFilter::Group(group_id) => Condition::all().add(post::Column::GroupId.eq(group_id)),
        PostFilter::Author(author_id) => {
            Condition::all().add(post::Column::AuthorId.eq(author_id))
        }
        PostFilter::FollowedBy(user_id) => Condition::all().add(
            post::Column::AuthorId.in_subquery(
                Query::select()
                    .column(follow::Column::AuthorId)
                    .from(FollowEntity)
                    .and_where(follow::Column::UserId.eq(user_id))
                    .to_owned(),
            ),
        ),
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Post>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let result = PostEntity::find()
            .filter(post::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(read_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn count(&self, filter: PostFilter) -> Result<u64, RepoError> {
        PostEntity::find()
            .filter(post_condition(filter))
            .count(self.db.as_ref())
            .await
            .map_err(read_error)
    }

    async fn list(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let result = PostEntity::find()
            .filter(post_condition(filter))
            .order_by_desc(post::Column::PubDate)
            .order_by_desc(post::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(read_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn search(&self, query: &PostSearch) -> Result<Vec<Post>, RepoError> {
        let mut condition = Condition::all();
        if let Some(needle) = &query.text {
            condition = condition.add(icontains(post::Column::Text, needle));
        }
        if let Some(since) = query.published_since {
            condition = condition.add(post::Column::PubDate.gte(since));
        }

        let result = PostEntity::find()
            .filter(condition)
            .order_by_desc(post::Column::PubDate)
            .all(self.db.as_ref())
            .await
            .map_err(read_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let result = CommentEntity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_desc(comment::Column::Created)
            .all(self.db.as_ref())
            .await
            .map_err(read_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn search(&self, needle: &str) -> Result<Vec<Comment>, RepoError> {
        let result = CommentEntity::find()
            .filter(icontains(comment::Column::Text, needle))
            .order_by_desc(comment::Column::Created)
            .all(self.db.as_ref())
            .await
            .map_err(read_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl FollowRepository for PostgresFollowRepository {
    async fn exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let count = FollowEntity::find()
            .filter(follow::Column::UserId.eq(user_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .count(self.db.as_ref())
            .await
            .map_err(read_error)?;

        Ok(count > 0)
    }

    async fn create(&self, follow: Follow) -> Result<Follow, RepoError> {
        let model = follow::ActiveModel::from(follow)
            .insert(self.db.as_ref())
            .await
            .map_err(write_error)?;

        Ok(model.into())
    }

    async fn delete_pair(&self, user_id: Uuid, author_id: Uuid) -> Result<u64, RepoError> {
        let result = FollowEntity::delete_many()
            .filter(follow::Column::UserId.eq(user_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .exec(self.db.as_ref())
            .await
            .map_err(write_error)?;

        Ok(result.rows_affected)
    }

    async fn list(&self) -> Result<Vec<Follow>, RepoError> {
        let result = FollowEntity::find().all(self.db.as_ref()).await.map_err(read_error)?;
        Ok(result.into_iter().map(Into::into).collect())
    }
}

/// Likes and dislikes live in two tables of identical shape.
pub struct PostgresReactionRepository {
    db: Arc<DbConn>,
}

impl PostgresReactionRepository {
    pub fn new(db: Arc<DbConn>) -> Self {
        Self { db }
    }
}

/// Evaluate `$body` with `$table` bound to the entity module for `$kind`.
macro_rules! with_reaction_table {
    ($kind:expr, $table:ident => $body:expr) => {
        match $kind {
            ReactionKind::Like => {
                use super::entity::like as $table;
                $body
            }
            ReactionKind::Dislike => {
                use super::entity::dislike as $table;
                $body
            }
        }
    };
}

#[async_trait]
impl ReactionRepository for PostgresReactionRepository {
    async fn exists(
        &self,
        kind: ReactionKind,
        post_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, RepoError> {
        let count = with_reaction_table!(kind, table => {
            table::Entity::find()
                .filter(table::Column::PostId.eq(post_id))
                .filter(table::Column::UserId.eq(user_id))
                .count(self.db.as_ref())
                .await
        })
        .map_err(read_error)?;

        Ok(count > 0)
    }

    async fn create(&self, reaction: Reaction) -> Result<Reaction, RepoError> {
        with_reaction_table!(reaction.kind, table => {
            table::ActiveModel::from(reaction)
                .insert(self.db.as_ref())
                .await
                .map(Reaction::from)
        })
        .map_err(write_error)
    }

    async fn delete_pair(
        &self,
        kind: ReactionKind,
        post_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, RepoError> {
        let result = with_reaction_table!(kind, table => {
            table::Entity::delete_many()
                .filter(table::Column::PostId.eq(post_id))
                .filter(table::Column::UserId.eq(user_id))
                .exec(self.db.as_ref())
                .await
        })
        .map_err(write_error)?;

        Ok(result.rows_affected)
    }

    async fn count_for_post(&self, kind: ReactionKind, post_id: Uuid) -> Result<u64, RepoError> {
        with_reaction_table!(kind, table => {
            table::Entity::find()
                .filter(table::Column::PostId.eq(post_id))
                .count(self.db.as_ref())
                .await
        })
        .map_err(read_error)
    }

    async fn list(&self, kind: ReactionKind) -> Result<Vec<Reaction>, RepoError> {
        let reactions = with_reaction_table!(kind, table => {
            table::Entity::find()
                .all(self.db.as_ref())
                .await
                .map(|rows| rows.into_iter().map(Reaction::from).collect::<Vec<_>>())
        })
        .map_err(read_error)?;

        Ok(reactions)
    }
}
