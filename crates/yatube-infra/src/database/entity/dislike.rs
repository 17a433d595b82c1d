//! Dislike entity for SeaORM. Unique on (post_id, user_id).

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use yatube_core::domain::{Reaction, ReactionKind};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "dislikes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_delete = "Cascade"
    )]
    Post,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Reaction {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            kind: ReactionKind::Dislike,
            post_id: model.post_id,
            user_id: model.user_id,
        }
    }
}

impl From<Reaction> for ActiveModel {
    fn from(reaction: Reaction) -> Self {
        Self {
            id: Set(reaction.id),
            post_id: Set(reaction.post_id),
            user_id: Set(reaction.user_id),
        }
    }
}
