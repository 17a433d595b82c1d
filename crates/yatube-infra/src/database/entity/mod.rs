//! SeaORM entities, one per table.

pub mod comment;
pub mod dislike;
pub mod follow;
pub mod group;
pub mod like;
pub mod post;
pub mod user;
