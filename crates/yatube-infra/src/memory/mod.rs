//! In-memory repositories - used when no database is configured, and in tests.
//!
//! All repositories share one [`InMemoryStore`], so uniqueness, foreign
//! keys and cascades behave the way the PostgreSQL schema enforces them.

mod repos;
mod store;

pub use repos::{
    InMemoryCommentRepository, InMemoryFollowRepository, InMemoryGroupRepository,
    InMemoryPostRepository, InMemoryReactionRepository, InMemoryUserRepository,
};
pub use store::InMemoryStore;
