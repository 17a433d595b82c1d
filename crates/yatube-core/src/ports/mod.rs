//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod cache;
mod media;
mod repository;

pub use auth::{AuthError, PasswordService, TokenClaims, TokenService};
pub use cache::{Cache, CacheError};
pub use media::{MediaStorage, StorageError};
pub use repository::{
    BaseRepository, CommentRepository, FollowRepository, GroupRepository, PostFilter,
    PostRepository, PostSearch, ReactionRepository, UserRepository,
};
