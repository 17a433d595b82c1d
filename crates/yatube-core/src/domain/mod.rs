//! Domain entities - the core business objects.

mod comment;
mod follow;
mod group;
mod post;
mod reaction;
mod user;

pub use comment::Comment;
pub use follow::Follow;
pub use group::{Group, TITLE_MAX_LEN, is_valid_slug, slugify};
pub use post::Post;
pub use reaction::{Reaction, ReactionKind};
pub use user::{ROLE_ADMIN, ROLE_USER, User};
