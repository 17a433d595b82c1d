use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of a group title.
pub const TITLE_MAX_LEN: usize = 200;

/// Group entity - a named community posts may belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub title: String,
    /// Globally unique, URL-safe identifier.
    pub slug: String,
    pub description: String,
}

impl Group {
    pub fn new(title: String, slug: String, description: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            slug,
            description,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Group \"{}\"", self.title)
    }
}

/// Turn a title into a slug: ASCII letters, digits, `_` and `-` only,
/// lowercased, whitespace runs collapsed into single hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for ch in title.trim().chars() {
        if ch.is_whitespace() || ch == '-' {
            pending_hyphen = true;
        } else if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        }
    }

    slug.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Whether `slug` consists solely of `[-a-zA-Z0-9_]`.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
