use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of characters a post shows when displayed inline.
const DISPLAY_CHARS: usize = 15;

/// Post entity - an authored text entry, optionally grouped and imaged.
///
/// `pub_date` is stamped on creation and never touched by [`Post::edit`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    pub text: String,
    /// Storage path relative to the media root, e.g. `posts/<uuid>.gif`.
    pub image: Option<String>,
    pub pub_date: DateTime<Utc>,
}

impl Post {
    /// Create a new post published now.
    pub fn new(
        author_id: Uuid,
        text: String,
        group_id: Option<Uuid>,
        image: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id,
            group_id,
            text,
            image,
            pub_date: Utc::now(),
        }
    }

    /// Apply an edit. A missing image keeps the current one.
    pub fn edit(&mut self, text: String, group_id: Option<Uuid>, image: Option<String>) {
        self.text = text;
        self.group_id = group_id;
        if image.is_some() {
            self.image = image;
        }
    }

    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short: String = self.text.chars().take(DISPLAY_CHARS).collect();
        f.write_str(&short)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_truncates_to_fifteen_chars() {
        let post = Post::new(
            Uuid::new_v4(),
            "This is a long text to check how str method works".into(),
            None,
            None,
        );
        assert_eq!(post.to_string(), "This is a long ");
    }

    #[test]
    fn display_counts_chars_not_bytes() {
        let post = Post::new(Uuid::new_v4(), "Тестовый пост про котиков".into(), None, None);
        assert_eq!(post.to_string(), "Тестовый пост п");
    }

    #[test]
    fn edit_keeps_pub_date_and_existing_image() {
        let mut post = Post::new(
            Uuid::new_v4(),
            "before".into(),
            None,
            Some("posts/a.gif".into()),
        );
        let published = post.pub_date;
        let group = Uuid::new_v4();

        post.edit("after".into(), Some(group), None);

        assert_eq!(post.text, "after");
        assert_eq!(post.group_id, Some(group));
        assert_eq!(post.image.as_deref(), Some("posts/a.gif"));
        assert_eq!(post.pub_date, published);
    }
}
