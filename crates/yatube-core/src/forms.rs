//! Form validators.
//!
//! A form takes raw submitted fields and produces either a typed record
//! ready for persistence or [`FormErrors`] keyed by field name. Nothing
//! here touches storage; lookups a form needs (the group choices) are
//! passed in by the caller.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Group, TITLE_MAX_LEN, is_valid_slug, slugify};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str = "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const INVALID_SLUG: &str =
    "Enter a valid \"slug\" consisting of letters, numbers, underscores or hyphens.";

/// Field-level validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `field`, empty if it validated.
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// `Ok(value)` when no errors were recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

/// Image formats accepted for post attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Gif,
    Png,
    Jpeg,
    Webp,
}

impl ImageFormat {
    /// Identify the format from the file's magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(Self::Gif),
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }
}

/// A decoded, sniffed image waiting to be stored.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// Raw post submission: `text`, optional `group` id, optional base64 `image`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default, skip_serializing)]
    pub image: Option<String>,
}

/// A post submission that passed validation.
#[derive(Debug, Clone)]
pub struct ValidPost {
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<ImageUpload>,
}

impl PostForm {
    /// Pre-fill a form from stored values, as the edit page shows it.
    pub fn from_values(text: &str, group_id: Option<Uuid>) -> Self {
        Self {
            text: text.to_string(),
            group: group_id.map(|id| id.to_string()),
            image: None,
        }
    }

    /// Validate against the available group choices.
    pub fn clean(&self, groups: &[Group]) -> Result<ValidPost, FormErrors> {
        let mut errors = FormErrors::new();

        let text = self.text.trim();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }

        let group_id = match self.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match Uuid::parse_str(raw) {
                Ok(id) if groups.iter().any(|g| g.id == id) => Some(id),
                _ => {
                    errors.add("group", INVALID_CHOICE);
                    None
                }
            },
        };

        let image = match self.image.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(encoded) => match decode_image(encoded) {
                Some(upload) => Some(upload),
                None => {
                    errors.add("image", INVALID_IMAGE);
                    None
                }
            },
        };

        errors.into_result(ValidPost {
            text: text.to_string(),
            group_id,
            image,
        })
    }
}

/// Accepts plain base64 or a `data:image/...;base64,` URL.
fn decode_image(encoded: &str) -> Option<ImageUpload> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    let bytes = STANDARD.decode(payload).ok()?;
    let format = ImageFormat::sniff(&bytes)?;
    Some(ImageUpload { format, bytes })
}

/// Raw comment submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    /// Returns the trimmed comment text.
    pub fn clean(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let text = self.text.trim();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }
        errors.into_result(text.to_string())
    }
}

/// Admin group submission. A blank slug is prepopulated from the title.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl GroupForm {
    pub fn clean(&self) -> Result<ValidGroup, FormErrors> {
        let mut errors = FormErrors::new();

        let title = self.title.trim();
        if title.is_empty() {
            errors.add("title", REQUIRED);
        } else if title.chars().count() > TITLE_MAX_LEN {
            errors.add(
                "title",
                format!("Ensure this value has at most {TITLE_MAX_LEN} characters."),
            );
        }

        let slug = match self.slug.as_deref().map(str::trim) {
            None | Some("") => slugify(title),
            Some(explicit) => explicit.to_string(),
        };
        if slug.is_empty() {
            errors.add("slug", REQUIRED);
        } else if !is_valid_slug(&slug) {
            errors.add("slug", INVALID_SLUG);
        }

        let description = self.description.trim();
        if description.is_empty() {
            errors.add("description", REQUIRED);
        }

        errors.into_result(ValidGroup {
            title: title.to_string(),
            slug,
            description: description.to_string(),
        })
    }
}
