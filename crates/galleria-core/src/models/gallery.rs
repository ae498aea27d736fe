use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use crate::constants::{IMAGE_QUOTA, MAX_TITLE_LENGTH, VIDEO_QUOTA};

/// Kind of media a gallery item holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "gallery_media_kind", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub const ALL: [MediaKind; 2] = [MediaKind::Image, MediaKind::Video];

    /// Ceiling on active items of this kind.
    pub fn quota(self) -> i64 {
        match self {
            MediaKind::Image => IMAGE_QUOTA,
            MediaKind::Video => VIDEO_QUOTA,
        }
    }

    /// Directory segment under the gallery prefix.
    pub fn folder(self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
        }
    }

    /// Short prefix embedded in object names.
    pub fn key_prefix(self) -> &'static str {
        match self {
            MediaKind::Image => "img",
            MediaKind::Video => "vid",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl FromStr for MediaKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image" | "images" | "photo" => Ok(MediaKind::Image),
            "video" | "videos" => Ok(MediaKind::Video),
            _ => Err(anyhow::anyhow!("Invalid media kind: {}", s)),
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// One published media asset, as recorded by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct GalleryItem {
    pub id: Uuid,
    pub media_kind: MediaKind,
    pub title: Option<String>,
    pub primary_object_ref: String,
    pub thumbnail_object_ref: Option<String>,
    pub featured: bool,
    pub active: bool,
    pub order_index: i32,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GalleryItem {
    /// Every object reference held by the item, primary first.
    pub fn object_refs(&self) -> Vec<&str> {
        let mut refs = vec![self.primary_object_ref.as_str()];
        if let Some(thumb) = self.thumbnail_object_ref.as_deref() {
            refs.push(thumb);
        }
        refs
    }
}

/// Row handed to the ledger once the object is durably stored.
///
/// `id`, `featured`, `active`, `order_index` and the timestamps are assigned
/// by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "thumbnail_only_for_video"))]
pub struct NewGalleryItem {
    pub media_kind: MediaKind,
    #[validate(length(max = MAX_TITLE_LENGTH, message = "Title must be at most 255 characters"))]
    pub title: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub primary_object_ref: String,
    pub thumbnail_object_ref: Option<String>,
    pub uploaded_by: Option<Uuid>,
}

impl NewGalleryItem {
    pub fn new(media_kind: MediaKind, primary_object_ref: impl Into<String>) -> Self {
        Self {
            media_kind,
            title: None,
            primary_object_ref: primary_object_ref.into(),
            thumbnail_object_ref: None,
            uploaded_by: None,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = normalize_title(title);
        self
    }

    pub fn with_uploader(mut self, uploaded_by: Option<Uuid>) -> Self {
        self.uploaded_by = uploaded_by;
        self
    }

    /// Thumbnails only exist for videos; the reference is dropped for images.
    pub fn with_thumbnail(mut self, thumbnail_object_ref: Option<String>) -> Self {
        self.thumbnail_object_ref = match self.media_kind {
            MediaKind::Video => thumbnail_object_ref,
            MediaKind::Image => None,
        };
        self
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required")
            .with_message("Primary object reference must not be empty".into()));
    }
    Ok(())
}

fn thumbnail_only_for_video(item: &NewGalleryItem) -> Result<(), ValidationError> {
    if item.thumbnail_object_ref.is_some() && item.media_kind != MediaKind::Video {
        return Err(ValidationError::new("video_only")
            .with_message("Only video items carry a thumbnail".into()));
    }
    Ok(())
}

/// Editable fields of an item. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct GalleryItemPatch {
    /// `Some(None)` clears the title.
    #[serde(default)]
    #[validate(length(max = MAX_TITLE_LENGTH, message = "Title must be at most 255 characters"))]
    pub title: Option<Option<String>>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub order_index: Option<i32>,
}

impl GalleryItemPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.featured.is_none() && self.order_index.is_none()
    }

    /// Trims the title and turns a blank one into a clear.
    pub fn normalized(mut self) -> Self {
        if let Some(title) = self.title.take() {
            self.title = Some(normalize_title(title));
        }
        self
    }

    /// Applies the patch to an item in place; object references are untouched.
    pub fn apply_to(&self, item: &mut GalleryItem) {
        if let Some(title) = &self.title {
            item.title = title.clone();
        }
        if let Some(featured) = self.featured {
            item.featured = featured;
        }
        if let Some(order_index) = self.order_index {
            item.order_index = order_index;
        }
    }
}

fn normalize_title(title: Option<String>) -> Option<String> {
    title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[derive(Validate)]
struct TitleField<'a> {
    #[validate(length(max = MAX_TITLE_LENGTH, message = "Title must be at most 255 characters"))]
    title: &'a str,
}

/// Check a (trimmed) title against the length limit.
pub fn validate_title(title: &str) -> Result<(), ValidationErrors> {
    TitleField { title }.validate()
}
