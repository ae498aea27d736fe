//! Fixed limits of the gallery. None of these are read from configuration.

/// Root prefix under which every gallery object is stored.
pub const GALLERY_PREFIX: &str = "gallery/";

/// Maximum number of active image items.
pub const IMAGE_QUOTA: i64 = 20;

/// Maximum number of active video items.
pub const VIDEO_QUOTA: i64 = 10;

/// Longest edge allowed for a published image, in pixels.
pub const IMAGE_MAX_DIMENSION: u32 = 1920;

/// Size an image is compressed towards, in bytes.
pub const IMAGE_TARGET_BYTES: usize = 500 * 1024;

/// Hard tolerance above the target; beyond this a warning is logged.
pub const IMAGE_SIZE_TOLERANCE: f32 = 1.5;

/// First JPEG quality tried.
pub const IMAGE_START_QUALITY: f32 = 0.8;

/// Lowest JPEG quality the compressor will go to.
pub const IMAGE_MIN_QUALITY: f32 = 0.3;

/// Quality decrement between attempts.
pub const IMAGE_QUALITY_STEP: f32 = 0.1;

/// Longest edge of a video thumbnail, in pixels.
pub const THUMBNAIL_MAX_DIMENSION: u32 = 480;

/// Size a video thumbnail is compressed towards, in bytes.
pub const THUMBNAIL_TARGET_BYTES: usize = 100 * 1024;

/// Videos above this size are logged but never rejected for it.
pub const VIDEO_SOFT_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Maximum length of an item title.
pub const MAX_TITLE_LENGTH: u64 = 255;
