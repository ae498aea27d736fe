use galleria_core::{GalleryConfig, MediaKind};
use std::path::Path;

use crate::compression::is_supported_source;

/// Validation errors for source media
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Content type could not be determined")]
    UnknownContentType,

    #[error("Payload is not a supported image")]
    UnrecognizedImage,

    #[error("Empty file")]
    EmptyFile,
}

/// Pre-flight validator for one media kind.
#[derive(Debug, Clone)]
pub struct MediaValidator {
    kind: MediaKind,
    max_file_size: usize,
    allowed_content_types: Vec<String>,
}

impl MediaValidator {
    pub fn new(kind: MediaKind, max_file_size: usize, allowed_content_types: Vec<String>) -> Self {
        Self {
            kind,
            max_file_size,
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|ct| ct.to_lowercase())
                .collect(),
        }
    }

    /// Validator with the limits configured for `kind`.
    pub fn for_kind(config: &GalleryConfig, kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => Self::new(
                kind,
                config.max_image_source_bytes,
                config.image_allowed_content_types.clone(),
            ),
            MediaKind::Video => Self::new(
                kind,
                config.max_video_source_bytes,
                config.video_allowed_content_types.clone(),
            ),
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate content type
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = normalize_content_type(content_type);

        if !self.allowed_content_types.iter().any(|ct| ct == &normalized) {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    /// Validate a fully-read payload and its declared content type.
    ///
    /// Images must also be sniffable as a supported format; videos are
    /// opaque bytes.
    pub fn validate(&self, data: &[u8], content_type: &str) -> Result<(), ValidationError> {
        self.validate_file_size(data.len())?;
        self.validate_content_type(content_type)?;

        if self.kind == MediaKind::Image {
            match image::guess_format(data) {
                Ok(format) if is_supported_source(format) => {}
                _ => return Err(ValidationError::UnrecognizedImage),
            }
        }

        Ok(())
    }
}

fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_lowercase()
}

/// Best guess at a payload's content type.
///
/// Images are sniffed from their magic bytes; videos fall back to the
/// filename extension.
pub fn infer_content_type(kind: MediaKind, data: &[u8], filename: Option<&str>) -> Option<String> {
    if kind == MediaKind::Image {
        if let Ok(format) = image::guess_format(data) {
            return Some(format.to_mime_type().to_string());
        }
    }

    let extension = filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())?;

    let content_type = match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        _ => return None,
    };
    Some(content_type.to_string())
}

/// File extension used in storage keys for a content type.
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    match normalize_content_type(content_type).as_str() {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/webm" => "webm",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn image_validator() -> MediaValidator {
        MediaValidator::new(
            MediaKind::Image,
            1024,
            vec!["image/jpeg".to_string(), "IMAGE/PNG".to_string()],
        )
    }

    #[test]
    fn test_validate_file_size() {
        let validator = image_validator();
        assert!(validator.validate_file_size(512).is_ok());
        assert_eq!(validator.validate_file_size(0), Err(ValidationError::EmptyFile));
        assert!(matches!(
            validator.validate_file_size(2048),
            Err(ValidationError::FileTooLarge { size: 2048, max: 1024 })
        ));
    }

    #[test]
    fn test_validate_content_type_ignores_case_and_params() {
        let validator = image_validator();
        assert!(validator.validate_content_type("image/png").is_ok());
        assert!(validator.validate_content_type("Image/JPEG; charset=binary").is_ok());
        assert!(validator.validate_content_type("video/mp4").is_err());
    }

    #[test]
    fn test_images_must_be_sniffable() {
        let validator = image_validator();
        assert!(validator.validate(PNG_MAGIC, "image/png").is_ok());
        assert_eq!(
            validator.validate(b"plain text pretending", "image/png"),
            Err(ValidationError::UnrecognizedImage)
        );
    }

    #[test]
    fn test_videos_are_opaque() {
        let validator = MediaValidator::new(MediaKind::Video, 1024, vec!["video/mp4".to_string()]);
        assert!(validator.validate(b"\x00\x00\x00\x18ftypmp42", "video/mp4").is_ok());
    }

    #[test]
    fn test_for_kind_uses_config_limits() {
        let config = GalleryConfig::from_lookup(|_| None).unwrap();
        let video = MediaValidator::for_kind(&config, MediaKind::Video);
        assert_eq!(video.kind(), MediaKind::Video);
        assert!(video.validate_content_type("video/quicktime").is_ok());
        assert!(video.validate_content_type("image/png").is_err());
    }

    #[test]
    fn test_infer_content_type() {
        assert_eq!(
            infer_content_type(MediaKind::Image, PNG_MAGIC, None).as_deref(),
            Some("image/png")
        );
        assert_eq!(
            infer_content_type(MediaKind::Video, b"....", Some("sports-day.MOV")).as_deref(),
            Some("video/quicktime")
        );
        assert_eq!(infer_content_type(MediaKind::Video, b"....", Some("notes.txt")), None);
        assert_eq!(infer_content_type(MediaKind::Video, b"....", None), None);
    }

    #[test]
    fn test_extension_for_content_type() {
        assert_eq!(extension_for_content_type("image/jpeg"), "jpg");
        assert_eq!(extension_for_content_type("video/quicktime"), "mov");
        assert_eq!(extension_for_content_type("application/x-unknown"), "bin");
    }
}
