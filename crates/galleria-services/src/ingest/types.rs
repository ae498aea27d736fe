//! Types for the ingestion pipeline.

use bytes::Bytes;
use galleria_core::MediaKind;
use std::path::PathBuf;
use uuid::Uuid;

/// Where the source media comes from.
#[derive(Debug, Clone)]
pub enum IngestSource {
    Bytes(Bytes),
    File(PathBuf),
}

impl IngestSource {
    /// File name used for content-type inference, if any.
    pub fn filename(&self) -> Option<String> {
        match self {
            IngestSource::Bytes(_) => None,
            IngestSource::File(path) => path
                .file_name()
                .and_then(|name| name.to_str())
                .map(String::from),
        }
    }
}

/// A single media upload.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub kind: MediaKind,
    pub source: IngestSource,
    /// Declared content type; inferred from the payload or file name when absent.
    pub content_type: Option<String>,
    pub filename: Option<String>,
    pub title: Option<String>,
    pub uploaded_by: Option<Uuid>,
    /// Poster frame for a video, as image bytes. Ignored for images.
    pub thumbnail: Option<Bytes>,
}

impl IngestRequest {
    pub fn new(kind: MediaKind, source: IngestSource) -> Self {
        Self {
            kind,
            filename: source.filename(),
            source,
            content_type: None,
            title: None,
            uploaded_by: None,
            thumbnail: None,
        }
    }

    pub fn image(data: impl Into<Bytes>) -> Self {
        Self::new(MediaKind::Image, IngestSource::Bytes(data.into()))
    }

    pub fn video(data: impl Into<Bytes>) -> Self {
        Self::new(MediaKind::Video, IngestSource::Bytes(data.into()))
    }

    pub fn from_file(kind: MediaKind, path: impl Into<PathBuf>) -> Self {
        Self::new(kind, IngestSource::File(path.into()))
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_uploader(mut self, uploaded_by: Uuid) -> Self {
        self.uploaded_by = Some(uploaded_by);
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<Bytes>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }
}
