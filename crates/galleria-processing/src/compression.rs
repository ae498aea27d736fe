//! Size-envelope JPEG compression.
//!
//! An image is decoded once, scaled down to fit the envelope's dimensions
//! and then re-encoded from those pixels at decreasing quality until it fits
//! the byte target or the quality floor is reached.

use bytes::Bytes;
use galleria_core::constants::{
    IMAGE_MAX_DIMENSION, IMAGE_MIN_QUALITY, IMAGE_QUALITY_STEP, IMAGE_SIZE_TOLERANCE,
    IMAGE_START_QUALITY, IMAGE_TARGET_BYTES, THUMBNAIL_MAX_DIMENSION, THUMBNAIL_TARGET_BYTES,
};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, RgbImage};
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

const JPEG_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("Source is not a decodable image: {0}")]
    Decode(String),

    #[error("Compression task failed: {0}")]
    TaskFailed(String),
}

/// Target limits for a compressed image.
///
/// Qualities are JPEG quality percents (0-100).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionEnvelope {
    pub max_width: u32,
    pub max_height: u32,
    pub target_bytes: usize,
    pub tolerance: f32,
    pub start_quality: u8,
    pub min_quality: u8,
    pub quality_step: u8,
}

fn percent(fraction: f32) -> u8 {
    (fraction * 100.0).round().clamp(1.0, 100.0) as u8
}

impl CompressionEnvelope {
    /// Envelope for published gallery images.
    pub fn gallery_image() -> Self {
        Self {
            max_width: IMAGE_MAX_DIMENSION,
            max_height: IMAGE_MAX_DIMENSION,
            target_bytes: IMAGE_TARGET_BYTES,
            tolerance: IMAGE_SIZE_TOLERANCE,
            start_quality: percent(IMAGE_START_QUALITY),
            min_quality: percent(IMAGE_MIN_QUALITY),
            quality_step: percent(IMAGE_QUALITY_STEP),
        }
    }

    /// Envelope for video poster thumbnails.
    pub fn video_thumbnail() -> Self {
        Self {
            max_width: THUMBNAIL_MAX_DIMENSION,
            max_height: THUMBNAIL_MAX_DIMENSION,
            target_bytes: THUMBNAIL_TARGET_BYTES,
            ..Self::gallery_image()
        }
    }

    /// Size above which a result is logged as out of tolerance.
    pub fn tolerance_bytes(&self) -> usize {
        (self.target_bytes as f64 * self.tolerance as f64) as usize
    }
}

impl Default for CompressionEnvelope {
    fn default() -> Self {
        Self::gallery_image()
    }
}

/// Output of [`SizeEnvelopeCompressor::compress`].
#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub bytes: Bytes,
    pub content_type: &'static str,
    pub width: u32,
    pub height: u32,
    /// JPEG quality of the final encode; `None` when the source bytes were kept.
    pub quality: Option<u8>,
    pub attempts: u32,
    pub within_target: bool,
    pub within_tolerance: bool,
}

impl CompressedImage {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the bytes were re-encoded (as opposed to passed through).
    pub fn reencoded(&self) -> bool {
        self.quality.is_some()
    }
}

/// Compresses images into a [`CompressionEnvelope`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeEnvelopeCompressor {
    envelope: CompressionEnvelope,
}

impl SizeEnvelopeCompressor {
    pub fn new(envelope: CompressionEnvelope) -> Self {
        Self { envelope }
    }

    pub fn envelope(&self) -> &CompressionEnvelope {
        &self.envelope
    }

    /// Compress on the blocking thread pool.
    pub async fn compress(&self, source: Bytes) -> Result<CompressedImage, CompressionError> {
        let compressor = *self;
        tokio::task::spawn_blocking(move || compressor.compress_blocking(&source))
            .await
            .map_err(|e| CompressionError::TaskFailed(e.to_string()))?
    }

    /// Synchronous compression.
    ///
    /// Only a source that cannot be decoded is an error. If encoding fails,
    /// the last successful encode is returned, or the source bytes when none
    /// succeeded.
    pub fn compress_blocking(&self, source: &[u8]) -> Result<CompressedImage, CompressionError> {
        let start = std::time::Instant::now();
        let envelope = &self.envelope;

        let source_format = image::guess_format(source).ok();
        let img = image::load_from_memory(source)
            .map_err(|e| CompressionError::Decode(e.to_string()))?;

        let resized = fit_within(img, envelope.max_width, envelope.max_height);
        let (width, height) = resized.dimensions();
        let rgb = resized.to_rgb8();

        let mut quality = envelope.start_quality;
        let mut attempts = 0u32;
        let mut best: Option<(Vec<u8>, u8)> = None;

        loop {
            attempts += 1;
            match encode_jpeg(&rgb, quality) {
                Ok(data) => {
                    let fits = data.len() <= envelope.target_bytes;
                    tracing::debug!(
                        quality = quality,
                        attempt = attempts,
                        size_bytes = data.len(),
                        target_bytes = envelope.target_bytes,
                        "JPEG encode attempt"
                    );
                    best = Some((data, quality));
                    if fits {
                        break;
                    }
                }
                Err(reason) => {
                    tracing::warn!(
                        quality = quality,
                        attempt = attempts,
                        error = %reason,
                        "JPEG encode failed, keeping best previous result"
                    );
                    break;
                }
            }

            if quality <= envelope.min_quality {
                break;
            }
            quality = quality
                .saturating_sub(envelope.quality_step)
                .max(envelope.min_quality);
        }

        let result = match best {
            Some((data, quality)) => self.finish(
                Bytes::from(data),
                JPEG_CONTENT_TYPE,
                width,
                height,
                Some(quality),
                attempts,
            ),
            None => {
                let content_type = source_format
                    .map(|f| f.to_mime_type())
                    .unwrap_or("application/octet-stream");
                tracing::warn!(
                    size_bytes = source.len(),
                    content_type = content_type,
                    "No JPEG encode succeeded, keeping source bytes"
                );
                let (width, height) = original_dimensions(source, width, height);
                self.finish(
                    Bytes::copy_from_slice(source),
                    content_type,
                    width,
                    height,
                    None,
                    attempts,
                )
            }
        };

        if !result.within_tolerance {
            tracing::warn!(
                size_bytes = result.size(),
                tolerance_bytes = envelope.tolerance_bytes(),
                quality = ?result.quality,
                "Compressed image exceeds size tolerance; accepting it"
            );
        }

        tracing::info!(
            source_bytes = source.len(),
            size_bytes = result.size(),
            width = result.width,
            height = result.height,
            quality = ?result.quality,
            attempts = result.attempts,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Image compressed"
        );

        Ok(result)
    }

    fn finish(
        &self,
        bytes: Bytes,
        content_type: &'static str,
        width: u32,
        height: u32,
        quality: Option<u8>,
        attempts: u32,
    ) -> CompressedImage {
        let size = bytes.len();
        CompressedImage {
            bytes,
            content_type,
            width,
            height,
            quality,
            attempts,
            within_target: size <= self.envelope.target_bytes,
            within_tolerance: size <= self.envelope.tolerance_bytes(),
        }
    }
}

/// Scale down to fit the box, preserving aspect ratio. Never upscales.
fn fit_within(img: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max_width && height <= max_height {
        return img;
    }
    img.resize(max_width, max_height, FilterType::CatmullRom)
}

fn original_dimensions(source: &[u8], fallback_width: u32, fallback_height: u32) -> (u32, u32) {
    image::load_from_memory(source)
        .map(|img| img.dimensions())
        .unwrap_or((fallback_width, fallback_height))
}

/// Encode RGB pixels with mozjpeg. Encoder panics are turned into errors.
fn encode_jpeg(rgb: &RgbImage, quality: u8) -> Result<Vec<u8>, String> {
    let (width, height) = rgb.dimensions();
    let encoded = panic::catch_unwind(AssertUnwindSafe(|| -> std::io::Result<Vec<u8>> {
        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(Vec::new())?;
        comp.write_scanlines(rgb.as_raw())?;
        comp.finish()
    }));

    match encoded {
        Ok(Ok(data)) => Ok(data),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("JPEG encoder panicked".to_string()),
    }
}

/// Whether `format` is one the compressor can take as input.
pub fn is_supported_source(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP | ImageFormat::Gif
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use rand::Rng;
    use std::io::Cursor;

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    fn noise(width: u32, height: u32) -> DynamicImage {
        let mut rng = rand::rng();
        let img = RgbImage::from_fn(width, height, |_, _| {
            Rgb([rng.random(), rng.random(), rng.random()])
        });
        DynamicImage::ImageRgb8(img)
    }

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([40, 120, 200])))
    }

    #[test]
    fn gallery_envelope_defaults() {
        let envelope = CompressionEnvelope::gallery_image();
        assert_eq!(envelope.max_width, 1920);
        assert_eq!(envelope.target_bytes, 512_000);
        assert_eq!(envelope.start_quality, 80);
        assert_eq!(envelope.min_quality, 30);
        assert_eq!(envelope.quality_step, 10);
        assert_eq!(envelope.tolerance_bytes(), 768_000);
    }

    #[test]
    fn large_noisy_image_lands_in_envelope() {
        let source = encode(noise(2400, 1800), ImageFormat::Png);
        let result = SizeEnvelopeCompressor::default()
            .compress_blocking(&source)
            .unwrap();

        assert!(result.width <= 1920 && result.height <= 1920);
        assert_eq!((result.width, result.height), (1920, 1440));
        assert!(result.size() <= 768_000 || result.quality == Some(30));
        assert_eq!(result.content_type, "image/jpeg");
        assert!(result.attempts >= 1 && result.attempts <= 6);
    }

    #[test]
    fn small_image_is_not_upscaled() {
        let source = encode(solid(200, 100), ImageFormat::Png);
        let result = SizeEnvelopeCompressor::default()
            .compress_blocking(&source)
            .unwrap();

        assert_eq!((result.width, result.height), (200, 100));
        assert_eq!(result.quality, Some(80));
        assert_eq!(result.attempts, 1);
        assert!(result.within_target);
        assert_eq!(&result.bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn unreachable_target_stops_at_quality_floor() {
        let envelope = CompressionEnvelope {
            target_bytes: 1,
            ..CompressionEnvelope::gallery_image()
        };
        let source = encode(noise(64, 64), ImageFormat::Png);
        let result = SizeEnvelopeCompressor::new(envelope)
            .compress_blocking(&source)
            .unwrap();

        assert_eq!(result.quality, Some(30));
        assert_eq!(result.attempts, 6);
        assert!(!result.within_target);
        assert!(result.reencoded());
    }

    #[test]
    fn thumbnail_envelope_scales_to_480() {
        let source = encode(solid(1280, 720), ImageFormat::Jpeg);
        let result = SizeEnvelopeCompressor::new(CompressionEnvelope::video_thumbnail())
            .compress_blocking(&source)
            .unwrap();

        assert_eq!((result.width, result.height), (480, 270));
        assert!(result.size() <= 100 * 1024);
    }

    #[test]
    fn undecodable_source_is_an_error() {
        let result = SizeEnvelopeCompressor::default().compress_blocking(b"definitely not an image");
        assert!(matches!(result, Err(CompressionError::Decode(_))));
    }

    #[tokio::test]
    async fn compress_runs_on_blocking_pool() {
        let source = Bytes::from(encode(solid(50, 50), ImageFormat::Png));
        let result = SizeEnvelopeCompressor::default().compress(source).await.unwrap();
        assert_eq!((result.width, result.height), (50, 50));
    }

    #[test]
    fn supported_source_formats() {
        assert!(is_supported_source(ImageFormat::Png));
        assert!(!is_supported_source(ImageFormat::Tiff));
    }
}
