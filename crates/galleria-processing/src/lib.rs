//! Galleria Processing Library
//!
//! CPU-bound work done on source media before it is stored: validation of
//! the raw payload and size-envelope JPEG compression for images.

pub mod compression;
pub mod validator;

pub use compression::{
    CompressedImage, CompressionEnvelope, CompressionError, SizeEnvelopeCompressor,
};
pub use validator::{
    extension_for_content_type, infer_content_type, MediaValidator, ValidationError,
};
