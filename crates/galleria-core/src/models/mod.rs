//! Data models for the gallery.

mod gallery;

pub use gallery::*;
