//! Image codec trait and shared error type.
//!
//! The [`ImageCodec`] trait is the seam between pipeline logic and pixel
//! I/O: decode a file into memory, encode an RGB buffer to a path.
//!
//! The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec), built on the `image`,
//! `jpeg-encoder` and `webp` crates.

use super::params::EncodeParams;
use image::{DynamicImage, RgbImage};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Trait for image codecs.
///
/// `Sync` so one codec can be shared by every rayon worker.
pub trait ImageCodec: Sync {
    /// Decode the file at `path`.
    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Encode `image` to `output`, replacing any existing file.
    ///
    /// Returns the number of bytes on disk after the write.
    fn encode(
        &self,
        image: &RgbImage,
        output: &Path,
        params: &EncodeParams,
    ) -> Result<u64, BackendError>;
}
