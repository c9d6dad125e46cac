//! Shared test utilities for the gallery-optimizer test suite.
//!
//! Synthetic fixtures written with the `image` crate's own encoders, so tests
//! never depend on binary files checked into the repository.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! create_test_jpeg(&tmp.path().join("a.jpg"), 200, 150);
//! let config = test_config(tmp.path());
//! ```

use crate::config::OptimizerConfig;
use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;

// =========================================================================
// Pixel buffers
// =========================================================================

/// Smooth RGB gradient; compresses like a photo, not like a flat fill.
pub fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    })
}

/// Gradient with a left-to-right alpha ramp, fully transparent at x = 0.
pub fn gradient_rgba(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
            (x * 255 / width.max(1)) as u8,
        ])
    })
}

// =========================================================================
// Fixture files
// =========================================================================

pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    gradient_rgb(width, height)
        .save_with_format(path, ImageFormat::Jpeg)
        .unwrap();
}

pub fn create_test_png(path: &Path, width: u32, height: u32) {
    gradient_rgb(width, height)
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

pub fn create_test_png_rgba(path: &Path, width: u32, height: u32) {
    gradient_rgba(width, height)
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

// =========================================================================
// Config
// =========================================================================

/// Defaults pointed at `dir`, with a single worker and no system font lookup.
pub fn test_config(dir: &Path) -> OptimizerConfig {
    let mut config = OptimizerConfig::default();
    config.paths.input_dir = dir.to_path_buf();
    config.processing.max_processes = Some(1);
    config.watermark.fonts.clear();
    config
}
