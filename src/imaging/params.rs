//! Parameter types for image operations.
//!
//! These types describe *what* to write, not *how*. They are the interface
//! between the pipeline (which decides which artifacts a file produces) and
//! the [`codec`](super::backend::ImageCodec) (which does the byte work), so the
//! codec can be swapped for a mock in tests.
//!
//! - [`Quality`] — lossy encoding quality (1–100). Clamped on construction.
//! - [`SourceFormat`] — the recognized input formats, keyed by extension.
//! - [`EncodeParams`] — format-specific encoder settings for one artifact.

use crate::config::OptimizerConfig;
use std::path::Path;

/// Extension of the derivative written next to each optimized image.
pub const DERIVATIVE_EXTENSION: &str = "webp";

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Format of a source file, derived from its extension. Files with any other
/// extension are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
}

impl SourceFormat {
    /// Case-insensitive extension match. `None` means the file is skipped.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }
}

/// Encoder settings for a single output artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeParams {
    Jpeg {
        quality: Quality,
        optimize: bool,
        progressive: bool,
    },
    Png {
        optimize: bool,
        compress_level: u8,
    },
    WebP {
        quality: Quality,
    },
}

impl EncodeParams {
    /// Settings for re-encoding a source in its original format.
    pub fn primary(format: SourceFormat, config: &OptimizerConfig) -> Self {
        match format {
            SourceFormat::Jpeg => Self::Jpeg {
                quality: Quality::new(config.jpeg.quality),
                optimize: config.jpeg.optimize,
                progressive: config.jpeg.progressive,
            },
            SourceFormat::Png => Self::Png {
                optimize: config.png.optimize,
                compress_level: config.png.compress_level.min(9),
            },
        }
    }

    /// Settings for the WebP derivative, or `None` when it is disabled.
    pub fn derivative(config: &OptimizerConfig) -> Option<Self> {
        config.webp.enabled.then(|| Self::WebP {
            quality: Quality::new(config.webp.quality),
        })
    }

    /// Short lowercase format name, used in logs and error messages.
    pub fn format_name(&self) -> &'static str {
        match self {
            Self::Jpeg { .. } => "jpeg",
            Self::Png { .. } => "png",
            Self::WebP { .. } => "webp",
        }
    }
}
