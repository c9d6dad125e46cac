//! Image processing, in-process with no system libraries.
//!
//! | Stage | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` |
//! | **Normalize** | alpha composite over white, `to_rgb8` |
//! | **Resize** | `image::imageops::resize` with Lanczos3 |
//! | **Watermark** | `ab_glyph` layout + rasterization, `font8x8` fallback |
//! | **Encode** | `jpeg-encoder`, `image` PNG, `webp` (bundled libwebp) |
//!
//! The module is split into:
//! - **Calculations**: pure functions for geometry and savings math
//! - **Parameters**: data describing what each encode should produce
//! - **Backend**: [`ImageCodec`] trait + [`RustCodec`]
//! - **Font**: [`FontProvider`] trait + [`SystemFonts`]
//! - **Operations**: in-memory transform stages

pub mod backend;
pub mod calculations;
pub mod font;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageCodec};
pub use font::{FontProvider, LoadedFont, SystemFonts};
pub use operations::{Placement, Resized, apply_watermark, constrain_size, normalize_to_rgb};
pub use params::{DERIVATIVE_EXTENSION, EncodeParams, Quality, SourceFormat};
pub use rust_backend::RustCodec;
