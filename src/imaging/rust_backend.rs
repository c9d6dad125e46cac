//! Codec on top of the `image` crate, with dedicated JPEG and WebP encoders.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG) | `image::ImageReader` with content sniffing |
//! | Encode → JPEG | `jpeg_encoder::Encoder` (quality, progressive, optimized Huffman tables) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (compression + row filter) |
//! | Encode → WebP | `webp::Encoder::encode_advanced`, lossy, method 6 |
//!
//! Every artifact is written to a hidden temporary file in the target
//! directory and renamed over the destination, so a crash mid-encode never
//! leaves a truncated image behind. The returned size is read back from the
//! file system after the rename.

use super::backend::{BackendError, ImageCodec};
use super::params::{EncodeParams, Quality};
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageReader, RgbImage};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Slowest, best-compressing libwebp method.
const WEBP_METHOD: i32 = 6;

/// Codec using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ImageCodec for RustCodec {
    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))
    }

    fn encode(
        &self,
        image: &RgbImage,
        output: &Path,
        params: &EncodeParams,
    ) -> Result<u64, BackendError> {
        let encoded = |e: &dyn std::fmt::Display| {
            BackendError::Encode(format!("{} {}: {}", params.format_name(), output.display(), e))
        };

        write_replacing(output, |out| match *params {
            EncodeParams::Jpeg {
                quality,
                optimize,
                progressive,
            } => {
                let bytes =
                    encode_jpeg(image, quality, optimize, progressive).map_err(|e| encoded(&e))?;
                out.write_all(&bytes)?;
                Ok(())
            }
            EncodeParams::Png {
                optimize,
                compress_level,
            } => {
                let filter = if optimize {
                    PngFilter::Adaptive
                } else {
                    PngFilter::NoFilter
                };
                let (width, height) = image.dimensions();
                PngEncoder::new_with_quality(out, png_compression(compress_level), filter)
                    .write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8)
                    .map_err(|e| encoded(&e))
            }
            EncodeParams::WebP { quality } => {
                let bytes = encode_webp(image, quality).map_err(|e| encoded(&e))?;
                out.write_all(&bytes)?;
                Ok(())
            }
        })
    }
}

fn encode_jpeg(
    image: &RgbImage,
    quality: Quality,
    optimize: bool,
    progressive: bool,
) -> Result<Vec<u8>, String> {
    let (width, height) = image.dimensions();
    let (Ok(width), Ok(height)) = (u16::try_from(width), u16::try_from(height)) else {
        return Err(format!("{width}x{height} exceeds the JPEG limit of 65535 px"));
    };

    let mut bytes = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut bytes, quality.value());
    encoder.set_progressive(progressive);
    encoder.set_optimized_huffman_tables(optimize);
    encoder
        .encode(image.as_raw(), width, height, jpeg_encoder::ColorType::Rgb)
        .map_err(|e| e.to_string())?;
    Ok(bytes)
}

/// Lossy WebP at `quality` with the highest-effort method.
fn encode_webp(image: &RgbImage, quality: Quality) -> Result<Vec<u8>, String> {
    let (width, height) = image.dimensions();
    let mut config =
        webp::WebPConfig::new().map_err(|()| "libwebp config init failed".to_string())?;
    config.lossless = 0;
    config.quality = quality.value() as f32;
    config.method = WEBP_METHOD;

    webp::Encoder::from_rgb(image.as_raw(), width, height)
        .encode_advanced(&config)
        .map(|memory| memory.to_vec())
        .map_err(|e| format!("{e:?}"))
}

/// Map a 0–9 compression level onto the encoder's presets.
fn png_compression(level: u8) -> CompressionType {
    match level {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Write through a temporary sibling file, then rename it over `output`.
///
/// Returns the size of `output` on disk.
fn write_replacing(
    output: &Path,
    write: impl FnOnce(&mut dyn Write) -> Result<(), BackendError>,
) -> Result<u64, BackendError> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".optimizing-")
        .suffix(".tmp")
        .tempfile_in(dir)?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    inherit_permissions(tmp.path(), output)?;
    tmp.persist(output).map_err(|e| BackendError::Io(e.error))?;

    Ok(std::fs::metadata(output)?.len())
}

/// Temporary files are created owner-only; give the replacement the
/// permissions of the file it replaces, or world-readable for new files.
fn inherit_permissions(tmp: &Path, output: &Path) -> std::io::Result<()> {
    match std::fs::metadata(output) {
        Ok(existing) => std::fs::set_permissions(tmp, existing.permissions()),
        #[cfg(unix)]
        Err(_) => {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(tmp, std::fs::Permissions::from_mode(0o644))
        }
        #[cfg(not(unix))]
        Err(_) => Ok(()),
    }
}
