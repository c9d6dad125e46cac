//! Optimizer configuration module.
//!
//! Handles loading, validating, and merging the `gallery-optimizer.toml` file.
//! Stock defaults are overridden by whatever keys the user file specifies; the
//! resulting [`OptimizerConfig`] is built once at startup and passed by
//! reference into every stage of the pipeline.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! input_dir = "media/gallery"   # Directory of images to optimize in place
//! # output_dir = "..."          # Where .webp derivatives go (default: input_dir)
//! # backup_dir = "..."          # Pristine copies (default: input_dir/backup)
//!
//! [jpeg]
//! quality = 85
//! optimize = true
//! progressive = true
//!
//! [png]
//! optimize = true
//! compress_level = 9            # 0-9
//!
//! [webp]
//! enabled = true                # Write a .webp derivative next to each image
//! quality = 85
//!
//! [resize]
//! enabled = false
//! max_width = 1920
//! max_height = 1080
//!
//! [watermark]
//! enabled = false
//! text = "© gallery"
//! font_size = 25
//! color = [255, 255, 255]
//! opacity = 0.5                 # 0.0-1.0
//! position = "bottom-right"     # bottom-right | bottom-left | top-right | top-left
//! margin = 30
//!
//! [processing]
//! max_processes = 4             # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default file name looked up when no `--config` is given.
pub const CONFIG_FILENAME: &str = "gallery-optimizer.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Complete optimizer configuration.
///
/// All fields have defaults matching the stock `gen-config` output. User
/// config files need only specify the values they want to override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerConfig {
    /// Input, output and backup locations.
    pub paths: PathsConfig,
    /// JPEG re-encode parameters.
    pub jpeg: JpegConfig,
    /// PNG re-encode parameters.
    pub png: PngConfig,
    /// WebP derivative generation.
    pub webp: WebpConfig,
    /// Optional downscale bound.
    pub resize: ResizeConfig,
    /// Optional text overlay. Also consumed by the video collaborator.
    pub watermark: WatermarkConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl OptimizerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jpeg.quality > 100 {
            return Err(ConfigError::Validation("jpeg.quality must be 0-100".into()));
        }
        if self.png.compress_level > 9 {
            return Err(ConfigError::Validation(
                "png.compress_level must be 0-9".into(),
            ));
        }
        if self.webp.quality > 100 {
            return Err(ConfigError::Validation("webp.quality must be 0-100".into()));
        }
        if self.resize.max_width == 0 || self.resize.max_height == 0 {
            return Err(ConfigError::Validation(
                "resize.max_width and resize.max_height must be non-zero".into(),
            ));
        }
        if self.watermark.font_size == 0 {
            return Err(ConfigError::Validation(
                "watermark.font_size must be non-zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.watermark.opacity) {
            return Err(ConfigError::Validation(
                "watermark.opacity must be between 0.0 and 1.0".into(),
            ));
        }
        if self.watermark.enabled && self.watermark.text.is_empty() {
            return Err(ConfigError::Validation(
                "watermark.text must not be empty when the watermark is enabled".into(),
            ));
        }
        Ok(())
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Directory whose images are optimized in place.
    pub input_dir: PathBuf,
    /// Directory for WebP derivatives. Defaults to `input_dir`.
    pub output_dir: Option<PathBuf>,
    /// Directory for pristine copies. Defaults to `input_dir/backup`.
    pub backup_dir: Option<PathBuf>,
}

impl PathsConfig {
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.input_dir.clone())
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.backup_dir
            .clone()
            .unwrap_or_else(|| self.input_dir.join("backup"))
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("media/gallery"),
            output_dir: None,
            backup_dir: None,
        }
    }
}

/// JPEG re-encode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JpegConfig {
    /// Encoding quality (0 = worst, 100 = best).
    pub quality: u8,
    /// Request optimized Huffman tables.
    pub optimize: bool,
    /// Request progressive scan order.
    pub progressive: bool,
}

impl Default for JpegConfig {
    fn default() -> Self {
        Self {
            quality: 85,
            optimize: true,
            progressive: true,
        }
    }
}

/// PNG re-encode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PngConfig {
    /// Use adaptive row filtering.
    pub optimize: bool,
    /// zlib-style compression level, 0-9.
    pub compress_level: u8,
}

impl Default for PngConfig {
    fn default() -> Self {
        Self {
            optimize: true,
            compress_level: 9,
        }
    }
}

/// WebP derivative settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebpConfig {
    pub enabled: bool,
    /// Lossy encoding quality (0 = smallest, 100 = best).
    pub quality: u8,
}

impl Default for WebpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            quality: 85,
        }
    }
}

/// Downscale bound. Images are never enlarged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub enabled: bool,
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_width: 1920,
            max_height: 1080,
        }
    }
}

/// Corner the watermark is anchored to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    BottomRight,
    BottomLeft,
    TopRight,
    #[default]
    TopLeft,
}

/// Text watermark settings, shared by the image pipeline and the video
/// collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    pub enabled: bool,
    pub text: String,
    /// Font size in pixels.
    pub font_size: u32,
    /// RGB fill color.
    pub color: [u8; 3],
    /// 0.0 = invisible, 1.0 = opaque.
    pub opacity: f32,
    pub position: Position,
    /// Distance from the anchored edges in pixels.
    pub margin: u32,
    /// Font files tried in order; the first that loads is used.
    pub fonts: Vec<PathBuf>,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            text: "© gallery".to_string(),
            font_size: 25,
            color: [255, 255, 255],
            opacity: 0.5,
            position: Position::BottomRight,
            margin: 30,
            fonts: default_font_candidates(),
        }
    }
}

/// System fonts covering CJK scripts first, Latin-only faces last.
pub fn default_font_candidates() -> Vec<PathBuf> {
    [
        "/System/Library/Fonts/Hiragino Sans GB.ttc",
        "/System/Library/Fonts/STHeiti Medium.ttc",
        "/System/Library/Fonts/STHeiti Light.ttc",
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
        "C:\\Windows\\Fonts\\msyh.ttc",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least 1
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// Base layer that user overrides are merged on top of.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(OptimizerConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<OptimizerConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: OptimizerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path`, falling back to stock defaults when it is
/// absent.
pub fn load_config(path: &Path) -> Result<OptimizerConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Gallery Optimizer Configuration
# ===============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Locations
# ---------------------------------------------------------------------------
[paths]
# Images in this directory are re-encoded in place.
input_dir = "media/gallery"
# WebP derivatives are written here (default: input_dir).
# output_dir = "media/gallery"
# One pristine copy of every original, never overwritten (default: input_dir/backup).
# backup_dir = "media/gallery/backup"

# ---------------------------------------------------------------------------
# Re-encoding
# ---------------------------------------------------------------------------
[jpeg]
quality = 85
optimize = true
progressive = true

[png]
optimize = true
# 0 = fastest, 9 = smallest.
compress_level = 9

# ---------------------------------------------------------------------------
# WebP derivative
# ---------------------------------------------------------------------------
[webp]
enabled = true
quality = 85

# ---------------------------------------------------------------------------
# Downscaling (never enlarges)
# ---------------------------------------------------------------------------
[resize]
enabled = false
max_width = 1920
max_height = 1080

# ---------------------------------------------------------------------------
# Text watermark (also used by the `video` command)
# ---------------------------------------------------------------------------
[watermark]
enabled = false
text = "© gallery"
font_size = 25
color = [255, 255, 255]
opacity = 0.5
# bottom-right | bottom-left | top-right | top-left
position = "bottom-right"
margin = 30
# Font files tried in order. Falls back to a built-in bitmap font.
# fonts = ["/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers. Omit to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
