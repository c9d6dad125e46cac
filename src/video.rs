//! Video watermarking through an external `ffmpeg`.
//!
//! Videos are not decoded in-process. The shared [`WatermarkConfig`] is
//! translated into an ffmpeg `drawtext` filter and the binary is run once:
//!
//! ```text
//! ffmpeg -i intro.mp4 -vf drawtext=... -an -c:v libx264 -crf 18 -preset medium -y intro_processed.mp4
//! ```
//!
//! Audio is dropped. On success the original is backed up (once, like images)
//! and the processed file is swapped into its place through a `.bak` rename.
//! On failure the original is left untouched and the partial output removed.

use crate::backup::backup_original;
use crate::config::{Position, WatermarkConfig};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Video not found: {0}")]
    MissingInput(PathBuf),
    #[error("ffmpeg exited with {status}: {stderr}")]
    Ffmpeg { status: String, stderr: String },
    #[error("ffmpeg reported success but produced no file at {0}")]
    MissingOutput(PathBuf),
}

/// One video to process and how to encode it.
#[derive(Debug, Clone)]
pub struct VideoJob {
    pub input: PathBuf,
    pub backup_dir: PathBuf,
    /// Binary to run; looked up on `PATH` when not absolute.
    pub ffmpeg: PathBuf,
    /// x264 constant rate factor (0 = lossless, 51 = worst).
    pub crf: u8,
    pub preset: String,
}

impl VideoJob {
    pub fn new(input: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            backup_dir: backup_dir.into(),
            ffmpeg: PathBuf::from("ffmpeg"),
            crf: 18,
            preset: "medium".to_string(),
        }
    }

    /// `intro.mp4` → `intro_processed.mp4`, next to the input.
    pub fn processed_path(&self) -> PathBuf {
        let stem = self
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match self.input.extension() {
            Some(ext) => format!("{stem}_processed.{}", ext.to_string_lossy()),
            None => format!("{stem}_processed"),
        };
        self.input.with_file_name(name)
    }
}

/// Sizes before and after, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoOutcome {
    pub original_size: u64,
    pub processed_size: u64,
    pub backed_up: bool,
}

/// First candidate that exists on disk.
pub fn select_font(candidates: &[PathBuf]) -> Option<&Path> {
    candidates
        .iter()
        .map(PathBuf::as_path)
        .find(|p| p.is_file())
}

/// Prefix each of `specials` (and backslash) with a backslash.
fn escape_with(value: &str, specials: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || specials.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a drawtext option value for use inside a `-vf` filter graph.
///
/// Two levels apply: the filter's option parser (`' :`), then the graph
/// parser (`' [ ] , ;`).
fn escape_option(value: &str) -> String {
    let option = escape_with(value, &['\'', ':']);
    escape_with(&option, &['\'', '[', ']', ',', ';'])
}

/// Escape watermark text: drawtext expands `%{...}` sequences, so `%` is
/// escaped before the option and graph levels.
pub fn escape_drawtext(text: &str) -> String {
    escape_option(&escape_with(text, &['%']))
}

/// Build the `drawtext` filter for the configured watermark.
///
/// Without a font file ffmpeg falls back to its fontconfig default.
pub fn drawtext_filter(config: &WatermarkConfig, font: Option<&Path>) -> String {
    let m = config.margin;
    let (x, y) = match config.position {
        Position::BottomRight => (format!("w-tw-{m}"), format!("h-th-{m}")),
        Position::BottomLeft => (m.to_string(), format!("h-th-{m}")),
        Position::TopRight => (format!("w-tw-{m}"), m.to_string()),
        Position::TopLeft => (m.to_string(), m.to_string()),
    };
    let [r, g, b] = config.color;

    let mut filter = String::from("drawtext=");
    if let Some(font) = font {
        filter.push_str(&format!(
            "fontfile={}:",
            escape_option(&font.to_string_lossy())
        ));
    }
    filter.push_str(&format!(
        "text={}:fontsize={}:fontcolor=0x{r:02x}{g:02x}{b:02x}:alpha={}:x={x}:y={y}",
        escape_drawtext(&config.text),
        config.font_size,
        config.opacity.clamp(0.0, 1.0),
    ));
    filter
}

/// Arguments for one ffmpeg run writing to `output`.
pub fn ffmpeg_args(job: &VideoJob, filter: Option<&str>, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-hide_banner".into(), "-i".into(), job.input.clone().into()];
    if let Some(filter) = filter {
        args.push("-vf".into());
        args.push(filter.into());
    }
    let crf = job.crf.to_string();
    args.extend(
        [
            "-an",
            "-c:v",
            "libx264",
            "-crf",
            crf.as_str(),
            "-preset",
            job.preset.as_str(),
            "-y",
        ]
        .into_iter()
        .map(OsString::from),
    );
    args.push(output.as_os_str().to_owned());
    args
}

/// Watermark `job.input` in place.
///
/// When the watermark is disabled the video is still re-encoded without
/// audio, just without the overlay.
pub fn watermark_video(
    job: &VideoJob,
    watermark: &WatermarkConfig,
) -> Result<VideoOutcome, VideoError> {
    if !job.input.is_file() {
        return Err(VideoError::MissingInput(job.input.clone()));
    }
    let original_size = std::fs::metadata(&job.input)?.len();
    let processed = job.processed_path();

    let filter = watermark.enabled.then(|| {
        let font = select_font(&watermark.fonts);
        match font {
            Some(path) => info!(font = %path.display(), "video watermark font"),
            None => warn!("no watermark font file found, using ffmpeg default"),
        }
        drawtext_filter(watermark, font)
    });

    let args = ffmpeg_args(job, filter.as_deref(), &processed);
    debug!(ffmpeg = %job.ffmpeg.display(), ?args, "running ffmpeg");
    let output = Command::new(&job.ffmpeg).args(&args).output()?;

    if !output.status.success() {
        let _ = std::fs::remove_file(&processed);
        return Err(VideoError::Ffmpeg {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    if !processed.is_file() {
        return Err(VideoError::MissingOutput(processed));
    }

    let backed_up = backup_original(&job.input, &job.backup_dir)?;
    if backed_up {
        info!(video = %job.input.display(), backup = %job.backup_dir.display(), "original backed up");
    }
    swap_into_place(&processed, &job.input)?;

    Ok(VideoOutcome {
        original_size,
        processed_size: std::fs::metadata(&job.input)?.len(),
        backed_up,
    })
}

/// Replace `target` with `replacement`, parking the old file at `<name>.bak`
/// until the new one is in place.
fn swap_into_place(replacement: &Path, target: &Path) -> std::io::Result<()> {
    let mut parked = target.as_os_str().to_owned();
    parked.push(".bak");
    let parked = PathBuf::from(parked);

    if parked.exists() {
        std::fs::remove_file(&parked)?;
    }
    std::fs::rename(target, &parked)?;
    if let Err(e) = std::fs::rename(replacement, target) {
        std::fs::rename(&parked, target)?;
        return Err(e);
    }
    std::fs::remove_file(&parked)
}
