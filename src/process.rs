//! Batch orchestration: discover, back up, transform, encode, report.
//!
//! Drives every file in the input directory through the pipeline:
//!
//! ```text
//! discover → backup → decode → normalize → resize? → watermark? → encode
//!                                                                 ├─ primary (in place)
//!                                                                 └─ .webp derivative?
//! ```
//!
//! ## Per-file isolation
//!
//! A file's failure never aborts the batch. Decode, encode and filesystem
//! errors become a [`ProcessResult`] with a `Failed` outcome and the run moves
//! on. There is no rollback: a file whose primary re-encode succeeded but whose
//! derivative failed stays re-encoded and is reported as failed. The only error
//! that stops a run is an input directory that cannot be listed, and that is
//! detected before any file is touched.
//!
//! ## Parallel Processing
//!
//! Files are processed on a dedicated [rayon](https://docs.rs/rayon) pool
//! sized by `processing.max_processes`. Results come back in discovery order
//! regardless of completion order. Progress is streamed as [`ProcessEvent`]s
//! over an optional channel so the CLI can print while workers run.

use crate::backup::backup_original;
use crate::config::{OptimizerConfig, effective_threads};
use crate::imaging::{
    BackendError, DERIVATIVE_EXTENSION, EncodeParams, FontProvider, ImageCodec, LoadedFont,
    RustCodec, SourceFormat, SystemFonts, apply_watermark, constrain_size, normalize_to_rgb,
};
use crate::report::{BatchSummary, ProcessResult, Savings};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Errors that abort a whole batch.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Input directory not found: {0}")]
    InputDirMissing(PathBuf),
    #[error("Cannot list input directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Why a single file failed. Rendered into the `Failed` message.
#[derive(Error, Debug)]
enum FileError {
    #[error("backup failed: {0}")]
    Backup(#[source] std::io::Error),
    #[error("{0}")]
    Imaging(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("webp derivative failed: {0}")]
    Derivative(#[source] BackendError),
}

/// Progress notifications sent while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    /// A pristine copy of the original was written.
    BackedUp { file_name: String },
    /// The image was scaled down to fit the bounding box.
    Resized {
        file_name: String,
        from: (u32, u32),
        to: (u32, u32),
    },
    /// The file reached a terminal state.
    Finished(ProcessResult),
}

/// Everything a batch produced.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub summary: BatchSummary,
    pub results: Vec<ProcessResult>,
}

/// Optimize every image in `config.paths.input_dir` with the built-in codec
/// and system fonts.
pub fn optimize_directory(
    config: &OptimizerConfig,
    events: Option<Sender<ProcessEvent>>,
) -> Result<BatchReport, ProcessError> {
    optimize_directory_with(&RustCodec::new(), &SystemFonts, config, events)
}

/// Optimize a directory using a specific codec and font provider (allows
/// testing with mocks).
pub fn optimize_directory_with(
    codec: &impl ImageCodec,
    fonts: &impl FontProvider,
    config: &OptimizerConfig,
    events: Option<Sender<ProcessEvent>>,
) -> Result<BatchReport, ProcessError> {
    let files = discover_files(&config.paths.input_dir)?;
    info!(
        input = %config.paths.input_dir.display(),
        files = files.len(),
        "starting batch"
    );

    // One font for the whole batch; every worker borrows it.
    let font = config.watermark.enabled.then(|| {
        fonts.load_first_available(&config.watermark.fonts, config.watermark.font_size)
    });
    if let Some(font) = &font {
        match font.source() {
            Some(source) => info!(font = %source.display(), "watermark font"),
            None => info!("watermark font: built-in bitmap"),
        }
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(effective_threads(&config.processing))
        .build()?;

    let collisions = derivative_collisions(&files, config);

    let results: Vec<ProcessResult> = pool.install(|| {
        files
            .par_iter()
            .zip(collisions.par_iter())
            .map_with(events, |events, (path, collision)| {
                let result = match collision {
                    Some(collision) => {
                        warn!(
                            file = %collision.file_name,
                            derivative = %collision.derivative,
                            "derivative name collision"
                        );
                        ProcessResult::failed(collision.file_name.clone(), collision.to_string())
                    }
                    None => process_file(codec, font.as_ref(), config, path, events.as_ref()),
                };
                if let Some(tx) = events {
                    tx.send(ProcessEvent::Finished(result.clone())).ok();
                }
                result
            })
            .collect()
    });

    let summary = BatchSummary::from_results(&results);
    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        failed = summary.failed,
        saved = summary.saved,
        "batch complete"
    );
    Ok(BatchReport { summary, results })
}

/// Regular files directly inside `input_dir`, sorted by file name.
///
/// Subdirectories (including the default `backup/`) are not entered.
pub fn discover_files(input_dir: &Path) -> Result<Vec<PathBuf>, ProcessError> {
    if !input_dir.is_dir() {
        return Err(ProcessError::InputDirMissing(input_dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// A file whose derivative would overwrite one claimed by an earlier file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("webp derivative {derivative} is already produced by {claimed_by}")]
pub struct DerivativeCollision {
    pub file_name: String,
    pub derivative: String,
    pub claimed_by: String,
}

/// For each of `files` (in order), the collision that keeps it from running.
///
/// `a.jpg` and `a.png` both derive `a.webp`; the first in name order wins
/// and the rest fail before any I/O. Names are compared case-insensitively
/// so the check also holds on case-folding file systems. Nothing collides
/// when derivatives are disabled.
pub fn derivative_collisions(
    files: &[PathBuf],
    config: &OptimizerConfig,
) -> Vec<Option<DerivativeCollision>> {
    let mut claimed: HashMap<String, String> = HashMap::new();
    files
        .iter()
        .map(|path| {
            if !config.webp.enabled || SourceFormat::from_path(path).is_none() {
                return None;
            }
            let derivative = derivative_name(path);
            let file_name = file_name_of(path);
            match claimed.get(&derivative.to_lowercase()) {
                Some(first) => Some(DerivativeCollision {
                    file_name,
                    derivative,
                    claimed_by: first.clone(),
                }),
                None => {
                    claimed.insert(derivative.to_lowercase(), file_name);
                    None
                }
            }
        })
        .collect()
}

/// Run one file through the pipeline and report its outcome.
///
/// The watermark is drawn when `config.watermark.enabled`; `font` is the face
/// to draw with, and the built-in bitmap face is used when it is `None`.
pub fn process_file(
    codec: &impl ImageCodec,
    font: Option<&LoadedFont>,
    config: &OptimizerConfig,
    path: &Path,
    events: Option<&Sender<ProcessEvent>>,
) -> ProcessResult {
    let file_name = file_name_of(path);

    let Some(format) = SourceFormat::from_path(path) else {
        debug!(file = %file_name, "skipping unrecognized file");
        return ProcessResult::skipped(file_name);
    };

    match optimize_file(codec, font, config, path, format, &file_name, events) {
        Ok(savings) => {
            debug!(
                file = %file_name,
                original = savings.original_size,
                new = savings.new_size,
                "optimized"
            );
            ProcessResult::optimized(file_name, savings)
        }
        Err(e) => {
            warn!(file = %file_name, error = %e, "optimization failed");
            ProcessResult::failed(file_name, e.to_string())
        }
    }
}

fn optimize_file(
    codec: &impl ImageCodec,
    font: Option<&LoadedFont>,
    config: &OptimizerConfig,
    path: &Path,
    format: SourceFormat,
    file_name: &str,
    events: Option<&Sender<ProcessEvent>>,
) -> Result<Savings, FileError> {
    let emit = |event: ProcessEvent| {
        if let Some(tx) = events {
            tx.send(event).ok();
        }
    };

    let original_size = std::fs::metadata(path)?.len();

    let backup_dir = config.paths.backup_dir();
    if backup_original(path, &backup_dir).map_err(FileError::Backup)? {
        info!(file = %file_name, backup = %backup_dir.display(), "original backed up");
        emit(ProcessEvent::BackedUp {
            file_name: file_name.to_string(),
        });
    }

    let rgb = normalize_to_rgb(codec.decode(path)?);
    let (mut rgb, resized) = constrain_size(rgb, &config.resize);
    if let Some(r) = resized {
        info!(file = %file_name, from = ?r.from, to = ?r.to, "resized");
        emit(ProcessEvent::Resized {
            file_name: file_name.to_string(),
            from: r.from,
            to: r.to,
        });
    }

    if config.watermark.enabled {
        let fallback;
        let font = match font {
            Some(font) => font,
            None => {
                fallback = LoadedFont::bitmap(config.watermark.font_size);
                &fallback
            }
        };
        let placement = apply_watermark(&mut rgb, &config.watermark, font);
        debug!(file = %file_name, ?placement, "watermark applied");
    }

    let new_size = codec.encode(&rgb, path, &EncodeParams::primary(format, config))?;

    let webp_size = match EncodeParams::derivative(config) {
        Some(params) => {
            let output_dir = config.paths.output_dir();
            std::fs::create_dir_all(&output_dir)?;
            let target = output_dir.join(derivative_name(path));
            let size = codec
                .encode(&rgb, &target, &params)
                .map_err(FileError::Derivative)?;
            Some(size)
        }
        None => None,
    };

    Ok(Savings {
        original_size,
        new_size,
        webp_size,
        resized,
    })
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `photo.JPG` → `photo.webp`
fn derivative_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}.{DERIVATIVE_EXTENSION}")
}
