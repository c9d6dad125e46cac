//! CLI output formatting for batch runs.
//!
//! # Output Format
//!
//! ## Progress
//!
//! One block per event, streamed while workers run:
//!
//! ```text
//! photo.jpg
//!     Backup: created
//! photo.jpg
//!     Resized: 4000x3000 → 1440x1080
//! photo.jpg
//!     Done: 2.41 MB → 812.30 KB (saved 67.1%)
//!     WebP: 640.12 KB
//! anim.gif
//!     Skipped: not an image
//! broken.png
//!     Failed: Decode failed: ...
//! ```
//!
//! Backup and resize lines arrive as their own events, each headed by the
//! file name, since blocks from parallel workers may interleave.
//!
//! ## Summary
//!
//! ```text
//! ==================================================
//! Summary
//! ==================================================
//! Optimized: 12
//! Skipped:   1
//! Failed:    0
//! Original:  31.20 MB
//! New size:  9.87 MB
//! Saved:     21.33 MB (68.4%)
//! WebP:      7.02 MB
//! Backups:   media/gallery/backup
//! ```
//!
//! # Architecture
//!
//! Each display has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::process::ProcessEvent;
use crate::report::{BatchSummary, Outcome, ProcessResult};
use crate::video::VideoOutcome;
use std::path::Path;

const RULE_WIDTH: usize = 50;

/// Human-readable size with two decimals.
///
/// ```text
/// 0          → 0 Bytes
/// 512        → 512.00 Bytes
/// 1536       → 1.50 KB
/// 5242880    → 5.00 MB
/// ```
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    for unit in ["Bytes", "KB", "MB", "GB"] {
        if value < 1024.0 {
            return format!("{value:.2} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.2} TB")
}

/// Like [`format_bytes`], with a leading `-` for growth.
fn format_signed_bytes(bytes: i64) -> String {
    let formatted = format_bytes(bytes.unsigned_abs());
    if bytes < 0 {
        format!("-{formatted}")
    } else {
        formatted
    }
}

/// Format a single progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::BackedUp { file_name } => {
            vec![file_name.clone(), "    Backup: created".to_string()]
        }
        ProcessEvent::Resized {
            file_name,
            from,
            to,
        } => vec![
            file_name.clone(),
            format!(
                "    Resized: {}x{} \u{2192} {}x{}",
                from.0, from.1, to.0, to.1
            ),
        ],
        ProcessEvent::Finished(result) => format_result(result),
    }
}

/// Format the terminal state of one file.
pub fn format_result(result: &ProcessResult) -> Vec<String> {
    let mut lines = vec![result.file_name.clone()];
    match &result.outcome {
        Outcome::Skipped => lines.push("    Skipped: not an image".to_string()),
        Outcome::Failed { message } => lines.push(format!("    Failed: {message}")),
        Outcome::Optimized(savings) => {
            lines.push(format!(
                "    Done: {} \u{2192} {} (saved {:.1}%)",
                format_bytes(savings.original_size),
                format_bytes(savings.new_size),
                savings.saved_percent()
            ));
            if let Some(webp) = savings.webp_size {
                lines.push(format!("    WebP: {}", format_bytes(webp)));
            }
        }
    }
    lines
}

/// Format the end-of-run summary.
///
/// The WebP total is shown only when derivatives were enabled.
pub fn format_summary(summary: &BatchSummary, webp_enabled: bool, backup_dir: &Path) -> Vec<String> {
    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![
        rule.clone(),
        "Summary".to_string(),
        rule,
        format!("Optimized: {}", summary.processed),
        format!("Skipped:   {}", summary.skipped),
        format!("Failed:    {}", summary.failed),
        format!("Original:  {}", format_bytes(summary.total_original)),
        format!("New size:  {}", format_bytes(summary.total_new)),
        format!(
            "Saved:     {} ({:.1}%)",
            format_signed_bytes(summary.saved),
            summary.saved_percent
        ),
    ];
    if webp_enabled {
        lines.push(format!("WebP:      {}", format_bytes(summary.total_webp)));
    }
    lines.push(format!("Backups:   {}", backup_dir.display()));
    lines
}

/// Format the result of a video run.
pub fn format_video_outcome(input: &Path, outcome: &VideoOutcome) -> Vec<String> {
    let backup = if outcome.backed_up {
        "created"
    } else {
        "already present"
    };
    vec![
        input.display().to_string(),
        format!("    Original:  {}", format_bytes(outcome.original_size)),
        format!("    Processed: {}", format_bytes(outcome.processed_size)),
        format!("    Backup: {backup}"),
    ]
}

/// Print a progress event to stdout.
pub fn print_process_event(event: &ProcessEvent) {
    for line in format_process_event(event) {
        println!("{}", line);
    }
}

/// Print the summary to stdout.
pub fn print_summary(summary: &BatchSummary, webp_enabled: bool, backup_dir: &Path) {
    for line in format_summary(summary, webp_enabled, backup_dir) {
        println!("{}", line);
    }
}
