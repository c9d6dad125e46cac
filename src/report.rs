//! Per-file results and batch aggregation.
//!
//! Every file the orchestrator discovers yields one [`ProcessResult`]. Its
//! [`Outcome`] is an enum, so a result is exactly one of skipped, failed or
//! optimized. [`BatchSummary`] folds a result list into totals; only
//! optimized results contribute bytes.

use crate::imaging::Resized;
use crate::imaging::calculations::saved_percent;
use serde::Serialize;

/// Outcome for a single discovered file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessResult {
    pub file_name: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ProcessResult {
    pub fn skipped(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            outcome: Outcome::Skipped,
        }
    }

    pub fn failed(file_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            outcome: Outcome::Failed {
                message: message.into(),
            },
        }
    }

    pub fn optimized(file_name: impl Into<String>, savings: Savings) -> Self {
        Self {
            file_name: file_name.into(),
            outcome: Outcome::Optimized(savings),
        }
    }

    pub fn savings(&self) -> Option<&Savings> {
        match &self.outcome {
            Outcome::Optimized(savings) => Some(savings),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Extension not recognized; the file never entered the pipeline.
    Skipped,
    /// Some stage failed. The file is left however that stage left it.
    Failed { message: String },
    Optimized(Savings),
}

/// Byte accounting for one optimized file.
///
/// Serializes with the derived `saved` and `saved_percent` alongside the sizes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "SavingsRecord")]
pub struct Savings {
    pub original_size: u64,
    pub new_size: u64,
    pub webp_size: Option<u64>,
    pub resized: Option<Resized>,
}

impl Savings {
    /// `original − new`; negative when re-encoding grew the file.
    pub fn saved(&self) -> i64 {
        self.original_size as i64 - self.new_size as i64
    }

    pub fn saved_percent(&self) -> f64 {
        saved_percent(self.original_size, self.new_size)
    }
}

/// Serialized form of [`Savings`].
#[derive(Serialize)]
struct SavingsRecord {
    original_size: u64,
    new_size: u64,
    saved: i64,
    saved_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    webp_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resized: Option<Resized>,
}

impl From<Savings> for SavingsRecord {
    fn from(savings: Savings) -> Self {
        Self {
            saved: savings.saved(),
            saved_percent: savings.saved_percent(),
            original_size: savings.original_size,
            new_size: savings.new_size,
            webp_size: savings.webp_size,
            resized: savings.resized,
        }
    }
}

/// Aggregate statistics over one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total_original: u64,
    pub total_new: u64,
    pub total_webp: u64,
    pub saved: i64,
    pub saved_percent: f64,
}

impl BatchSummary {
    pub fn from_results(results: &[ProcessResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match &result.outcome {
                Outcome::Skipped => summary.skipped += 1,
                Outcome::Failed { .. } => summary.failed += 1,
                Outcome::Optimized(savings) => {
                    summary.processed += 1;
                    summary.total_original += savings.original_size;
                    summary.total_new += savings.new_size;
                    summary.total_webp += savings.webp_size.unwrap_or(0);
                }
            }
        }
        summary.saved = summary.total_original as i64 - summary.total_new as i64;
        summary.saved_percent = saved_percent(summary.total_original, summary.total_new);
        summary
    }
}
