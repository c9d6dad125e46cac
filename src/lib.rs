//! # Gallery Optimizer
//!
//! Batch optimizer for a directory of gallery images. Every JPEG and PNG is
//! flattened to RGB, optionally resized and watermarked, re-encoded in place in
//! its own format, and given a WebP derivative. Originals are preserved once in
//! a backup directory and never overwritten.
//!
//! # Pipeline
//!
//! ```text
//! discover → backup → decode → normalize → resize? → watermark? → encode (+ .webp?)
//!                                                                    ↓
//!                                                     ProcessResult → BatchSummary
//! ```
//!
//! Each file is independent: a failure is recorded as that file's result and
//! the batch continues. Files run in parallel on a rayon pool; results are
//! reported in file-name order.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`process`] | Batch orchestrator: discovery, per-file pipeline, parallel execution, progress events |
//! | [`imaging`] | Pixel work: codec trait, normalize, resize, watermark, encoders |
//! | [`backup`] | Once-only, atomic backup of originals |
//! | [`report`] | Per-file outcome enum and batch aggregation |
//! | [`config`] | `gallery-optimizer.toml` loading, validation, merging, stock sample |
//! | [`video`] | Video watermarking through an external `ffmpeg` |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Injected Capabilities
//!
//! Pixel I/O sits behind [`imaging::ImageCodec`] and font discovery behind
//! [`imaging::FontProvider`]. Pipeline tests run against a recording mock codec
//! and never touch real encoders or system fonts.
//!
//! ## Outcomes, Not Exceptions
//!
//! [`report::Outcome`] is an enum: a file is skipped, failed, or optimized, and
//! never more than one. Only a missing input directory aborts a run, and it is
//! detected before any file is touched.
//!
//! ## In-Process Imaging
//!
//! Decoding and PNG encoding use the `image` crate, JPEG is written by
//! `jpeg-encoder` (progressive, optimized Huffman tables) and WebP by the
//! `webp` bindings to a bundled libwebp. Text is laid out and rasterized with
//! `ab_glyph`, falling back to the `font8x8` bitmap face when no font file
//! loads. No system libraries are needed for images. Video is the one
//! exception and shells out to `ffmpeg`.

pub mod backup;
pub mod config;
pub mod imaging;
pub mod output;
pub mod process;
pub mod report;
pub mod video;

#[cfg(test)]
pub(crate) mod test_helpers;
