//! Watermark font loading and text rasterization.
//!
//! A [`FontProvider`] resolves an ordered candidate list to a [`LoadedFont`].
//! Outline fonts (TTF/OTF/TTC) are parsed, laid out and rasterized with
//! `ab_glyph`; when no candidate loads, the built-in `font8x8` bitmap face is
//! used instead. The bitmap face covers Basic Latin and Latin-1, so other
//! scripts render as `?`. That degradation is logged, never an error.
//!
//! Both faces render to a coverage mask ([`GrayImage`], 0 = empty, 255 = full
//! glyph) which the compositor blends onto the photo. For outline faces the
//! mask is the union of the glyphs' pixel bounds, so the box hugs the ink
//! including descenders and overhangs.

use ab_glyph::{Font, FontVec, OutlinedGlyph, PxScale, Rect, ScaleFont, point};
use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{GrayImage, Luma};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Pixel size of one bitmap glyph cell before scaling.
const BITMAP_CELL: u32 = 8;

/// The face selected for rendering.
pub enum Typeface {
    Outline { font: FontVec, source: PathBuf },
    Bitmap,
}

impl std::fmt::Debug for Typeface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outline { source, .. } => f.debug_tuple("Outline").field(source).finish(),
            Self::Bitmap => f.write_str("Bitmap"),
        }
    }
}

/// A face bound to a pixel size.
#[derive(Debug)]
pub struct LoadedFont {
    face: Typeface,
    size: u32,
}

impl LoadedFont {
    pub fn outline(font: FontVec, source: PathBuf, size: u32) -> Self {
        Self {
            face: Typeface::Outline { font, source },
            size: size.max(1),
        }
    }

    pub fn bitmap(size: u32) -> Self {
        Self {
            face: Typeface::Bitmap,
            size: size.max(1),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.face, Typeface::Bitmap)
    }

    /// File the outline face was loaded from.
    pub fn source(&self) -> Option<&Path> {
        match &self.face {
            Typeface::Outline { source, .. } => Some(source),
            Typeface::Bitmap => None,
        }
    }

    /// Rendered size of `text` as `(width, height)`.
    pub fn measure(&self, text: &str) -> (u32, u32) {
        match &self.face {
            Typeface::Outline { font, .. } => layout_outline(font, self.scale(), text).size(),
            Typeface::Bitmap => {
                let cell = self.bitmap_cell();
                (text.chars().count() as u32 * cell, cell)
            }
        }
    }

    /// Rasterize `text` into a coverage mask of exactly [`measure`](Self::measure) size.
    pub fn render_mask(&self, text: &str) -> GrayImage {
        match &self.face {
            Typeface::Outline { font, .. } => layout_outline(font, self.scale(), text).render(),
            Typeface::Bitmap => self.render_bitmap(text),
        }
    }

    fn render_bitmap(&self, text: &str) -> GrayImage {
        let (w, h) = self.measure(text);
        let mut mask = GrayImage::new(w.max(1), h.max(1));
        let cell = self.bitmap_cell();
        let pixel = cell / BITMAP_CELL;

        for (index, ch) in text.chars().enumerate() {
            let Some(rows) = BASIC_FONTS
                .get(ch)
                .or_else(|| LATIN_FONTS.get(ch))
                .or_else(|| BASIC_FONTS.get('?'))
            else {
                continue;
            };
            let left = index as u32 * cell;
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..BITMAP_CELL {
                    if (bits >> col) & 1 == 0 {
                        continue;
                    }
                    let x0 = left + col * pixel;
                    let y0 = row as u32 * pixel;
                    for dy in 0..pixel {
                        for dx in 0..pixel {
                            mask.put_pixel(x0 + dx, y0 + dy, Luma([255]));
                        }
                    }
                }
            }
        }

        mask
    }

    fn scale(&self) -> PxScale {
        PxScale::from(self.size as f32)
    }

    /// Bitmap glyph cell edge: the 8px cell scaled by an integer factor.
    fn bitmap_cell(&self) -> u32 {
        (self.size / BITMAP_CELL).max(1) * BITMAP_CELL
    }
}

/// Outline glyphs positioned along one baseline.
struct OutlineLayout {
    glyphs: Vec<OutlinedGlyph>,
    /// Union of the glyphs' pixel bounds; `None` when nothing has ink.
    bounds: Option<Rect>,
}

impl OutlineLayout {
    fn size(&self) -> (u32, u32) {
        match self.bounds {
            Some(b) => ((b.max.x - b.min.x) as u32, (b.max.y - b.min.y) as u32),
            None => (0, 0),
        }
    }

    /// Draw every glyph relative to the top-left corner of the union bounds.
    fn render(&self) -> GrayImage {
        let (w, h) = self.size();
        let mut mask = GrayImage::new(w.max(1), h.max(1));
        let Some(union) = self.bounds else {
            return mask;
        };

        for glyph in &self.glyphs {
            let bounds = glyph.px_bounds();
            let left = (bounds.min.x - union.min.x) as u32;
            let top = (bounds.min.y - union.min.y) as u32;
            glyph.draw(|x, y, coverage| {
                let (px, py) = (left + x, top + y);
                if px >= w || py >= h {
                    return;
                }
                let value = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
                let current = mask.get_pixel_mut(px, py);
                current.0[0] = current.0[0].max(value);
            });
        }
        mask
    }
}

fn layout_outline(font: &FontVec, scale: PxScale, text: &str) -> OutlineLayout {
    let scaled = font.as_scaled(scale);
    let mut caret = 0.0f32;
    let mut previous = None;
    let mut glyphs = Vec::new();
    let mut bounds: Option<Rect> = None;

    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(previous) = previous {
            caret += scaled.kern(previous, id);
        }
        previous = Some(id);
        let glyph = id.with_scale_and_position(scale, point(caret, scaled.ascent()));
        caret += scaled.h_advance(id);

        // Whitespace has no outline
        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let b = outlined.px_bounds();
        bounds = Some(match bounds {
            Some(u) => Rect {
                min: point(u.min.x.min(b.min.x), u.min.y.min(b.min.y)),
                max: point(u.max.x.max(b.max.x), u.max.y.max(b.max.y)),
            },
            None => b,
        });
        glyphs.push(outlined);
    }

    OutlineLayout { glyphs, bounds }
}

/// Resolves font candidates to a usable face.
pub trait FontProvider: Sync {
    /// Try `candidates` in order and return the first that loads at `size`,
    /// or the built-in bitmap face if none do.
    fn load_first_available(&self, candidates: &[PathBuf], size: u32) -> LoadedFont;
}

/// Loads font files from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFonts;

impl FontProvider for SystemFonts {
    fn load_first_available(&self, candidates: &[PathBuf], size: u32) -> LoadedFont {
        for path in candidates {
            let data = match std::fs::read(path) {
                Ok(data) => data,
                Err(_) => continue,
            };
            // Index 0 selects the first face of a .ttc collection.
            match FontVec::try_from_vec_and_index(data, 0) {
                Ok(font) => {
                    debug!(font = %path.display(), "watermark font loaded");
                    return LoadedFont::outline(font, path.clone(), size);
                }
                Err(e) => debug!(font = %path.display(), error = %e, "font candidate unusable"),
            }
        }

        warn!(
            candidates = candidates.len(),
            "no watermark font could be loaded, using built-in bitmap font"
        );
        LoadedFont::bitmap(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_candidates_fall_back_to_bitmap() {
        let font = SystemFonts.load_first_available(
            &[
                PathBuf::from("/nonexistent/a.ttf"),
                PathBuf::from("/nonexistent/b.ttc"),
            ],
            24,
        );
        assert!(font.is_fallback());
        assert_eq!(font.source(), None);
    }

    #[test]
    fn corrupt_font_file_is_skipped() {
        let tmp = tempfile::TempDir::new().unwrap();
        let bogus = tmp.path().join("broken.ttf");
        std::fs::write(&bogus, b"definitely not a font").unwrap();

        let font = SystemFonts.load_first_available(&[bogus], 24);
        assert!(font.is_fallback());
    }

    #[test]
    fn bitmap_measure_scales_by_whole_cells() {
        // 25px → factor 3 → 24px cells
        let font = LoadedFont::bitmap(25);
        assert_eq!(font.measure("TEST"), (96, 24));

        // Smaller than one cell still renders at 8px
        let tiny = LoadedFont::bitmap(4);
        assert_eq!(tiny.measure("ab"), (16, 8));
    }

    #[test]
    fn bitmap_mask_matches_measure_and_has_ink() {
        let font = LoadedFont::bitmap(16);
        let mask = font.render_mask("Hi");
        assert_eq!(mask.dimensions(), font.measure("Hi"));
        assert!(mask.pixels().any(|p| p.0[0] == 255));
        assert!(mask.pixels().any(|p| p.0[0] == 0));
    }

    #[test]
    fn bitmap_renders_unknown_glyphs_as_question_mark() {
        let font = LoadedFont::bitmap(8);
        let cjk = font.render_mask("听");
        let question = font.render_mask("?");
        assert_eq!(cjk.as_raw(), question.as_raw());
    }

    #[test]
    fn bitmap_covers_latin1_symbols() {
        let font = LoadedFont::bitmap(8);
        let copyright = font.render_mask("\u{a9}");
        assert!(copyright.pixels().any(|p| p.0[0] == 255));
        assert_ne!(copyright.as_raw(), font.render_mask("?").as_raw());
    }

    /// First outline font from the stock candidate list, if the host has one.
    fn host_outline_font(size: u32) -> Option<LoadedFont> {
        let font = SystemFonts.load_first_available(&crate::config::default_font_candidates(), size);
        (!font.is_fallback()).then_some(font)
    }

    /// Whether each edge (top, bottom, left, right) has ink within its two
    /// outermost pixel lines. Bounds are rounded outwards, so the very last
    /// line may carry only sub-threshold coverage.
    fn ink_near_edges(mask: &GrayImage) -> [bool; 4] {
        let (w, h) = mask.dimensions();
        let inked = |x: u32, y: u32| mask.get_pixel(x, y).0[0] > 0;
        let rows = |y: u32| (0..w).any(|x| inked(x, y));
        let cols = |x: u32| (0..h).any(|y| inked(x, y));
        [
            rows(0) || rows(1),
            rows(h - 1) || rows(h - 2),
            cols(0) || cols(1),
            cols(w - 1) || cols(w - 2),
        ]
    }

    #[test]
    fn outline_mask_hugs_the_ink() {
        let Some(font) = host_outline_font(25) else {
            return;
        };
        for text in ["TEST", "\u{a9} gallery", "gyp"] {
            let mask = font.render_mask(text);
            assert_eq!(mask.dimensions(), font.measure(text), "{text}");
            // Ink reaches all four edges: nothing is padding
            assert_eq!(ink_near_edges(&mask), [true; 4], "{text}");
        }
    }

    #[test]
    fn outline_mask_keeps_descenders() {
        let Some(font) = host_outline_font(25) else {
            return;
        };
        let (_, cap_height) = font.measure("A");
        let (_, with_descender) = font.measure("Ag");
        assert!(with_descender > cap_height);
    }

    #[test]
    fn outline_mask_keeps_every_inked_pixel_of_a_glyph() {
        let Some(font) = host_outline_font(25) else {
            return;
        };
        let Typeface::Outline { font: face, .. } = &font.face else {
            unreachable!()
        };
        let ascent = face.as_scaled(font.scale()).ascent();
        let glyph = face
            .glyph_id('g')
            .with_scale_and_position(font.scale(), point(0.0, ascent));
        let outlined = face.outline_glyph(glyph).unwrap();
        let mut expected = 0usize;
        outlined.draw(|_, _, c| {
            if (c.clamp(0.0, 1.0) * 255.0).round() as u8 > 0 {
                expected += 1;
            }
        });

        let mask = font.render_mask("g");
        let inked = mask.pixels().filter(|p| p.0[0] > 0).count();
        assert_eq!(inked, expected);
    }

    #[test]
    fn empty_text_yields_minimal_mask() {
        let font = LoadedFont::bitmap(8);
        assert_eq!(font.measure(""), (0, 8));
        assert_eq!(font.render_mask("").dimensions(), (1, 8));
    }
}
