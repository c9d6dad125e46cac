//! Pure calculation functions for geometry, blending and savings.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::config::Position;

/// Fit `source` inside `bound`, preserving aspect ratio.
///
/// Returns `None` when the source already fits (never upscales). The edge
/// that hits the bound is set exactly; the other is rounded and kept at
/// least one pixel.
///
/// ```text
/// (4000, 3000) in (1920, 1080) → Some((1440, 1080))
/// (800, 600)   in (1920, 1080) → None
/// ```
pub fn fit_within(source: (u32, u32), bound: (u32, u32)) -> Option<(u32, u32)> {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bound;

    if src_w <= max_w && src_h <= max_h {
        return None;
    }

    // Compare src_w/src_h against max_w/max_h without floating point.
    if src_w as u64 * max_h as u64 >= src_h as u64 * max_w as u64 {
        // Wider than the box: width is the limiting edge
        let h = (src_h as f64 * max_w as f64 / src_w as f64).round() as u32;
        Some((max_w, h.clamp(1, max_h)))
    } else {
        let w = (src_w as f64 * max_h as f64 / src_h as f64).round() as u32;
        Some((w.clamp(1, max_w), max_h))
    }
}

/// Top-left corner of the watermark text box.
///
/// Signed because a text box larger than the image places the origin
/// off-canvas; drawing clips.
pub fn watermark_origin(
    position: Position,
    image: (u32, u32),
    text: (u32, u32),
    margin: u32,
) -> (i64, i64) {
    let (img_w, img_h) = (image.0 as i64, image.1 as i64);
    let (txt_w, txt_h) = (text.0 as i64, text.1 as i64);
    let m = margin as i64;

    match position {
        Position::BottomRight => (img_w - txt_w - m, img_h - txt_h - m),
        Position::BottomLeft => (m, img_h - txt_h - m),
        Position::TopRight => (img_w - txt_w - m, m),
        Position::TopLeft => (m, m),
    }
}

/// Opacity in [0, 1] to an 8-bit alpha value.
pub fn opacity_to_alpha(opacity: f32) -> u8 {
    (255.0 * opacity.clamp(0.0, 1.0)).round() as u8
}

/// Blend `over` onto `base` with the given 8-bit weight.
pub fn blend_channel(base: u8, over: u8, weight: u8) -> u8 {
    let w = weight as u32;
    ((base as u32 * (255 - w) + over as u32 * w + 127) / 255) as u8
}

/// Percentage of `original` saved by shrinking to `new`.
///
/// Negative when the file grew; 0 when `original` is 0.
pub fn saved_percent(original: u64, new: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (original as f64 - new as f64) / original as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // fit_within
    // =========================================================================

    #[test]
    fn fit_within_noop_when_inside_bounds() {
        assert_eq!(fit_within((800, 600), (1920, 1080)), None);
        assert_eq!(fit_within((1920, 1080), (1920, 1080)), None);
    }

    #[test]
    fn fit_within_landscape_limited_by_height() {
        assert_eq!(fit_within((4000, 3000), (1920, 1080)), Some((1440, 1080)));
    }

    #[test]
    fn fit_within_landscape_limited_by_width() {
        assert_eq!(fit_within((3840, 1080), (1920, 1080)), Some((1920, 540)));
    }

    #[test]
    fn fit_within_portrait() {
        assert_eq!(fit_within((1000, 3000), (1920, 1080)), Some((360, 1080)));
    }

    #[test]
    fn fit_within_one_dimension_over() {
        // Only width exceeds; height shrinks proportionally
        assert_eq!(fit_within((2000, 500), (1000, 1000)), Some((1000, 250)));
    }

    #[test]
    fn fit_within_extreme_aspect_keeps_one_pixel() {
        assert_eq!(fit_within((10000, 1), (100, 100)), Some((100, 1)));
    }

    #[test]
    fn fit_within_preserves_aspect_within_a_pixel() {
        let cases = [
            ((4032, 3024), (1920, 1080)),
            ((3000, 2000), (1200, 1200)),
            ((1234, 5678), (800, 600)),
            ((5000, 5000), (640, 480)),
            ((1001, 999), (1000, 1000)),
        ];
        for (src, bound) in cases {
            let (w, h) = fit_within(src, bound).unwrap();
            assert!(w <= bound.0 && h <= bound.1, "{src:?} → {w}x{h} exceeds {bound:?}");
            let expected_h = w as f64 * src.1 as f64 / src.0 as f64;
            let expected_w = h as f64 * src.0 as f64 / src.1 as f64;
            assert!(
                (expected_h - h as f64).abs() <= 1.0 || (expected_w - w as f64).abs() <= 1.0,
                "{src:?} → {w}x{h} distorts aspect ratio"
            );
        }
    }

    // =========================================================================
    // watermark_origin
    // =========================================================================

    #[test]
    fn watermark_origin_all_corners() {
        let img = (500, 400);
        let text = (100, 20);
        assert_eq!(watermark_origin(Position::BottomRight, img, text, 10), (390, 370));
        assert_eq!(watermark_origin(Position::BottomLeft, img, text, 10), (10, 370));
        assert_eq!(watermark_origin(Position::TopRight, img, text, 10), (390, 10));
        assert_eq!(watermark_origin(Position::TopLeft, img, text, 10), (10, 10));
    }

    #[test]
    fn watermark_origin_can_go_negative() {
        assert_eq!(
            watermark_origin(Position::BottomRight, (50, 20), (100, 30), 5),
            (-55, -15)
        );
    }

    // =========================================================================
    // Blending and alpha
    // =========================================================================

    #[test]
    fn opacity_to_alpha_rounds() {
        assert_eq!(opacity_to_alpha(0.0), 0);
        assert_eq!(opacity_to_alpha(0.5), 128);
        assert_eq!(opacity_to_alpha(1.0), 255);
        assert_eq!(opacity_to_alpha(2.0), 255);
    }

    #[test]
    fn blend_channel_endpoints() {
        assert_eq!(blend_channel(10, 200, 0), 10);
        assert_eq!(blend_channel(10, 200, 255), 200);
        assert_eq!(blend_channel(0, 255, 128), 128);
    }

    // =========================================================================
    // saved_percent
    // =========================================================================

    #[test]
    fn saved_percent_formula() {
        assert_eq!(saved_percent(1000, 750), 25.0);
        assert_eq!(saved_percent(1000, 1000), 0.0);
        assert_eq!(saved_percent(1000, 1500), -50.0);
    }

    #[test]
    fn saved_percent_zero_original() {
        assert_eq!(saved_percent(0, 0), 0.0);
        assert_eq!(saved_percent(0, 42), 0.0);
    }
}
