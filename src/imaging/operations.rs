//! In-memory transform stages: normalize, resize, watermark.
//!
//! These functions combine the pure [`calculations`](super::calculations) with
//! pixel work on decoded buffers. None of them touch the filesystem.

use super::calculations::{blend_channel, fit_within, opacity_to_alpha, watermark_origin};
use super::font::LoadedFont;
use crate::config::{ResizeConfig, WatermarkConfig};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Rgb, RgbImage};

/// Backdrop that transparent pixels are flattened onto.
const BACKDROP: [u8; 3] = [255, 255, 255];

/// Convert any decoded image to opaque 8-bit RGB.
///
/// Images with an alpha channel are composited over white using alpha as the
/// blend weight. Palette images arrive here already expanded by the decoder,
/// so a palette with transparency takes the alpha path too. Everything else
/// is converted directly.
pub fn normalize_to_rgb(image: DynamicImage) -> RgbImage {
    if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        let (w, h) = rgba.dimensions();
        let mut flat = RgbImage::new(w, h);
        for (dst, src) in flat.pixels_mut().zip(rgba.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = Rgb([
                blend_channel(BACKDROP[0], r, a),
                blend_channel(BACKDROP[1], g, a),
                blend_channel(BACKDROP[2], b, a),
            ]);
        }
        return flat;
    }

    match image {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.to_rgb8(),
    }
}

/// Result of a resize that actually happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Resized {
    pub from: (u32, u32),
    pub to: (u32, u32),
}

/// Shrink `image` to fit the configured bounding box (Lanczos3).
///
/// Returns the image unchanged and `None` when resizing is disabled or the
/// image already fits.
pub fn constrain_size(image: RgbImage, config: &ResizeConfig) -> (RgbImage, Option<Resized>) {
    if !config.enabled {
        return (image, None);
    }
    let from = image.dimensions();
    match fit_within(from, (config.max_width, config.max_height)) {
        Some(to) => {
            let resized = image::imageops::resize(&image, to.0, to.1, FilterType::Lanczos3);
            (resized, Some(Resized { from, to }))
        }
        None => (image, None),
    }
}

/// Where the watermark text box landed, in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Draw the configured watermark text onto `image`.
///
/// The text box is anchored per [`watermark_origin`]; each pixel is blended
/// with weight `coverage × alpha`, where alpha = round(255 × opacity). Parts
/// of the text outside the image are clipped.
pub fn apply_watermark(
    image: &mut RgbImage,
    config: &WatermarkConfig,
    font: &LoadedFont,
) -> Placement {
    let mask = font.render_mask(&config.text);
    let (text_w, text_h) = font.measure(&config.text);
    let (x, y) = watermark_origin(
        config.position,
        image.dimensions(),
        (text_w, text_h),
        config.margin,
    );

    blend_mask(
        image,
        &mask,
        (x, y),
        config.color,
        opacity_to_alpha(config.opacity),
    );

    Placement {
        x,
        y,
        width: text_w,
        height: text_h,
    }
}

/// Blend a solid `color` through a coverage `mask` placed at `origin`.
fn blend_mask(image: &mut RgbImage, mask: &GrayImage, origin: (i64, i64), color: [u8; 3], alpha: u8) {
    if alpha == 0 {
        return;
    }
    let (img_w, img_h) = (image.width() as i64, image.height() as i64);

    for (mx, my, coverage) in mask.enumerate_pixels() {
        let coverage = coverage.0[0];
        if coverage == 0 {
            continue;
        }
        let px = origin.0 + mx as i64;
        let py = origin.1 + my as i64;
        if px < 0 || py < 0 || px >= img_w || py >= img_h {
            continue;
        }

        let weight = blend_channel(0, alpha, coverage);
        let pixel = image.get_pixel_mut(px as u32, py as u32);
        for (channel, over) in pixel.0.iter_mut().zip(color) {
            *channel = blend_channel(*channel, over, weight);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Position;
    use image::{GrayAlphaImage, LumaA, Rgba, RgbaImage};

    // =========================================================================
    // normalize_to_rgb
    // =========================================================================

    #[test]
    fn rgb_passes_through_unchanged() {
        let rgb = RgbImage::from_fn(3, 2, |x, y| Rgb([x as u8, y as u8, 7]));
        let out = normalize_to_rgb(DynamicImage::ImageRgb8(rgb.clone()));
        assert_eq!(out, rgb);
    }

    #[test]
    fn transparent_pixels_become_white() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 0]));
        let out = normalize_to_rgb(DynamicImage::ImageRgba8(rgba));
        assert!(out.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn opaque_rgba_keeps_color() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]));
        let out = normalize_to_rgb(DynamicImage::ImageRgba8(rgba));
        assert!(out.pixels().all(|p| p.0 == [10, 20, 30]));
    }

    #[test]
    fn half_transparent_black_becomes_mid_gray() {
        let rgba = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128]));
        let out = normalize_to_rgb(DynamicImage::ImageRgba8(rgba));
        assert_eq!(out.get_pixel(0, 0).0, [127, 127, 127]);
    }

    #[test]
    fn gray_alpha_is_flattened() {
        let la = GrayAlphaImage::from_pixel(1, 1, LumaA([0, 0]));
        let out = normalize_to_rgb(DynamicImage::ImageLumaA8(la));
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn grayscale_converts_without_compositing() {
        let gray = GrayImage::from_pixel(2, 1, image::Luma([40]));
        let out = normalize_to_rgb(DynamicImage::ImageLuma8(gray));
        assert!(out.pixels().all(|p| p.0 == [40, 40, 40]));
    }

    // =========================================================================
    // constrain_size
    // =========================================================================

    fn resize_config(enabled: bool, max_width: u32, max_height: u32) -> ResizeConfig {
        ResizeConfig {
            enabled,
            max_width,
            max_height,
        }
    }

    #[test]
    fn constrain_size_disabled_is_noop() {
        let (out, resized) = constrain_size(RgbImage::new(400, 300), &resize_config(false, 100, 100));
        assert_eq!(out.dimensions(), (400, 300));
        assert_eq!(resized, None);
    }

    #[test]
    fn constrain_size_within_bounds_is_noop() {
        let (out, resized) = constrain_size(RgbImage::new(90, 60), &resize_config(true, 100, 100));
        assert_eq!(out.dimensions(), (90, 60));
        assert_eq!(resized, None);
    }

    #[test]
    fn constrain_size_shrinks_to_fit() {
        let (out, resized) = constrain_size(RgbImage::new(400, 300), &resize_config(true, 200, 200));
        assert_eq!(out.dimensions(), (200, 150));
        assert_eq!(
            resized,
            Some(Resized {
                from: (400, 300),
                to: (200, 150)
            })
        );
    }

    // =========================================================================
    // apply_watermark
    // =========================================================================

    fn watermark(position: Position, margin: u32, opacity: f32) -> WatermarkConfig {
        WatermarkConfig {
            enabled: true,
            text: "TEST".to_string(),
            font_size: 16,
            color: [255, 0, 0],
            opacity,
            position,
            margin,
            fonts: Vec::new(),
        }
    }

    #[test]
    fn watermark_bottom_right_only_touches_text_box() {
        let original = RgbImage::from_pixel(200, 100, Rgb([0, 0, 255]));
        let mut image = original.clone();
        let font = LoadedFont::bitmap(16);

        let placement = apply_watermark(&mut image, &watermark(Position::BottomRight, 10, 1.0), &font);

        // "TEST" in 16px bitmap cells is 64x16
        assert_eq!(
            placement,
            Placement {
                x: 200 - 64 - 10,
                y: 100 - 16 - 10,
                width: 64,
                height: 16
            }
        );

        let mut changed_inside = false;
        for (x, y, px) in image.enumerate_pixels() {
            let inside = (x as i64) >= placement.x
                && (x as i64) < placement.x + placement.width as i64
                && (y as i64) >= placement.y
                && (y as i64) < placement.y + placement.height as i64;
            if inside {
                changed_inside |= px != original.get_pixel(x, y);
            } else {
                assert_eq!(px, original.get_pixel(x, y), "pixel ({x},{y}) changed");
            }
        }
        assert!(changed_inside);
    }

    #[test]
    fn watermark_opacity_blends_color() {
        let mut image = RgbImage::from_pixel(100, 40, Rgb([0, 0, 0]));
        let font = LoadedFont::bitmap(16);
        apply_watermark(&mut image, &watermark(Position::TopLeft, 0, 0.5), &font);

        // Fully covered bitmap pixels blend red at alpha 128 over black.
        assert!(image.pixels().any(|p| p.0 == [128, 0, 0]));
        assert!(image.pixels().all(|p| p.0[0] <= 128 && p.0[1] == 0 && p.0[2] == 0));
    }

    #[test]
    fn watermark_zero_opacity_is_invisible() {
        let original = RgbImage::from_pixel(100, 40, Rgb([9, 9, 9]));
        let mut image = original.clone();
        apply_watermark(
            &mut image,
            &watermark(Position::TopLeft, 0, 0.0),
            &LoadedFont::bitmap(16),
        );
        assert_eq!(image, original);
    }

    #[test]
    fn watermark_larger_than_image_is_clipped() {
        let mut image = RgbImage::from_pixel(20, 10, Rgb([0, 0, 0]));
        let placement = apply_watermark(
            &mut image,
            &watermark(Position::BottomRight, 5, 1.0),
            &LoadedFont::bitmap(32),
        );
        assert!(placement.x < 0 && placement.y < 0);
        assert_eq!(image.dimensions(), (20, 10));
    }
}
