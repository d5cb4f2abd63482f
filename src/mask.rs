//! Rounded-rectangle alpha masks.
//!
//! The mask is binary: a pixel is opaque when its centre lies inside a
//! rectangle covering the whole image whose corners are rounded to the
//! requested radius, and transparent otherwise.

use image::{GrayImage, Luma, RgbaImage};

use crate::request::AlphaMode;

const OPAQUE: u8 = u8::MAX;
const TRANSPARENT: u8 = 0;

/// Build a `width` x `height` mask with corners rounded to `radius` pixels.
///
/// The radius is clamped to half of the shorter edge, so an oversized radius
/// on a square image yields a circle. A radius of 0 yields a fully opaque mask.
pub fn rounded_rect_mask(width: u32, height: u32, radius: u32) -> GrayImage {
    let w = width as f32;
    let h = height as f32;
    let r = (radius as f32).min(w / 2.0).min(h / 2.0);

    GrayImage::from_fn(width, height, |x, y| {
        if covers(x as f32 + 0.5, y as f32 + 0.5, w, h, r) {
            Luma([OPAQUE])
        } else {
            Luma([TRANSPARENT])
        }
    })
}

/// Whether point `(px, py)` lies inside the rounded rectangle `[0,w] x [0,h]`.
fn covers(px: f32, py: f32, w: f32, h: f32, r: f32) -> bool {
    if r <= 0.0 {
        return true;
    }
    // Nearest point on the inner rectangle whose Minkowski sum with a disc of
    // radius r is the rounded rectangle.
    let cx = px.clamp(r, w - r);
    let cy = py.clamp(r, h - r);
    let dx = px - cx;
    let dy = py - cy;
    dx * dx + dy * dy <= r * r
}

/// Combine `mask` into the alpha channel of `image`.
///
/// # Panics
///
/// Panics if the mask and image dimensions differ.
pub fn apply_mask(image: &mut RgbaImage, mask: &GrayImage, mode: AlphaMode) {
    assert_eq!(
        image.dimensions(),
        mask.dimensions(),
        "mask must match image dimensions"
    );
    for (pixel, coverage) in image.pixels_mut().zip(mask.pixels()) {
        let coverage = coverage.0[0];
        pixel.0[3] = match mode {
            AlphaMode::Preserve => pixel.0[3].min(coverage),
            AlphaMode::Replace => coverage,
        };
    }
}
