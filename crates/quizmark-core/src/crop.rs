//! Cropping a padded region around a bounding box out of a page image.

use image::DynamicImage;
use tracing::{debug, warn};

use crate::error::{MarkError, Result};
use crate::rect::{NormalizedRect, PixelRect};
use crate::source::EncodedImage;

/// How much context to keep around a box, and the floor applied to boxes the
/// model reported with no size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropPolicy {
    /// Padding on each side as a fraction of the box size.
    pub expansion_factor: f64,
    /// Natural-pixel size substituted for a zero or negative box side.
    pub min_dimension: f64,
}

impl Default for CropPolicy {
    fn default() -> Self {
        Self {
            expansion_factor: 0.3,
            min_dimension: 10.0,
        }
    }
}

/// Compute the padded, clamped crop rectangle in natural pixels.
///
/// Fails with `InvalidCropRegion` when nothing of the padded box remains
/// inside the image.
pub fn compute_crop_region(
    image_width: u32,
    image_height: u32,
    rect: NormalizedRect,
    policy: &CropPolicy,
) -> Result<PixelRect> {
    let (iw, ih) = (image_width as f64, image_height as f64);
    let (box_x, box_y, mut box_w, mut box_h) = rect.to_natural(image_width, image_height);

    if box_w <= 0.0 || box_h <= 0.0 {
        warn!(
            box_w,
            box_h,
            min_dimension = policy.min_dimension,
            "bounding box has no size, applying minimum dimension"
        );
        if box_w <= 0.0 {
            box_w = policy.min_dimension;
        }
        if box_h <= 0.0 {
            box_h = policy.min_dimension;
        }
    }

    let expansion_w = box_w * policy.expansion_factor;
    let expansion_h = box_h * policy.expansion_factor;

    let crop_x = (box_x - expansion_w).max(0.0);
    let crop_y = (box_y - expansion_h).max(0.0);
    let crop_w = (iw - crop_x).min(box_w + 2.0 * expansion_w);
    let crop_h = (ih - crop_y).min(box_h + 2.0 * expansion_h);

    let invalid = MarkError::InvalidCropRegion {
        width: crop_w,
        height: crop_h,
    };
    if !(crop_w > 0.0 && crop_h > 0.0) {
        return Err(invalid);
    }

    // Canvas sizes are integral: truncate, as a raster canvas would.
    let region = PixelRect {
        x: crop_x.floor() as u32,
        y: crop_y.floor() as u32,
        w: crop_w as u32,
        h: crop_h as u32,
    };
    let region = PixelRect {
        w: region.w - region.right().saturating_sub(image_width).min(region.w),
        h: region.h - region.bottom().saturating_sub(image_height).min(region.h),
        ..region
    };
    if region.is_empty() {
        return Err(invalid);
    }

    debug!(
        x = region.x,
        y = region.y,
        w = region.w,
        h = region.h,
        "computed crop region"
    );
    Ok(region)
}

/// Crop `rect` (plus padding) out of an already decoded image.
pub fn crop_region(
    image: &DynamicImage,
    rect: NormalizedRect,
    policy: &CropPolicy,
) -> Result<DynamicImage> {
    let region = compute_crop_region(image.width(), image.height(), rect, policy)?;
    Ok(image.crop_imm(region.x, region.y, region.w, region.h))
}

/// Crop around `rect` and encode the result as a PNG.
pub fn crop_to_png(
    image: &DynamicImage,
    rect: NormalizedRect,
    policy: &CropPolicy,
) -> Result<EncodedImage> {
    EncodedImage::png(&crop_region(image, rect, policy)?)
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};
    use tracing_test::traced_test;

    use super::*;

    fn page(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 0, 255])
        }))
    }

    fn rect(x: f64, y: f64, w: f64, h: f64) -> NormalizedRect {
        NormalizedRect { x, y, w, h }
    }

    fn policy() -> CropPolicy {
        CropPolicy::default()
    }

    #[test]
    fn pads_box_symmetrically() {
        let region = compute_crop_region(1000, 1000, rect(0.4, 0.4, 0.1, 0.1), &policy()).unwrap();
        assert_eq!(region, PixelRect { x: 370, y: 370, w: 160, h: 160 });
    }

    #[test]
    #[traced_test]
    fn zero_size_box_gets_minimum_dimension() {
        for &(x, y) in &[(0.5, 0.5), (0.0, 0.0), (0.2, 0.9), (0.97, 0.1)] {
            let cropped = crop_region(&page(400, 300), rect(x, y, 0.0, 0.0), &policy()).unwrap();
            // 10px floor plus 3px padding each side, minus whatever the edge clamps away.
            let (w, h) = (cropped.width(), cropped.height());
            assert!(w >= 10 || x * 400.0 + 13.0 > 400.0, "{x},{y}: {w}");
            assert!(h >= 10 || y * 300.0 + 13.0 > 300.0, "{x},{y}: {h}");
        }
        let centered = crop_region(&page(400, 300), rect(0.5, 0.5, 0.0, 0.0), &policy()).unwrap();
        assert_eq!((centered.width(), centered.height()), (16, 16));
        assert!(logs_contain("applying minimum dimension"));
    }

    #[test]
    fn negative_size_box_gets_minimum_dimension() {
        let region = compute_crop_region(200, 200, rect(0.5, 0.5, -0.2, 0.1), &policy()).unwrap();
        assert_eq!(region.w, 16);
        assert_eq!(region.h, 32);
    }

    #[test]
    fn crop_never_exceeds_right_edge() {
        let region = compute_crop_region(200, 100, rect(0.95, 0.2, 0.2, 0.1), &policy()).unwrap();
        assert!(region.right() <= 200);
        assert_eq!(region.right(), 200);

        let cropped = crop_region(&page(200, 100), rect(0.95, 0.2, 0.2, 0.1), &policy()).unwrap();
        assert_eq!(cropped.width(), region.w);
    }

    #[test]
    fn crop_is_clamped_at_origin() {
        let region = compute_crop_region(100, 100, rect(0.0, 0.0, 0.5, 0.5), &policy()).unwrap();
        assert_eq!((region.x, region.y), (0, 0));
        assert_eq!((region.w, region.h), (80, 80));
    }

    #[test]
    fn box_outside_image_is_invalid_region() {
        let err = compute_crop_region(100, 100, rect(1.5, 0.2, 0.1, 0.1), &policy()).unwrap_err();
        assert!(matches!(err, MarkError::InvalidCropRegion { .. }));
    }

    #[test]
    fn crop_keeps_source_pixels() {
        let cropped = crop_region(&page(100, 100), rect(0.4, 0.4, 0.1, 0.1), &policy())
            .unwrap()
            .to_rgba8();
        // Region starts at (37, 37).
        assert_eq!(cropped.get_pixel(0, 0), &Rgba([37, 37, 0, 255]));
    }

    #[test]
    fn custom_policy_without_expansion() {
        let policy = CropPolicy { expansion_factor: 0.0, min_dimension: 4.0 };
        let region = compute_crop_region(100, 100, rect(0.5, 0.5, 0.0, 0.2), &policy).unwrap();
        assert_eq!(region, PixelRect { x: 50, y: 50, w: 4, h: 20 });
    }

    #[test]
    fn crop_to_png_encodes_png() {
        let encoded = crop_to_png(&page(50, 40), rect(0.2, 0.25, 0.2, 0.25), &policy())
            .unwrap();
        assert_eq!(encoded.mime(), "image/png");
        let decoded = encoded.decode().unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
    }

    #[test]
    fn crop_to_png_propagates_invalid_region() {
        let err = crop_to_png(&page(50, 40), rect(2.0, 0.0, 0.1, 0.1), &policy())
            .unwrap_err();
        assert!(matches!(err, MarkError::InvalidCropRegion { .. }));
    }
}
