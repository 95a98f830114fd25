//! Raster operations the mask tools burn into the canvas.

use image::{Pixel, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;

use super::viewport::Point;

pub const MASK_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
/// White at 70% opacity.
pub const PREVIEW_COLOR: Rgba<u8> = Rgba([255, 255, 255, 179]);

/// Pixel bounds `[x0, x1) x [y0, y1)` of the rectangle spanned by two corners
/// in either order, clipped to the image.
fn span(image: &RgbaImage, a: Point, b: Point) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = (image.width() as f64, image.height() as f64);
    let x0 = a.x.min(b.x).round().clamp(0.0, w) as u32;
    let x1 = a.x.max(b.x).round().clamp(0.0, w) as u32;
    let y0 = a.y.min(b.y).round().clamp(0.0, h) as u32;
    let y1 = a.y.max(b.y).round().clamp(0.0, h) as u32;
    (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
}

pub fn fill_rect(image: &mut RgbaImage, a: Point, b: Point, color: Rgba<u8>) {
    if let Some((x0, y0, x1, y1)) = span(image, a, b) {
        let rect = Rect::at(x0 as i32, y0 as i32).of_size(x1 - x0, y1 - y0);
        draw_filled_rect_mut(image, rect, color);
    }
}

/// Alpha-composite `color` over the rectangle.
pub fn blend_rect(image: &mut RgbaImage, a: Point, b: Point, color: Rgba<u8>) {
    let Some((x0, y0, x1, y1)) = span(image, a, b) else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            image.get_pixel_mut(x, y).blend(&color);
        }
    }
}

/// Clip a segment to the box `[min, max]` (Liang-Barsky). Returns `None`
/// when no part of it lies inside.
fn clip_segment(from: Point, to: Point, min: Point, max: Point) -> Option<(Point, Point)> {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    let edges = [
        (-dx, from.x - min.x),
        (dx, max.x - from.x),
        (-dy, from.y - min.y),
        (dy, max.y - from.y),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    let at = |t: f64| Point::new(from.x + dx * t, from.y + dy * t);
    Some((at(t0), at(t1)))
}

/// Paint a round-capped segment of the given width by stamping discs along it.
/// Only the part within one radius of the image is stamped; segments with a
/// non-finite end are skipped.
pub fn stroke_segment(image: &mut RgbaImage, from: Point, to: Point, width: f64, color: Rgba<u8>) {
    if ![from.x, from.y, to.x, to.y, width].iter().all(|v| v.is_finite()) {
        return;
    }
    let radius = (width / 2.0).max(0.5);
    let min = Point::new(-radius, -radius);
    let max = Point::new(image.width() as f64 + radius, image.height() as f64 + radius);
    let Some((from, to)) = clip_segment(from, to, min, max) else {
        return;
    };

    let step = (radius / 2.0).max(1.0);
    let length = from.distance(to);
    let stamps = (length / step).ceil().max(1.0) as u32;

    for i in 0..=stamps {
        let t = i as f64 / stamps as f64;
        let cx = from.x + (to.x - from.x) * t;
        let cy = from.y + (to.y - from.y) * t;
        draw_filled_circle_mut(
            image,
            (cx.round() as i32, cy.round() as i32),
            radius.round() as i32,
            color,
        );
    }
}
