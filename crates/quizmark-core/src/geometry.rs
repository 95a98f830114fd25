//! Contain-fit layout math shared by the overlay view and the mask editor.
//!
//! Everything here is pure: the same inputs always produce the same output,
//! so callers recompute on every resize or page change instead of caching.

use crate::rect::{NormalizedRect, ScreenRect};

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self::new(width as f64, height as f64)
    }

    /// True when both sides are finite and strictly positive.
    pub fn is_drawable(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Where a natural-size image lands inside a container under contain fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedGeometry {
    pub rendered_width: f64,
    pub rendered_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl RenderedGeometry {
    /// Rendered size divided by natural size; identical on both axes.
    pub fn scale_for(&self, natural: Size) -> f64 {
        self.rendered_width / natural.width
    }

    /// The rendered image rectangle in container pixels.
    pub fn image_rect(&self) -> ScreenRect {
        ScreenRect {
            left: self.offset_x,
            top: self.offset_y,
            width: self.rendered_width,
            height: self.rendered_height,
        }
    }
}

/// Letterbox an image of `natural` size into `container`.
///
/// Returns `None` for the no-render state: any non-positive or non-finite
/// dimension, including an image that has not finished loading.
pub fn compute_contain_geometry(natural: Size, container: Size) -> Option<RenderedGeometry> {
    if !natural.is_drawable() || !container.is_drawable() {
        return None;
    }

    let natural_aspect = natural.width / natural.height;
    let container_aspect = container.width / container.height;

    let geometry = if natural_aspect > container_aspect {
        let rendered_height = container.width * natural.height / natural.width;
        RenderedGeometry {
            rendered_width: container.width,
            rendered_height,
            offset_x: 0.0,
            offset_y: (container.height - rendered_height) / 2.0,
        }
    } else {
        let rendered_width = container.height * natural.width / natural.height;
        RenderedGeometry {
            rendered_width,
            rendered_height: container.height,
            offset_x: (container.width - rendered_width) / 2.0,
            offset_y: 0.0,
        }
    };
    Some(geometry)
}

/// Map a normalized box to absolute pixels inside the container (not the
/// natural image).
pub fn normalized_to_container_pixels(
    rect: NormalizedRect,
    geometry: &RenderedGeometry,
) -> ScreenRect {
    ScreenRect {
        left: geometry.offset_x + rect.x * geometry.rendered_width,
        top: geometry.offset_y + rect.y * geometry.rendered_height,
        width: rect.w * geometry.rendered_width,
        height: rect.h * geometry.rendered_height,
    }
}
