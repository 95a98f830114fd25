/// A rectangle defined in normalized coordinates (0.0 to 1.0),
/// relative to an image's natural pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// A rectangle in absolute (integer) pixel coordinates of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// A rectangle in fractional pixels of a display container.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    /// The whole image.
    pub const FULL: NormalizedRect = NormalizedRect {
        x: 0.0,
        y: 0.0,
        w: 1.0,
        h: 1.0,
    };

    /// Scale into natural pixel units without any clamping.
    pub fn to_natural(self, width: u32, height: u32) -> (f64, f64, f64, f64) {
        let (iw, ih) = (width as f64, height as f64);
        (self.x * iw, self.y * ih, self.w * iw, self.h * ih)
    }

    pub fn center_y(self) -> f64 {
        self.y + self.h / 2.0
    }
}

impl PixelRect {
    pub fn right(self) -> u32 {
        self.x + self.w
    }

    pub fn bottom(self) -> u32 {
        self.y + self.h
    }

    pub fn is_empty(self) -> bool {
        self.w == 0 || self.h == 0
    }
}

impl ScreenRect {
    pub fn right(self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(self) -> f64 {
        self.top + self.height
    }

    /// Snap to the integer pixel grid for rasterization. Returns `None` when
    /// nothing would be drawn.
    pub fn to_imageproc(self) -> Option<imageproc::rect::Rect> {
        let left = self.left.round();
        let top = self.top.round();
        let w = (self.right().round() - left).max(0.0) as u32;
        let h = (self.bottom().round() - top).max(0.0) as u32;
        if w == 0 || h == 0 {
            return None;
        }
        Some(imageproc::rect::Rect::at(left as i32, top as i32).of_size(w, h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_to_natural() {
        let n = NormalizedRect { x: 0.5, y: 0.25, w: 0.1, h: 0.05 };
        let (x, y, w, h) = n.to_natural(1920, 1080);
        assert_eq!(x, 960.0);
        assert_eq!(y, 270.0);
        assert!((w - 192.0).abs() < 1e-9);
        assert!((h - 54.0).abs() < 1e-9);
    }

    #[test]
    fn screen_rect_snaps_to_grid() {
        let r = ScreenRect { left: 10.4, top: 20.6, width: 30.2, height: 9.8 };
        let snapped = r.to_imageproc().unwrap();
        assert_eq!(snapped.left(), 10);
        assert_eq!(snapped.top(), 21);
        assert_eq!(snapped.width(), 31);
        assert_eq!(snapped.height(), 9);
    }

    #[test]
    fn degenerate_screen_rect_draws_nothing() {
        let r = ScreenRect { left: 5.0, top: 5.0, width: 0.2, height: 40.0 };
        assert!(r.to_imageproc().is_none());
    }

    #[test]
    fn pixel_rect_edges() {
        let r = PixelRect { x: 178, y: 10, w: 22, h: 5 };
        assert_eq!(r.right(), 200);
        assert_eq!(r.bottom(), 15);
        assert!(!r.is_empty());
        assert!(PixelRect { x: 0, y: 0, w: 0, h: 3 }.is_empty());
    }
}
