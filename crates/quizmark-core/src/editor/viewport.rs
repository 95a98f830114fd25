use crate::geometry::{compute_contain_geometry, Size};

/// A point in either client (container-relative) or canvas pixel space;
/// which one is always clear from the function it is passed to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Canvas placement inside the editor container: the canvas is drawn at
/// `(translate_x, translate_y)` and scaled by `scale` from its top-left
/// corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTransform {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }
}

impl ViewportTransform {
    /// Contain-fit the image into the container without enlarging it past
    /// its natural size, centred on both axes.
    pub fn fit(natural: Size, container: Size) -> Option<Self> {
        let geometry = compute_contain_geometry(natural, container)?;
        let scale = geometry.scale_for(natural);
        if scale <= 1.0 {
            return Some(Self {
                scale,
                translate_x: geometry.offset_x,
                translate_y: geometry.offset_y,
            });
        }
        Some(Self {
            scale: 1.0,
            translate_x: (container.width - natural.width) / 2.0,
            translate_y: (container.height - natural.height) / 2.0,
        })
    }

    /// Zoom by `factor` keeping the client point `anchor` fixed on screen.
    pub fn zoomed(self, factor: f64, anchor: Point, min_zoom: f64, max_zoom: f64) -> Self {
        let scale = (self.scale * factor).clamp(min_zoom, max_zoom);
        let ratio = scale / self.scale;
        Self {
            scale,
            translate_x: anchor.x - (anchor.x - self.translate_x) * ratio,
            translate_y: anchor.y - (anchor.y - self.translate_y) * ratio,
        }
    }

    pub fn panned(self, dx: f64, dy: f64) -> Self {
        Self {
            translate_x: self.translate_x + dx,
            translate_y: self.translate_y + dy,
            ..self
        }
    }

    /// Convert a client point to canvas pixels by the ratio of the canvas's
    /// pixel size to its on-screen size.
    pub fn client_to_canvas(&self, client: Point, canvas: Size) -> Option<Point> {
        let client_width = canvas.width * self.scale;
        let client_height = canvas.height * self.scale;
        if !(client_width > 0.0 && client_height > 0.0) {
            return None;
        }
        let scale_x = canvas.width / client_width;
        let scale_y = canvas.height / client_height;
        Some(Point::new(
            (client.x - self.translate_x) * scale_x,
            (client.y - self.translate_y) * scale_y,
        ))
    }

    pub fn canvas_to_client(&self, canvas_point: Point) -> Point {
        Point::new(
            self.translate_x + canvas_point.x * self.scale,
            self.translate_y + canvas_point.y * self.scale,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_never_enlarges() {
        let t = ViewportTransform::fit(Size::new(200.0, 100.0), Size::new(400.0, 400.0)).unwrap();
        assert_eq!(t, ViewportTransform { scale: 1.0, translate_x: 100.0, translate_y: 150.0 });
    }

    #[test]
    fn fit_shrinks_large_images() {
        let t = ViewportTransform::fit(Size::new(200.0, 100.0), Size::new(100.0, 100.0)).unwrap();
        assert_eq!(t, ViewportTransform { scale: 0.5, translate_x: 0.0, translate_y: 25.0 });
    }

    #[test]
    fn fit_rejects_empty_container() {
        assert!(ViewportTransform::fit(Size::new(200.0, 100.0), Size::new(0.0, 100.0)).is_none());
    }

    #[test]
    fn client_to_canvas_undoes_transform() {
        let canvas = Size::new(200.0, 100.0);
        let t = ViewportTransform { scale: 0.5, translate_x: 0.0, translate_y: 25.0 };
        assert_eq!(
            t.client_to_canvas(Point::new(50.0, 50.0), canvas),
            Some(Point::new(100.0, 50.0))
        );

        let p = Point::new(37.0, 81.0);
        let back = t.client_to_canvas(t.canvas_to_client(p), canvas).unwrap();
        assert!((back.x - p.x).abs() < 1e-9 && (back.y - p.y).abs() < 1e-9);
    }

    #[test]
    fn zoom_keeps_anchor_fixed() {
        let t = ViewportTransform { scale: 1.0, translate_x: 10.0, translate_y: 20.0 };
        let anchor = Point::new(60.0, 70.0);
        let canvas = Size::new(500.0, 500.0);
        let before = t.client_to_canvas(anchor, canvas).unwrap();
        let z = t.zoomed(2.0, anchor, 0.1, 10.0);
        assert_eq!(z.scale, 2.0);
        let after = z.client_to_canvas(anchor, canvas).unwrap();
        assert!((before.x - after.x).abs() < 1e-9 && (before.y - after.y).abs() < 1e-9);
    }

    #[test]
    fn zoom_is_clamped() {
        let t = ViewportTransform::default();
        let origin = Point::new(0.0, 0.0);
        assert_eq!(t.zoomed(100.0, origin, 0.1, 10.0).scale, 10.0);
        assert_eq!(t.zoomed(0.001, origin, 0.1, 10.0).scale, 0.1);
    }
}
