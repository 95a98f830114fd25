//! Interactive masking editor used to redact parts of a photo before it is
//! resubmitted for grading.
//!
//! The canvas pixel buffer is the document: strokes are burned into it as
//! they are drawn. The only history is the per-stroke snapshot the rectangle
//! tool uses for its live preview, plus a whole-image reset.

mod paint;
mod viewport;

pub use paint::{MASK_COLOR, PREVIEW_COLOR};
pub use viewport::{Point, ViewportTransform};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use tracing::{debug, error, info, warn};

use crate::error::{MarkError, Result};
use crate::geometry::Size;
use crate::source::EncodedImage;

pub const MIN_BRUSH_SIZE: f64 = 5.0;
pub const MAX_BRUSH_SIZE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorConfig {
    /// Initial brush diameter in canvas pixels.
    pub brush_size: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// JPEG quality (1-100) used when saving JPEG input.
    pub jpeg_quality: u8,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            brush_size: 30.0,
            min_zoom: 0.1,
            max_zoom: 10.0,
            jpeg_quality: 95,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskTool {
    #[default]
    Rectangle,
    Brush,
}

/// The file handed to the editor.
#[derive(Debug, Clone)]
pub struct EditorInput {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// The artifact produced by a save.
#[derive(Debug, Clone, PartialEq)]
pub struct EditedImage {
    pub file_name: String,
    pub image: EncodedImage,
}

/// Receives the outcome of an editing session.
pub trait EditorHost {
    fn on_save(&mut self, edited: EditedImage);
    fn on_cancel(&mut self);
}

enum Stroke {
    Brush { last: Point },
    Rectangle { start: Point, snapshot: RgbaImage },
}

pub struct MaskEditor {
    file_name: String,
    format: ImageFormat,
    original: RgbaImage,
    canvas: RgbaImage,
    config: EditorConfig,
    tool: MaskTool,
    brush_size: f64,
    container: Option<Size>,
    transform: ViewportTransform,
    initial_transform: ViewportTransform,
    stroke: Option<Stroke>,
    pinch_distance: Option<f64>,
    generation: u64,
}

impl MaskEditor {
    /// Decode `input` and start a session. If the image cannot be decoded
    /// the host is told to cancel and no editor is returned.
    pub fn open(
        input: EditorInput,
        container: Size,
        config: EditorConfig,
        host: &mut impl EditorHost,
    ) -> Option<Self> {
        match Self::decode(&input) {
            Ok((format, image)) => {
                info!(
                    file = %input.file_name,
                    width = image.width(),
                    height = image.height(),
                    ?format,
                    "opened image for masking"
                );
                let mut editor = Self {
                    file_name: input.file_name,
                    format,
                    canvas: image.clone(),
                    original: image,
                    config,
                    tool: MaskTool::default(),
                    brush_size: config.brush_size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE),
                    container: None,
                    transform: ViewportTransform::default(),
                    initial_transform: ViewportTransform::default(),
                    stroke: None,
                    pinch_distance: None,
                    generation: 0,
                };
                editor.resize(container);
                Some(editor)
            }
            Err(e) => {
                error!(file = %input.file_name, error = %e, "failed to load image for editing");
                host.on_cancel();
                None
            }
        }
    }

    fn decode(input: &EditorInput) -> Result<(ImageFormat, RgbaImage)> {
        let load_error = |e| MarkError::ImageLoad {
            source_desc: input.file_name.clone(),
            source: e,
        };
        let format = image::guess_format(&input.bytes).map_err(load_error)?;
        let image = image::load_from_memory_with_format(&input.bytes, format).map_err(load_error)?;
        Ok((format, image.to_rgba8()))
    }

    fn canvas_size(&self) -> Size {
        Size::from_pixels(self.canvas.width(), self.canvas.height())
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn original(&self) -> &RgbaImage {
        &self.original
    }

    pub fn tool(&self) -> MaskTool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: MaskTool) {
        self.tool = tool;
    }

    pub fn brush_size(&self) -> f64 {
        self.brush_size
    }

    pub fn set_brush_size(&mut self, size: f64) {
        self.brush_size = size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
    }

    pub fn is_drawing(&self) -> bool {
        self.stroke.is_some()
    }

    /// Incremented by every reset.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn transform(&self) -> ViewportTransform {
        self.transform
    }

    pub fn initial_transform(&self) -> ViewportTransform {
        self.initial_transform
    }

    /// Refit the canvas to a new container size. Empty containers are
    /// ignored and keep the previous fit.
    pub fn resize(&mut self, container: Size) {
        let Some(fit) = ViewportTransform::fit(self.canvas_size(), container) else {
            debug!(width = container.width, height = container.height, "ignoring empty container");
            return;
        };
        self.container = Some(container);
        self.transform = fit;
        self.initial_transform = fit;
        debug!(
            scale = fit.scale,
            x = fit.translate_x,
            y = fit.translate_y,
            "fitted canvas to container"
        );
    }

    pub fn reset_view(&mut self) {
        self.transform = self.initial_transform;
    }

    pub fn zoom_at(&mut self, factor: f64, anchor: Point) {
        self.transform = self
            .transform
            .zoomed(factor, anchor, self.config.min_zoom, self.config.max_zoom);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.transform = self.transform.panned(dx, dy);
    }

    /// Client (container-relative) point to canvas pixels.
    pub fn client_to_canvas(&self, client: Point) -> Option<Point> {
        self.transform.client_to_canvas(client, self.canvas_size())
    }

    pub fn canvas_to_client(&self, canvas_point: Point) -> Point {
        self.transform.canvas_to_client(canvas_point)
    }

    fn contains(&self, p: Point) -> bool {
        let size = self.canvas_size();
        (0.0..=size.width).contains(&p.x) && (0.0..=size.height).contains(&p.y)
    }

    pub fn pointer_down(&mut self, client: Point) {
        if self.stroke.is_some() {
            return;
        }
        let Some(p) = self.client_to_canvas(client).filter(|p| self.contains(*p)) else {
            return;
        };
        self.stroke = Some(match self.tool {
            MaskTool::Brush => Stroke::Brush { last: p },
            MaskTool::Rectangle => Stroke::Rectangle {
                start: p,
                snapshot: self.canvas.clone(),
            },
        });
        debug!(tool = ?self.tool, x = p.x, y = p.y, "stroke started");
    }

    pub fn pointer_move(&mut self, client: Point) {
        let Some(p) = self.client_to_canvas(client) else {
            return;
        };
        match &mut self.stroke {
            None => {}
            Some(Stroke::Brush { last }) => {
                paint::stroke_segment(&mut self.canvas, *last, p, self.brush_size, MASK_COLOR);
                *last = p;
            }
            Some(Stroke::Rectangle { start, snapshot }) => {
                self.canvas.clone_from(snapshot);
                paint::blend_rect(&mut self.canvas, *start, p, PREVIEW_COLOR);
            }
        }
    }

    /// Finish the stroke at `client`. Leaving the canvas area finishes the
    /// same way.
    pub fn pointer_up(&mut self, client: Point) {
        let end = self.client_to_canvas(client);
        match self.stroke.take() {
            None | Some(Stroke::Brush { .. }) => {}
            Some(Stroke::Rectangle { start, snapshot }) => {
                self.canvas = snapshot;
                if let Some(end) = end {
                    paint::fill_rect(&mut self.canvas, start, end, MASK_COLOR);
                    debug!(
                        x0 = start.x,
                        y0 = start.y,
                        x1 = end.x,
                        y1 = end.y,
                        "rectangle committed"
                    );
                }
            }
        }
    }

    pub fn pointer_leave(&mut self, client: Point) {
        self.pointer_up(client);
    }

    /// Drop an in-progress stroke without committing a rectangle.
    fn abandon_stroke(&mut self) {
        if let Some(Stroke::Rectangle { snapshot, .. }) = self.stroke.take() {
            self.canvas = snapshot;
        }
    }

    pub fn touch_start(&mut self, touches: &[Point]) {
        match touches {
            [single] => self.pointer_down(*single),
            [a, b] => {
                self.abandon_stroke();
                self.pinch_distance = Some(a.distance(*b));
            }
            _ => {}
        }
    }

    pub fn touch_move(&mut self, touches: &[Point]) {
        match touches {
            [single] => self.pointer_move(*single),
            [a, b] => {
                let distance = a.distance(*b);
                if let Some(last) = self.pinch_distance.filter(|d| *d > 0.0) {
                    self.zoom_at(distance / last, a.midpoint(*b));
                }
                self.pinch_distance = Some(distance);
            }
            _ => {}
        }
    }

    /// `changed` holds the touches that were lifted.
    pub fn touch_end(&mut self, changed: &[Point]) {
        match changed.first() {
            Some(p) if self.pinch_distance.is_none() => self.pointer_up(*p),
            _ => self.abandon_stroke(),
        }
        self.pinch_distance = None;
    }

    /// Discard every edit and redraw the original image.
    pub fn reset(&mut self) {
        self.stroke = None;
        self.canvas.clone_from(&self.original);
        self.generation += 1;
        info!(generation = self.generation, "mask edits reset");
    }

    /// Encode the canvas, masks included, in the input's format.
    pub fn encode(&self) -> Result<EditedImage> {
        let image = match self.format {
            ImageFormat::Jpeg => {
                let mut bytes = Vec::new();
                let encoder = JpegEncoder::new_with_quality(&mut bytes, self.config.jpeg_quality);
                DynamicImage::ImageRgba8(self.canvas.clone())
                    .to_rgb8()
                    .write_with_encoder(encoder)
                    .map_err(MarkError::Encode)?;
                EncodedImage {
                    bytes,
                    format: ImageFormat::Jpeg,
                }
            }
            ImageFormat::Png => EncodedImage::png(&DynamicImage::ImageRgba8(self.canvas.clone()))?,
            other => {
                warn!(format = ?other, "unsupported output format, saving as PNG");
                EncodedImage::png(&DynamicImage::ImageRgba8(self.canvas.clone()))?
            }
        };
        Ok(EditedImage {
            file_name: self.file_name.clone(),
            image,
        })
    }

    /// Hand the edited image to the host.
    pub fn save(&self, host: &mut impl EditorHost) -> Result<()> {
        let edited = self.encode()?;
        info!(
            file = %edited.file_name,
            bytes = edited.image.bytes.len(),
            mime = edited.image.mime(),
            "saving masked image"
        );
        host.on_save(edited);
        Ok(())
    }

    /// End the session without producing an image.
    pub fn cancel(self, host: &mut impl EditorHost) {
        info!(file = %self.file_name, "mask editing cancelled");
        host.on_cancel();
    }
}
