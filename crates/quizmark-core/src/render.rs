use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::{debug, info, warn};

use crate::geometry::RenderedGeometry;
use crate::grading::Verdict;
use crate::overlay::{FeedbackLabel, Overlay};

const BACKGROUND: Rgba<u8> = Rgba([243, 244, 246, 255]);
const CORRECT_COLOR: Rgba<u8> = Rgba([34, 197, 94, 255]);
const INCORRECT_COLOR: Rgba<u8> = Rgba([239, 68, 68, 255]);
const TAG_COLOR: Rgba<u8> = Rgba([22, 163, 74, 255]);
const TAG_TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

const BORDER_WIDTH: i32 = 2;
const TEXT_SCALE: f32 = 14.0;
const TAG_PADDING_X: u32 = 8;
const TAG_PADDING_Y: u32 = 4;
/// Tag width used when no font is available to measure the text.
const TAG_FALLBACK_WIDTH: u32 = 24;

/// Composes a marked page: the page image letterboxed into a container-sized
/// canvas with box outlines and correct-answer tags on top.
pub struct MarkedPageRenderer {
    font: Option<FontVec>,
}

impl MarkedPageRenderer {
    /// A renderer without a font draws tags as plain boxes.
    pub fn new(font_path: Option<&Path>) -> Self {
        let font = font_path.and_then(Self::load_font);
        Self { font }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn render(
        &self,
        page: &DynamicImage,
        geometry: &RenderedGeometry,
        container_width: u32,
        container_height: u32,
        overlays: &[Overlay],
    ) -> RgbaImage {
        let mut canvas = RgbaImage::from_pixel(container_width, container_height, BACKGROUND);

        match geometry.image_rect().to_imageproc() {
            Some(placed) => {
                let scaled = imageops::resize(
                    &page.to_rgba8(),
                    placed.width(),
                    placed.height(),
                    FilterType::Triangle,
                );
                imageops::overlay(&mut canvas, &scaled, placed.left() as i64, placed.top() as i64);
            }
            None => warn!(?geometry, "page rounds to nothing, drawing overlays only"),
        }

        for overlay in overlays {
            self.draw_box(&mut canvas, overlay);
            if let Some(label) = &overlay.feedback {
                self.draw_tag(&mut canvas, label);
            }
        }

        debug!(
            container_width,
            container_height,
            overlays = overlays.len(),
            "rendered marked page"
        );
        canvas
    }

    fn draw_box(&self, canvas: &mut RgbaImage, overlay: &Overlay) {
        let Some(rect) = overlay.rect.to_imageproc() else {
            return;
        };
        let color = match overlay.verdict {
            Verdict::Correct => CORRECT_COLOR,
            Verdict::Incorrect => INCORRECT_COLOR,
        };
        for inset in 0..BORDER_WIDTH {
            let w = rect.width() as i32 - 2 * inset;
            let h = rect.height() as i32 - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let ring =
                Rect::at(rect.left() + inset, rect.top() + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(canvas, ring, color);
        }
    }

    fn draw_tag(&self, canvas: &mut RgbaImage, label: &FeedbackLabel) {
        let scale = PxScale::from(TEXT_SCALE);
        let (text_w, text_h) = match &self.font {
            Some(font) => text_size(scale, font, &label.text),
            None => (TAG_FALLBACK_WIDTH, TEXT_SCALE as u32),
        };
        let tag_w = text_w + 2 * TAG_PADDING_X;
        let tag_h = text_h + 2 * TAG_PADDING_Y;
        let left = label.left.round() as i32;
        let top = (label.center_y - tag_h as f64 / 2.0).round() as i32;

        draw_filled_rect_mut(canvas, Rect::at(left, top).of_size(tag_w, tag_h), TAG_COLOR);

        if let Some(font) = &self.font {
            draw_text_mut(
                canvas,
                TAG_TEXT_COLOR,
                left + TAG_PADDING_X as i32,
                top + TAG_PADDING_Y as i32,
                scale,
                font,
                &label.text,
            );
        }
    }

    fn load_font(path: &Path) -> Option<FontVec> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                warn!(?path, error = %e, "failed to read font file");
                return None;
            }
        };
        match FontVec::try_from_vec(data) {
            Ok(font) => {
                info!(?path, "loaded label font");
                Some(font)
            }
            Err(e) => {
                warn!(?path, error = %e, "failed to parse font file");
                None
            }
        }
    }
}
