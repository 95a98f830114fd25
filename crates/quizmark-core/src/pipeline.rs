use std::path::PathBuf;

use image::RgbaImage;
use tracing::{info, warn};

use crate::geometry::Size;
use crate::grading::GradedItem;
use crate::overlay::OverlayView;
use crate::render::MarkedPageRenderer;
use crate::source::ImageSource;

/// Parameters for headless rendering of marked pages.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Size of the viewport each page is letterboxed into.
    pub container_width: u32,
    pub container_height: u32,
    /// TrueType/OpenType font for correct-answer tags, or None to draw
    /// tags without text.
    pub font_path: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            container_width: 800,
            container_height: 1000,
            font_path: None,
        }
    }
}

impl RenderConfig {
    fn container(&self) -> Size {
        Size::from_pixels(self.container_width, self.container_height)
    }
}

/// One rendered page with its overlays drawn in.
pub struct MarkedPage {
    pub index: usize,
    pub image: RgbaImage,
}

/// Step through every page the way a reader would and render what the
/// overlay view shows for it.
///
/// A page whose image cannot be decoded is logged and left out; the other
/// pages still render.
pub fn render_marked_pages(
    items: &[GradedItem],
    images: &[ImageSource],
    config: &RenderConfig,
) -> Vec<MarkedPage> {
    let renderer = MarkedPageRenderer::new(config.font_path.as_deref());
    info!(
        pages = images.len(),
        questions = items.len(),
        container_width = config.container_width,
        container_height = config.container_height,
        tag_text = renderer.has_font(),
        "rendering marked pages"
    );

    let mut view = OverlayView::new(images.len(), items.to_vec());
    view.resize(config.container());

    let mut pages = Vec::with_capacity(images.len());
    for (index, source) in images.iter().enumerate() {
        if index > 0 {
            view.next();
        }
        let ticket = view.begin_load();

        // Load failures are logged by the source itself.
        let Ok(page) = source.load() else {
            warn!(page = index, "skipping page that failed to load");
            continue;
        };
        if !view.image_loaded(ticket, Size::from_pixels(page.width(), page.height())) {
            warn!(page = ticket.page(), "page load was superseded, skipping");
            continue;
        }

        let Some(geometry) = view.geometry().copied() else {
            warn!(page = index, "page has no drawable geometry, skipping");
            continue;
        };
        let overlays = view.overlays();
        let image = renderer.render(
            &page,
            &geometry,
            config.container_width,
            config.container_height,
            &overlays,
        );
        info!(page = index, overlays = overlays.len(), "page marked");
        pages.push(MarkedPage { index, image });
    }

    info!(rendered = pages.len(), total = images.len(), "marking complete");
    pages
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgba};
    use tracing_test::traced_test;

    use super::*;
    use crate::grading::{BoundingBox, QuestionType, Verdict};
    use crate::source::EncodedImage;

    fn page_source(w: u32, h: u32) -> ImageSource {
        let image =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([250, 250, 250, 255])));
        ImageSource::Bytes(EncodedImage::png(&image).unwrap().bytes)
    }

    fn item(number: &str, verdict: Verdict, bbox: BoundingBox) -> GradedItem {
        GradedItem {
            section: String::new(),
            question_number: number.into(),
            question: String::new(),
            question_type: QuestionType::ShortAnswer,
            choices: Vec::new(),
            student_answer: String::new(),
            verdict,
            correct_answer: Some("5".into()),
            explanation: None,
            bounding_box: Some(bbox),
            reported_box: None,
        }
    }

    fn config() -> RenderConfig {
        RenderConfig {
            container_width: 200,
            container_height: 200,
            font_path: None,
        }
    }

    fn is_red(p: &Rgba<u8>) -> bool {
        p[0] > 200 && p[1] < 100 && p[2] < 100
    }

    fn is_green(p: &Rgba<u8>) -> bool {
        p[1] > 150 && p[0] < 100 && p[2] < 120
    }

    #[test]
    fn each_page_shows_only_its_own_boxes() {
        let images = vec![page_source(100, 100), page_source(100, 100)];
        let items = vec![
            item("1", Verdict::Correct, BoundingBox::new(0.1, 0.1, 0.3, 0.3, 0)),
            item("2", Verdict::Incorrect, BoundingBox::new(0.5, 0.5, 0.3, 0.3, 1)),
        ];

        let pages = render_marked_pages(&items, &images, &config());
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].image.dimensions(), (200, 200));

        // Page 1 box: container (20, 20) to (80, 80).
        assert!(is_green(pages[0].image.get_pixel(20, 50)));
        assert!(!is_red(pages[0].image.get_pixel(100, 150)));

        // Page 2 box: container (100, 100) to (160, 160).
        assert!(is_red(pages[1].image.get_pixel(100, 130)));
        assert!(!is_green(pages[1].image.get_pixel(20, 50)));
    }

    #[test]
    #[traced_test]
    fn broken_page_is_skipped() {
        let images = vec![ImageSource::Bytes(b"nope".to_vec()), page_source(50, 100)];
        let pages = render_marked_pages(&[], &images, &config());
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].index, 1);
        assert!(logs_contain("skipping page that failed to load"));
    }

    #[test]
    #[traced_test]
    fn missing_font_still_renders_tags() {
        let images = vec![page_source(100, 100)];
        let items = vec![item("1", Verdict::Incorrect, BoundingBox::new(0.1, 0.1, 0.3, 0.3, 0))];
        let config = RenderConfig {
            font_path: Some(PathBuf::from("/nonexistent/font.ttf")),
            ..config()
        };
        let pages = render_marked_pages(&items, &images, &config);
        assert_eq!(pages.len(), 1);
        assert!(logs_contain("tag_text=false"));
    }
}
