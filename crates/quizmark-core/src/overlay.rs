//! Page-at-a-time overlay state for marked quiz pages.
//!
//! The view owns navigation and layout state only. Image decoding happens
//! elsewhere and reports back through [`OverlayView::image_loaded`] with the
//! [`LoadTicket`] it was issued; a ticket issued before a page change or a
//! later load request is stale and its result is dropped.

use tracing::debug;

use crate::geometry::{
    compute_contain_geometry, normalized_to_container_pixels, RenderedGeometry, Size,
};
use crate::grading::{GradedItem, Verdict};
use crate::rect::ScreenRect;

/// Horizontal position of feedback labels, as a fraction of the rendered
/// image width measured from its left edge.
const FEEDBACK_LEFT: f64 = 1.02;

/// Correct-answer tag shown beside an incorrectly answered box.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackLabel {
    pub text: String,
    /// Container x of the label's left edge.
    pub left: f64,
    /// Container y the label is vertically centred on.
    pub center_y: f64,
}

/// One box to draw on the current page.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub question_number: String,
    pub rect: ScreenRect,
    pub verdict: Verdict,
    pub feedback: Option<FeedbackLabel>,
}

/// Issued when a page image starts loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    page: usize,
    generation: u64,
}

impl LoadTicket {
    pub fn page(&self) -> usize {
        self.page
    }
}

pub struct OverlayView {
    page_count: usize,
    items: Vec<GradedItem>,
    current: usize,
    generation: u64,
    container: Option<Size>,
    natural: Option<Size>,
    geometry: Option<RenderedGeometry>,
}

impl OverlayView {
    pub fn new(page_count: usize, items: Vec<GradedItem>) -> Self {
        Self {
            page_count,
            items,
            current: 0,
            generation: 0,
            container: None,
            natural: None,
            geometry: None,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Navigation controls are only offered for multi-page documents.
    pub fn has_navigation(&self) -> bool {
        self.page_count > 1
    }

    /// 1-based "current/total" caption, for multi-page documents only.
    pub fn page_label(&self) -> Option<String> {
        self.has_navigation()
            .then(|| format!("{}/{}", self.current + 1, self.page_count))
    }

    pub fn next(&mut self) {
        if !self.has_navigation() {
            return;
        }
        let target = if self.current + 1 == self.page_count { 0 } else { self.current + 1 };
        self.go_to(target);
    }

    pub fn previous(&mut self) {
        if !self.has_navigation() {
            return;
        }
        let target = if self.current == 0 { self.page_count - 1 } else { self.current - 1 };
        self.go_to(target);
    }

    fn go_to(&mut self, page: usize) {
        debug!(from = self.current, to = page, "changing page");
        self.current = page;
        self.generation += 1;
        // The previous page's natural size no longer applies; overlays stay
        // hidden until the new page reports in.
        self.natural = None;
        self.geometry = None;
    }

    /// Start loading the current page. Any earlier ticket becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket {
            page: self.current,
            generation: self.generation,
        }
    }

    /// Report a finished decode. Returns `false` if the ticket was superseded
    /// and the result was ignored.
    pub fn image_loaded(&mut self, ticket: LoadTicket, natural: Size) -> bool {
        if ticket.generation != self.generation || ticket.page != self.current {
            debug!(
                ticket_page = ticket.page,
                current_page = self.current,
                "discarding stale image load"
            );
            return false;
        }
        self.natural = Some(natural);
        self.recompute();
        true
    }

    /// Report a new container size.
    pub fn resize(&mut self, container: Size) {
        self.container = Some(container);
        self.recompute();
    }

    fn recompute(&mut self) {
        self.geometry = match (self.natural, self.container) {
            (Some(natural), Some(container)) => compute_contain_geometry(natural, container),
            _ => None,
        };
        if let Some(g) = &self.geometry {
            debug!(
                page = self.current,
                rendered_width = g.rendered_width,
                rendered_height = g.rendered_height,
                offset_x = g.offset_x,
                offset_y = g.offset_y,
                "overlay geometry updated"
            );
        }
    }

    /// Current geometry, or `None` in the no-render state.
    pub fn geometry(&self) -> Option<&RenderedGeometry> {
        self.geometry.as_ref()
    }

    pub fn items_on_current_page(&self) -> impl Iterator<Item = &GradedItem> {
        let page = self.current;
        self.items
            .iter()
            .filter(move |q| q.bounding_box.is_some_and(|b| b.image_index == page))
    }

    /// Overlays for every box on the current page. Empty until both the
    /// page image and the container size are known.
    pub fn overlays(&self) -> Vec<Overlay> {
        let Some(geometry) = &self.geometry else {
            return Vec::new();
        };

        self.items_on_current_page()
            .filter_map(|item| {
                let bbox = item.bounding_box?;
                let rect = normalized_to_container_pixels(bbox.rect, geometry);
                let feedback = match (item.verdict, &item.correct_answer) {
                    (Verdict::Incorrect, Some(answer)) => Some(FeedbackLabel {
                        text: answer.clone(),
                        left: geometry.offset_x + geometry.rendered_width * FEEDBACK_LEFT,
                        center_y: geometry.offset_y
                            + bbox.rect.center_y() * geometry.rendered_height,
                    }),
                    _ => None,
                };
                Some(Overlay {
                    question_number: item.question_number.clone(),
                    rect,
                    verdict: item.verdict,
                    feedback,
                })
            })
            .collect()
    }
}
