use std::sync::Arc;

use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::crop::{crop_to_png, CropPolicy};
use crate::error::MarkError;
use crate::grading::GradedItem;
use crate::source::ImageSource;

/// A reviewable question with the cropped picture of where it sits on the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionGraphic {
    pub section: String,
    pub question_number: String,
    pub question: String,
    pub correct_answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// PNG data URL.
    pub question_graphic: String,
}

/// An item that had a box and an answer but could not be cropped.
///
/// Items on the same undecodable page share one load error.
#[derive(Debug)]
pub struct SkippedQuestion {
    pub question_number: String,
    pub error: Arc<MarkError>,
}

#[derive(Debug, Default)]
pub struct QuestionBank {
    pub entries: Vec<QuestionGraphic>,
    pub skipped: Vec<SkippedQuestion>,
}

/// Pages decoded on first use and kept for the rest of the build.
struct PageCache<'a> {
    sources: &'a [ImageSource],
    pages: Vec<Option<Result<DynamicImage, Arc<MarkError>>>>,
}

impl<'a> PageCache<'a> {
    fn new(sources: &'a [ImageSource]) -> Self {
        Self {
            sources,
            pages: sources.iter().map(|_| None).collect(),
        }
    }

    fn page(&mut self, index: usize) -> Result<&DynamicImage, Arc<MarkError>> {
        let count = self.sources.len();
        let (Some(source), Some(slot)) = (self.sources.get(index), self.pages.get_mut(index)) else {
            return Err(Arc::new(MarkError::ImageIndexOutOfRange { index, count }));
        };
        if slot.is_none() {
            debug!(page = index, "decoding page for question bank");
        }
        slot.get_or_insert_with(|| source.load().map_err(Arc::new))
            .as_ref()
            .map_err(Arc::clone)
    }
}

/// Crop a graphic for every item that has both a bounding box and a correct
/// answer. Each page is decoded at most once. Each item is processed on its
/// own: a failure is logged, recorded in `skipped`, and the remaining items
/// continue.
pub fn build_question_bank(
    items: &[GradedItem],
    images: &[ImageSource],
    policy: &CropPolicy,
) -> QuestionBank {
    let mut bank = QuestionBank::default();
    let mut pages = PageCache::new(images);

    for item in items {
        let (Some(bbox), Some(answer)) = (&item.bounding_box, &item.correct_answer) else {
            continue;
        };

        let graphic = pages
            .page(bbox.image_index)
            .and_then(|page| crop_to_png(page, bbox.rect, policy).map_err(Arc::new));

        match graphic {
            Ok(encoded) => bank.entries.push(QuestionGraphic {
                section: item.section.clone(),
                question_number: item.question_number.clone(),
                question: item.question.clone(),
                correct_answer: answer.clone(),
                explanation: item.explanation.clone(),
                question_graphic: encoded.to_data_url(),
            }),
            Err(error) => {
                warn!(
                    question = %item.question_number,
                    image_index = bbox.image_index,
                    %error,
                    "could not generate graphic for question"
                );
                bank.skipped.push(SkippedQuestion {
                    question_number: item.question_number.clone(),
                    error,
                });
            }
        }
    }

    info!(
        generated = bank.entries.len(),
        skipped = bank.skipped.len(),
        "question bank built"
    );
    bank
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgba, RgbaImage};
    use tracing_test::traced_test;

    use super::*;
    use crate::grading::{BoundingBox, QuestionType, Verdict};
    use crate::source::EncodedImage;

    fn page_source(w: u32, h: u32) -> ImageSource {
        let image =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([200, 200, 200, 255])));
        ImageSource::Bytes(EncodedImage::png(&image).unwrap().bytes)
    }

    fn item(number: &str, answer: Option<&str>, bbox: Option<BoundingBox>) -> GradedItem {
        GradedItem {
            section: "A".into(),
            question_number: number.into(),
            question: format!("question {number}"),
            question_type: QuestionType::ShortAnswer,
            choices: Vec::new(),
            student_answer: "x".into(),
            verdict: Verdict::Incorrect,
            correct_answer: answer.map(str::to_string),
            explanation: None,
            bounding_box: bbox,
            reported_box: None,
        }
    }

    #[test]
    #[traced_test]
    fn failures_do_not_abort_siblings() {
        let images = vec![page_source(100, 100), ImageSource::Bytes(b"broken".to_vec())];
        let items = vec![
            item("1", Some("4"), Some(BoundingBox::new(0.1, 0.1, 0.2, 0.2, 0))),
            item("2", Some("7"), Some(BoundingBox::new(0.1, 0.1, 0.2, 0.2, 1))),
            item("3", Some("9"), Some(BoundingBox::new(1.5, 0.1, 0.1, 0.1, 0))),
            item("4", Some("2"), Some(BoundingBox::new(0.5, 0.5, 0.1, 0.1, 5))),
            item("5", Some("1"), Some(BoundingBox::new(0.5, 0.5, 0.0, 0.0, 0))),
        ];

        let bank = build_question_bank(&items, &images, &CropPolicy::default());

        let generated: Vec<_> = bank.entries.iter().map(|e| e.question_number.as_str()).collect();
        assert_eq!(generated, vec!["1", "5"]);

        let skipped: Vec<_> = bank.skipped.iter().map(|s| s.question_number.as_str()).collect();
        assert_eq!(skipped, vec!["2", "3", "4"]);
        assert!(bank.skipped[0].error.is_load_failure());
        assert!(matches!(*bank.skipped[1].error, MarkError::InvalidCropRegion { .. }));
        assert!(matches!(
            *bank.skipped[2].error,
            MarkError::ImageIndexOutOfRange { index: 5, count: 2 }
        ));
        assert!(logs_contain("could not generate graphic for question"));
    }

    #[test]
    fn items_without_box_or_answer_are_ignored() {
        let images = vec![page_source(40, 40)];
        let items = vec![
            item("1", None, Some(BoundingBox::new(0.1, 0.1, 0.2, 0.2, 0))),
            item("2", Some("b"), None),
        ];
        let bank = build_question_bank(&items, &images, &CropPolicy::default());
        assert!(bank.entries.is_empty());
        assert!(bank.skipped.is_empty());
    }

    #[test]
    fn graphic_is_png_data_url() {
        let images = vec![page_source(100, 50)];
        let items = vec![item("1", Some("4"), Some(BoundingBox::new(0.2, 0.2, 0.2, 0.2, 0)))];
        let bank = build_question_bank(&items, &images, &CropPolicy::default());
        assert_eq!(bank.entries.len(), 1);
        assert!(bank.entries[0].question_graphic.starts_with("data:image/png;base64,"));

        let json = serde_json::to_value(&bank.entries[0]).unwrap();
        assert_eq!(json["questionNumber"], "1");
        assert_eq!(json["correctAnswer"], "4");
        assert!(json.get("explanation").is_none());
    }

    #[test]
    #[traced_test]
    fn each_page_is_decoded_once() {
        let images = vec![page_source(100, 100), ImageSource::Bytes(b"broken".to_vec())];
        let items = vec![
            item("1", Some("4"), Some(BoundingBox::new(0.1, 0.1, 0.2, 0.2, 0))),
            item("2", Some("7"), Some(BoundingBox::new(0.5, 0.5, 0.2, 0.2, 0))),
            item("3", Some("9"), Some(BoundingBox::new(0.1, 0.1, 0.2, 0.2, 1))),
            item("4", Some("2"), Some(BoundingBox::new(0.6, 0.6, 0.2, 0.2, 1))),
        ];

        let bank = build_question_bank(&items, &images, &CropPolicy::default());

        let generated: Vec<_> = bank.entries.iter().map(|e| e.question_number.as_str()).collect();
        assert_eq!(generated, vec!["1", "2"]);
        assert_eq!(bank.skipped.len(), 2);
        assert!(bank.skipped.iter().all(|s| s.error.is_load_failure()));
        assert!(Arc::ptr_eq(&bank.skipped[0].error, &bank.skipped[1].error));

        logs_assert(|lines: &[&str]| {
            let decodes = lines
                .iter()
                .filter(|line| line.contains("decoding page for question bank"))
                .count();
            let failures = lines
                .iter()
                .filter(|line| line.contains("failed to decode image"))
                .count();
            match (decodes, failures) {
                (2, 1) => Ok(()),
                other => Err(format!("expected 2 decodes and 1 failure, got {other:?}")),
            }
        });
    }
}
