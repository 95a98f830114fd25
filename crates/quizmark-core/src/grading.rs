//! Graded items as returned by the grading model, and their validation into
//! the strict types the rest of the crate works with.
//!
//! The model's output is untrusted: optional fields may be missing and box
//! coordinates may be out of range. All clamping and rejection happens here,
//! once, so the mapper and cropper can assume finite values and valid page
//! indices.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::rect::NormalizedRect;

/// Whether the student's answer was judged correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Incorrect,
}

impl From<bool> for Verdict {
    fn from(is_correct: bool) -> Self {
        if is_correct {
            Verdict::Correct
        } else {
            Verdict::Incorrect
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    FillInTheBlank,
    ShortAnswer,
}

impl QuestionType {
    /// The kebab-case name the grading model uses.
    pub fn as_wire(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple-choice",
            QuestionType::FillInTheBlank => "fill-in-the-blank",
            QuestionType::ShortAnswer => "short-answer",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "multiple-choice" => Some(QuestionType::MultipleChoice),
            "fill-in-the-blank" => Some(QuestionType::FillInTheBlank),
            "short-answer" => Some(QuestionType::ShortAnswer),
            _ => None,
        }
    }
}

/// Bounding box exactly as the model emitted it. The page index is kept as
/// a JSON number so `1.0` and `-1` reach validation instead of failing the
/// whole response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub image_index: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGradedQuestion {
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub question_number: String,
    #[serde(default)]
    pub question: String,
    /// Unknown names fall back to short answer during validation.
    #[serde(default)]
    pub question_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    #[serde(default)]
    pub student_answer: String,
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<RawBoundingBox>,
}

/// The grading response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGradingResult {
    /// Kept untyped so each question is decoded on its own.
    pub questions: Vec<serde_json::Value>,
    pub score: u32,
    pub total_questions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// A validated normalized box on page `image_index`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub rect: NormalizedRect,
    pub image_index: usize,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64, image_index: usize) -> Self {
        Self {
            rect: NormalizedRect { x, y, w: width, h: height },
            image_index,
        }
    }

    /// The equivalent unvalidated box, for items built without model output.
    pub fn to_raw(self) -> RawBoundingBox {
        RawBoundingBox {
            x: self.rect.x,
            y: self.rect.y,
            width: self.rect.w,
            height: self.rect.h,
            image_index: self.image_index as f64,
        }
    }
}

/// A graded question after boundary validation.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedItem {
    pub section: String,
    pub question_number: String,
    pub question: String,
    pub question_type: QuestionType,
    pub choices: Vec<String>,
    pub student_answer: String,
    pub verdict: Verdict,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub bounding_box: Option<BoundingBox>,
    /// The box exactly as the model reported it, persisted unchanged so a
    /// reload validates against the original values.
    pub reported_box: Option<RawBoundingBox>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradingResult {
    pub questions: Vec<GradedItem>,
    pub score: u32,
    pub total_questions: u32,
    pub model: Option<String>,
}

impl GradingResult {
    /// Parse the model's JSON response and validate it against `image_count`
    /// page images.
    ///
    /// Only a broken envelope is an error. A question that does not match
    /// the expected shape is logged and left out; its siblings are kept.
    pub fn from_json(json: &str, image_count: usize) -> serde_json::Result<Self> {
        let raw: RawGradingResult = serde_json::from_str(json)?;
        Ok(Self::validate(raw, image_count))
    }

    pub fn validate(raw: RawGradingResult, image_count: usize) -> Self {
        let questions = raw
            .questions
            .into_iter()
            .enumerate()
            .filter_map(|(position, value)| match serde_json::from_value(value) {
                Ok(question) => Some(question),
                Err(e) => {
                    warn!(position, error = %e, "dropping malformed graded question");
                    None
                }
            })
            .collect();

        Self {
            questions: validate_items(questions, image_count),
            score: raw.score,
            total_questions: raw.total_questions,
            model: raw.model,
        }
    }
}

pub fn validate_items(raw: Vec<RawGradedQuestion>, image_count: usize) -> Vec<GradedItem> {
    raw.into_iter()
        .map(|q| validate_item(q, image_count))
        .collect()
}

pub fn validate_item(raw: RawGradedQuestion, image_count: usize) -> GradedItem {
    let bounding_box = raw
        .bounding_box
        .and_then(|b| validate_box(&raw.question_number, b, image_count));
    let question_type = question_type(&raw.question_number, &raw.question_type);

    GradedItem {
        section: raw.section,
        question_number: raw.question_number,
        question_type,
        question: raw.question,
        choices: raw.choices.unwrap_or_default(),
        student_answer: raw.student_answer,
        verdict: Verdict::from(raw.is_correct),
        correct_answer: non_blank(raw.correct_answer),
        explanation: non_blank(raw.explanation),
        bounding_box,
        reported_box: raw.bounding_box,
    }
}

fn question_type(question: &str, name: &str) -> QuestionType {
    QuestionType::from_wire(name).unwrap_or_else(|| {
        warn!(question, question_type = name, "unknown question type, treating as short answer");
        QuestionType::ShortAnswer
    })
}

/// Drop boxes that cannot be placed on any page; clamp the rest into the
/// unit square. Zero sizes are kept: the cropper applies its own floor.
fn validate_box(question: &str, raw: RawBoundingBox, image_count: usize) -> Option<BoundingBox> {
    let values = [raw.x, raw.y, raw.width, raw.height, raw.image_index];
    if values.iter().any(|v| !v.is_finite()) {
        warn!(question, ?raw, "dropping bounding box with non-finite coordinates");
        return None;
    }

    if raw.image_index.fract() != 0.0 {
        warn!(
            question,
            image_index = raw.image_index,
            "dropping bounding box with non-integral image index"
        );
        return None;
    }
    if raw.image_index < 0.0 || raw.image_index >= image_count as f64 {
        warn!(
            question,
            image_index = raw.image_index,
            image_count,
            "dropping bounding box with out-of-range image index"
        );
        return None;
    }
    let index = raw.image_index as usize;

    let x = raw.x.clamp(0.0, 1.0);
    let y = raw.y.clamp(0.0, 1.0);
    let w = raw.width.clamp(0.0, 1.0 - x);
    let h = raw.height.clamp(0.0, 1.0 - y);

    if (x, y, w, h) != (raw.x, raw.y, raw.width, raw.height) {
        debug!(
            question,
            raw_x = raw.x,
            raw_y = raw.y,
            raw_w = raw.width,
            raw_h = raw.height,
            x,
            y,
            w,
            h,
            "clamped bounding box into unit square"
        );
    }

    Some(BoundingBox::new(x, y, w, h, index))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
