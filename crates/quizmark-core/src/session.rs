//! Conversion between graded results and the persisted `QuizSession`
//! protobuf.

use std::path::PathBuf;

use prost::Message;
use tracing::{info, warn};

use quizmark_proto::proto;

use crate::error::Result;
use crate::grading::{
    validate_item, BoundingBox, GradedItem, GradingResult, QuestionType, RawBoundingBox,
    RawGradedQuestion, Verdict,
};
use crate::source::ImageSource;

/// Build a session record for a freshly graded quiz. Question ids are
/// `"<timestamp>-<index>"`. Boxes are stored as the model reported them;
/// validation runs again on read.
pub fn build_session(
    result: &GradingResult,
    image_paths: &[String],
    timestamp: i64,
) -> proto::QuizSession {
    let questions = result
        .questions
        .iter()
        .enumerate()
        .map(|(i, item)| review_question(format!("{timestamp}-{i}"), item))
        .collect();

    proto::QuizSession {
        timestamp,
        questions,
        image_paths: image_paths.to_vec(),
        score: result.score,
        total_questions: result.total_questions,
        model: result.model.clone(),
    }
}

fn review_question(id: String, item: &GradedItem) -> proto::ReviewQuestion {
    let question_type = match item.question_type {
        QuestionType::MultipleChoice => proto::QuestionType::MultipleChoice,
        QuestionType::FillInTheBlank => proto::QuestionType::FillInTheBlank,
        QuestionType::ShortAnswer => proto::QuestionType::ShortAnswer,
    };

    proto::ReviewQuestion {
        id,
        section: item.section.clone(),
        question_number: item.question_number.clone(),
        question: item.question.clone(),
        question_type: question_type as i32,
        choices: item.choices.clone(),
        student_answer: item.student_answer.clone(),
        is_correct: item.verdict == Verdict::Correct,
        correct_answer: item.correct_answer.clone(),
        explanation: item.explanation.clone(),
        bounding_box: item
            .reported_box
            .or(item.bounding_box.map(BoundingBox::to_raw))
            .map(|b| proto::BoundingBox {
                x: b.x,
                y: b.y,
                width: b.width,
                height: b.height,
                image_index: b.image_index,
            }),
        is_solved: false,
        reanswer_attempts: 0,
    }
}

/// Serialize as a single length-delimited message.
pub fn encode_session(session: &proto::QuizSession) -> Vec<u8> {
    session.encode_length_delimited_to_vec()
}

pub fn decode_session(bytes: &[u8]) -> Result<proto::QuizSession> {
    let session = proto::QuizSession::decode_length_delimited(bytes)?;
    info!(
        timestamp = session.timestamp,
        questions = session.questions.len(),
        images = session.image_paths.len(),
        "decoded quiz session"
    );
    Ok(session)
}

/// Graded items for re-display. Stored boxes pass through the same
/// validation as fresh model output, so a session whose image list no
/// longer matches its boxes loses those boxes rather than failing.
pub fn session_items(session: &proto::QuizSession) -> Vec<GradedItem> {
    let image_count = session.image_paths.len();
    session
        .questions
        .iter()
        .map(|q| validate_item(raw_question(q), image_count))
        .collect()
}

fn raw_question(q: &proto::ReviewQuestion) -> RawGradedQuestion {
    let question_type = match proto::QuestionType::try_from(q.question_type) {
        Ok(proto::QuestionType::MultipleChoice) => QuestionType::MultipleChoice,
        Ok(proto::QuestionType::FillInTheBlank) => QuestionType::FillInTheBlank,
        Ok(proto::QuestionType::ShortAnswer) => QuestionType::ShortAnswer,
        Err(_) => {
            warn!(
                id = %q.id,
                value = q.question_type,
                "unknown question type, treating as short answer"
            );
            QuestionType::ShortAnswer
        }
    }
    .as_wire()
    .to_string();

    RawGradedQuestion {
        section: q.section.clone(),
        question_number: q.question_number.clone(),
        question: q.question.clone(),
        question_type,
        choices: Some(q.choices.clone()),
        student_answer: q.student_answer.clone(),
        is_correct: q.is_correct,
        correct_answer: q.correct_answer.clone(),
        explanation: q.explanation.clone(),
        bounding_box: q.bounding_box.as_ref().map(|b| RawBoundingBox {
            x: b.x,
            y: b.y,
            width: b.width,
            height: b.height,
            image_index: b.image_index,
        }),
    }
}

pub fn session_images(session: &proto::QuizSession) -> Vec<ImageSource> {
    session
        .image_paths
        .iter()
        .map(|p| ImageSource::Path(PathBuf::from(p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    fn item(number: &str, verdict: Verdict, bbox: Option<BoundingBox>) -> GradedItem {
        GradedItem {
            section: "Part A".into(),
            question_number: number.into(),
            question: format!("Question {number}"),
            question_type: QuestionType::FillInTheBlank,
            choices: Vec::new(),
            student_answer: "x".into(),
            verdict,
            correct_answer: Some("y".into()),
            explanation: None,
            bounding_box: bbox,
            reported_box: bbox.map(BoundingBox::to_raw),
        }
    }

    fn result() -> GradingResult {
        GradingResult {
            questions: vec![
                item("1", Verdict::Correct, Some(BoundingBox::new(0.1, 0.2, 0.3, 0.05, 0))),
                item("2", Verdict::Incorrect, Some(BoundingBox::new(0.4, 0.5, 0.0, 0.0, 1))),
                item("3", Verdict::Incorrect, None),
            ],
            score: 1,
            total_questions: 3,
            model: Some("grader".into()),
        }
    }

    fn paths() -> Vec<String> {
        vec!["a.jpg".into(), "b.jpg".into()]
    }

    #[test]
    fn session_records_every_question() {
        let session = build_session(&result(), &paths(), 1_700_000_000);
        assert_eq!(session.questions.len(), 3);
        assert_eq!(session.questions[1].id, "1700000000-1");
        assert!(session.questions[0].is_correct);
        assert!(!session.questions[0].is_solved);
        assert_eq!(
            session.questions[0].question_type,
            proto::QuestionType::FillInTheBlank as i32
        );
        assert_eq!(session.score, 1);
        assert_eq!(session.model.as_deref(), Some("grader"));
    }

    #[test]
    fn boxes_are_stored_verbatim() {
        let session = build_session(&result(), &paths(), 0);
        let stored = session.questions[1].bounding_box.as_ref().unwrap();
        assert_eq!((stored.x, stored.y, stored.width, stored.height), (0.4, 0.5, 0.0, 0.0));
        assert_eq!(stored.image_index, 1.0);
        assert!(session.questions[2].bounding_box.is_none());
    }

    #[test]
    fn reported_box_is_stored_unclamped_and_clamped_on_read() {
        let json = r#"{
            "questions": [
                { "questionNumber": "1", "questionType": "short-answer", "isCorrect": false,
                  "boundingBox": { "x": 0.95, "y": 0.1, "width": 0.2, "height": 0.1,
                                   "imageIndex": 0 } }
            ],
            "score": 0,
            "totalQuestions": 1
        }"#;
        let result = GradingResult::from_json(json, 1).unwrap();
        let session = build_session(&result, &["a.jpg".to_string()], 0);
        let stored = session.questions[0].bounding_box.as_ref().unwrap();
        assert_eq!((stored.x, stored.width), (0.95, 0.2));

        let items = session_items(&decode_session(&encode_session(&session)).unwrap());
        let b = items[0].bounding_box.unwrap();
        assert_eq!(b.rect.x, 0.95);
        assert!((b.rect.w - 0.05).abs() < 1e-12);
    }

    #[test]
    fn encoded_session_reads_back_as_same_items() {
        let original = result();
        let bytes = encode_session(&build_session(&original, &paths(), 42));
        let decoded = decode_session(&bytes).unwrap();
        assert_eq!(decoded.timestamp, 42);
        assert_eq!(session_items(&decoded), original.questions);
        assert_eq!(
            session_images(&decoded),
            vec![ImageSource::Path("a.jpg".into()), ImageSource::Path("b.jpg".into())]
        );
    }

    #[test]
    fn truncated_bytes_fail_to_decode() {
        let bytes = encode_session(&build_session(&result(), &paths(), 42));
        let err = decode_session(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(!err.is_load_failure());
    }

    #[test]
    #[traced_test]
    fn boxes_past_the_image_list_are_dropped() {
        let mut session = build_session(&result(), &paths(), 0);
        session.image_paths.truncate(1);
        let items = session_items(&session);
        assert!(items[0].bounding_box.is_some());
        assert!(items[1].bounding_box.is_none());
        assert!(logs_contain("out-of-range image index"));
    }
}
