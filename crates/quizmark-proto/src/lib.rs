/// Persisted quiz session messages.
///
/// Field tags are stable; append new fields with fresh tags only.
pub mod proto {
    /// A bounding box exactly as returned by the grading model, before any
    /// clamping. The page index is a double because the model's JSON
    /// number is stored unchanged.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct BoundingBox {
        #[prost(double, tag = "1")]
        pub x: f64,
        #[prost(double, tag = "2")]
        pub y: f64,
        #[prost(double, tag = "3")]
        pub width: f64,
        #[prost(double, tag = "4")]
        pub height: f64,
        #[prost(double, tag = "5")]
        pub image_index: f64,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
    #[repr(i32)]
    pub enum QuestionType {
        MultipleChoice = 0,
        FillInTheBlank = 1,
        ShortAnswer = 2,
    }

    /// A graded question plus its review bookkeeping.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct ReviewQuestion {
        #[prost(string, tag = "1")]
        pub id: String,
        #[prost(string, tag = "2")]
        pub section: String,
        #[prost(string, tag = "3")]
        pub question_number: String,
        #[prost(string, tag = "4")]
        pub question: String,
        #[prost(enumeration = "QuestionType", tag = "5")]
        pub question_type: i32,
        #[prost(string, repeated, tag = "6")]
        pub choices: Vec<String>,
        #[prost(string, tag = "7")]
        pub student_answer: String,
        #[prost(bool, tag = "8")]
        pub is_correct: bool,
        #[prost(string, optional, tag = "9")]
        pub correct_answer: Option<String>,
        #[prost(string, optional, tag = "10")]
        pub explanation: Option<String>,
        #[prost(message, optional, tag = "11")]
        pub bounding_box: Option<BoundingBox>,
        #[prost(bool, tag = "12")]
        pub is_solved: bool,
        #[prost(uint32, tag = "13")]
        pub reanswer_attempts: u32,
    }

    /// One graded quiz together with the page images it was graded from.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct QuizSession {
        /// Seconds since the Unix epoch.
        #[prost(int64, tag = "1")]
        pub timestamp: i64,
        #[prost(message, repeated, tag = "2")]
        pub questions: Vec<ReviewQuestion>,
        #[prost(string, repeated, tag = "3")]
        pub image_paths: Vec<String>,
        #[prost(uint32, tag = "4")]
        pub score: u32,
        #[prost(uint32, tag = "5")]
        pub total_questions: u32,
        #[prost(string, optional, tag = "6")]
        pub model: Option<String>,
    }
}
