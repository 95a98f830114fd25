pub mod bank;
pub mod crop;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod grading;
pub mod overlay;
pub mod pipeline;
pub mod rect;
pub mod render;
pub mod session;
pub mod source;

pub use error::{MarkError, Result};
