use thiserror::Error;

/// Errors produced by the marking core.
///
/// Every variant is local to one image or one box: callers processing a
/// batch log the error and continue with the remaining items.
#[derive(Debug, Error)]
pub enum MarkError {
    #[error("failed to load image from {source_desc}")]
    ImageLoad {
        source_desc: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to read image file {path}")]
    ImageRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid data URL: {0}")]
    InvalidDataUrl(String),

    #[error("calculated crop region {width:.1}x{height:.1} is not positive")]
    InvalidCropRegion { width: f64, height: f64 },

    #[error("bounding box references image {index} but only {count} images are available")]
    ImageIndexOutOfRange { index: usize, count: usize },

    #[error("failed to encode image")]
    Encode(#[source] image::ImageError),

    #[error("failed to decode quiz session")]
    SessionDecode(#[from] prost::DecodeError),
}

impl MarkError {
    /// Whether the failure came from decoding or reading the source bitmap.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            MarkError::ImageLoad { .. } | MarkError::ImageRead { .. } | MarkError::InvalidDataUrl(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MarkError>;
