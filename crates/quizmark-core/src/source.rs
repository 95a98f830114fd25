use std::io::Cursor;
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, error};

use crate::error::{MarkError, Result};

/// Where a page image comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Path(PathBuf),
    /// `data:<mime>;base64,<payload>`
    DataUrl(String),
    Bytes(Vec<u8>),
}

impl ImageSource {
    /// Short description for logs and errors. Never includes payload bytes.
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Path(p) => p.display().to_string(),
            ImageSource::DataUrl(url) => {
                let header = url.split(',').next().unwrap_or_default();
                format!("{header},...")
            }
            ImageSource::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }

    /// Read the encoded bytes without decoding them.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        match self {
            ImageSource::Path(p) => std::fs::read(p).map_err(|e| MarkError::ImageRead {
                path: p.display().to_string(),
                source: e,
            }),
            ImageSource::DataUrl(url) => Ok(parse_data_url(url)?.1),
            ImageSource::Bytes(b) => Ok(b.clone()),
        }
    }

    /// Decode the image. Failures are logged here and surfaced as `ImageLoad`.
    pub fn load(&self) -> Result<DynamicImage> {
        let bytes = self.read_bytes().inspect_err(|e| {
            error!(source = %self.describe(), error = %e, "failed to read image");
        })?;
        let image = decode(&bytes).map_err(|e| {
            error!(source = %self.describe(), error = %e, "failed to decode image");
            MarkError::ImageLoad {
                source_desc: self.describe(),
                source: e,
            }
        })?;
        debug!(
            source = %self.describe(),
            width = image.width(),
            height = image.height(),
            "decoded image"
        );
        Ok(image)
    }
}

fn decode(bytes: &[u8]) -> image::ImageResult<DynamicImage> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()
}

/// Split a base64 data URL into its MIME type and payload bytes.
pub fn parse_data_url(url: &str) -> Result<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| MarkError::InvalidDataUrl("missing data: prefix".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| MarkError::InvalidDataUrl("missing payload separator".into()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| MarkError::InvalidDataUrl("only base64 payloads are supported".into()))?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| MarkError::InvalidDataUrl(e.to_string()))?;
    Ok((mime.to_string(), bytes))
}

/// An image encoded into a concrete file format.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

impl EncodedImage {
    /// Encode losslessly as PNG.
    pub fn png(image: &DynamicImage) -> Result<Self> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(MarkError::Encode)?;
        Ok(Self {
            bytes,
            format: ImageFormat::Png,
        })
    }

    pub fn mime(&self) -> &'static str {
        self.format.to_mime_type()
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime(), STANDARD.encode(&self.bytes))
    }

    pub fn decode(&self) -> Result<DynamicImage> {
        image::load_from_memory_with_format(&self.bytes, self.format).map_err(|e| {
            MarkError::ImageLoad {
                source_desc: format!("<encoded {}>", self.mime()),
                source: e,
            }
        })
    }
}
