use crate::error::PayloadError;
use base64::{Engine, engine::general_purpose::STANDARD};
use std::path::Path;

/// Raw image bytes with their MIME type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Result<Self, PayloadError> {
        let mime_type = mime_type.into();
        if !is_image(&mime_type) {
            return Err(PayloadError::NotAnImage(mime_type));
        }
        Ok(Self { bytes, mime_type })
    }

    /// Reads an image file, labelling it by extension.
    pub fn from_path(path: &Path) -> Result<Self, PayloadError> {
        let mime_type = detect_mime_type(path);
        if !is_image(mime_type) {
            return Err(PayloadError::NotAnImage(path.display().to_string()));
        }
        let bytes = std::fs::read(path).map_err(|source| PayloadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            bytes,
            mime_type: mime_type.to_string(),
        })
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// Parses a `data:<mime>;base64,<data>` URL.
    pub fn from_data_url(url: &str) -> Result<Self, PayloadError> {
        let rest = url.strip_prefix("data:").ok_or(PayloadError::MalformedDataUrl)?;
        let (mime_type, data) = rest
            .split_once(";base64,")
            .ok_or(PayloadError::MalformedDataUrl)?;
        let bytes = STANDARD
            .decode(data)
            .map_err(|_| PayloadError::MalformedDataUrl)?;
        Self::new(bytes, mime_type)
    }
}

/// Detect an image MIME type by file extension.
pub fn detect_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "avif" => "image/avif",
        "tiff" | "tif" => "image/tiff",
        _ => "application/octet-stream",
    }
}

pub fn is_image(mime: &str) -> bool {
    mime.starts_with("image/")
}
