//! Document bytes handed to the extractor, with the MIME type they were read as.

use scanner_core::{ReadError, ScanSource};
use std::path::Path;

/// Extensions accepted by the scanner and the MIME type sent for each.
const ACCEPTED: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("pdf", "application/pdf"),
];

/// Images of any kind and PDFs.
pub fn is_accepted_mime(mime: &str) -> bool {
    let mime = mime.trim().to_ascii_lowercase();
    mime.starts_with("image/") || mime == "application/pdf"
}

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    ACCEPTED
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPayload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DocumentPayload {
    pub fn new(file_name: &str, mime_type: &str, bytes: Vec<u8>) -> Result<Self, ReadError> {
        if !is_accepted_mime(mime_type) {
            return Err(ReadError::UnsupportedType(mime_type.to_string()));
        }
        if bytes.is_empty() {
            return Err(ReadError::Empty);
        }
        Ok(Self {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            bytes,
        })
    }

    /// Read a statement file, inferring the MIME type from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        let path = path.as_ref();
        let mime = mime_for_path(path)
            .ok_or_else(|| ReadError::UnsupportedType(path.display().to_string()))?;
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(&file_name, mime, bytes)
    }

    pub fn source(&self) -> ScanSource {
        ScanSource {
            file_name: self.file_name.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}
