use bytes::Bytes;
use std::path::Path;
use thiserror::Error;

pub const MAX_SINGLE_FILE_BYTES: u64 = 5 * 1024 * 1024;
pub const MAX_TOTAL_FILE_BYTES: u64 = 20 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: [&str; 6] = ["pdf", "docx", "pptx", "jpg", "jpeg", "png"];

/// An uploaded file held in memory until the lesson is submitted.
#[derive(Clone)]
pub struct FileHandle {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, content_type: Option<&str>, bytes: Bytes) -> Self {
        let name = name.into();
        let content_type = content_type
            .filter(|ct| !ct.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| content_type_for(&name).to_string());

        Self {
            name,
            content_type,
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.size())
            .finish()
    }
}

fn content_type_for(name: &str) -> &'static str {
    let extension = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("pptx") => {
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        }
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileRejection {
    #[error("File size exceeds 5MB limit")]
    TooLarge,
    #[error("Total file size exceeds 20MB limit")]
    TotalTooLarge,
    #[error("Invalid file type. Allowed types: pdf, docx, pptx, jpg, jpeg, png")]
    UnsupportedType,
}

/// Check a candidate file against the per-file cap, the running total across
/// the other rows (`others_total`, excluding the row being replaced) and the
/// extension allow-list, in that order.
pub fn validate_file(file: &FileHandle, others_total: u64) -> Result<(), FileRejection> {
    let size = file.size();

    if size > MAX_SINGLE_FILE_BYTES {
        return Err(FileRejection::TooLarge);
    }

    if others_total.saturating_add(size) > MAX_TOTAL_FILE_BYTES {
        return Err(FileRejection::TotalTooLarge);
    }

    match file.extension() {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(FileRejection::UnsupportedType),
    }
}
