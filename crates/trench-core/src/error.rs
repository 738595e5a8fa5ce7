use std::path::PathBuf;

use crate::model::Authority;

#[derive(Debug, thiserror::Error)]
pub enum TrenchError {
    #[error("document is not a readable PDF: {0}")]
    DocumentUnreadable(String),

    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    #[error("{tool} not found on PATH")]
    ToolNotFound { tool: String },

    #[error("{tool} failed with exit code {code}: {stderr}")]
    ToolFailed {
        tool: String,
        code: i32,
        stderr: String,
    },

    #[error("unknown authority '{0}'. Known: KDMC, MBMC, MCGM, MIDC Type 1, MIDC Type 2, NMMC")]
    UnknownAuthority(String),

    #[error("parser for {0} is not yet supported")]
    UnsupportedAuthority(Authority),

    #[error("invalid field schema: {0}")]
    SchemaInvalid(String),

    #[error("failed to load profile from {path}: {reason}")]
    ProfileLoad { path: PathBuf, reason: String },

    #[error("failed to write spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("image processing failed: {0}")]
    Image(String),

    #[error("preview {0} not found or expired")]
    PreviewNotFound(uuid::Uuid),

    #[error("PO lookup failed: {0}")]
    Lookup(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rust_xlsxwriter::XlsxError> for TrenchError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        TrenchError::Spreadsheet(e.to_string())
    }
}

impl From<image::ImageError> for TrenchError {
    fn from(e: image::ImageError) -> Self {
        TrenchError::Image(e.to_string())
    }
}
