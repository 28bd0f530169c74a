// Error taxonomy for the extraction pipeline

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the extraction components.
///
/// Per-ROI and per-page variants are caught by the orchestrator and turned
/// into skipped units; only document-level failures surface to the batch.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unreadable image: {0}")]
    UnreadableImage(String),

    #[error("OCR backend failed: {0}")]
    OcrBackend(String),

    #[error("no qualifying region: {0}")]
    NoRegion(String),

    #[error("text parse failed in stage '{stage}': {message}")]
    TextParse { stage: &'static str, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("PDF error for {path}: {message}")]
    Pdf { path: PathBuf, message: String },

    #[error("export failed: {0}")]
    Export(String),

    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn parse(stage: &'static str, message: impl Into<String>) -> Self {
        Self::TextParse {
            stage,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
