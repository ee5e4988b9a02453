use std::path::PathBuf;
use thiserror::Error;

/// Image axis a geometry search ran along
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Columns,
    Rows,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Columns => write!(f, "column"),
            Axis::Rows => write!(f, "row"),
        }
    }
}

/// Errors that abort processing of a screenshot or a command
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("panel geometry not found: {axis} profile has {found} qualifying edge peaks, need {needed}")]
    GeometryNotFound { axis: Axis, found: usize, needed: usize },

    #[error("reference library is empty")]
    EmptyReferenceLibrary,

    #[error("duplicate reference identifier: {0}")]
    DuplicateReference(String),

    #[error("row template not found: {0:?}")]
    MissingRowTemplate(PathBuf),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("OCR engine error: {0}")]
    Ocr(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("table format error at line {line}: {message}")]
    Table { line: usize, message: String },

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReaderError>;
