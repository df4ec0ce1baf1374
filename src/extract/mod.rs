//! Document text extraction.
//!
//! Extracts the leading text of a paper using:
//! - pdftotext (Poppler) for the PDF text layer
//! - pdftoppm + Tesseract OCR when the text layer is too sparse
//! - a direct read for plain text files
//!
//! The raw text is then split heuristically into title, authors,
//! affiliation, journal and abstract to build a compact excerpt.

mod extractor;
mod sections;

use thiserror::Error;

pub use extractor::{ExtractionMethod, ExtractionResult, TextExtractor};
pub use sections::{split_sections, truncate_at_boundary, Excerpt, PdfMetadata};

/// Errors that can occur during text extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
