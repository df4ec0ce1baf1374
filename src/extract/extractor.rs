//! Text extraction using pdftotext, with Tesseract OCR for scanned PDFs.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::{debug, warn};

use super::sections::{split_sections, Excerpt, PdfMetadata};
use super::ExtractionError;
use crate::config::ExtractionConfig;

/// Handle command output, extracting stdout on success or returning appropriate error.
fn handle_cmd_output(
    result: std::io::Result<std::process::Output>,
    tool_name: &str,
    error_prefix: &str,
) -> Result<String, ExtractionError> {
    match result {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(ExtractionError::ExtractionFailed(format!(
                    "{}: {}",
                    error_prefix,
                    stderr.trim()
                )))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractionError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(ExtractionError::Io(e)),
    }
}

/// Method used to extract text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// PDF text layer.
    PdfToText,
    /// OCR of rendered pages.
    TesseractOcr,
    /// Plain text file read directly.
    PlainText,
}

/// Raw text of one document.
#[derive(Debug)]
pub struct ExtractionResult {
    pub text: String,
    pub method: ExtractionMethod,
    pub metadata: PdfMetadata,
}

/// Text extractor that shells out to poppler and Tesseract.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    max_pages: u32,
    min_text_chars: usize,
    ocr: bool,
    ocr_language: String,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl TextExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            max_pages: config.max_pages.max(1),
            min_text_chars: config.min_text_chars,
            ocr: config.ocr,
            ocr_language: config.ocr_language.clone(),
        }
    }

    /// Extract and split a document, never failing: problems are logged and
    /// produce an empty excerpt.
    pub fn excerpt(&self, file_path: &Path) -> Excerpt {
        let file_name = file_name(file_path);
        match self.extract(file_path) {
            Ok(result) => {
                debug!(
                    "{}: {} chars via {:?}",
                    file_name,
                    result.text.chars().count(),
                    result.method
                );
                split_sections(&result.text, &file_name, &result.metadata)
            }
            Err(ExtractionError::UnsupportedFileType(ext)) => {
                debug!("{}: no extractor for .{}", file_name, ext);
                Excerpt::empty(file_name)
            }
            Err(e) => {
                warn!("Failed to extract {}: {}", file_path.display(), e);
                Excerpt::empty(file_name)
            }
        }
    }

    /// Extract raw text from a file based on its extension.
    pub fn extract(&self, file_path: &Path) -> Result<ExtractionResult, ExtractionError> {
        if !file_path.is_file() {
            return Err(ExtractionError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a readable file", file_path.display()),
            )));
        }

        let ext = file_path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => self.extract_pdf(file_path),
            "txt" | "md" => {
                let bytes = std::fs::read(file_path)?;
                Ok(ExtractionResult {
                    text: String::from_utf8_lossy(&bytes).to_string(),
                    method: ExtractionMethod::PlainText,
                    metadata: PdfMetadata::default(),
                })
            }
            _ => Err(ExtractionError::UnsupportedFileType(ext)),
        }
    }

    /// Text layer first; OCR when it is too sparse to classify.
    fn extract_pdf(&self, file_path: &Path) -> Result<ExtractionResult, ExtractionError> {
        let metadata = self.read_metadata(file_path);
        let text = self.run_pdftotext(file_path)?;
        let chars = count_visible(&text);

        if chars >= self.min_text_chars || !self.ocr {
            return Ok(ExtractionResult {
                text,
                method: ExtractionMethod::PdfToText,
                metadata,
            });
        }

        debug!(
            "{}: text layer has {} chars (< {}), trying OCR",
            file_path.display(),
            chars,
            self.min_text_chars
        );
        match self.ocr_pdf(file_path) {
            Ok(ocr_text) if count_visible(&ocr_text) > 0 => Ok(ExtractionResult {
                text: ocr_text,
                method: ExtractionMethod::TesseractOcr,
                metadata,
            }),
            Ok(_) => Ok(ExtractionResult {
                text,
                method: ExtractionMethod::PdfToText,
                metadata,
            }),
            Err(e) => {
                warn!("OCR failed for {}: {}", file_path.display(), e);
                Ok(ExtractionResult {
                    text,
                    method: ExtractionMethod::PdfToText,
                    metadata,
                })
            }
        }
    }

    /// Run pdftotext over the leading pages.
    fn run_pdftotext(&self, file_path: &Path) -> Result<String, ExtractionError> {
        let last = self.max_pages.to_string();
        let output = Command::new("pdftotext")
            .args(["-enc", "UTF-8", "-f", "1", "-l", &last])
            .arg(file_path)
            .arg("-") // Output to stdout
            .output();

        handle_cmd_output(output, "pdftotext (install poppler-utils)", "pdftotext failed")
    }

    /// Title/author/page count from pdfinfo. Missing tool or bad PDF yields defaults.
    fn read_metadata(&self, file_path: &Path) -> PdfMetadata {
        let output = Command::new("pdfinfo")
            .args(["-enc", "UTF-8"])
            .arg(file_path)
            .output();
        match handle_cmd_output(output, "pdfinfo (install poppler-utils)", "pdfinfo failed") {
            Ok(stdout) => PdfMetadata::parse(&stdout),
            Err(e) => {
                debug!("No metadata for {}: {}", file_path.display(), e);
                PdfMetadata::default()
            }
        }
    }

    /// Render the leading pages to PNG and OCR each one.
    fn ocr_pdf(&self, file_path: &Path) -> Result<String, ExtractionError> {
        let temp_dir = TempDir::new()?;
        let temp_path = temp_dir.path();

        let last = self.max_pages.to_string();
        let output = Command::new("pdftoppm")
            .args(["-png", "-r", "200", "-f", "1", "-l", &last])
            .arg(file_path)
            .arg(temp_path.join("page"))
            .output();
        handle_cmd_output(
            output,
            "pdftoppm (install poppler-utils)",
            "pdftoppm failed to convert PDF",
        )?;

        let images = page_images(temp_path)?;
        if images.is_empty() {
            return Err(ExtractionError::ExtractionFailed(
                "No images generated from PDF".to_string(),
            ));
        }

        let mut pages = Vec::with_capacity(images.len());
        for (i, image_path) in images.iter().enumerate() {
            match self.run_tesseract(image_path) {
                Ok(text) => pages.push(text),
                Err(e @ ExtractionError::ToolNotFound(_)) => return Err(e),
                Err(e) => warn!("OCR failed for page {}: {}", i + 1, e),
            }
        }

        Ok(pages.join("\n\n"))
    }

    /// Run Tesseract OCR on an image.
    fn run_tesseract(&self, image_path: &Path) -> Result<String, ExtractionError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.ocr_language])
            .output();

        handle_cmd_output(output, "tesseract (install tesseract-ocr)", "tesseract failed")
    }

    /// Check if required tools are available.
    pub fn check_tools() -> Vec<(String, bool)> {
        ["pdftotext", "pdfinfo", "pdftoppm", "tesseract"]
            .iter()
            .map(|tool| (tool.to_string(), which::which(tool).is_ok()))
            .collect()
    }
}

/// PNGs written by pdftoppm, in page order (page-1.png ... or page-01.png ...).
fn page_images(dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
        .collect();
    images.sort_by_key(|p| page_number(p));
    Ok(images)
}

fn page_number(path: &Path) -> u32 {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.rsplit('-').next())
        .and_then(|n| n.parse().ok())
        .unwrap_or(u32::MAX)
}

fn count_visible(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
