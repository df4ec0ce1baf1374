//! CSV snapshot of the domain table.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::Result;
use crate::models::DocumentRecord;

/// Header row of the exported file; matches the table columns.
const CSV_HEADER: &str = "file_path,file_name,domain_cn,domain_en,updated_at";

/// UTF-8 byte order mark so spreadsheet software detects the encoding.
const UTF8_BOM: &str = "\u{feff}";

/// Outcome of an export.
#[derive(Debug, Clone)]
pub struct ExportReport {
    /// Where the file was actually written.
    pub path: PathBuf,
    /// Number of data rows written.
    pub rows: usize,
    /// True when the requested path was not writable and a sibling was used.
    pub used_fallback: bool,
}

/// Write `records` as CSV to `target`.
///
/// If the target exists but cannot be opened for writing (typically because a
/// spreadsheet has it locked), the export goes to `<stem>.new.<ext>` instead.
pub fn write_csv(records: &[DocumentRecord], target: &Path) -> Result<ExportReport> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let contents = render_csv(records);
    match std::fs::write(target, &contents) {
        Ok(()) => Ok(ExportReport {
            path: target.to_path_buf(),
            rows: records.len(),
            used_fallback: false,
        }),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            let alt = fallback_path(target);
            warn!(
                "Cannot write {} ({}), writing {} instead",
                target.display(),
                e,
                alt.display()
            );
            std::fs::write(&alt, &contents)?;
            Ok(ExportReport {
                path: alt,
                rows: records.len(),
                used_fallback: true,
            })
        }
        Err(e) => Err(e.into()),
    }
}

fn render_csv(records: &[DocumentRecord]) -> String {
    let mut out = String::with_capacity(64 * (records.len() + 1));
    out.push_str(UTF8_BOM);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for rec in records {
        let fields = [
            escape_csv(&rec.file_path),
            escape_csv(&rec.file_name),
            escape_csv(&rec.domain_cn),
            escape_csv(&rec.domain_en),
            rec.updated_at.to_rfc3339(),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn fallback_path(target: &Path) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "export".to_string());
    let name = match target.extension() {
        Some(ext) => format!("{}.new.{}", stem, ext.to_string_lossy()),
        None => format!("{}.new", stem),
    };
    target.with_file_name(name)
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
