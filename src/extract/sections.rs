//! Heuristic split of a paper's leading text into title, authors,
//! affiliation, journal and abstract.

use std::sync::LazyLock;

use regex::Regex;

const TITLE_MAX_CHARS: usize = 200;
const AUTHOR_MAX_CHARS: usize = 200;
const AFFILIATION_MAX_CHARS: usize = 300;
const JOURNAL_MAX_CHARS: usize = 200;
const ABSTRACT_MAX_CHARS: usize = 600;

/// Text considered when no abstract marker is found.
const HEADER_BLOCK_CHARS: usize = 800;
/// Window after the abstract marker searched for its end.
const ABSTRACT_WINDOW_CHARS: usize = 2000;
/// Lines of the header block sorted into authors/affiliation/journal.
const HEADER_MAX_LINES: usize = 20;

static ABSTRACT_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)abstract|摘要|summary").expect("valid regex"));

static ABSTRACT_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)introduction|keywords|key words|索引|1\. |\n1\.\t").expect("valid regex")
});

const AFFILIATION_KEYWORDS: &[&str] = &[
    "department",
    "university",
    "hospital",
    "school",
    "college",
    "institute",
    "laboratory",
    "lab ",
    "学院",
    "大学",
    "研究所",
    "医院",
    "实验室",
];

const JOURNAL_MARKERS: &[&str] = &[
    "journal",
    "proceedings",
    "vol.",
    "doi:",
    "doi.org",
    "issn",
    "学报",
    "期刊",
];

/// Title and author reported by `pdfinfo`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
}

impl PdfMetadata {
    /// Parse `pdfinfo` output (`Key:   value` lines).
    pub fn parse(output: &str) -> Self {
        let mut meta = Self::default();
        for line in output.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "Title" => meta.title = Some(value.to_string()),
                "Author" => meta.author = Some(value.to_string()),
                _ => {}
            }
        }
        meta
    }
}

/// Structured excerpt of one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Excerpt {
    pub file_name: String,
    pub title: Option<String>,
    pub authors: Option<String>,
    pub affiliation: Option<String>,
    pub journal: Option<String>,
    pub abstract_text: Option<String>,
    /// Leading body text, only when no abstract was found.
    pub body: Option<String>,
}

impl Excerpt {
    /// Excerpt carrying nothing but the file name.
    pub fn empty(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Default::default()
        }
    }

    /// True when no section was recovered.
    pub fn is_empty(&self) -> bool {
        self.sections().next().is_none()
    }

    /// Title for display and keyword matching, falling back to the file name.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.file_name)
    }

    fn sections(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("【标题】", &self.title),
            ("【作者】", &self.authors),
            ("【研究团队/机构】", &self.affiliation),
            ("【期刊】", &self.journal),
            ("【摘要】", &self.abstract_text),
            ("【正文】", &self.body),
        ]
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(|v| (label, v))
        })
    }

    /// Render labelled sections into one block of at most `max_chars` characters.
    pub fn render(&self, max_chars: usize) -> String {
        let joined = self
            .sections()
            .map(|(label, value)| format!("{}\n{}", label, value))
            .collect::<Vec<_>>()
            .join("\n\n");
        truncate_at_boundary(&joined, max_chars)
    }
}

/// Split extracted text into an [`Excerpt`].
pub fn split_sections(text: &str, file_name: &str, meta: &PdfMetadata) -> Excerpt {
    let text = text.trim();
    if text.is_empty() {
        return Excerpt::empty(file_name);
    }

    let title_lines = title_lines(text);
    let title = if !title_lines.is_empty() {
        Some(truncate_at_boundary(&title_lines.join(" "), TITLE_MAX_CHARS))
    } else {
        meta.title
            .as_deref()
            .map(|t| truncate_at_boundary(t, TITLE_MAX_CHARS))
            .or_else(|| Some(file_name.to_string()))
    };

    let abstract_span = find_abstract_span(text);
    let abstract_text = abstract_span
        .map(|(start, end)| truncate_at_boundary(&text[start..end], ABSTRACT_MAX_CHARS))
        .filter(|a| !a.is_empty());

    // Everything before the abstract marker, or the first block of text.
    let header_end = match abstract_span {
        Some(_) => ABSTRACT_START.find(text).map(|m| m.start()).unwrap_or(0),
        None => byte_offset(text, HEADER_BLOCK_CHARS),
    };
    let mut header = text[..header_end].to_string();
    for line in &title_lines {
        header = header.replacen(line.as_str(), "", 1);
    }
    let header_lines: Vec<&str> = header
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut author_parts = Vec::new();
    let mut affiliation_parts = Vec::new();
    let mut journal_parts = Vec::new();
    for line in header_lines.iter().take(HEADER_MAX_LINES) {
        let lower = line.to_lowercase();
        if JOURNAL_MARKERS.iter().any(|m| lower.contains(m)) {
            journal_parts.push(*line);
        } else if AFFILIATION_KEYWORDS.iter().any(|k| lower.contains(k))
            || line.chars().count() > 60
        {
            affiliation_parts.push(*line);
        } else {
            author_parts.push(*line);
        }
    }

    let mut authors = non_empty(truncate_at_boundary(
        &author_parts.join("\n"),
        AUTHOR_MAX_CHARS,
    ));
    let affiliation = non_empty(truncate_at_boundary(
        &affiliation_parts.join("\n"),
        AFFILIATION_MAX_CHARS,
    ));
    let journal = non_empty(truncate_at_boundary(
        &journal_parts.join("\n"),
        JOURNAL_MAX_CHARS,
    ));
    if authors.is_none() {
        authors = meta
            .author
            .as_deref()
            .map(|a| truncate_at_boundary(a, AUTHOR_MAX_CHARS))
            .and_then(non_empty);
    }

    let body = match abstract_text {
        Some(_) => None,
        None => non_empty(truncate_at_boundary(&text[header_end..], ABSTRACT_MAX_CHARS)),
    };

    Excerpt {
        file_name: file_name.to_string(),
        title,
        authors,
        affiliation,
        journal,
        abstract_text,
        body,
    }
}

/// Leading lines that look like a title: up to two of the first four
/// non-empty lines, skipping short lines and URLs.
fn title_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, line) in text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(4)
        .enumerate()
    {
        let len = line.chars().count();
        let lower = line.to_lowercase();
        if len > 10 && !lower.starts_with("http") && !lower.starts_with("www.") {
            lines.push(line.to_string());
            if i >= 1 || len > 80 {
                break;
            }
        }
    }
    lines
}

/// Byte range of the abstract body: from the line after the marker to the
/// first end marker within the search window.
fn find_abstract_span(text: &str) -> Option<(usize, usize)> {
    let marker = ABSTRACT_START.find(text)?;
    let start = match text[marker.start()..].find('\n') {
        Some(nl) => marker.start() + nl + 1,
        None => marker.end(),
    };
    let window_end = start + byte_offset(&text[start..], ABSTRACT_WINDOW_CHARS);
    let window = &text[start..window_end];
    let end = ABSTRACT_END
        .find(window)
        .map(|m| start + m.start())
        .unwrap_or(window_end);
    (end > start).then_some((start, end))
}

/// Byte offset of the `chars`-th character, or the string length.
fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map(|(i, _)| i).unwrap_or(s.len())
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Trim `s` to at most `max_chars` characters, preferring to cut after a
/// newline, `。`, `.` or space when one lies past the halfway point.
pub fn truncate_at_boundary(s: &str, max_chars: usize) -> String {
    let s = s.trim();
    if max_chars == 0 {
        return String::new();
    }
    if s.chars().count() <= max_chars {
        return s.to_string();
    }

    let cut = &s[..byte_offset(s, max_chars)];
    for sep in ["\n", "。", ".", " "] {
        if let Some(idx) = cut.rfind(sep) {
            if cut[..idx].chars().count() > max_chars / 2 {
                return cut[..idx + sep.len()].trim().to_string();
            }
        }
    }
    cut.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAPER: &str = "\
Journal of Immunology Research, Vol. 12
Single-cell profiling of tumour-infiltrating T cells
in colorectal cancer
Jane Doe, John Smith
Department of Immunology, Example University, Shanghai
Abstract
T cells infiltrating colorectal tumours were profiled with single-cell RNA sequencing.
Exhausted clusters predicted poor response to checkpoint blockade.
Keywords: T cells; colorectal cancer
1. Introduction
Colorectal cancer is ...";

    #[test]
    fn test_split_sections() {
        let excerpt = split_sections(PAPER, "paper.pdf", &PdfMetadata::default());

        // The journal line is long enough to count as a title line too.
        let title = excerpt.title.as_deref().unwrap();
        assert!(title.contains("Single-cell profiling"));

        assert_eq!(excerpt.authors.as_deref(), Some("in colorectal cancer\nJane Doe, John Smith"));
        assert_eq!(
            excerpt.affiliation.as_deref(),
            Some("Department of Immunology, Example University, Shanghai")
        );

        let abstract_text = excerpt.abstract_text.as_deref().unwrap();
        assert!(abstract_text.starts_with("T cells infiltrating"));
        assert!(abstract_text.ends_with("checkpoint blockade."));
        assert!(excerpt.body.is_none());
    }

    #[test]
    fn test_journal_line_outside_title() {
        let text = "Short\nDeep learning for protein folding prediction\nA. Author\nProceedings of ICML 2024\nAbstract\nWe fold proteins.\n";
        let excerpt = split_sections(text, "x.pdf", &PdfMetadata::default());
        assert_eq!(
            excerpt.title.as_deref(),
            Some("Deep learning for protein folding prediction")
        );
        assert_eq!(excerpt.journal.as_deref(), Some("Proceedings of ICML 2024"));
        assert_eq!(excerpt.authors.as_deref(), Some("Short\nA. Author"));
    }

    #[test]
    fn test_names_resembling_markers_stay_authors() {
        let text = "Short\nProtein folding with graph networks\nDoing Wang, Mei Li\n张体系，王芳\nStructural Biology Reports, doi:10.1000/xyz\nAbstract\nWe fold proteins.\n";
        let excerpt = split_sections(text, "fold.pdf", &PdfMetadata::default());
        assert_eq!(
            excerpt.authors.as_deref(),
            Some("Short\nDoing Wang, Mei Li\n张体系，王芳")
        );
        assert_eq!(
            excerpt.journal.as_deref(),
            Some("Structural Biology Reports, doi:10.1000/xyz")
        );
        assert!(excerpt.affiliation.is_none());
    }

    #[test]
    fn test_chinese_abstract() {
        let text = "基于深度学习的水稻病害识别方法研究\n以长江中下游稻区为例的实证分析\n张三 李四\n南京农业大学 信息科学技术学院\n摘要\n本文提出一种卷积神经网络模型。\n关键词：水稻；病害\n";
        let excerpt = split_sections(text, "rice.pdf", &PdfMetadata::default());
        assert_eq!(
            excerpt.title.as_deref(),
            Some("基于深度学习的水稻病害识别方法研究 以长江中下游稻区为例的实证分析")
        );
        assert_eq!(excerpt.authors.as_deref(), Some("张三 李四"));
        assert_eq!(
            excerpt.affiliation.as_deref(),
            Some("南京农业大学 信息科学技术学院")
        );
        assert!(excerpt
            .abstract_text
            .as_deref()
            .unwrap()
            .starts_with("本文提出一种卷积神经网络模型。"));
    }

    #[test]
    fn test_no_abstract_uses_body_and_metadata() {
        let text = format!("{}\n{}", "x".repeat(5), "computer vision ".repeat(80));
        let meta = PdfMetadata {
            title: Some("Metadata Title".to_string()),
            author: Some("Meta Author".to_string()),
        };
        let excerpt = split_sections(&text, "cv.pdf", &meta);
        assert!(excerpt.abstract_text.is_none());
        assert!(excerpt.body.as_deref().unwrap().contains("computer vision"));
        assert!(excerpt.body.as_deref().unwrap().chars().count() <= ABSTRACT_MAX_CHARS);
    }

    #[test]
    fn test_metadata_title_fallback() {
        let meta = PdfMetadata {
            title: Some("Metadata Title".to_string()),
            ..Default::default()
        };
        let excerpt = split_sections("tiny\ntext", "f.pdf", &meta);
        assert_eq!(excerpt.title.as_deref(), Some("Metadata Title"));

        let excerpt = split_sections("tiny\ntext", "f.pdf", &PdfMetadata::default());
        assert_eq!(excerpt.title.as_deref(), Some("f.pdf"));
    }

    #[test]
    fn test_empty_text_is_empty_excerpt() {
        let excerpt = split_sections("  \n ", "blank.pdf", &PdfMetadata::default());
        assert!(excerpt.is_empty());
        assert_eq!(excerpt.render(100), "");
        assert_eq!(excerpt.display_title(), "blank.pdf");
    }

    #[test]
    fn test_render_labels_and_bound() {
        let excerpt = Excerpt {
            file_name: "a.pdf".to_string(),
            title: Some("A title".to_string()),
            abstract_text: Some("word ".repeat(200)),
            ..Default::default()
        };
        let full = excerpt.render(10_000);
        assert!(full.starts_with("【标题】\nA title\n\n【摘要】\nword"));

        let short = excerpt.render(100);
        assert!(short.chars().count() <= 100);
    }

    #[test]
    fn test_truncate_at_boundary() {
        assert_eq!(truncate_at_boundary("  short  ", 20), "short");
        assert_eq!(truncate_at_boundary("anything", 0), "");
        assert_eq!(
            truncate_at_boundary("first sentence. second sentence", 24),
            "first sentence."
        );
        // No separator past the halfway point: hard cut.
        assert_eq!(truncate_at_boundary("a bcdefghijklmnop", 10), "a bcdefghi");
        assert_eq!(truncate_at_boundary("细胞生物学。免疫学研究进展", 8), "细胞生物学。");
    }

    #[test]
    fn test_pdfinfo_parse() {
        let out = "Title:          Tumour immunology\nAuthor:         \nPages:          12\nPage size:      612 x 792 pts\n";
        let meta = PdfMetadata::parse(out);
        assert_eq!(meta.title.as_deref(), Some("Tumour immunology"));
        assert_eq!(meta.author, None);
    }
}
