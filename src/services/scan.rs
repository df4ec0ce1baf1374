//! Literature scan service.
//!
//! Walks the configured directories and, one file at a time, extracts an
//! excerpt, classifies it and upserts the result. Separated from UI concerns -
//! emits events for progress tracking.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::classify::{Classifier, ContextRecycler, KeywordClassifier, PromptBuilder, RecycleOutcome};
use crate::config::Config;
use crate::extract::{Excerpt, TextExtractor};
use crate::llm::InferenceBackend;
use crate::models::{DocumentRecord, DomainPair};
use crate::repository::{DocumentRepository, ExportReport, RepositoryError};

/// Events emitted during a scan.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// Scan started
    Started { total_files: usize, mock: bool },
    /// File processing started
    FileStarted {
        index: usize,
        total: usize,
        file_name: String,
    },
    /// File classified and stored (possibly with the sentinel pair)
    FileCompleted {
        index: usize,
        total: usize,
        file_name: String,
        excerpt_chars: usize,
        domain: DomainPair,
        /// Model error behind a sentinel result, if any
        error: Option<String>,
    },
    /// File could not be stored
    FileFailed {
        index: usize,
        total: usize,
        file_name: String,
        error: String,
    },
    /// Model unloaded (error set when the unload failed)
    ContextRecycled {
        after_files: usize,
        error: Option<String>,
    },
    /// Scan complete
    Complete {
        classified: usize,
        uncategorized: usize,
        failed: usize,
    },
}

/// Result of a scan.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Files found.
    pub total: usize,
    /// Files stored with a real domain.
    pub classified: usize,
    /// Files stored with the sentinel pair.
    pub uncategorized: usize,
    /// Files that could not be stored.
    pub failed: usize,
    /// Context recycles issued.
    pub recycles: usize,
    /// CSV export, when one was written.
    pub export: Option<ExportReport>,
}

/// How domains are assigned.
enum Mode {
    Model {
        classifier: Classifier,
        prompts: PromptBuilder,
        recycle_every: u32,
    },
    Mock(KeywordClassifier),
}

/// Per-file classification result before storage.
struct Classified {
    domain: DomainPair,
    parsed: bool,
    excerpt_chars: usize,
    error: Option<String>,
}

/// Service that scans literature directories.
pub struct ScanService {
    repo: DocumentRepository,
    extractor: TextExtractor,
    extensions: Vec<String>,
    max_chars_for_llm: usize,
    mode: Mode,
}

impl ScanService {
    /// Scan service that classifies through `backend`.
    pub fn new(
        config: &Config,
        repo: DocumentRepository,
        backend: Arc<dyn InferenceBackend>,
    ) -> Self {
        Self {
            repo,
            extractor: TextExtractor::new(&config.extraction),
            extensions: config.extensions.clone(),
            max_chars_for_llm: config.max_chars_for_llm,
            mode: Mode::Model {
                classifier: Classifier::new(backend, &config.llm),
                prompts: PromptBuilder::new(config),
                recycle_every: config.clear_context_every_n,
            },
        }
    }

    /// Scan service using the offline keyword heuristic; makes no network calls.
    pub fn mock(config: &Config, repo: DocumentRepository) -> Self {
        Self {
            repo,
            extractor: TextExtractor::new(&config.extraction),
            extensions: config.extensions.clone(),
            max_chars_for_llm: config.max_chars_for_llm,
            mode: Mode::Mock(KeywordClassifier::new()),
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self.mode, Mode::Mock(_))
    }

    /// Scan `dirs`, storing one record per file, then export the table to
    /// `export_to` if given.
    pub async fn scan(
        &self,
        dirs: &[PathBuf],
        export_to: Option<&Path>,
        event_tx: mpsc::Sender<ScanEvent>,
    ) -> Result<ScanSummary, RepositoryError> {
        let files = collect_files(dirs, &self.extensions);
        let total = files.len();
        let mut summary = ScanSummary {
            total,
            ..Default::default()
        };

        let _ = event_tx
            .send(ScanEvent::Started {
                total_files: total,
                mock: self.is_mock(),
            })
            .await;

        let mut recycler = match &self.mode {
            Mode::Model { recycle_every, .. } => ContextRecycler::new(*recycle_every),
            Mode::Mock(_) => ContextRecycler::new(0),
        };

        for (i, path) in files.iter().enumerate() {
            let index = i + 1;
            let file_name = file_name(path);
            let _ = event_tx
                .send(ScanEvent::FileStarted {
                    index,
                    total,
                    file_name: file_name.clone(),
                })
                .await;

            let excerpt = self.extract(path).await;
            let result = self.classify(&file_name, &excerpt).await;

            if result.parsed {
                if let Mode::Model { classifier, .. } = &self.mode {
                    match recycler.record_success(classifier.backend()).await {
                        RecycleOutcome::NotDue => {}
                        RecycleOutcome::Recycled => {
                            summary.recycles += 1;
                            let _ = event_tx
                                .send(ScanEvent::ContextRecycled {
                                    after_files: index,
                                    error: None,
                                })
                                .await;
                        }
                        RecycleOutcome::Failed(error) => {
                            summary.recycles += 1;
                            let _ = event_tx
                                .send(ScanEvent::ContextRecycled {
                                    after_files: index,
                                    error: Some(error),
                                })
                                .await;
                        }
                    }
                }
            }

            let record = DocumentRecord::new(path, &result.domain);
            match self.repo.upsert(&record) {
                Ok(()) => {
                    if result.domain.is_uncategorized() {
                        summary.uncategorized += 1;
                    } else {
                        summary.classified += 1;
                    }
                    let _ = event_tx
                        .send(ScanEvent::FileCompleted {
                            index,
                            total,
                            file_name,
                            excerpt_chars: result.excerpt_chars,
                            domain: result.domain,
                            error: result.error,
                        })
                        .await;
                }
                Err(e) => {
                    warn!("Failed to store {}: {}", path.display(), e);
                    summary.failed += 1;
                    let _ = event_tx
                        .send(ScanEvent::FileFailed {
                            index,
                            total,
                            file_name,
                            error: format!("Save failed: {}", e),
                        })
                        .await;
                }
            }
        }

        if let Some(csv_path) = export_to {
            summary.export = Some(self.repo.export_csv(csv_path)?);
        }

        let _ = event_tx
            .send(ScanEvent::Complete {
                classified: summary.classified,
                uncategorized: summary.uncategorized,
                failed: summary.failed,
            })
            .await;

        Ok(summary)
    }

    /// Extract off the async runtime; extraction shells out and blocks.
    async fn extract(&self, path: &Path) -> Excerpt {
        let extractor = self.extractor.clone();
        let owned = path.to_path_buf();
        match tokio::task::spawn_blocking(move || extractor.excerpt(&owned)).await {
            Ok(excerpt) => excerpt,
            Err(e) => {
                warn!("Extraction task for {} failed: {}", path.display(), e);
                Excerpt::empty(file_name(path))
            }
        }
    }

    async fn classify(&self, file_name: &str, excerpt: &Excerpt) -> Classified {
        let rendered = excerpt.render(self.max_chars_for_llm);

        match &self.mode {
            Mode::Mock(heuristic) => {
                let title = format!("{} {}", file_name, excerpt.display_title());
                let domain = heuristic.classify(&title, &rendered);
                Classified {
                    parsed: !domain.is_uncategorized(),
                    domain,
                    excerpt_chars: rendered.chars().count(),
                    error: None,
                }
            }
            Mode::Model {
                classifier,
                prompts,
                ..
            } => {
                let prompt = prompts.build(file_name, &rendered);
                debug!(
                    "{}: prompt {} chars ({} excerpt)",
                    file_name,
                    prompt.total_chars(),
                    prompt.excerpt_chars
                );
                let outcome = classifier.classify(&prompt).await;
                Classified {
                    domain: outcome.domain,
                    parsed: outcome.parsed,
                    excerpt_chars: prompt.excerpt_chars,
                    error: outcome.last_error,
                }
            }
        }
    }
}

/// Recursively collect files under `dirs` whose extension is in `extensions`
/// (case-insensitive, leading dot optional). Returns sorted, deduplicated
/// absolute paths. Missing directories are skipped with a warning.
pub fn collect_files(dirs: &[PathBuf], extensions: &[String]) -> Vec<PathBuf> {
    let wanted: Vec<String> = extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    let mut files = Vec::new();
    for dir in dirs {
        if !dir.is_dir() {
            warn!("Literature directory {} does not exist, skipping", dir.display());
            continue;
        }

        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Cannot read {}: {}", dir.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let matches = entry
                .path()
                .extension()
                .map(|ext| wanted.contains(&ext.to_string_lossy().to_lowercase()))
                .unwrap_or(false);
            if matches {
                let path = entry.path();
                files.push(std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()));
            }
        }
    }

    files.sort();
    files.dedup();
    files
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
