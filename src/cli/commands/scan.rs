//! Scan command: classify every paper under the literature directories.

use std::io::Write;

use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc;

use crate::config::{Config, Settings};
use crate::llm::create_backend;
use crate::models::DomainPair;
use crate::repository::DocumentRepository;
use crate::services::{ScanEvent, ScanService};

use super::super::helpers::truncate;

/// Renders scan events. Per-file lines go above the progress bar, or straight
/// to `out` when the bar is hidden (output redirected to a file or pipe).
struct ScanReporter<W: Write> {
    progress: Option<ProgressBar>,
    draw_target: fn() -> ProgressDrawTarget,
    out: W,
}

impl ScanReporter<std::io::Stdout> {
    fn stdout() -> Self {
        Self {
            progress: None,
            draw_target: ProgressDrawTarget::stderr,
            out: std::io::stdout(),
        }
    }
}

impl<W: Write> ScanReporter<W> {
    fn line(&mut self, text: String) {
        match &self.progress {
            Some(progress) if !progress.is_hidden() => progress.println(text),
            _ => {
                let _ = writeln!(self.out, "{}", text);
            }
        }
    }

    fn handle(&mut self, event: ScanEvent) {
        match event {
            ScanEvent::Started { total_files, mock } => {
                if total_files == 0 {
                    return;
                }
                let progress =
                    ProgressBar::with_draw_target(Some(total_files as u64), (self.draw_target)());
                progress.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("█▓░"),
                );
                progress.set_message(if mock { "Matching keywords..." } else { "Classifying..." });
                self.progress = Some(progress);
            }
            ScanEvent::FileStarted { file_name, .. } => {
                if let Some(ref progress) = self.progress {
                    progress.set_message(truncate(&file_name, 40));
                }
            }
            ScanEvent::FileCompleted {
                index,
                total,
                file_name,
                excerpt_chars,
                domain,
                error,
            } => {
                let marker = if domain.is_uncategorized() {
                    style("!").yellow()
                } else {
                    style("✓").green()
                };
                self.line(format!(
                    "{} [{}/{}] {} ({} chars) {}",
                    marker,
                    index,
                    total,
                    truncate(&file_name, 60),
                    excerpt_chars,
                    domain
                ));
                if let Some(error) = error {
                    self.line(format!("    {}", style(error).dim()));
                }
                if let Some(ref progress) = self.progress {
                    progress.inc(1);
                }
            }
            ScanEvent::FileFailed {
                index,
                total,
                file_name,
                error,
            } => {
                self.line(format!(
                    "{} [{}/{}] {}: {}",
                    style("✗").red(),
                    index,
                    total,
                    truncate(&file_name, 60),
                    error
                ));
                if let Some(ref progress) = self.progress {
                    progress.inc(1);
                }
            }
            ScanEvent::ContextRecycled { after_files, error } => match error {
                None => self.line(format!(
                    "{} Model unloaded after file {}",
                    style("↻").cyan(),
                    after_files
                )),
                Some(e) => self.line(format!(
                    "{} Model unload failed after file {}: {}",
                    style("!").yellow(),
                    after_files,
                    e
                )),
            },
            ScanEvent::Complete {
                classified,
                uncategorized,
                failed,
            } => {
                if let Some(progress) = self.progress.take() {
                    progress.finish_and_clear();
                }
                self.line(format!(
                    "{} Scan complete: {} classified, {} uncategorized, {} failed",
                    style("✓").green(),
                    classified,
                    uncategorized,
                    failed
                ));
            }
        }
    }
}

/// Scan, classify and record every matching file.
pub async fn cmd_scan(
    settings: &Settings,
    mut config: Config,
    mock: bool,
    model: Option<String>,
    endpoint: Option<String>,
) -> anyhow::Result<()> {
    if let Some(m) = model {
        config.llm.model = m;
    }
    if let Some(ep) = endpoint {
        config.llm.endpoint = Some(ep);
    }

    let repo = DocumentRepository::new(&settings.db_path)
        .with_context(|| format!("Failed to open database {}", settings.db_path.display()))?;

    let service = if mock {
        println!(
            "{} Mock mode: classifying with keyword rules, no model calls",
            style("→").cyan()
        );
        ScanService::mock(&config, repo)
    } else {
        let backend = create_backend(&config.llm)?;
        if backend.is_available().await {
            println!(
                "{} Connected to {} at {} (model: {})",
                style("✓").green(),
                backend.name(),
                config.llm.endpoint(),
                backend.model()
            );
        } else {
            // Each file still gets its attempts and falls back to the sentinel.
            println!("{} {}", style("!").yellow(), config.llm.availability_hint());
            println!(
                "  Continuing; unanswered papers are recorded as {} (or use --mock)",
                DomainPair::uncategorized()
            );
        }
        if config.clear_context_every_n > 0 {
            println!(
                "  Unloading the model every {} classified papers",
                config.clear_context_every_n
            );
        }
        ScanService::new(&config, repo, backend)
    };

    for dir in &settings.literature_dirs {
        println!("{} Scanning {}", style("→").cyan(), dir.display());
    }

    let (event_tx, mut event_rx) = mpsc::channel::<ScanEvent>(100);

    let event_handler = tokio::spawn(async move {
        let mut reporter = ScanReporter::stdout();
        while let Some(event) = event_rx.recv().await {
            reporter.handle(event);
        }
    });

    let export_to = settings.export_csv.then_some(settings.csv_path.as_path());
    let result = service
        .scan(&settings.literature_dirs, export_to, event_tx)
        .await;

    let _ = event_handler.await;
    let summary = result?;

    if summary.total == 0 {
        println!("{} No matching files found", style("!").yellow());
        println!(
            "  Check literature_dirs and extensions ({}) in your config",
            config.extensions.join(", ")
        );
    }

    if summary.recycles > 0 {
        println!("  {} Model unloaded {} times", style("→").dim(), summary.recycles);
    }

    if let Some(export) = summary.export {
        if export.used_fallback {
            println!(
                "{} {} was not writable, exported {} rows to {} instead",
                style("!").yellow(),
                settings.csv_path.display(),
                export.rows,
                export.path.display()
            );
        } else {
            println!(
                "{} Exported {} rows to {}",
                style("✓").green(),
                export.rows,
                export.path.display()
            );
        }
    }

    println!("  Database: {}", settings.db_path.display());

    Ok(())
}
