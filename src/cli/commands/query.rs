//! Read-side commands over the classification table.

use std::path::PathBuf;

use console::style;

use crate::config::Settings;

use super::super::helpers::open_existing_db;

/// Print every distinct domain pair.
pub async fn cmd_domains(settings: &Settings) -> anyhow::Result<()> {
    let Some(repo) = open_existing_db(settings)? else {
        return Ok(());
    };

    let domains = repo.list_domains()?;
    if domains.is_empty() {
        println!("{} No papers classified yet", style("!").yellow());
        return Ok(());
    }

    println!("{} {} domains:", style("→").cyan(), domains.len());
    for domain in &domains {
        println!("  {:<20} {}", domain.cn, domain.en);
    }

    Ok(())
}

/// Print the paths of papers under a domain.
pub async fn cmd_filter(settings: &Settings, domain: &str) -> anyhow::Result<()> {
    let Some(repo) = open_existing_db(settings)? else {
        return Ok(());
    };

    let paths = repo.filter(domain)?;
    if paths.is_empty() {
        println!("{} No papers found in domain '{}'", style("!").yellow(), domain);
        println!("  Run `litdomain domains` to see recorded domains");
        return Ok(());
    }

    println!(
        "{} {} papers in '{}':",
        style("→").cyan(),
        paths.len(),
        domain.trim()
    );
    for path in &paths {
        println!("  {}", path);
    }

    Ok(())
}

/// Rewrite the CSV export from the database.
pub async fn cmd_export(settings: &Settings, output: Option<PathBuf>) -> anyhow::Result<()> {
    let Some(repo) = open_existing_db(settings)? else {
        return Ok(());
    };

    let target = output.unwrap_or_else(|| settings.csv_path.clone());
    let report = repo.export_csv(&target)?;

    if report.used_fallback {
        println!(
            "{} {} was not writable, using {}",
            style("!").yellow(),
            target.display(),
            report.path.display()
        );
    }
    println!(
        "{} Exported {} rows to {}",
        style("✓").green(),
        report.rows,
        report.path.display()
    );

    Ok(())
}
