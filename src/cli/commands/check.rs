//! Environment check: extraction tools and the model backend.

use console::style;

use crate::config::Config;
use crate::extract::TextExtractor;
use crate::llm::create_backend;

/// Report which extraction tools are installed and whether the configured
/// model is served.
pub async fn cmd_check(config: &Config) -> anyhow::Result<()> {
    println!("\n{}", style("Extraction Tools").bold());
    println!("{}", "-".repeat(40));

    let mut missing = false;
    for (tool, available) in TextExtractor::check_tools() {
        let status = if available {
            style("✓ found").green()
        } else {
            missing = true;
            style("✗ not found").red()
        };
        println!("  {:<15} {}", tool, status);
    }

    if missing {
        println!("\n  pdftotext, pdfinfo and pdftoppm ship with poppler-utils;");
        println!("  OCR additionally needs tesseract with the '{}' language data", config.extraction.ocr_language);
    }
    if !config.extraction.ocr {
        println!("  {} OCR fallback is disabled", style("→").dim());
    }

    println!("\n{}", style("Model Backend").bold());
    println!("{}", "-".repeat(40));
    println!("  {:<15} {}", "provider", config.llm.provider_name());
    println!("  {:<15} {}", "endpoint", config.llm.endpoint());
    println!("  {:<15} {}", "model", config.llm.model);

    let backend = create_backend(&config.llm)?;
    if !backend.is_available().await {
        println!("  {:<15} {}", "status", style("✗ unreachable").red());
        println!("\n  {}", config.llm.availability_hint());
        return Ok(());
    }
    println!("  {:<15} {}", "status", style("✓ reachable").green());

    match backend.list_models().await {
        Ok(models) => {
            let served = models.iter().any(|m| m == &config.llm.model);
            if served {
                println!("  {:<15} {}", "model", style("✓ available").green());
            } else {
                println!("  {:<15} {}", "model", style("✗ not served").red());
                if !models.is_empty() {
                    println!("\n  Served models:");
                    for m in &models {
                        println!("    {}", m);
                    }
                }
            }
        }
        Err(e) => {
            println!("  {:<15} {} ({})", "model", style("? unknown").yellow(), e);
        }
    }

    Ok(())
}
