//! Shared helper functions for CLI commands.

use console::style;

use crate::config::Settings;
use crate::repository::DocumentRepository;

/// Truncate to `max` characters with a trailing ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Open the database for read commands; prints a hint and returns None when
/// no scan has created it yet.
pub fn open_existing_db(settings: &Settings) -> anyhow::Result<Option<DocumentRepository>> {
    if !settings.database_exists() {
        println!(
            "{} Database {} does not exist",
            style("!").yellow(),
            settings.db_path.display()
        );
        println!("  Run `litdomain scan` first");
        return Ok(None);
    }
    Ok(Some(DocumentRepository::new(&settings.db_path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short.pdf", 20), "short.pdf");
        assert_eq!(truncate("a-very-long-file-name.pdf", 10), "a-very-...");
        assert_eq!(truncate("细胞生物学研究进展综述", 6), "细胞生...");
    }
}
