//! Write a starter config file.

use std::path::Path;

use console::style;

use crate::config::DEFAULT_CONFIG_TEMPLATE;

/// Write the annotated default config to `path`.
pub async fn cmd_init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        println!(
            "{} {} already exists",
            style("!").yellow(),
            path.display()
        );
        println!("  Use --force to overwrite it");
        return Ok(());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, DEFAULT_CONFIG_TEMPLATE).await?;

    println!("{} Wrote {}", style("✓").green(), path.display());
    println!("  Edit literature_dirs, then run `litdomain scan`");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_writes_and_respects_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf/config.yaml");

        cmd_init(&path, false).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG_TEMPLATE);

        std::fs::write(&path, "max_chars_for_llm: 10\n").unwrap();
        cmd_init(&path, false).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "max_chars_for_llm: 10\n");

        cmd_init(&path, true).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG_TEMPLATE);
    }
}
