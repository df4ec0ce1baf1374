//! Configuration loading.
//!
//! A config file (YAML, TOML or JSON, chosen by extension) is deserialized into
//! [`Config`]; paths inside it are then resolved into [`Settings`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::LlmConfig;

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Annotated default config written by `init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config.example.yaml");

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config {path}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Text extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Pages read from the start of each PDF.
    pub max_pages: u32,
    /// Text layers with fewer non-whitespace characters fall back to OCR.
    pub min_text_chars: usize,
    /// Whether OCR fallback runs at all.
    pub ocr: bool,
    /// Tesseract language spec.
    pub ocr_language: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_pages: 5,
            min_text_chars: 200,
            ocr: true,
            ocr_language: "eng+chi_sim".to_string(),
        }
    }
}

/// Where results go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub db_path: String,
    pub export_csv: bool,
    pub csv_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            db_path: "./literature_domains.db".to_string(),
            export_csv: true,
            csv_path: "./literature_domains.csv".to_string(),
        }
    }
}

/// Configuration file contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories scanned recursively.
    pub literature_dirs: Vec<String>,
    /// Accepted file extensions, with or without the leading dot.
    pub extensions: Vec<String>,
    pub llm: LlmConfig,
    /// Excerpt budget in characters.
    pub max_chars_for_llm: usize,
    /// Bound on system + user prompt in characters.
    pub max_prompt_chars: usize,
    /// Unload the model every N successful classifications (0 disables).
    pub clear_context_every_n: u32,
    pub extraction: ExtractionConfig,
    pub output: OutputConfig,

    /// Path this config was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            literature_dirs: vec!["./papers".to_string()],
            extensions: vec![".pdf".to_string(), ".txt".to_string()],
            llm: LlmConfig::default(),
            max_chars_for_llm: 3000,
            max_prompt_chars: 4000,
            clear_context_every_n: 0,
            extraction: ExtractionConfig::default(),
            output: OutputConfig::default(),
            source_path: None,
        }
    }
}

impl Config {
    /// Load configuration from a specific file path.
    /// The format is chosen by extension; anything unrecognised is read as YAML.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("yaml")
            .to_ascii_lowercase();

        let parse_err = |format: &'static str, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        };

        match ext.as_str() {
            "toml" => toml::from_str(contents).map_err(|e| parse_err("TOML", e.to_string())),
            "json" => serde_json::from_str(contents).map_err(|e| parse_err("JSON", e.to_string())),
            _ => serde_yaml::from_str(contents).map_err(|e| parse_err("YAML", e.to_string())),
        }
    }

    /// Check value ranges before any file is processed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extensions.iter().all(|e| e.trim_start_matches('.').is_empty()) {
            return Err(ConfigError::Invalid(
                "extensions must list at least one file extension".to_string(),
            ));
        }
        if self.max_chars_for_llm == 0 {
            return Err(ConfigError::Invalid(
                "max_chars_for_llm must be greater than 0".to_string(),
            ));
        }
        if self.max_prompt_chars == 0 {
            return Err(ConfigError::Invalid(
                "max_prompt_chars must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid(format!(
                "llm.temperature must be between 0.0 and 2.0 (got {})",
                self.llm.temperature
            )));
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "llm.max_tokens must be greater than 0".to_string(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.model must not be empty".to_string()));
        }
        Ok(())
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Resolve configured paths into settings.
    pub fn to_settings(&self, base_dir: &Path) -> Settings {
        Settings {
            literature_dirs: self
                .literature_dirs
                .iter()
                .map(|d| self.resolve_path(d, base_dir))
                .collect(),
            db_path: self.resolve_path(&self.output.db_path, base_dir),
            csv_path: self.resolve_path(&self.output.csv_path, base_dir),
            export_csv: self.output.export_csv,
            config_path: self.source_path.clone(),
        }
    }
}

/// Paths resolved from a [`Config`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub literature_dirs: Vec<PathBuf>,
    pub db_path: PathBuf,
    pub csv_path: PathBuf,
    pub export_csv: bool,
    /// Config file in effect, if one was read.
    pub config_path: Option<PathBuf>,
}

impl Settings {
    /// Check if the database has been created by a previous scan.
    pub fn database_exists(&self) -> bool {
        self.db_path.exists()
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides the default lookup).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
}

impl LoadOptions {
    /// Config path that will be read (or written by `init`).
    pub fn config_file(&self) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

/// Load, override and validate configuration.
///
/// A missing default config file falls back to built-in defaults; a missing
/// explicit `--config` file is an error.
pub async fn load_settings(options: &LoadOptions) -> Result<(Settings, Config), ConfigError> {
    let path = options.config_file();

    let mut config = if path.exists() {
        debug!("Loading config from {}", path.display());
        Config::load_from_path(&path).await?
    } else if options.config_path.is_some() {
        return Err(ConfigError::NotFound(path));
    } else {
        warn!(
            "No {} found, using built-in defaults (run `litdomain init` to create one)",
            DEFAULT_CONFIG_FILE
        );
        Config::default()
    };

    config.llm = config.llm.with_env_overrides();
    config.validate()?;

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = if options.use_cwd {
        cwd
    } else {
        config.base_dir().unwrap_or(cwd)
    };

    let settings = config.to_settings(&base_dir);
    Ok((settings, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmProvider;
    use tempfile::TempDir;

    #[test]
    fn test_example_template_parses_to_defaults() {
        let config = Config::parse(DEFAULT_CONFIG_TEMPLATE, Path::new("config.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "literature_dirs: [/data/papers]\nllm:\n  provider: openai\n  model: local\nclear_context_every_n: 20\n";
        let config = Config::parse(yaml, Path::new("c.yml")).unwrap();
        assert_eq!(config.literature_dirs, vec!["/data/papers"]);
        assert_eq!(config.llm.provider, LlmProvider::OpenAI);
        assert_eq!(config.llm.max_tokens, 256);
        assert_eq!(config.clear_context_every_n, 20);
        assert_eq!(config.max_chars_for_llm, 3000);
        assert!(config.extraction.ocr);
    }

    #[test]
    fn test_toml_and_json() {
        let toml = "max_prompt_chars = 1500\n[output]\ncsv_path = \"out.csv\"\n";
        let config = Config::parse(toml, Path::new("c.toml")).unwrap();
        assert_eq!(config.max_prompt_chars, 1500);
        assert_eq!(config.output.csv_path, "out.csv");
        assert!(config.output.export_csv);

        let json = r#"{"extensions": ["pdf"], "extraction": {"ocr": false}}"#;
        let config = Config::parse(json, Path::new("c.json")).unwrap();
        assert_eq!(config.extensions, vec!["pdf"]);
        assert!(!config.extraction.ocr);
    }

    #[test]
    fn test_malformed_config_is_error() {
        let err = Config::parse("llm: [unclosed", Path::new("c.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: "YAML", .. }));
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.max_prompt_chars = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.extensions = vec![".".to_string()];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.llm.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_path() {
        let config = Config::default();
        let base = Path::new("/etc/litdomain");
        assert_eq!(
            config.resolve_path("./papers", base),
            PathBuf::from("/etc/litdomain/./papers")
        );
        assert_eq!(config.resolve_path("/abs/db", base), PathBuf::from("/abs/db"));
        assert!(!config.resolve_path("~/papers", base).starts_with("~"));
    }

    #[tokio::test]
    async fn test_load_settings_relative_to_config_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("litdomain.yaml");
        std::fs::write(&path, "output:\n  db_path: data/domains.db\n").unwrap();

        let options = LoadOptions {
            config_path: Some(path.clone()),
            use_cwd: false,
        };
        let (settings, config) = load_settings(&options).await.unwrap();
        assert_eq!(config.source_path.as_deref(), Some(path.as_path()));
        assert_eq!(settings.db_path, dir.path().join("data/domains.db"));
        assert_eq!(settings.literature_dirs, vec![dir.path().join("./papers")]);
    }

    #[tokio::test]
    async fn test_missing_explicit_config_is_error() {
        let dir = TempDir::new().unwrap();
        let options = LoadOptions {
            config_path: Some(dir.path().join("nope.yaml")),
            use_cwd: false,
        };
        assert!(matches!(
            load_settings(&options).await,
            Err(ConfigError::NotFound(_))
        ));
    }
}
