//! Classified document records and the bilingual domain label pair.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chinese label used when no domain could be determined.
pub const UNCATEGORIZED_CN: &str = "未分类";
/// English label used when no domain could be determined.
pub const UNCATEGORIZED_EN: &str = "Uncategorized";

/// A minimal-domain label in Chinese and English.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DomainPair {
    pub cn: String,
    pub en: String,
}

impl DomainPair {
    pub fn new(cn: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            cn: cn.into(),
            en: en.into(),
        }
    }

    /// The fixed fallback pair recorded when classification fails.
    pub fn uncategorized() -> Self {
        Self::new(UNCATEGORIZED_CN, UNCATEGORIZED_EN)
    }

    pub fn is_uncategorized(&self) -> bool {
        self.cn == UNCATEGORIZED_CN && self.en == UNCATEGORIZED_EN
    }
}

impl std::fmt::Display for DomainPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} | {}", self.cn, self.en)
    }
}

/// One row of the `literature_domains` table.
///
/// `file_path` is the unique key; rescanning a file replaces its row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub file_path: String,
    pub file_name: String,
    pub domain_cn: String,
    pub domain_en: String,
    pub updated_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// Build a record for `path`, stamped with the current time.
    pub fn new(path: &Path, domain: &DomainPair) -> Self {
        Self::with_timestamp(path, domain, Utc::now())
    }

    pub fn with_timestamp(path: &Path, domain: &DomainPair, updated_at: DateTime<Utc>) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            file_path: path.to_string_lossy().to_string(),
            file_name,
            domain_cn: domain.cn.clone(),
            domain_en: domain.en.clone(),
            updated_at,
        }
    }

    pub fn domain(&self) -> DomainPair {
        DomainPair::new(&self.domain_cn, &self.domain_en)
    }
}
