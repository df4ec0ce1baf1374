//! Document repository: per-file domain records.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, Row};
use tracing::info;

use super::export::{write_csv, ExportReport};
use super::{parse_datetime, to_option, Result};
use crate::models::{DocumentRecord, DomainPair};

/// SQLite-backed repository of classified documents.
pub struct DocumentRepository {
    db_path: PathBuf,
}

impl DocumentRepository {
    /// Open (creating if needed) the database at `db_path`.
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let repo = Self {
            db_path: db_path.to_path_buf(),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    fn connect(&self) -> Result<Connection> {
        super::connect(&self.db_path)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'literature_domains'",
            [],
            |row| row.get::<_, i64>(0).map(|n| n > 0),
        )?;

        if !exists {
            conn.execute_batch(
                r#"
                CREATE TABLE literature_domains (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    file_path TEXT NOT NULL UNIQUE,
                    file_name TEXT,
                    domain_cn TEXT,
                    domain_en TEXT,
                    updated_at TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_literature_domains_cn
                    ON literature_domains(domain_cn);
                CREATE INDEX IF NOT EXISTS idx_literature_domains_en
                    ON literature_domains(domain_en);
            "#,
            )?;
            return Ok(());
        }

        // Databases from the single-label era have a `domain` column only.
        let columns = table_columns(&conn)?;
        if !columns.iter().any(|c| c == "domain_cn") {
            if columns.iter().any(|c| c == "domain") {
                conn.execute_batch(
                    r#"
                    ALTER TABLE literature_domains RENAME COLUMN domain TO domain_cn;
                    ALTER TABLE literature_domains ADD COLUMN domain_en TEXT;
                "#,
                )?;
            } else {
                conn.execute_batch(
                    r#"
                    ALTER TABLE literature_domains ADD COLUMN domain_cn TEXT;
                    ALTER TABLE literature_domains ADD COLUMN domain_en TEXT;
                "#,
                )?;
            }
            info!("Upgraded literature_domains to bilingual domain columns");
        }
        Ok(())
    }

    /// Insert a record, or overwrite the existing row for its `file_path`.
    pub fn upsert(&self, record: &DocumentRecord) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO literature_domains (file_path, file_name, domain_cn, domain_en, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(file_path) DO UPDATE SET
                file_name = excluded.file_name,
                domain_cn = excluded.domain_cn,
                domain_en = excluded.domain_en,
                updated_at = excluded.updated_at
            "#,
            params![
                record.file_path,
                record.file_name,
                record.domain_cn,
                record.domain_en,
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get the record for a file path.
    pub fn get(&self, file_path: &str) -> Result<Option<DocumentRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT file_path, file_name, domain_cn, domain_en, updated_at
             FROM literature_domains WHERE file_path = ?",
        )?;
        to_option(stmt.query_row(params![file_path], row_to_record))
    }

    /// Get all records, ordered by Chinese domain then file name.
    pub fn list_all(&self) -> Result<Vec<DocumentRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT file_path, file_name, domain_cn, domain_en, updated_at
             FROM literature_domains ORDER BY domain_cn, file_name",
        )?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Count stored records.
    pub fn count(&self) -> Result<u64> {
        let conn = self.connect()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM literature_domains", [], |row| {
                row.get(0)
            })?;
        Ok(count as u64)
    }

    /// Distinct `(domain_cn, domain_en)` pairs currently stored.
    pub fn list_domains(&self) -> Result<Vec<DomainPair>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT domain_cn, COALESCE(domain_en, '')
             FROM literature_domains
             WHERE domain_cn IS NOT NULL
             ORDER BY domain_cn, 2",
        )?;
        let domains = stmt
            .query_map([], |row| {
                Ok(DomainPair::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(domains)
    }

    /// File paths whose Chinese or English domain equals `domain`.
    pub fn filter(&self, domain: &str) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT file_path FROM literature_domains
             WHERE domain_cn = ?1 OR domain_en = ?1
             ORDER BY file_name, file_path",
        )?;
        let paths = stmt
            .query_map(params![domain.trim()], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(paths)
    }

    /// Write the whole table to `csv_path`.
    pub fn export_csv(&self, csv_path: &Path) -> Result<ExportReport> {
        let records = self.list_all()?;
        write_csv(&records, csv_path)
    }
}

fn table_columns(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("PRAGMA table_info(literature_domains)")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<DocumentRecord> {
    Ok(DocumentRecord {
        file_path: row.get(0)?,
        file_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        domain_cn: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        domain_en: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        updated_at: row
            .get::<_, Option<String>>(4)?
            .map(|s| parse_datetime(&s))
            .unwrap_or(chrono::DateTime::UNIX_EPOCH),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn repo() -> (TempDir, DocumentRepository) {
        let dir = TempDir::new().unwrap();
        let repo = DocumentRepository::new(&dir.path().join("domains.db")).unwrap();
        (dir, repo)
    }

    fn record(path: &str, cn: &str, en: &str) -> DocumentRecord {
        DocumentRecord::new(Path::new(path), &DomainPair::new(cn, en))
    }

    #[test]
    fn test_upsert_overwrites_existing_row() {
        let (_dir, repo) = repo();
        let first = Utc::now() - Duration::days(3);
        let second = Utc::now();

        let mut rec = DocumentRecord::with_timestamp(
            Path::new("/papers/a.pdf"),
            &DomainPair::new("免疫学", "Immunology"),
            first,
        );
        repo.upsert(&rec).unwrap();

        rec.domain_cn = "病毒学".to_string();
        rec.domain_en = "Virology".to_string();
        rec.updated_at = second;
        repo.upsert(&rec).unwrap();

        assert_eq!(repo.count().unwrap(), 1);
        let stored = repo.get("/papers/a.pdf").unwrap().unwrap();
        assert_eq!(stored.domain_en, "Virology");
        assert_eq!(stored.updated_at.timestamp(), second.timestamp());
    }

    #[test]
    fn test_filter_matches_either_language() {
        let (_dir, repo) = repo();
        repo.upsert(&record("/p/a.pdf", "免疫学", "Immunology")).unwrap();
        repo.upsert(&record("/p/b.pdf", "免疫学", "Immunology")).unwrap();
        repo.upsert(&record("/p/c.pdf", "药理学", "Pharmacology")).unwrap();

        assert_eq!(repo.filter("免疫学").unwrap(), vec!["/p/a.pdf", "/p/b.pdf"]);
        assert_eq!(repo.filter("Pharmacology").unwrap(), vec!["/p/c.pdf"]);
        assert!(repo.filter("Astronomy").unwrap().is_empty());
    }

    #[test]
    fn test_list_domains_is_distinct() {
        let (_dir, repo) = repo();
        repo.upsert(&record("/p/a.pdf", "免疫学", "Immunology")).unwrap();
        repo.upsert(&record("/p/b.pdf", "免疫学", "Immunology")).unwrap();
        repo.upsert(&record("/p/c.pdf", "药理学", "Pharmacology")).unwrap();

        let domains = repo.list_domains().unwrap();
        assert_eq!(domains.len(), 2);
        assert!(domains.contains(&DomainPair::new("免疫学", "Immunology")));
        assert!(domains.contains(&DomainPair::new("药理学", "Pharmacology")));
    }

    #[test]
    fn test_missing_record_is_none() {
        let (_dir, repo) = repo();
        assert!(repo.get("/nope.pdf").unwrap().is_none());
    }

    #[test]
    fn test_legacy_single_domain_table_is_upgraded() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("legacy.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute_batch(
                r#"
                CREATE TABLE literature_domains (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    file_path TEXT NOT NULL UNIQUE,
                    file_name TEXT,
                    domain TEXT,
                    updated_at TEXT DEFAULT (datetime('now','localtime'))
                );
                INSERT INTO literature_domains (file_path, file_name, domain)
                VALUES ('/old/x.pdf', 'x.pdf', '肿瘤学');
            "#,
            )
            .unwrap();
        }

        let repo = DocumentRepository::new(&db_path).unwrap();
        let old = repo.get("/old/x.pdf").unwrap().unwrap();
        assert_eq!(old.domain_cn, "肿瘤学");
        assert_eq!(old.domain_en, "");
        assert_eq!(repo.filter("肿瘤学").unwrap(), vec!["/old/x.pdf"]);
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("nested/deeper/domains.db");
        let repo = DocumentRepository::new(&db_path).unwrap();
        assert_eq!(repo.count().unwrap(), 0);
        assert!(db_path.exists());
    }
}
