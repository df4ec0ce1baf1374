//! litdomain - classify academic papers into their minimal subject domain.
//!
//! Extracts an excerpt from each PDF (text layer first, OCR as fallback),
//! asks a locally served language model for a bilingual domain label and
//! records the result in SQLite with an optional CSV export.

pub mod classify;
pub mod cli;
pub mod config;
pub mod extract;
pub mod llm;
pub mod models;
pub mod repository;
pub mod services;
