//! Data models for litdomain.

mod document;

pub use document::{DocumentRecord, DomainPair, UNCATEGORIZED_CN, UNCATEGORIZED_EN};
