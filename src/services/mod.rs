//! Service layer for litdomain business logic.
//!
//! Domain logic separated from UI concerns. The CLI drives services and
//! renders the events they emit.

pub mod scan;

pub use scan::{collect_files, ScanEvent, ScanService, ScanSummary};
