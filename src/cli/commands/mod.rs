//! Command implementations.

mod check;
mod init;
mod query;
mod scan;

pub use check::cmd_check;
pub use init::cmd_init;
pub use query::{cmd_domains, cmd_export, cmd_filter};
pub use scan::cmd_scan;
