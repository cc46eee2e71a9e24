//! CLI command handlers, one per file.

mod checksum;
mod path;
mod resolve;

pub use checksum::run_checksum;
pub use path::run_path;
pub use resolve::run_resolve;
