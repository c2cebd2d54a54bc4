//! Sync Package Codec (C9): export signed `.qsp` packages on a terminal
//! node, import and correlate them on a hub.

#![deny(unsafe_code)]

mod correlation;
mod error;
mod export;
mod import;

pub use correlation::correlate_techniques;
pub use error::{SyncError, SyncResult};
pub use export::{build_package, write_package, ExportRequest};
pub use import::{import_package, read_package, ImportOutcome};
