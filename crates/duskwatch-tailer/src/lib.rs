//! Real-Time Tailer (C8): watches a set of files for appended lines,
//! applies a lightweight variant of the keyword scorer, and dispatches
//! `StreamEvent`s to a bounded queue and any registered listeners.

#![deny(unsafe_code)]

mod error;
mod identity;
mod monitor;
mod parsing;
mod scoring;
mod tailer;

pub use error::{TailerError, TailerResult};
pub use identity::FileIdentity;
pub use monitor::{Listener, RealtimeMonitor};
pub use parsing::parse_line;
pub use scoring::{band_for, quick_score};
pub use tailer::FileTailer;
