//! Persistence layer: the Model Store (C2) plus the ambient `LogStore`,
//! `AnomalyStore`, and `SessionStore` ports every other component writes
//! through.
//!
//! Design stance: SQLite is the transactional source of truth for a
//! single-host deployment; the in-memory adapter exists for tests and for
//! the real-time tailer's lightweight scoring path, which never touches
//! durable storage.

#![deny(unsafe_code)]

mod error;
mod hub;
pub mod memory;
mod model_store;
#[cfg(feature = "sqlite")]
pub mod sqlite;
mod traits;

pub use error::{StoreError, StoreResult};
pub use hub::HubStore;
pub use model_store::{default_root, ModelStore};
pub use traits::{AnalysisStore, AnomalyStore, LogStore, QueryWindow, SessionStore};
