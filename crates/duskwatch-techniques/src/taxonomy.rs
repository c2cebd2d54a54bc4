//! The attack-technique taxonomy itself is an external collaborator
//! (downloaded MITRE ATT&CK JSON, in the reference deployment); this crate
//! only defines the port it is consumed through and a file-backed adapter.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("failed to read taxonomy file: {0}")]
    Read(String),
    #[error("failed to parse taxonomy file: {0}")]
    Parse(String),
}

/// Taxonomy entry for one technique ID.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TechniqueInfo {
    pub technique_id: String,
    pub tactic: String,
    pub name: String,
}

/// Resolves a technique ID to its taxonomy entry. Absence of a configured
/// provider is not an error at the call site — callers pass `None` and the
/// mapper simply leaves `technique_id` unset.
pub trait TaxonomyProvider: Send + Sync {
    fn resolve(&self, technique_id: &str) -> Option<TechniqueInfo>;
}

/// In-memory taxonomy loaded once from a flattened JSON array of
/// `TechniqueInfo` records (the reference deployment instead downloads and
/// flattens the raw STIX bundle into this shape at load time).
pub struct StaticTaxonomy {
    by_id: HashMap<String, TechniqueInfo>,
}

impl StaticTaxonomy {
    pub fn from_entries(entries: Vec<TechniqueInfo>) -> Self {
        Self { by_id: entries.into_iter().map(|t| (t.technique_id.clone(), t)).collect() }
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, TaxonomyError> {
        let bytes = std::fs::read(path).map_err(|e| TaxonomyError::Read(e.to_string()))?;
        let entries: Vec<TechniqueInfo> =
            serde_json::from_slice(&bytes).map_err(|e| TaxonomyError::Parse(e.to_string()))?;
        Ok(Self::from_entries(entries))
    }
}

impl TaxonomyProvider for StaticTaxonomy {
    fn resolve(&self, technique_id: &str) -> Option<TechniqueInfo> {
        self.by_id.get(technique_id).cloned()
    }
}
