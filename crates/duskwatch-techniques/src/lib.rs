//! Technique Mapper (C6): enriches anomalies with an attack-technique ID
//! and tactic via fixed event-id/keyword tables resolved against a
//! pluggable taxonomy.

#![deny(unsafe_code)]

mod mapper;
mod tables;
mod taxonomy;

pub use mapper::{apply, map_record, TechniqueMatch};
pub use taxonomy::{StaticTaxonomy, TaxonomyError, TaxonomyProvider, TechniqueInfo};
