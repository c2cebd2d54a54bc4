use duskwatch_types::{Anomaly, LogRecord};

use crate::tables::{lookup_event_id, lookup_keywords};
use crate::taxonomy::TaxonomyProvider;

/// One candidate technique match for a record, in first-match order.
pub struct TechniqueMatch {
    pub technique_id: String,
    pub tactic: Option<String>,
}

/// Candidate technique IDs for `record`: the event-id table first, then
/// every keyword hit, deduplicated while preserving first-match order.
fn candidate_technique_ids(record: &LogRecord) -> Vec<String> {
    let mut candidates = Vec::new();

    if let Some(event_id) = &record.event_id {
        if let Some(technique) = lookup_event_id(event_id) {
            candidates.push(technique.to_string());
        }
    }

    let event_type = record.event_type.as_deref().unwrap_or("");
    let combined = format!("{} {}", record.message.to_lowercase(), event_type.to_lowercase());
    for technique in lookup_keywords(&combined) {
        candidates.push(technique.to_string());
    }

    let mut seen = std::collections::HashSet::new();
    candidates.retain(|id| seen.insert(id.clone()));
    candidates
}

/// Maps `record` to the taxonomy, resolving each candidate through
/// `taxonomy` when one is configured. With no taxonomy configured, returns
/// no matches at all — absence of the taxonomy is not fatal, it just means
/// nothing gets attached.
pub fn map_record(record: &LogRecord, taxonomy: Option<&dyn TaxonomyProvider>) -> Vec<TechniqueMatch> {
    let taxonomy = match taxonomy {
        Some(t) => t,
        None => return Vec::new(),
    };

    candidate_technique_ids(record)
        .into_iter()
        .filter_map(|id| {
            let tactic = taxonomy.resolve(&id).map(|info| info.tactic);
            tactic.map(|tactic| TechniqueMatch { technique_id: id, tactic: Some(tactic) })
        })
        .collect()
}

/// Mutates `anomaly` in place: the first resolved match populates
/// `technique_id`/`tactic`; everything else is discarded (the mapper
/// returns only the first hit to the caller, per the single-technique
/// fields on `Anomaly`).
pub fn apply(anomaly: &mut Anomaly, record: &LogRecord, taxonomy: Option<&dyn TaxonomyProvider>) {
    let matches = map_record(record, taxonomy);
    if let Some(first) = matches.into_iter().next() {
        anomaly.technique_id = Some(first.technique_id);
        anomaly.tactic = first.tactic;
    } else {
        tracing::debug!(log_ref = %record.id, "no technique mapped for record");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::{StaticTaxonomy, TechniqueInfo};
    use chrono::Utc;
    use duskwatch_types::{Algorithm, AnomalyId, SeverityBand};
    use std::collections::BTreeMap;

    fn record(message: &str) -> LogRecord {
        LogRecord::new(Utc::now(), "sshd", message)
    }

    fn taxonomy() -> StaticTaxonomy {
        StaticTaxonomy::from_entries(vec![
            TechniqueInfo { technique_id: "T1003".to_string(), tactic: "credential_access".to_string(), name: "OS Credential Dumping".to_string() },
            TechniqueInfo { technique_id: "T1078".to_string(), tactic: "defense_evasion".to_string(), name: "Valid Accounts".to_string() },
        ])
    }

    fn blank_anomaly(record: &LogRecord) -> Anomaly {
        Anomaly {
            id: AnomalyId::new(),
            log_ref: record.id,
            score: 0.9,
            algorithm: Algorithm::Ensemble,
            severity: SeverityBand::Critical,
            feature_snapshot: BTreeMap::new(),
            explanation: String::new(),
            technique_id: None,
            tactic: None,
            detected_at: Utc::now(),
        }
    }

    #[test]
    fn keyword_match_populates_technique_and_tactic() {
        let rec = record("Failed password for root from 10.0.0.1");
        let mut anomaly = blank_anomaly(&rec);
        apply(&mut anomaly, &rec, Some(&taxonomy()));
        assert_eq!(anomaly.technique_id.as_deref(), Some("T1003"));
        assert_eq!(anomaly.tactic.as_deref(), Some("credential_access"));
    }

    #[test]
    fn event_id_takes_priority_over_keyword() {
        let mut rec = record("password reset requested");
        rec.event_id = Some("4624".to_string());
        let matches = candidate_technique_ids(&rec);
        assert_eq!(matches.first().map(|s| s.as_str()), Some("T1078"));
    }

    #[test]
    fn missing_taxonomy_leaves_technique_id_null() {
        let rec = record("Failed password for root");
        let mut anomaly = blank_anomaly(&rec);
        apply(&mut anomaly, &rec, None);
        assert!(anomaly.technique_id.is_none());
    }

    #[test]
    fn no_matching_keyword_leaves_technique_id_null() {
        let rec = record("Started session 42");
        let mut anomaly = blank_anomaly(&rec);
        apply(&mut anomaly, &rec, Some(&taxonomy()));
        assert!(anomaly.technique_id.is_none());
    }

    #[test]
    fn duplicate_keyword_hits_are_deduplicated() {
        let rec = record("service restarted after scheduled task failure, service");
        let candidates = candidate_technique_ids(&rec);
        let unique: std::collections::HashSet<_> = candidates.iter().collect();
        assert_eq!(candidates.len(), unique.len());
    }
}
