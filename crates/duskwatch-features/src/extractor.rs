use chrono::{Datelike, Timelike};
use duskwatch_types::{keyword_risk, source_risk, FeatureMatrix, LogRecord, FEATURE_ARITY};
use regex::Regex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;
use tracing::debug;

use crate::encoder::EncoderTables;
use crate::error::FeatureResult;

const FAILURE_TOKENS: &[&str] = &["failed", "failure", "denied", "rejected"];
const PRIVILEGE_TOKENS: &[&str] = &["sudo", "root", "admin", "privilege"];
const AUTH_TOKENS: &[&str] = &["ssh", "publickey", "password", "login"];

fn ip_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,3}\.){3}\d{1,3}\b").expect("static ip pattern"))
}

fn port_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bport\s+\d+\b").expect("static port pattern"))
}

/// Turns a batch of records into a fixed-width numeric matrix plus the
/// batch-local encoder tables used to produce it
///
/// Indices line up 1:1 with `records`: row `i` describes `records[i]`.
/// Never fails on missing optional fields; those just contribute a zero or
/// default feature value instead.
pub fn extract_features(records: &[LogRecord]) -> FeatureResult<(FeatureMatrix, EncoderTables)> {
    let lowercase_sources: Vec<String> = records.iter().map(|r| r.source.to_lowercase()).collect();
    let tables = EncoderTables::build(
        lowercase_sources.iter().map(|s| s.as_str()),
        records.iter().map(|r| r.event_type.as_deref().unwrap_or("")),
    );

    let rows = records
        .iter()
        .map(|record| extract_row(record, &tables))
        .collect();

    debug!(batch_size = records.len(), sources = tables.sources.len(), "extracted feature matrix");
    Ok((FeatureMatrix::new(rows), tables))
}

fn extract_row(record: &LogRecord, tables: &EncoderTables) -> [f64; FEATURE_ARITY] {
    let lowercase_message = record.message.to_lowercase();
    let lowercase_source = record.source.to_lowercase();

    let hour_of_day = record.timestamp.hour() as f64;
    let day_of_week = record.timestamp.weekday().num_days_from_monday() as f64;
    let after_hours = if record.timestamp.hour() < 6 || record.timestamp.hour() > 22 { 1.0 } else { 0.0 };
    let severity_level = record.severity.level() as f64;

    let source_encoded = *tables.sources.get(&lowercase_source).unwrap_or(&0) as f64;
    let source_risk_value = source_risk(&lowercase_source);

    let event_type_key = record.event_type.as_deref().unwrap_or("");
    let event_type_encoded = *tables.event_types.get(event_type_key).unwrap_or(&0) as f64;

    let message_length = record.message.chars().count() as f64;
    let word_count = record.message.split_whitespace().count().min(50) as f64;
    let keyword_risk_value = keyword_risk(&lowercase_message);

    let event_id_hash = record
        .event_id
        .as_deref()
        .map(|id| {
            let mut hasher = DefaultHasher::new();
            id.hash(&mut hasher);
            (hasher.finish() % 10_000) as f64
        })
        .unwrap_or(0.0);

    let has_username = record.username.as_deref().is_some_and(|u| !u.is_empty()) as u8 as f64;
    let has_hostname = record.hostname.as_deref().is_some_and(|h| !h.is_empty()) as u8 as f64;
    let has_process = record.process_name.as_deref().is_some_and(|p| !p.is_empty()) as u8 as f64;
    let process_id_norm = record.process_id.map(|pid| pid.rem_euclid(1000) as f64).unwrap_or(0.0);

    let has_failure_signal = contains_any(&lowercase_message, FAILURE_TOKENS);
    let has_privilege_signal = contains_any(&lowercase_message, PRIVILEGE_TOKENS);
    let has_auth_signal = contains_any(&lowercase_message, AUTH_TOKENS);
    let has_ip_address = if ip_pattern().is_match(&record.raw) { 1.0 } else { 0.0 };
    let has_port_number = if port_pattern().is_match(&lowercase_message) { 1.0 } else { 0.0 };

    [
        hour_of_day,
        day_of_week,
        after_hours,
        severity_level,
        source_encoded,
        source_risk_value,
        event_type_encoded,
        message_length,
        word_count,
        keyword_risk_value,
        event_id_hash,
        has_username,
        has_hostname,
        has_process,
        process_id_norm,
        has_failure_signal,
        has_privilege_signal,
        has_auth_signal,
        has_ip_address,
        has_port_number,
    ]
}

fn contains_any(haystack: &str, tokens: &[&str]) -> f64 {
    if tokens.iter().any(|t| haystack.contains(t)) {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use duskwatch_types::Severity;

    fn record_at(hour: u32, message: &str) -> LogRecord {
        let ts = Utc.with_ymd_and_hms(2026, 1, 5, hour, 0, 0).unwrap();
        LogRecord::new(ts, "sshd", message).with_severity(Severity::Medium)
    }

    #[test]
    fn row_count_matches_record_count() {
        let records = vec![record_at(3, "failed password for root from 10.0.0.1 port 22")];
        let (matrix, _) = extract_features(&records).unwrap();
        assert_eq!(matrix.len(), records.len());
    }

    #[test]
    fn after_hours_flag_set_before_6am() {
        let records = vec![record_at(3, "started session 42")];
        let (matrix, _) = extract_features(&records).unwrap();
        let map = matrix.row_as_map(0);
        assert_eq!(map["after_hours"], 1.0);
    }

    #[test]
    fn after_hours_flag_set_after_10pm() {
        let records = vec![record_at(23, "started session 42")];
        let (matrix, _) = extract_features(&records).unwrap();
        let map = matrix.row_as_map(0);
        assert_eq!(map["after_hours"], 1.0);
    }

    #[test]
    fn evening_hour_within_10pm_is_not_after_hours() {
        let records = vec![record_at(20, "started session 42")];
        let (matrix, _) = extract_features(&records).unwrap();
        let map = matrix.row_as_map(0);
        assert_eq!(map["after_hours"], 0.0);
    }

    #[test]
    fn business_hours_record_is_not_after_hours() {
        let records = vec![record_at(10, "started session 42")];
        let (matrix, _) = extract_features(&records).unwrap();
        let map = matrix.row_as_map(0);
        assert_eq!(map["after_hours"], 0.0);
    }

    #[test]
    fn source_is_encoded_case_insensitively() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
        let records = vec![
            LogRecord::new(ts, "sshd", "a").with_severity(Severity::Medium),
            LogRecord::new(ts, "SSHD", "b").with_severity(Severity::Medium),
        ];
        let (_, tables) = extract_features(&records).unwrap();
        assert_eq!(tables.sources.len(), 1);
    }

    #[test]
    fn keyword_dominant_message_scores_high_risk() {
        let records = vec![record_at(3, "failed password for root from 10.0.0.1 port 22")];
        let (matrix, _) = extract_features(&records).unwrap();
        let map = matrix.row_as_map(0);
        assert!(map["keyword_risk"] >= 0.95);
        assert_eq!(map["has_ip_address"], 1.0);
        assert_eq!(map["has_port_number"], 1.0);
        assert_eq!(map["has_auth_signal"], 1.0);
        assert_eq!(map["has_failure_signal"], 1.0);
    }

    #[test]
    fn clean_message_has_no_signals() {
        let records = vec![record_at(10, "started session 42")];
        let (matrix, _) = extract_features(&records).unwrap();
        let map = matrix.row_as_map(0);
        assert_eq!(map["has_ip_address"], 0.0);
        assert_eq!(map["has_port_number"], 0.0);
        assert_eq!(map["has_failure_signal"], 0.0);
    }

    #[test]
    fn event_id_hash_is_deterministic_across_runs() {
        let mut record = record_at(3, "some event");
        record.event_id = Some("4625".to_string());
        let (a, _) = extract_features(&[record.clone()]).unwrap();
        let (b, _) = extract_features(&[record]).unwrap();
        assert_eq!(a.row_as_map(0)["event_id_hash"], b.row_as_map(0)["event_id_hash"]);
    }

    #[test]
    fn encoder_indices_are_batch_local() {
        let records = vec![record_at(1, "a"), record_at(2, "b")];
        let (_, tables) = extract_features(&records).unwrap();
        assert_eq!(tables.sources.len(), 1);
        assert_eq!(tables.sources.get("sshd"), Some(&0));
    }

    proptest::proptest! {
        #[test]
        fn matrix_shape_matches_batch_size(hours in proptest::collection::vec(0u32..24, 0..20)) {
            let records: Vec<LogRecord> = hours.iter().map(|h| record_at(*h, "some message")).collect();
            let (matrix, _) = extract_features(&records).unwrap();
            proptest::prop_assert_eq!(matrix.len(), records.len());
        }
    }
}
