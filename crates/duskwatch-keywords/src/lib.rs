//! Keyword Scorer (C4): a pure, deterministic rule engine that turns a
//! batch of raw records into a per-record score in `[0, 1]`

#![deny(unsafe_code)]

use duskwatch_types::{keyword_risk, source_risk, LogRecord, Severity, SOURCE_WEIGHTS};

/// Baseline score assigned from a record's severity.
///
/// `LogRecord::severity` is folded to the canonical five-level enum at
/// construction time (ERROR -> High, WARN/WARNING -> Medium), which would
/// otherwise lose the WARN/WARNING baseline this system's upstream
/// documentation calls out as distinct from MEDIUM. `raw_severity` (the
/// pre-fold text) is consulted first so that distinction survives; records
/// with no raw text fall back to the folded enum. `Low` has no documented
/// baseline; it is interpolated between `Medium` and `Info`.
fn severity_baseline(severity: Severity, raw_severity: Option<&str>) -> f64 {
    if let Some(raw) = raw_severity {
        if raw.eq_ignore_ascii_case("warn") || raw.eq_ignore_ascii_case("warning") {
            return 0.45;
        }
    }
    match severity {
        Severity::Critical => 0.85,
        Severity::High => 0.70,
        Severity::Medium => 0.50,
        Severity::Low => 0.35,
        Severity::Info => 0.25,
        Severity::Debug => 0.10,
    }
}

/// Score one record: severity baseline, raised by the fixed keyword table,
/// then by the fixed source table (each source hit dampened by `0.9`).
pub fn score_record(record: &LogRecord) -> f64 {
    let mut score = severity_baseline(record.severity, record.raw_severity.as_deref());

    let lowered_message = record.message.to_lowercase();
    let keyword_hit = keyword_risk(&lowered_message);
    if keyword_hit > 0.0 {
        score = score.max(keyword_hit);
    }

    let lowered_source = record.source.to_lowercase();
    if SOURCE_WEIGHTS.iter().any(|(prefix, _)| lowered_source.contains(prefix)) {
        let source_hit = source_risk(&lowered_source);
        score = score.max(source_hit) * 0.9;
    }

    score.clamp(0.0, 1.0)
}

/// Score every record in a batch, preserving order.
pub fn score_batch(records: &[LogRecord]) -> Vec<f64> {
    records.iter().map(score_record).collect()
}
