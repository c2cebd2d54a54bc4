//! Best-effort ingestion of a plain-text log file into a `LogStore`.
//!
//! Source-file parsing is an external collaborator's concern; this just
//! reuses the tailer's line-parsing templates so a local file can be
//! pushed through the same pipeline the real-time path uses, for manual
//! exercise of `analyze`/`export` without a running log source.

use std::path::Path;

use chrono::{Duration, Utc};
use duskwatch_store::LogStore;
use duskwatch_tailer::parse_line;
use duskwatch_types::LogRecord;

pub async fn ingest_file<S: LogStore>(store: &S, path: &Path) -> anyhow::Result<u64> {
    let contents = std::fs::read_to_string(path)?;
    let now = Utc::now();
    let lines: Vec<&str> = contents.lines().filter(|l| !l.trim().is_empty()).collect();
    let mut ingested = 0u64;

    for (idx, line) in lines.iter().enumerate() {
        let fields = parse_line(line);
        let message = fields.get("message").cloned().unwrap_or_else(|| line.to_string());
        let source = fields.get("tag").or_else(|| fields.get("appname")).cloned().unwrap_or_else(|| "unknown".to_string());

        // No parser here resolves the original timestamp to a calendar
        // date (RFC-3164 lines omit the year); records are stamped by
        // ingestion order instead, oldest first.
        let timestamp = now - Duration::milliseconds((lines.len() - idx) as i64);

        let mut record = LogRecord::new(timestamp, source, message);
        record.raw = line.to_string();
        record.hostname = fields.get("hostname").cloned();
        record.process_id = fields.get("pid").and_then(|pid| pid.parse().ok());

        store.append(record).await?;
        ingested += 1;
    }

    Ok(ingested)
}
