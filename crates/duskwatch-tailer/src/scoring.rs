//! Lightweight per-line scoring: the same keyword/source tables the
//! batch keyword scorer uses, but with a fixed baseline instead of a
//! severity-derived one, since a freshly tailed line has no severity
//! assigned yet.

use chrono::{DateTime, Utc};
use duskwatch_types::{keyword_risk, source_risk, SeverityBand, SOURCE_WEIGHTS};

const BASELINE: f64 = 0.20;
const AFTER_HOURS_BONUS: f64 = 0.10;

pub fn quick_score(message: &str, source: Option<&str>, now: DateTime<Utc>) -> f64 {
    let mut score = BASELINE;

    let lowered_message = message.to_lowercase();
    let keyword_hit = keyword_risk(&lowered_message);
    if keyword_hit > 0.0 {
        score = score.max(keyword_hit);
    }

    if let Some(source) = source {
        let lowered_source = source.to_lowercase();
        if SOURCE_WEIGHTS.iter().any(|(prefix, _)| lowered_source.contains(prefix)) {
            let source_hit = source_risk(&lowered_source);
            score = score.max(source_hit) * 0.9;
        }
    }

    let hour = now.format("%H").to_string().parse::<u32>().unwrap_or(12);
    if hour < 6 || hour > 22 {
        score = (score + AFTER_HOURS_BONUS).min(1.0);
    }

    score.clamp(0.0, 1.0)
}

pub fn band_for(score: f64) -> SeverityBand {
    SeverityBand::from_score(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn clean_message_sits_at_baseline() {
        let score = quick_score("session opened for user alice", None, noon());
        assert!((0.20..0.40).contains(&score), "got {score}");
    }

    #[test]
    fn keyword_hit_dominates_baseline() {
        let score = quick_score("mimikatz detected on host", None, noon());
        assert!(score >= 0.95, "got {score}");
    }

    #[test]
    fn after_hours_adds_a_fixed_bonus() {
        let late = Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap();
        let day_score = quick_score("plain message", None, noon());
        let night_score = quick_score("plain message", None, late);
        assert!((night_score - day_score - AFTER_HOURS_BONUS).abs() < 1e-9);
    }

    #[test]
    fn score_never_exceeds_one() {
        let late = Utc.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap();
        let score = quick_score("ransomware exfiltration backdoor", Some("sshd"), late);
        assert!(score <= 1.0);
    }
}
