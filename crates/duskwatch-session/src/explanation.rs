//! Deterministic narrative text attached to each anomaly.

use std::collections::BTreeMap;

fn feature(features: &BTreeMap<String, f64>, name: &str) -> f64 {
    features.get(name).copied().unwrap_or(0.0)
}

/// Builds the explanation string for one feature row, given its calibrated
/// score.
pub fn explain(score: f64, features: &BTreeMap<String, f64>) -> String {
    let mut phrases = Vec::new();

    if feature(features, "after_hours") >= 1.0 {
        let hour = feature(features, "hour_of_day") as u32;
        phrases.push(format!("activity at unusual hour ({hour:02}:00)"));
    }

    let keyword_risk = feature(features, "keyword_risk");
    if keyword_risk >= 0.85 {
        phrases.push("high-risk keywords detected".to_string());
    } else if keyword_risk >= 0.60 {
        phrases.push("suspicious keywords present".to_string());
    }

    if feature(features, "has_failure_signal") >= 1.0 {
        phrases.push("authentication/access failure".to_string());
    }

    if feature(features, "has_privilege_signal") >= 1.0 {
        phrases.push("privilege escalation activity".to_string());
    }

    if feature(features, "severity_level") >= 4.0 {
        phrases.push("high severity event".to_string());
    }

    if feature(features, "message_length") > 300.0 {
        phrases.push("unusually long message".to_string());
    }

    if feature(features, "source_risk") >= 0.60 {
        phrases.push("high-risk source".to_string());
    }

    if phrases.is_empty() {
        format!("Statistical anomaly detected (score {score:.3})")
    } else {
        format!("Anomaly (score {score:.3}): {}", phrases.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features_with(overrides: &[(&str, f64)]) -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        for (name, value) in overrides {
            map.insert(name.to_string(), *value);
        }
        map
    }

    #[test]
    fn no_rules_fire_falls_back_to_generic_statement() {
        let features = features_with(&[]);
        assert_eq!(explain(0.6, &features), "Statistical anomaly detected (score 0.600)");
    }

    #[test]
    fn after_hours_includes_the_hour() {
        let features = features_with(&[("after_hours", 1.0), ("hour_of_day", 3.0)]);
        let text = explain(0.9, &features);
        assert!(text.contains("activity at unusual hour (03:00)"));
        assert!(text.starts_with("Anomaly (score 0.900): "));
    }

    #[test]
    fn keyword_risk_tiers_are_mutually_exclusive() {
        let high = features_with(&[("keyword_risk", 0.9)]);
        let medium = features_with(&[("keyword_risk", 0.65)]);
        assert!(explain(0.5, &high).contains("high-risk keywords detected"));
        assert!(explain(0.5, &medium).contains("suspicious keywords present"));
        assert!(!explain(0.5, &medium).contains("high-risk keywords detected"));
    }

    #[test]
    fn multiple_rules_join_with_semicolons() {
        let features = features_with(&[("has_failure_signal", 1.0), ("has_privilege_signal", 1.0)]);
        let text = explain(0.95, &features);
        assert!(text.contains("authentication/access failure; privilege escalation activity"));
    }
}
