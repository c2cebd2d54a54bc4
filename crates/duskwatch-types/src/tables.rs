//! Fixed keyword/source risk tables shared by the Feature Extractor (C1),
//! the Keyword Scorer (C4), and the Real-Time Tailer's lightweight variant
//! (C8). Both the feature set and the keyword scorer treat the keyword
//! table and the source table as singular, so one canonical copy lives
//! here rather than being duplicated per consumer.

/// Substring (lowercase) → risk weight in `[0, 1]`. Longer, more specific
/// phrases are listed alongside their single-word components so either a
/// precise match or a looser one contributes a signal.
pub const KEYWORD_WEIGHTS: &[(&str, f64)] = &[
    ("mimikatz", 0.97),
    ("rootkit", 0.97),
    ("ransomware", 0.98),
    ("malware", 0.95),
    ("backdoor", 0.95),
    ("reverse shell", 0.93),
    ("privilege escalation", 0.93),
    ("exploit", 0.92),
    ("credential dump", 0.92),
    ("lateral movement", 0.90),
    ("sql injection", 0.90),
    ("brute force", 0.90),
    ("exfiltrat", 0.90),
    ("powershell -enc", 0.90),
    ("command injection", 0.88),
    ("ddos", 0.85),
    ("buffer overflow", 0.85),
    ("authentication failure", 0.85),
    ("phishing", 0.80),
    ("invalid user", 0.80),
    ("firewall disabled", 0.80),
    ("password", 0.80),
    ("failed password", 0.95),
    ("unauthorized", 0.75),
    ("c2", 0.70),
    ("beacon", 0.65),
    ("port scan", 0.60),
    ("sudo", 0.55),
    ("failed", 0.55),
    ("denied", 0.55),
    ("group policy modified", 0.55),
    ("account locked", 0.50),
    ("rejected", 0.45),
    ("root", 0.45),
    ("new user created", 0.45),
    ("admin", 0.35),
];

/// Lowercase source substring → risk weight; feature extraction falls back
/// to `DEFAULT_SOURCE_RISK` when nothing matches.
pub const SOURCE_WEIGHTS: &[(&str, f64)] = &[
    ("sshd", 0.55),
    ("sudo", 0.55),
    ("auth", 0.50),
    ("firewall", 0.45),
    ("edr", 0.45),
    ("antivirus", 0.40),
    ("kernel", 0.35),
    ("cron", 0.30),
    ("systemd", 0.20),
];

/// Default source risk when no entry in `SOURCE_WEIGHTS` matches.
pub const DEFAULT_SOURCE_RISK: f64 = 0.30;

/// Highest keyword weight whose substring occurs in `lowercased_message`,
/// or `0.0` if none match.
pub fn keyword_risk(lowercased_message: &str) -> f64 {
    KEYWORD_WEIGHTS
        .iter()
        .filter(|(kw, _)| lowercased_message.contains(kw))
        .map(|(_, w)| *w)
        .fold(0.0_f64, f64::max)
}

/// Highest source weight whose substring occurs in `lowercased_source`, or
/// `DEFAULT_SOURCE_RISK` if none match.
pub fn source_risk(lowercased_source: &str) -> f64 {
    SOURCE_WEIGHTS
        .iter()
        .filter(|(src, _)| lowercased_source.contains(src))
        .map(|(_, w)| *w)
        .fold(None, |acc: Option<f64>, w| Some(acc.map_or(w, |a| a.max(w))))
        .unwrap_or(DEFAULT_SOURCE_RISK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_keyword_dominance_message() {
        let msg = "failed password for root from 10.0.0.1 port 22";
        assert!(keyword_risk(msg) >= 0.95, "got {}", keyword_risk(msg));
    }

    #[test]
    fn scenario_clean_message() {
        let msg = "started session 42";
        assert!(keyword_risk(msg) <= 0.35, "got {}", keyword_risk(msg));
    }

    #[test]
    fn unknown_source_falls_back_to_default() {
        assert_eq!(source_risk("some-unlisted-daemon"), DEFAULT_SOURCE_RISK);
    }

    #[test]
    fn known_source_overrides_default() {
        assert_eq!(source_risk("sshd"), 0.55);
    }
}
