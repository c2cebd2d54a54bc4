use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Normalized severity of a `LogRecord`, folding the synonyms a collaborator
/// parser may hand us (`ERROR`, `WARN`/`WARNING`, `DEBUG`) into the five
/// canonical levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
    Debug,
}

impl Severity {
    /// Numeric level used by feature extraction
    pub fn level(self) -> u8 {
        match self {
            Severity::Critical => 5,
            Severity::High => 4,
            Severity::Medium => 3,
            Severity::Low => 2,
            Severity::Info => 1,
            Severity::Debug => 0,
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Info
    }
}

impl FromStr for Severity {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "CRITICAL" => Severity::Critical,
            "HIGH" | "ERROR" => Severity::High,
            "MEDIUM" | "WARN" | "WARNING" => Severity::Medium,
            "LOW" => Severity::Low,
            "DEBUG" => Severity::Debug,
            _ => Severity::Info,
        })
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Info => "INFO",
            Severity::Debug => "DEBUG",
        };
        write!(f, "{s}")
    }
}

/// Named bucket assigned from a calibrated anomaly score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeverityBand {
    Critical,
    High,
    Medium,
    Low,
}

impl SeverityBand {
    /// Band a calibrated score (expected to already lie in `[0.1, 0.99]`,
    /// but any finite value is accepted).
    pub fn from_score(score: f64) -> Self {
        if score >= 0.90 {
            SeverityBand::Critical
        } else if score >= 0.75 {
            SeverityBand::High
        } else if score >= 0.55 {
            SeverityBand::Medium
        } else {
            SeverityBand::Low
        }
    }
}

impl std::fmt::Display for SeverityBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SeverityBand::Critical => "CRITICAL",
            SeverityBand::High => "HIGH",
            SeverityBand::Medium => "MEDIUM",
            SeverityBand::Low => "LOW",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synonyms_fold_correctly() {
        assert_eq!("ERROR".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!("WARN".parse::<Severity>().unwrap(), Severity::Medium);
        assert_eq!("WARNING".parse::<Severity>().unwrap(), Severity::Medium);
        assert_eq!("DEBUG".parse::<Severity>().unwrap(), Severity::Debug);
        assert_eq!("nonsense".parse::<Severity>().unwrap(), Severity::Info);
    }

    #[test]
    fn levels_are_monotonic_with_rank() {
        assert!(Severity::Critical.level() > Severity::High.level());
        assert!(Severity::High.level() > Severity::Medium.level());
        assert!(Severity::Medium.level() > Severity::Low.level());
        assert!(Severity::Low.level() > Severity::Info.level());
        assert!(Severity::Info.level() > Severity::Debug.level());
    }

    #[test]
    fn severity_band_thresholds() {
        assert_eq!(SeverityBand::from_score(0.95), SeverityBand::Critical);
        assert_eq!(SeverityBand::from_score(0.90), SeverityBand::Critical);
        assert_eq!(SeverityBand::from_score(0.89), SeverityBand::High);
        assert_eq!(SeverityBand::from_score(0.75), SeverityBand::High);
        assert_eq!(SeverityBand::from_score(0.60), SeverityBand::Medium);
        assert_eq!(SeverityBand::from_score(0.1), SeverityBand::Low);
    }
}
