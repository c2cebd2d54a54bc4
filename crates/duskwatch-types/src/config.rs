use std::env;

/// Process-wide configuration recognized via environment variables. Read
/// once at start-up; threaded down explicitly to the services that need
/// it rather than accessed as a global.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    pub svm_max_samples: usize,
    pub large_dataset_threshold: usize,
    pub anomaly_threshold: f64,
    pub contamination: f64,
    pub random_seed: u64,
    pub batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            svm_max_samples: 10_000,
            large_dataset_threshold: 100_000,
            anomaly_threshold: 0.95,
            contamination: 0.01,
            random_seed: 42,
            batch_size: 10_000,
        }
    }
}

impl Config {
    /// Read configuration from the process environment, falling back to
    /// the documented defaults for anything missing or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            svm_max_samples: env_positive_usize("AI_SVM_MAX_SAMPLES")
                .unwrap_or(defaults.svm_max_samples),
            large_dataset_threshold: env_positive_usize("AI_LARGE_DATASET_THRESHOLD")
                .unwrap_or(defaults.large_dataset_threshold),
            anomaly_threshold: env_f64("AI_ANOMALY_THRESHOLD", defaults.anomaly_threshold),
            contamination: env_f64("AI_CONTAMINATION", defaults.contamination),
            random_seed: env_u64("AI_RANDOM_SEED", defaults.random_seed),
            batch_size: env_positive_usize("BATCH_SIZE").unwrap_or(defaults.batch_size),
        }
    }
}

/// Parses an environment variable as a strictly positive integer; a
/// missing, unparsable, or non-positive value is treated as "unset" so the
/// caller falls back to its default.
fn env_positive_usize(key: &str) -> Option<usize> {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map(|v| v as usize)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|v| v.parse::<f64>().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse::<u64>().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_stable() {
        let cfg = Config::default();
        assert_eq!(cfg.svm_max_samples, 10_000);
        assert_eq!(cfg.large_dataset_threshold, 100_000);
        assert!((cfg.anomaly_threshold - 0.95).abs() < f64::EPSILON);
        assert!((cfg.contamination - 0.01).abs() < f64::EPSILON);
        assert_eq!(cfg.random_seed, 42);
        assert_eq!(cfg.batch_size, 10_000);
    }
}
