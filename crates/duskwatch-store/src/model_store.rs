//! Model Store (C2): persists and restores `DetectorArtifact`s keyed by
//! detector name, with a metadata envelope that lets `load` reject stale
//! or incompatible artifacts instead of handing a detector bad state.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use duskwatch_types::DetectorArtifact;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// On-disk envelope written by `ModelStore::save`.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ModelMetadata {
    name: String,
    feature_arity: usize,
    hyperparameters: BTreeMap<String, String>,
    created_at: DateTime<Utc>,
    integrity_digest: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ModelEnvelope {
    payload: DetectorArtifact,
    metadata: ModelMetadata,
}

/// Legacy pre-metadata layout: the artifact serialized with no envelope at
/// all. Accepted as a best-effort fallback
type LegacyPayload = DetectorArtifact;

/// Filesystem-backed Model Store.
///
/// Writes to a given key are serialized through a per-path lock so two
/// concurrent retrains of the same detector never interleave their writes.
pub struct ModelStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("model store lock table poisoned");
        locks.entry(key.to_string()).or_default().clone()
    }

    /// Write `artifact` under `key`, replacing whatever was there.
    pub fn save(&self, key: &str, artifact: &DetectorArtifact) -> StoreResult<()> {
        let lock = self.lock_for(key);
        let _guard = lock.lock().expect("model store write lock poisoned");

        std::fs::create_dir_all(&self.root)
            .map_err(|e| StoreError::Backend(format!("failed to create model store dir: {e}")))?;

        let metadata = ModelMetadata {
            name: artifact.name.clone(),
            feature_arity: artifact.feature_arity,
            hyperparameters: artifact.hyperparameters.clone(),
            created_at: Utc::now(),
            integrity_digest: String::new(),
        };
        let digest = digest_metadata(&metadata)?;
        let metadata = ModelMetadata {
            integrity_digest: digest,
            ..metadata
        };

        let envelope = ModelEnvelope {
            payload: artifact.clone(),
            metadata,
        };
        let serialized = serde_json::to_vec_pretty(&envelope)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &serialized)
            .map_err(|e| StoreError::Backend(format!("failed to write model artifact: {e}")))?;
        std::fs::rename(&tmp_path, &path)
            .map_err(|e| StoreError::Backend(format!("failed to finalize model artifact: {e}")))?;
        Ok(())
    }

    /// Attempt to restore an artifact, validating it against the caller's
    /// expectations. Returns `(artifact, true)` only on a full match;
    /// `(_, false)` on any mismatch or corruption. Rejected loads are
    /// never an `Err` — retrain and move on is the normal response, not a
    /// failure path.
    pub fn load(
        &self,
        key: &str,
        expected_name: &str,
        expected_feature_arity: usize,
        expected_hyperparameters: &BTreeMap<String, String>,
    ) -> (Option<DetectorArtifact>, bool) {
        let path = self.path_for(key);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(_) => return (None, false),
        };

        if let Ok(envelope) = serde_json::from_slice::<ModelEnvelope>(&bytes) {
            return match validate_envelope(
                &envelope,
                expected_name,
                expected_feature_arity,
                expected_hyperparameters,
            ) {
                true => (Some(envelope.payload), true),
                false => {
                    tracing::warn!(key, "model store load rejected: metadata mismatch");
                    (None, false)
                }
            };
        }

        // Fall back to the unversioned payload-only layout. We cannot check
        // arity or hyperparameters against it, so this is strictly
        // best-effort and only trusted by name.
        match serde_json::from_slice::<LegacyPayload>(&bytes) {
            Ok(payload) if payload.name == expected_name => (Some(payload), true),
            Ok(_) => {
                tracing::warn!(key, "model store load rejected: legacy artifact name mismatch");
                (None, false)
            }
            Err(_) => {
                tracing::warn!(key, "model store load rejected: deserialization failure");
                (None, false)
            }
        }
    }
}

fn validate_envelope(
    envelope: &ModelEnvelope,
    expected_name: &str,
    expected_feature_arity: usize,
    expected_hyperparameters: &BTreeMap<String, String>,
) -> bool {
    let recomputed = match digest_metadata(&ModelMetadata {
        integrity_digest: String::new(),
        ..envelope.metadata.clone()
    }) {
        Ok(d) => d,
        Err(_) => return false,
    };

    recomputed == envelope.metadata.integrity_digest
        && envelope.metadata.name == expected_name
        && envelope.metadata.feature_arity == expected_feature_arity
        && &envelope.metadata.hyperparameters == expected_hyperparameters
}

fn digest_metadata(metadata: &ModelMetadata) -> StoreResult<String> {
    let bytes =
        serde_json::to_vec(metadata).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Convenience for callers that only know the store's root directory.
pub fn default_root(base: impl AsRef<Path>) -> PathBuf {
    base.as_ref().join("models")
}
