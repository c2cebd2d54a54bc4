use serde::Serialize;

use crate::error::{CryptoError, CryptoResult};

/// Canonical JSON encoding used for everything a signature covers: UTF-8,
/// object keys sorted, no extraneous whitespace.
///
/// `serde_json`'s default `Map` is backed by a `BTreeMap` (the
/// `preserve_order` feature is not enabled anywhere in this workspace), so
/// serializing through `serde_json::Value` already sorts object keys; this
/// function exists so every call site gets that guarantee by construction
/// rather than by accident of which feature flags happen to be active.
pub fn canonical_json<T: Serialize>(value: &T) -> CryptoResult<Vec<u8>> {
    let as_value = serde_json::to_value(value).map_err(|e| CryptoError::Io(e.to_string()))?;
    serde_json::to_vec(&as_value).map_err(|e| CryptoError::Io(e.to_string()))
}
