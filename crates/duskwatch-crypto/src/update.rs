use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CryptoError, CryptoResult};
use crate::keys::verify;

/// The SOUP update format consumed by an external update collaborator:
/// `{payload, hash, signature, algorithm, hash_algorithm}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateEnvelope {
    pub payload: String,
    pub hash: String,
    pub signature: String,
    pub algorithm: String,
    pub hash_algorithm: String,
}

/// The decoded shape of a verified envelope's `payload` field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdatePayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
    pub data: serde_json::Value,
    pub metadata: serde_json::Value,
}

/// Verify a SOUP update envelope against `public_key_pem`.
///
/// Rejects if the SHA-256 of `payload` differs from `hash`, or the
/// signature does not validate over the payload bytes.
pub fn verify_update(public_key_pem: &str, envelope: &UpdateEnvelope) -> CryptoResult<UpdatePayload> {
    if envelope.algorithm != "RSA-PSS" {
        return Err(CryptoError::UpdateEnvelopeMissingField("algorithm"));
    }
    if envelope.hash_algorithm != "SHA256" {
        return Err(CryptoError::UpdateEnvelopeMissingField("hash_algorithm"));
    }

    let computed_hash = hex::encode(Sha256::digest(envelope.payload.as_bytes()));
    if !constant_time_eq(computed_hash.as_bytes(), envelope.hash.as_bytes()) {
        return Err(CryptoError::UpdateHashMismatch);
    }

    use base64::Engine;
    let signature_bytes = base64::engine::general_purpose::STANDARD
        .decode(envelope.signature.as_bytes())
        .map_err(|e| CryptoError::MalformedKey(e.to_string()))?;

    let valid = verify(public_key_pem, envelope.payload.as_bytes(), &signature_bytes)?;
    if !valid {
        return Err(CryptoError::VerificationFailed);
    }

    serde_json::from_str(&envelope.payload).map_err(|e| CryptoError::Io(e.to_string()))
}

/// Constant-time byte comparison; avoids a short-circuiting hash check
/// leaking timing information about how many leading hex digits matched.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_keypair, sign};
    use base64::Engine;

    fn make_envelope(private_key_pem: &str, payload: &str) -> UpdateEnvelope {
        let hash = hex::encode(Sha256::digest(payload.as_bytes()));
        let signature = sign(private_key_pem, payload.as_bytes()).unwrap();
        UpdateEnvelope {
            payload: payload.to_string(),
            hash,
            signature: base64::engine::general_purpose::STANDARD.encode(signature),
            algorithm: "RSA-PSS".to_string(),
            hash_algorithm: "SHA256".to_string(),
        }
    }

    #[test]
    fn valid_envelope_round_trips() {
        let pair = generate_keypair().unwrap();
        let payload = r#"{"type":"model-update","version":"1.2.3","data":{},"metadata":{}}"#;
        let envelope = make_envelope(&pair.private_key_pem, payload);
        let decoded = verify_update(&pair.public_key_pem, &envelope).unwrap();
        assert_eq!(decoded.kind, "model-update");
        assert_eq!(decoded.version, "1.2.3");
    }

    #[test]
    fn tampered_hash_is_rejected() {
        let pair = generate_keypair().unwrap();
        let payload = r#"{"type":"model-update","version":"1.2.3","data":{},"metadata":{}}"#;
        let mut envelope = make_envelope(&pair.private_key_pem, payload);
        envelope.hash = "0".repeat(64);
        assert!(matches!(
            verify_update(&pair.public_key_pem, &envelope),
            Err(CryptoError::UpdateHashMismatch)
        ));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let pair = generate_keypair().unwrap();
        let payload = r#"{"type":"model-update","version":"1.2.3","data":{},"metadata":{}}"#;
        let other_pair = generate_keypair().unwrap();
        let envelope = make_envelope(&other_pair.private_key_pem, payload);
        assert!(verify_update(&pair.public_key_pem, &envelope).is_err());
    }
}
