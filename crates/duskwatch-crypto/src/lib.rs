//! Key material collaborator: RSA-PSS-SHA256 signing and verification,
//! node identity persistence, and SOUP update-envelope verification.

#![deny(unsafe_code)]

mod canonical;
mod error;
mod identity;
mod keys;
mod update;

pub use canonical::canonical_json;
pub use error::{CryptoError, CryptoResult};
pub use identity::load_or_create_node_identity;
pub use keys::{generate_keypair, sign, verify, GeneratedKeyPair, RSA_KEY_BITS};
pub use update::{verify_update, UpdateEnvelope, UpdatePayload};
