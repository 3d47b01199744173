use crate::*;
use digest::Digest;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;

/// A voter's long-term identity key
pub type PrivateKey = ed25519_dalek::SecretKey;

pub fn generate_private_key() -> PrivateKey {
    let mut csprng = rand::rngs::OsRng {};
    PrivateKey::generate(&mut csprng)
}

/// SHA-256 over the concatenation of `parts`
pub fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// A record that travels over the broadcast log.
///
/// This trait should be considered sealed and should not be implemented outside this crate
#[doc(hidden)]
pub trait Record: Serialize + DeserializeOwned {
    /// Canonical CBOR bytes, used for hashing and signing
    fn as_bytes(&self) -> Vec<u8> {
        serde_cbor::to_vec(&self).expect("pebble: unexpected error serializing record")
    }

    /// Unpack from either JSON or CBOR bytes
    fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        // If it starts with `{` then it's JSON
        if bytes.first() == Some(&b'{') {
            Ok(serde_json::from_slice(bytes)?)
        } else {
            Ok(serde_cbor::from_slice(bytes)?)
        }
    }
}
