use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use sha2::{Digest, Sha256};

/// Derives deterministic identifiers for shared catalog entities
///
/// An identifier is the normalized entity name followed by a hex-encoded
/// AES-256-GCM ciphertext of that name: `"<NORMALIZED>-<hex>"`. The cipher
/// key comes from the configured secret and the nonce from the name itself,
/// so equal names always yield equal identifiers and different names yield
/// different ones. No randomness, no I/O.
#[derive(Clone)]
pub struct HashIdentity {
    cipher: Aes256Gcm,
}

impl HashIdentity {
    /// Create a generator keyed by the given secret
    pub fn new(secret: &str) -> Self {
        let key_bytes = Sha256::digest(secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);

        HashIdentity {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Derive the identifier for an entity name
    ///
    /// The name is normalized (trimmed, inner whitespace stripped, uppercased)
    /// before hashing, so callers may pass display-form names. If the cipher
    /// fails the identifier degrades to a truncated SHA-256 digest of the
    /// name: still deterministic and collision resistant, no longer
    /// reversible. The downgrade is logged.
    pub fn derive(&self, name: &str) -> String {
        let normalized = normalize_identity_input(name);
        let digest = Sha256::digest(normalized.as_bytes());
        let nonce = Nonce::from_slice(&digest[..12]);

        match self.cipher.encrypt(nonce, normalized.as_bytes()) {
            Ok(ciphertext) => format!("{}-{}", normalized, hex::encode(ciphertext)),
            Err(_) => {
                tracing::warn!(
                    entity_name = %normalized,
                    "identifier cipher failed, falling back to digest identifier"
                );
                let digest_hex = hex::encode(digest);
                format!("{}-{}", normalized, &digest_hex[..32])
            }
        }
    }
}

/// Strip all whitespace and uppercase, the canonical form hashed into ids
fn normalize_identity_input(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}
