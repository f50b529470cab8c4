// ============================
// crates/backend-lib/src/auth/key.rs
// ============================
//! Signing key derivation.
//!
//! The configured secret is turned into a fixed 64-byte HMAC-SHA-512 key by
//! zero-padding or truncating its UTF-8 bytes. This keeps tokens issued by
//! earlier deployments verifiable. It performs no key stretching.
use std::fmt;
use zeroize::Zeroize;

/// Length of the HMAC-SHA-512 signing key in bytes
pub const SIGNING_KEY_LEN: usize = 64;

/// Fixed-length key material for token signatures. Wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey([u8; SIGNING_KEY_LEN]);

impl SigningKey {
    /// Derive a key from a configured secret of any length
    pub fn derive(secret: &str) -> Self {
        let bytes = secret.as_bytes();
        let mut key = [0u8; SIGNING_KEY_LEN];
        let len = bytes.len().min(SIGNING_KEY_LEN);
        key[..len].copy_from_slice(&bytes[..len]);
        Self(key)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNING_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}

impl Drop for SigningKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}
