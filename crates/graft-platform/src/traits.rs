//! Sealing key abstraction.

use crate::error::Result;
use zeroize::Zeroizing;

/// Nonce length of a sealed blob.
pub const NONCE_LEN: usize = 12;

/// Tag length of a sealed blob.
pub const TAG_LEN: usize = 16;

/// Bytes a sealed blob adds to its plaintext.
pub const SEAL_OVERHEAD: usize = NONCE_LEN + TAG_LEN;

/// Provides the key used to seal exported session state.
///
/// # Format
///
/// Sealed blobs are `nonce[12] || ciphertext || tag[16]` under AES-256-GCM.
/// Every call to [`KeyProvider::encrypt`] must use a fresh nonce.
pub trait KeyProvider: Send + Sync {
    /// The 32-byte sealing key.
    ///
    /// # Errors
    ///
    /// - `Error::Keystore` if the key cannot be produced
    /// - `Error::Unavailable` if no key storage exists
    fn sealing_key(&self) -> Result<Zeroizing<[u8; 32]>>;

    /// Seal `plaintext`.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Open a blob produced by [`KeyProvider::encrypt`].
    ///
    /// # Errors
    ///
    /// - `Error::Truncated` if the blob cannot hold a nonce and tag
    /// - `Error::Keystore` on authentication failure
    fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>>;
}
