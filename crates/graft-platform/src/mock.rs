//! In-process key provider for tests and tooling.

use crate::error::{Error, Result};
use crate::traits::{KeyProvider, NONCE_LEN, SEAL_OVERHEAD};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

/// Key provider holding its key in memory.
///
/// # Example
///
/// ```
/// use graft_platform::mock::MockKeyProvider;
/// use graft_platform::traits::KeyProvider;
///
/// let a = MockKeyProvider::new_deterministic();
/// let b = MockKeyProvider::new_deterministic();
/// let sealed = a.encrypt(b"state").unwrap();
/// assert_eq!(b.decrypt(&sealed).unwrap(), b"state");
/// ```
#[derive(Clone)]
pub struct MockKeyProvider {
    key: Arc<Zeroizing<[u8; 32]>>,
}

impl MockKeyProvider {
    /// Provider with a fixed key shared by every deterministic instance.
    pub fn new_deterministic() -> Self {
        Self::with_key([0x42u8; 32])
    }

    /// Provider with a fresh random key.
    pub fn new_random() -> Self {
        let mut key = Zeroizing::new([0u8; 32]);
        rand::rngs::OsRng.fill_bytes(&mut *key);
        Self { key: Arc::new(key) }
    }

    /// Provider with an explicit key.
    pub fn with_key(key: [u8; 32]) -> Self {
        Self {
            key: Arc::new(Zeroizing::new(key)),
        }
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&**self.key)
            .map_err(|e| Error::Keystore(format!("Cipher init failed: {}", e)))
    }
}

impl std::fmt::Debug for MockKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockKeyProvider").finish_non_exhaustive()
    }
}

impl KeyProvider for MockKeyProvider {
    fn sealing_key(&self) -> Result<Zeroizing<[u8; 32]>> {
        Ok(Zeroizing::new(**self.key))
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| Error::Keystore(format!("Encryption failed: {}", e)))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        debug!(plaintext_len = plaintext.len(), sealed_len = sealed.len(), "sealed");
        Ok(sealed)
    }

    fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < SEAL_OVERHEAD {
            return Err(Error::Truncated(sealed.len()));
        }
        let (nonce, body) = sealed.split_at(NONCE_LEN);

        self.cipher()?
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|e| Error::Keystore(format!("Decryption failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_keys_match() {
        let key1 = MockKeyProvider::new_deterministic().sealing_key().unwrap();
        let key2 = MockKeyProvider::new_deterministic().sealing_key().unwrap();
        assert_eq!(*key1, *key2);
    }

    #[test]
    fn test_random_keys_differ() {
        let key1 = MockKeyProvider::new_random().sealing_key().unwrap();
        let key2 = MockKeyProvider::new_random().sealing_key().unwrap();
        assert_ne!(*key1, *key2);
    }

    #[test]
    fn test_with_key() {
        let provider = MockKeyProvider::with_key([0x99u8; 32]);
        assert_eq!(*provider.sealing_key().unwrap(), [0x99u8; 32]);
    }

    #[test]
    fn test_seal_open() {
        let provider = MockKeyProvider::new_deterministic();
        let sealed = provider.encrypt(b"exported session").unwrap();
        assert_eq!(sealed.len(), b"exported session".len() + SEAL_OVERHEAD);
        assert_eq!(provider.decrypt(&sealed).unwrap(), b"exported session");
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let provider = MockKeyProvider::new_deterministic();
        let a = provider.encrypt(b"same").unwrap();
        let b = provider.encrypt(b"same").unwrap();
        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = MockKeyProvider::new_deterministic()
            .encrypt(b"secret")
            .unwrap();
        assert!(matches!(
            MockKeyProvider::new_random().decrypt(&sealed),
            Err(Error::Keystore(_))
        ));
    }

    #[test]
    fn test_tampered_blob_fails() {
        let provider = MockKeyProvider::new_deterministic();
        let mut sealed = provider.encrypt(b"state").unwrap();
        if let Some(byte) = sealed.last_mut() {
            *byte ^= 0x01;
        }
        assert!(provider.decrypt(&sealed).is_err());
    }

    #[test]
    fn test_truncated_blob() {
        let provider = MockKeyProvider::new_deterministic();
        assert!(matches!(
            provider.decrypt(&[0u8; SEAL_OVERHEAD - 1]),
            Err(Error::Truncated(27))
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let rendered = format!("{:?}", MockKeyProvider::with_key([0xABu8; 32]));
        assert_eq!(rendered, "MockKeyProvider { .. }");
    }
}
