//! TLS 1.3 cipher suite definitions (RFC 8446 §B.4).

/// Cipher suites the record layer can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CipherSuite {
    /// TLS_AES_128_GCM_SHA256
    Aes128GcmSha256 = 0x1301,

    /// TLS_AES_256_GCM_SHA384
    Aes256GcmSha384 = 0x1302,

    /// TLS_CHACHA20_POLY1305_SHA256
    ChaCha20Poly1305Sha256 = 0x1303,
}

impl CipherSuite {
    /// Convert from wire format (u16).
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x1301 => Some(Self::Aes128GcmSha256),
            0x1302 => Some(Self::Aes256GcmSha384),
            0x1303 => Some(Self::ChaCha20Poly1305Sha256),
            _ => None,
        }
    }

    /// Convert to wire format (u16).
    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// Get the AEAD algorithm for this suite.
    pub fn aead_algorithm(&self) -> AeadAlgorithm {
        match self {
            Self::Aes128GcmSha256 => AeadAlgorithm::Aes128Gcm,
            Self::Aes256GcmSha384 => AeadAlgorithm::Aes256Gcm,
            Self::ChaCha20Poly1305Sha256 => AeadAlgorithm::ChaCha20Poly1305,
        }
    }

    /// Get the handshake hash used for key derivation.
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        match self {
            Self::Aes256GcmSha384 => HashAlgorithm::Sha384,
            Self::Aes128GcmSha256 | Self::ChaCha20Poly1305Sha256 => HashAlgorithm::Sha256,
        }
    }

    /// AEAD key length in bytes.
    pub fn key_len(&self) -> usize {
        match self.aead_algorithm() {
            AeadAlgorithm::Aes128Gcm => 16,
            AeadAlgorithm::Aes256Gcm | AeadAlgorithm::ChaCha20Poly1305 => 32,
        }
    }
}

/// AEAD algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadAlgorithm {
    /// AES-128-GCM (NIST SP 800-38D).
    Aes128Gcm,
    /// AES-256-GCM (NIST SP 800-38D).
    Aes256Gcm,
    /// ChaCha20-Poly1305 (RFC 8439).
    ChaCha20Poly1305,
}

/// Hash algorithms used by HKDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// SHA-256 (32-byte output).
    Sha256,
    /// SHA-384 (48-byte output).
    Sha384,
}

impl HashAlgorithm {
    /// Digest length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cipher_suite_roundtrip() {
        for suite in [
            CipherSuite::Aes128GcmSha256,
            CipherSuite::Aes256GcmSha384,
            CipherSuite::ChaCha20Poly1305Sha256,
        ] {
            assert_eq!(CipherSuite::from_u16(suite.to_u16()), Some(suite));
        }
    }

    #[test]
    fn test_unknown_suite() {
        assert_eq!(CipherSuite::from_u16(0x0005), None);
        assert_eq!(CipherSuite::from_u16(0xC02F), None);
    }

    #[test]
    fn test_key_lengths() {
        assert_eq!(CipherSuite::Aes128GcmSha256.key_len(), 16);
        assert_eq!(CipherSuite::Aes256GcmSha384.key_len(), 32);
        assert_eq!(CipherSuite::ChaCha20Poly1305Sha256.key_len(), 32);
        assert_eq!(CipherSuite::Aes256GcmSha384.hash_algorithm().output_len(), 48);
    }
}
