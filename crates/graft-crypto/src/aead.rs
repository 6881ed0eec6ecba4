//! AEAD (Authenticated Encryption with Associated Data) for record protection.
//!
//! Implements:
//! - AES-128-GCM and AES-256-GCM (NIST SP 800-38D)
//! - ChaCha20-Poly1305 (RFC 8439)
//!
//! All algorithms use 12-byte nonces and append a 16-byte tag.

use crate::suite::AeadAlgorithm;
use crate::{Error, Result};
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use chacha20poly1305::{ChaCha20Poly1305, Key};
use zeroize::Zeroizing;

/// Nonce length shared by every supported AEAD.
pub const NONCE_LEN: usize = 12;

/// Authentication tag length shared by every supported AEAD.
pub const TAG_LEN: usize = 16;

/// Construct a per-record nonce per RFC 8446 §5.3.
///
/// The 64-bit sequence number is encoded big-endian, left-padded to the IV
/// length and XORed with the static IV.
///
/// # Example
/// ```
/// use graft_crypto::aead::construct_nonce;
///
/// let iv = [0u8; 12];
/// let nonce = construct_nonce(&iv, 1);
/// assert_eq!(nonce[11], 1);
/// assert_eq!(&nonce[..11], &[0u8; 11]);
/// ```
pub fn construct_nonce(iv: &[u8; NONCE_LEN], seq: u64) -> [u8; NONCE_LEN] {
    let mut nonce = *iv;
    for (n, s) in nonce[4..].iter_mut().zip(seq.to_be_bytes()) {
        *n ^= s;
    }
    nonce
}

/// Encrypt `plaintext` with the given algorithm.
///
/// Returns ciphertext with the 16-byte tag appended.
pub fn seal(
    algorithm: AeadAlgorithm,
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    match algorithm {
        AeadAlgorithm::Aes128Gcm => aes128gcm_encrypt(fixed_key(key)?, nonce, plaintext, aad),
        AeadAlgorithm::Aes256Gcm => aes256gcm_encrypt(fixed_key(key)?, nonce, plaintext, aad),
        AeadAlgorithm::ChaCha20Poly1305 => {
            chacha20poly1305_encrypt(fixed_key(key)?, nonce, plaintext, aad)
        }
    }
}

/// Decrypt and authenticate `ciphertext_and_tag` with the given algorithm.
pub fn open(
    algorithm: AeadAlgorithm,
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    ciphertext_and_tag: &[u8],
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    match algorithm {
        AeadAlgorithm::Aes128Gcm => {
            aes128gcm_decrypt(fixed_key(key)?, nonce, ciphertext_and_tag, aad)
        }
        AeadAlgorithm::Aes256Gcm => {
            aes256gcm_decrypt(fixed_key(key)?, nonce, ciphertext_and_tag, aad)
        }
        AeadAlgorithm::ChaCha20Poly1305 => {
            chacha20poly1305_decrypt(fixed_key(key)?, nonce, ciphertext_and_tag, aad)
        }
    }
}

fn fixed_key<const N: usize>(key: &[u8]) -> Result<&[u8; N]> {
    key.try_into().map_err(|_| Error::InvalidLength {
        expected: N,
        actual: key.len(),
    })
}

/// Encrypt with AES-128-GCM.
pub fn aes128gcm_encrypt(
    key: &[u8; 16],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes128Gcm::new_from_slice(key)
        .map_err(|_| Error::Encryption("Invalid AES-128-GCM key length".into()))?;

    cipher
        .encrypt(GenericArray::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|_| Error::Encryption("AES-128-GCM encryption failed".into()))
}

/// Decrypt with AES-128-GCM.
///
/// # Errors
/// Returns `Error::Decryption` if tag verification fails.
pub fn aes128gcm_decrypt(
    key: &[u8; 16],
    nonce: &[u8; NONCE_LEN],
    ciphertext_and_tag: &[u8],
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = Aes128Gcm::new_from_slice(key)
        .map_err(|_| Error::Decryption("Invalid AES-128-GCM key length".into()))?;

    let plaintext = cipher
        .decrypt(
            GenericArray::from_slice(nonce),
            Payload {
                msg: ciphertext_and_tag,
                aad,
            },
        )
        .map_err(|_| Error::Decryption("AES-128-GCM authentication failed".into()))?;

    Ok(Zeroizing::new(plaintext))
}

/// Encrypt with AES-256-GCM.
pub fn aes256gcm_encrypt(
    key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| Error::Encryption("Invalid AES-256-GCM key length".into()))?;

    cipher
        .encrypt(GenericArray::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|_| Error::Encryption("AES-256-GCM encryption failed".into()))
}

/// Decrypt with AES-256-GCM.
///
/// # Errors
/// Returns `Error::Decryption` if tag verification fails.
pub fn aes256gcm_decrypt(
    key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    ciphertext_and_tag: &[u8],
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| Error::Decryption("Invalid AES-256-GCM key length".into()))?;

    let plaintext = cipher
        .decrypt(
            GenericArray::from_slice(nonce),
            Payload {
                msg: ciphertext_and_tag,
                aad,
            },
        )
        .map_err(|_| Error::Decryption("AES-256-GCM authentication failed".into()))?;

    Ok(Zeroizing::new(plaintext))
}

/// Encrypt with ChaCha20-Poly1305 per RFC 8439.
pub fn chacha20poly1305_encrypt(
    key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    cipher
        .encrypt(GenericArray::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|_| Error::Encryption("ChaCha20-Poly1305 encryption failed".into()))
}

/// Decrypt with ChaCha20-Poly1305 per RFC 8439.
///
/// # Errors
/// Returns `Error::Decryption` if tag verification fails.
pub fn chacha20poly1305_decrypt(
    key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    ciphertext_and_tag: &[u8],
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    let plaintext = cipher
        .decrypt(
            GenericArray::from_slice(nonce),
            Payload {
                msg: ciphertext_and_tag,
                aad,
            },
        )
        .map_err(|_| Error::Decryption("ChaCha20-Poly1305 authentication failed".into()))?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construct_nonce_xor() {
        let iv: [u8; 12] = hex::decode("5d313eb2671276ee13000b30")
            .unwrap()
            .try_into()
            .unwrap();

        assert_eq!(construct_nonce(&iv, 0), iv);

        let nonce = construct_nonce(&iv, 1);
        assert_eq!(hex::encode(nonce), "5d313eb2671276ee13000b31");

        let nonce = construct_nonce(&iv, 0x0102);
        assert_eq!(hex::encode(nonce), "5d313eb2671276ee13000a32");
    }

    #[test]
    fn test_construct_nonce_max() {
        let nonce = construct_nonce(&[0u8; 12], u64::MAX);
        assert_eq!(&nonce[0..4], &[0, 0, 0, 0]);
        assert_eq!(&nonce[4..12], &[0xFF; 8]);
    }

    /// RFC 8439 §2.8.2 AEAD test vector.
    #[test]
    fn test_chacha20poly1305_rfc8439() {
        let key: [u8; 32] =
            hex::decode("808182838485868788898a8b8c8d8e8f909192939495969798999a9b9c9d9e9f")
                .unwrap()
                .try_into()
                .unwrap();

        let nonce: [u8; 12] = hex::decode("070000004041424344454647")
            .unwrap()
            .try_into()
            .unwrap();

        let aad = hex::decode("50515253c0c1c2c3c4c5c6c7").unwrap();

        let plaintext = hex::decode(
            "4c616469657320616e642047656e746c656d656e206f662074686520636c6173\
             73206f66202739393a204966204920636f756c64206f6666657220796f75206f\
             6e6c79206f6e652074697020666f7220746865206675747572652c2073756e73\
             637265656e20776f756c642062652069742e",
        )
        .unwrap();

        let expected_ciphertext = hex::decode(
            "d31a8d34648e60db7b86afbc53ef7ec2a4aded51296e08fea9e2b5a736ee62d6\
             3dbea45e8ca9671282fafb69da92728b1a71de0a9e060b2905d6a5b67ecd3b36\
             92ddbd7f2d778b8c9803aee328091b58fab324e4fad675945585808b4831d7bc\
             3ff4def08e4b7a9de576d26586cec64b6116",
        )
        .unwrap();

        let expected_tag = hex::decode("1ae10b594f09e26a7e902ecbd0600691").unwrap();

        let sealed = seal(
            AeadAlgorithm::ChaCha20Poly1305,
            &key,
            &nonce,
            &plaintext,
            &aad,
        )
        .unwrap();

        assert_eq!(&sealed[..expected_ciphertext.len()], &expected_ciphertext[..]);
        assert_eq!(&sealed[expected_ciphertext.len()..], &expected_tag[..]);

        let opened = open(AeadAlgorithm::ChaCha20Poly1305, &key, &nonce, &sealed, &aad).unwrap();
        assert_eq!(&*opened, &plaintext);
    }

    /// NIST GCM test cases 1 and 2 (zero key, zero IV).
    #[test]
    fn test_aes128gcm_nist_vectors() {
        let key = [0u8; 16];
        let nonce = [0u8; 12];

        let tag_only = aes128gcm_encrypt(&key, &nonce, b"", b"").unwrap();
        assert_eq!(hex::encode(&tag_only), "58e2fccefa7e3061367f1d57a4e7455a");

        let sealed = aes128gcm_encrypt(&key, &nonce, &[0u8; 16], b"").unwrap();
        assert_eq!(
            hex::encode(&sealed),
            "0388dace60b6a392f328c2b971b2fe78ab6e47d42cec13bdf53a67b21257bddf"
        );
    }

    #[test]
    fn test_seal_open_roundtrip_all_algorithms() {
        let plaintext = b"The quick brown fox jumps over the lazy dog";
        let aad = b"record header";
        let nonce = [0x01u8; 12];

        for (algorithm, key) in [
            (AeadAlgorithm::Aes128Gcm, vec![0x42u8; 16]),
            (AeadAlgorithm::Aes256Gcm, vec![0x42u8; 32]),
            (AeadAlgorithm::ChaCha20Poly1305, vec![0x42u8; 32]),
        ] {
            let sealed = seal(algorithm, &key, &nonce, plaintext, aad).unwrap();
            assert_eq!(sealed.len(), plaintext.len() + TAG_LEN);
            let opened = open(algorithm, &key, &nonce, &sealed, aad).unwrap();
            assert_eq!(&*opened, plaintext);
        }
    }

    #[test]
    fn test_wrong_key_length_rejected() {
        let result = seal(AeadAlgorithm::Aes128Gcm, &[0u8; 32], &[0u8; 12], b"x", b"");
        assert!(matches!(
            result,
            Err(Error::InvalidLength {
                expected: 16,
                actual: 32
            })
        ));
    }

    #[test]
    fn test_wrong_aad_fails() {
        let key = [0x42u8; 32];
        let nonce = [0x01u8; 12];
        let sealed = aes256gcm_encrypt(&key, &nonce, b"secret message", b"correct").unwrap();
        assert!(aes256gcm_decrypt(&key, &nonce, &sealed, b"wrong").is_err());
    }

    #[test]
    fn test_corrupted_ciphertext_fails() {
        let key = [0x42u8; 32];
        let nonce = [0x01u8; 12];
        let mut sealed = chacha20poly1305_encrypt(&key, &nonce, b"secret message", b"").unwrap();
        sealed[5] ^= 0xFF;
        assert!(chacha20poly1305_decrypt(&key, &nonce, &sealed, b"").is_err());
    }
}
