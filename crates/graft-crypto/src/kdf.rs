//! Key derivation functions (HKDF, RFC 5869 / RFC 8446 §7.1).
//!
//! Implements:
//! - TLS 1.3 `HKDF-Expand-Label` over SHA-256 and SHA-384
//! - Per-direction traffic key/IV derivation (§7.3)
//! - Keying-material exporter (§7.5)

use crate::aead::NONCE_LEN;
use crate::suite::{CipherSuite, HashAlgorithm};
use crate::{Error, Result};
use hkdf::Hkdf;
use sha2::{Digest, Sha256, Sha384};
use zeroize::Zeroizing;

/// Label prefix mandated by RFC 8446 §7.1.
const LABEL_PREFIX: &[u8] = b"tls13 ";

/// Per-direction record protection material.
pub struct TrafficKeys {
    /// AEAD key (16 or 32 bytes depending on suite).
    pub key: Zeroizing<Vec<u8>>,
    /// Static IV XORed with the record sequence number.
    pub iv: [u8; NONCE_LEN],
}

/// `HKDF-Expand-Label(Secret, Label, Context, Length)` per RFC 8446 §7.1.
///
/// `secret` is used directly as the PRK and must be at least one hash length.
pub fn hkdf_expand_label(
    hash: HashAlgorithm,
    secret: &[u8],
    label: &[u8],
    context: &[u8],
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let full_label_len = LABEL_PREFIX.len() + label.len();
    if full_label_len > 255 || context.len() > 255 || output_len > u16::MAX as usize {
        return Err(Error::KeyDerivation("HkdfLabel field too long".into()));
    }

    let mut info = Vec::with_capacity(4 + full_label_len + context.len());
    info.extend_from_slice(&(output_len as u16).to_be_bytes());
    info.push(full_label_len as u8);
    info.extend_from_slice(LABEL_PREFIX);
    info.extend_from_slice(label);
    info.push(context.len() as u8);
    info.extend_from_slice(context);

    let mut okm = vec![0u8; output_len];
    match hash {
        HashAlgorithm::Sha256 => Hkdf::<Sha256>::from_prk(secret)
            .map_err(|_| Error::KeyDerivation("PRK shorter than SHA-256 output".into()))?
            .expand(&info, &mut okm),
        HashAlgorithm::Sha384 => Hkdf::<Sha384>::from_prk(secret)
            .map_err(|_| Error::KeyDerivation("PRK shorter than SHA-384 output".into()))?
            .expand(&info, &mut okm),
    }
    .map_err(|_| Error::KeyDerivation("HKDF-Expand-Label failed".into()))?;

    Ok(Zeroizing::new(okm))
}

/// Hash `data` with the suite hash.
pub fn transcript_hash(hash: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    match hash {
        HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
    }
}

/// Derive the record key and IV from a traffic secret (RFC 8446 §7.3).
pub fn derive_traffic_keys(suite: CipherSuite, traffic_secret: &[u8]) -> Result<TrafficKeys> {
    let hash = suite.hash_algorithm();
    let key = hkdf_expand_label(hash, traffic_secret, b"key", &[], suite.key_len())?;
    let iv_bytes = hkdf_expand_label(hash, traffic_secret, b"iv", &[], NONCE_LEN)?;

    let mut iv = [0u8; NONCE_LEN];
    iv.copy_from_slice(&iv_bytes);

    Ok(TrafficKeys { key, iv })
}

/// Export keying material per RFC 8446 §7.5.
///
/// ```text
/// TLS-Exporter(label, context, length) =
///     HKDF-Expand-Label(Derive-Secret(exporter_secret, label, ""),
///                       "exporter", Hash(context), length)
/// ```
pub fn export_keying_material(
    hash: HashAlgorithm,
    exporter_secret: &[u8],
    label: &[u8],
    context: &[u8],
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let empty_hash = transcript_hash(hash, &[]);
    let derived = hkdf_expand_label(
        hash,
        exporter_secret,
        label,
        &empty_hash,
        hash.output_len(),
    )?;

    let context_hash = transcript_hash(hash, context);
    hkdf_expand_label(hash, &derived, b"exporter", &context_hash, output_len)
}
