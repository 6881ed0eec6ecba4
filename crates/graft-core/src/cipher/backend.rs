//! AES block cipher backends.
//!
//! Three concrete shapes exist:
//!
//! ```text
//! GcmAes ──inner──► AcceleratedAes ──inner──► SoftwareAes { enc, dec }
//!    └────────────inner───────────────────────►┘
//! ```
//!
//! Only [`SoftwareAes`] stores the expanded schedule; the outer layers wrap it.

use crate::field::{FieldAccess, FieldDescriptor, FieldKind, FieldValue};
use crate::{Error, Result};
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use graft_crypto::aead;
use graft_crypto::aes::{KeySchedule, BLOCK_SIZE};
use graft_crypto::suite::AeadAlgorithm;
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Name of the encryption schedule field.
pub const ENC_FIELD: &str = "enc";

/// Name of the decryption schedule field.
pub const DEC_FIELD: &str = "dec";

static SCHEDULE_FIELDS: [FieldDescriptor; 2] = [
    FieldDescriptor::new(ENC_FIELD, FieldKind::Words, 0),
    FieldDescriptor::new(DEC_FIELD, FieldKind::Words, 0),
];

/// Runtime shape of a block backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendVariant {
    /// Portable table-free implementation holding the schedule.
    Software,
    /// Hardware-accelerated wrapper around a software layer.
    Accelerated,
    /// AES-GCM wrapper around a block layer.
    Gcm,
    /// Anything else.
    Other(String),
}

impl fmt::Display for BackendVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Software => f.write_str("software"),
            Self::Accelerated => f.write_str("accelerated"),
            Self::Gcm => f.write_str("gcm"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// A 128-bit block cipher that can report its layering.
pub trait BlockBackend: Send + Sync {
    /// Shape of this layer.
    fn variant(&self) -> BackendVariant;

    /// The wrapped layer, if any.
    fn inner(&self) -> Option<&dyn BlockBackend> {
        None
    }

    /// Field view of the stored key schedule, if this layer holds one.
    fn schedule(&self) -> Option<&dyn FieldAccess> {
        None
    }

    /// Encrypt one block in place.
    fn encrypt_block(&self, block: &mut [u8; BLOCK_SIZE]);

    /// Decrypt one block in place.
    fn decrypt_block(&self, block: &mut [u8; BLOCK_SIZE]);
}

/// Software AES holding the expanded round keys.
#[derive(Clone)]
pub struct SoftwareAes {
    schedule: KeySchedule,
}

impl SoftwareAes {
    /// Expand a 16, 24 or 32 byte key.
    pub fn new(key: &[u8]) -> Result<Self> {
        Ok(Self {
            schedule: KeySchedule::expand(key)?,
        })
    }

    /// The expanded schedule.
    pub fn key_schedule(&self) -> &KeySchedule {
        &self.schedule
    }

    fn shape_mismatch(&self, field: &str, actual: usize) -> Error {
        Error::TypeMismatch {
            field: format!("SoftwareAes.{}", field),
            expected: format!("[u32; {}]", self.schedule.enc().len()),
            actual: format!("[u32; {}]", actual),
        }
    }
}

impl fmt::Debug for SoftwareAes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftwareAes")
            .field("rounds", &self.schedule.rounds())
            .finish_non_exhaustive()
    }
}

impl BlockBackend for SoftwareAes {
    fn variant(&self) -> BackendVariant {
        BackendVariant::Software
    }

    fn schedule(&self) -> Option<&dyn FieldAccess> {
        Some(self)
    }

    fn encrypt_block(&self, block: &mut [u8; BLOCK_SIZE]) {
        self.schedule.encrypt_block(block);
    }

    fn decrypt_block(&self, block: &mut [u8; BLOCK_SIZE]) {
        self.schedule.decrypt_block(block);
    }
}

impl FieldAccess for SoftwareAes {
    fn type_name(&self) -> &'static str {
        "SoftwareAes"
    }

    fn fields(&self) -> &'static [FieldDescriptor] {
        &SCHEDULE_FIELDS
    }

    fn get(&self, name: &str) -> Result<FieldValue> {
        match self.addressable(name)?.name {
            ENC_FIELD => Ok(FieldValue::Words(self.schedule.enc().to_vec())),
            DEC_FIELD => Ok(FieldValue::Words(self.schedule.dec().to_vec())),
            other => Err(Error::FieldNotFound(format!("SoftwareAes.{}", other))),
        }
    }

    /// Replace one half of the schedule. The new words must keep the
    /// schedule's shape, so the block functions stay in bounds.
    fn set(&mut self, name: &str, value: FieldValue) -> Result<()> {
        let descriptor = self.addressable(name)?;
        let words = match value {
            FieldValue::Words(words) => words,
            other => return Err(descriptor.mismatch(other.kind())),
        };

        let len = words.len();
        let (enc, dec) = match descriptor.name {
            ENC_FIELD => (words, self.schedule.dec().to_vec()),
            _ => (self.schedule.enc().to_vec(), words),
        };
        self.schedule = KeySchedule::from_words(enc, dec)
            .map_err(|_| self.shape_mismatch(descriptor.name, len))?;
        Ok(())
    }
}

enum AesCore {
    Aes128(aes::Aes128),
    Aes192(aes::Aes192),
    Aes256(aes::Aes256),
}

/// Hardware-dispatched AES layered over a software schedule.
///
/// Block operations go through the `aes` crate, which selects AES-NI or the
/// ARMv8 crypto extensions at runtime. The expanded schedule lives only in
/// the embedded software layer.
pub struct AcceleratedAes {
    software: SoftwareAes,
    core: AesCore,
}

impl AcceleratedAes {
    /// Build both layers from the same key.
    pub fn new(key: &[u8]) -> Result<Self> {
        let software = SoftwareAes::new(key)?;
        let invalid = |_| graft_crypto::Error::InvalidKeyLength(key.len());
        let core = match key.len() {
            16 => AesCore::Aes128(aes::Aes128::new_from_slice(key).map_err(invalid)?),
            24 => AesCore::Aes192(aes::Aes192::new_from_slice(key).map_err(invalid)?),
            _ => AesCore::Aes256(aes::Aes256::new_from_slice(key).map_err(invalid)?),
        };
        Ok(Self { software, core })
    }
}

impl fmt::Debug for AcceleratedAes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcceleratedAes")
            .field("inner", &self.software)
            .finish()
    }
}

impl BlockBackend for AcceleratedAes {
    fn variant(&self) -> BackendVariant {
        BackendVariant::Accelerated
    }

    fn inner(&self) -> Option<&dyn BlockBackend> {
        Some(&self.software)
    }

    fn encrypt_block(&self, block: &mut [u8; BLOCK_SIZE]) {
        let block = aes::Block::from_mut_slice(&mut block[..]);
        match &self.core {
            AesCore::Aes128(c) => c.encrypt_block(block),
            AesCore::Aes192(c) => c.encrypt_block(block),
            AesCore::Aes256(c) => c.encrypt_block(block),
        }
    }

    fn decrypt_block(&self, block: &mut [u8; BLOCK_SIZE]) {
        let block = aes::Block::from_mut_slice(&mut block[..]);
        match &self.core {
            AesCore::Aes128(c) => c.decrypt_block(block),
            AesCore::Aes192(c) => c.decrypt_block(block),
            AesCore::Aes256(c) => c.decrypt_block(block),
        }
    }
}

/// AES-GCM wrapper over a block layer.
pub struct GcmAes {
    block: Box<dyn BlockBackend>,
    key: Zeroizing<Vec<u8>>,
    algorithm: AeadAlgorithm,
}

impl GcmAes {
    /// Wrap `block`, which must have been keyed with `key`.
    ///
    /// Only 16 and 32 byte keys have a GCM mode here.
    ///
    /// # Errors
    /// `KeyMismatch` if `block` does not encrypt like AES under `key`.
    pub fn new(block: Box<dyn BlockBackend>, key: &[u8]) -> Result<Self> {
        let algorithm = match key.len() {
            16 => AeadAlgorithm::Aes128Gcm,
            32 => AeadAlgorithm::Aes256Gcm,
            other => return Err(graft_crypto::Error::InvalidKeyLength(other).into()),
        };

        let expected = KeySchedule::expand(key)?;
        let mut ours = [0u8; BLOCK_SIZE];
        let mut theirs = [0u8; BLOCK_SIZE];
        expected.encrypt_block(&mut ours);
        block.encrypt_block(&mut theirs);
        if !bool::from(ours[..].ct_eq(&theirs[..])) {
            return Err(Error::KeyMismatch(block.variant().to_string()));
        }

        Ok(Self {
            block,
            key: Zeroizing::new(key.to_vec()),
            algorithm,
        })
    }

    /// Encrypt and authenticate; output is `ciphertext || tag`.
    pub fn seal(&self, nonce: &[u8; aead::NONCE_LEN], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        Ok(aead::seal(self.algorithm, &self.key, nonce, plaintext, aad)?)
    }

    /// Verify and decrypt `ciphertext || tag`.
    pub fn open(
        &self,
        nonce: &[u8; aead::NONCE_LEN],
        ciphertext: &[u8],
        aad: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        Ok(aead::open(self.algorithm, &self.key, nonce, ciphertext, aad)?)
    }
}

impl fmt::Debug for GcmAes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcmAes")
            .field("algorithm", &self.algorithm)
            .field("inner", &self.block.variant())
            .finish_non_exhaustive()
    }
}

impl BlockBackend for GcmAes {
    fn variant(&self) -> BackendVariant {
        BackendVariant::Gcm
    }

    fn inner(&self) -> Option<&dyn BlockBackend> {
        Some(self.block.as_ref())
    }

    fn encrypt_block(&self, block: &mut [u8; BLOCK_SIZE]) {
        self.block.encrypt_block(block);
    }

    fn decrypt_block(&self, block: &mut [u8; BLOCK_SIZE]) {
        self.block.decrypt_block(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIPS_KEY: &str = "000102030405060708090a0b0c0d0e0f";
    const FIPS_PT: &str = "00112233445566778899aabbccddeeff";
    const FIPS_CT: &str = "69c4e0d86a7b0430d8cdb78070b4c55a";

    fn key() -> Vec<u8> {
        hex::decode(FIPS_KEY).unwrap()
    }

    fn block(hex_str: &str) -> [u8; BLOCK_SIZE] {
        let mut b = [0u8; BLOCK_SIZE];
        b.copy_from_slice(&hex::decode(hex_str).unwrap());
        b
    }

    #[test]
    fn test_all_shapes_agree_on_fips197_c1() {
        let backends: Vec<Box<dyn BlockBackend>> = vec![
            Box::new(SoftwareAes::new(&key()).unwrap()),
            Box::new(AcceleratedAes::new(&key()).unwrap()),
            Box::new(
                GcmAes::new(Box::new(AcceleratedAes::new(&key()).unwrap()), &key()).unwrap(),
            ),
        ];

        for backend in &backends {
            let mut b = block(FIPS_PT);
            backend.encrypt_block(&mut b);
            assert_eq!(hex::encode(b), FIPS_CT, "{}", backend.variant());
            backend.decrypt_block(&mut b);
            assert_eq!(hex::encode(b), FIPS_PT, "{}", backend.variant());
        }
    }

    #[test]
    fn test_layering() {
        let gcm = GcmAes::new(Box::new(AcceleratedAes::new(&key()).unwrap()), &key()).unwrap();
        assert_eq!(gcm.variant(), BackendVariant::Gcm);
        assert!(gcm.schedule().is_none());

        let accel = gcm.inner().unwrap();
        assert_eq!(accel.variant(), BackendVariant::Accelerated);
        assert!(accel.schedule().is_none());

        let soft = accel.inner().unwrap();
        assert_eq!(soft.variant(), BackendVariant::Software);
        assert!(soft.inner().is_none());
        assert!(soft.schedule().is_some());
    }

    #[test]
    fn test_gcm_seal_open() {
        let k = [0u8; 16];
        let gcm = GcmAes::new(Box::new(SoftwareAes::new(&k).unwrap()), &k).unwrap();
        let nonce = [0u8; 12];
        let sealed = gcm.seal(&nonce, &[0u8; 16], &[]).unwrap();
        assert_eq!(
            hex::encode(&sealed),
            "0388dace60b6a392f328c2b971b2fe78ab6e47d42cec13bdf53a67b21257bddf"
        );
        let opened = gcm.open(&nonce, &sealed, &[]).unwrap();
        assert_eq!(&opened[..], &[0u8; 16]);
    }

    #[test]
    fn test_gcm_rejects_192_bit_key() {
        let k = [0u8; 24];
        let result = GcmAes::new(Box::new(SoftwareAes::new(&k).unwrap()), &k);
        assert!(matches!(
            result,
            Err(Error::Crypto(graft_crypto::Error::InvalidKeyLength(24)))
        ));
    }

    #[test]
    fn test_gcm_rejects_inner_layer_with_other_key() {
        let inner = SoftwareAes::new(&[1u8; 16]).unwrap();
        match GcmAes::new(Box::new(inner), &[2u8; 16]) {
            Err(Error::KeyMismatch(variant)) => assert_eq!(variant, "software"),
            other => panic!("expected KeyMismatch, got {:?}", other),
        }

        let inner = AcceleratedAes::new(&[3u8; 32]).unwrap();
        assert!(matches!(
            GcmAes::new(Box::new(inner), &[4u8; 32]),
            Err(Error::KeyMismatch(_))
        ));

        let inner = SoftwareAes::new(&[5u8; 32]).unwrap();
        assert!(GcmAes::new(Box::new(inner), &[5u8; 32]).is_ok());
    }

    #[test]
    fn test_schedule_set_preserves_shape() {
        let mut soft = SoftwareAes::new(&key()).unwrap();
        let enc = match soft.get(ENC_FIELD).unwrap() {
            FieldValue::Words(w) => w,
            other => panic!("unexpected {:?}", other),
        };

        soft.set(ENC_FIELD, FieldValue::Words(enc.clone())).unwrap();
        assert!(matches!(
            soft.set(ENC_FIELD, FieldValue::Words(enc[..40].to_vec())),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            soft.set(DEC_FIELD, FieldValue::U32(1)),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(soft.get("rounds"), Err(Error::FieldNotFound(_))));
    }
}
