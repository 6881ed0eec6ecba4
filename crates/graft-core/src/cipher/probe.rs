//! Backend construction and schedule probing.

use super::backend::{AcceleratedAes, BackendVariant, BlockBackend, GcmAes, SoftwareAes};
use super::schedule::{read_round_keys, RoundKeys};
use crate::field::FieldAccess;
use crate::{Error, Result};
use tracing::debug;

/// CPU features that decide which backend shape is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendCapabilities {
    /// AES round instructions (AES-NI / ARMv8 AES).
    pub aes: bool,
    /// Carry-less multiply (PCLMULQDQ / PMULL), needed for the GCM wrapper.
    pub carryless_mul: bool,
}

impl BackendCapabilities {
    /// Detect capabilities of the running CPU.
    pub fn detect() -> Self {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            Self {
                aes: is_x86_feature_detected!("aes"),
                carryless_mul: is_x86_feature_detected!("pclmulqdq"),
            }
        }

        #[cfg(target_arch = "aarch64")]
        {
            Self {
                aes: std::arch::is_aarch64_feature_detected!("aes"),
                carryless_mul: std::arch::is_aarch64_feature_detected!("pmull"),
            }
        }

        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
        {
            Self::software_only()
        }
    }

    /// No hardware support.
    pub const fn software_only() -> Self {
        Self {
            aes: false,
            carryless_mul: false,
        }
    }

    /// AES instructions without carry-less multiply.
    pub const fn accelerated() -> Self {
        Self {
            aes: true,
            carryless_mul: false,
        }
    }

    /// Both AES and carry-less multiply.
    pub const fn full() -> Self {
        Self {
            aes: true,
            carryless_mul: true,
        }
    }
}

/// Builds ciphers for a capability set and locates their key schedules.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendProber {
    caps: BackendCapabilities,
}

impl BackendProber {
    /// Prober for an explicit capability set.
    pub fn new(caps: BackendCapabilities) -> Self {
        Self { caps }
    }

    /// Prober for the running CPU.
    pub fn detect() -> Self {
        Self::new(BackendCapabilities::detect())
    }

    /// Capability set in use.
    pub fn capabilities(&self) -> BackendCapabilities {
        self.caps
    }

    /// Plain block cipher: accelerated when AES instructions are available.
    pub fn new_block(&self, key: &[u8]) -> Result<Box<dyn BlockBackend>> {
        if self.caps.aes {
            Ok(Box::new(AcceleratedAes::new(key)?))
        } else {
            Ok(Box::new(SoftwareAes::new(key)?))
        }
    }

    /// GCM wrapper over [`BackendProber::new_block`], regardless of
    /// carry-less multiply support.
    pub fn new_gcm(&self, key: &[u8]) -> Result<GcmAes> {
        GcmAes::new(self.new_block(key)?, key)
    }

    /// Build the cipher this capability set selects.
    ///
    /// | aes | carryless_mul | shape                          |
    /// |-----|---------------|--------------------------------|
    /// | no  | any           | `SoftwareAes`                  |
    /// | yes | no            | `AcceleratedAes`               |
    /// | yes | yes           | `GcmAes(AcceleratedAes)`       |
    ///
    /// 192-bit keys never get the GCM wrapper.
    pub fn new_cipher(&self, key: &[u8]) -> Result<Box<dyn BlockBackend>> {
        if !self.caps.aes {
            return Ok(Box::new(SoftwareAes::new(key)?));
        }

        if self.caps.carryless_mul && key.len() != 24 {
            return Ok(Box::new(self.new_gcm(key)?));
        }
        self.new_block(key)
    }

    /// Descend through recognized wrapper layers to the stored schedule.
    ///
    /// # Errors
    /// `UnsupportedBackend` naming the first layer that is not one of the
    /// recognized shapes or that lacks the expected inner layer.
    pub fn probe<'a>(&self, cipher: &'a dyn BlockBackend) -> Result<&'a dyn FieldAccess> {
        let mut layer = cipher;

        if layer.variant() == BackendVariant::Gcm {
            layer = descend(layer)?;
        }
        if layer.variant() == BackendVariant::Accelerated {
            layer = descend(layer)?;
        }

        match layer.variant() {
            BackendVariant::Software => layer
                .schedule()
                .ok_or_else(|| Error::UnsupportedBackend(layer.variant().to_string())),
            other => Err(Error::UnsupportedBackend(other.to_string())),
        }
    }

    /// Probe `cipher` and copy out its round keys.
    pub fn extract(&self, cipher: &dyn BlockBackend) -> Result<RoundKeys> {
        read_round_keys(self.probe(cipher)?)
    }
}

fn descend(layer: &dyn BlockBackend) -> Result<&dyn BlockBackend> {
    let variant = layer.variant();
    let inner = layer
        .inner()
        .ok_or_else(|| Error::UnsupportedBackend(format!("{} without inner layer", variant)))?;
    debug!(from = %variant, to = %inner.variant(), "descending cipher layer");
    Ok(inner)
}
