//! Cryptographic primitives for graft.
//!
//! This crate implements the primitives the session and cipher layers build on:
//! - AES key expansion and a software block cipher (FIPS-197)
//! - AEAD record protection (AES-128-GCM, AES-256-GCM, ChaCha20-Poly1305)
//! - Key derivation (TLS 1.3 `HKDF-Expand-Label` over SHA-256 and SHA-384)
//! - The TLS 1.3 cipher-suite table
//!
//! Security requirements:
//! - No unsafe code
//! - All secrets use Zeroizing wrappers
//! - No logging of key material

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aead;
pub mod aes;
pub mod error;
pub mod kdf;
pub mod suite;

pub use error::{Error, Result};
pub use suite::CipherSuite;
