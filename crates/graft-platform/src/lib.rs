//! Key providers for sealing exported session state at rest.
//!
//! An exported session carries traffic secrets. Callers seal the exported
//! bytes with a [`KeyProvider`] before writing them anywhere:
//!
//! ```
//! use graft_platform::{KeyProvider, MockKeyProvider};
//!
//! let provider = MockKeyProvider::new_deterministic();
//! let sealed = provider.encrypt(b"exported state").unwrap();
//! assert_eq!(provider.decrypt(&sealed).unwrap(), b"exported state");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod mock;
pub mod traits;

pub use error::{Error, Result};
pub use mock::MockKeyProvider;
pub use traits::{KeyProvider, NONCE_LEN, SEAL_OVERHEAD, TAG_LEN};
