//! keyforge-crypto - Authenticated Encryption, DRBGs, and Hierarchical
//! Key Derivation
//!
//! This crate provides deterministic, capability-trait-driven
//! implementations of three related cryptographic subsystems:
//!
//! # Architecture
//!
//! - **primitives**: Capability traits (`BlockCipher`, `EntropyProvider`,
//!   `Xof`) and the Keccak-f[1600]-backed cSHAKE/KMAC framing the
//!   RustCrypto ecosystem does not expose at custom rates.
//! - **ciphers**: Counter-mode keystream (`CounterMode`) and the three
//!   AEAD constructions built over it (`Eax`, `Gcm`, `Ocb`).
//! - **drbg**: Three deterministic random bit generators (`Bcr`, `Csg`,
//!   `Hcg`) sharing a common reseed/request-ceiling contract.
//! - **kms**: The HKDS client (`HkdsClient`), a hierarchical
//!   transaction-key cache for payment-style tokens.
//! - **parallel**: `ParallelProfile`, the execution capability surface
//!   that sizes buffers and dispatch lanes for the cipher/DRBG layers.
//! - **key**: `SymmetricKey`, the zeroizing key/nonce/info container and
//!   its wire format.
//! - **error**: The shared `KeyforgeError` taxonomy and `Result` alias.
//!
//! # Usage
//!
//! ```rust
//! use keyforge_crypto::ciphers::Eax;
//! use keyforge_crypto::parallel::ParallelProfile;
//!
//! let profile = ParallelProfile::new(16, false, 0, false);
//! let mut eax = Eax::new(profile);
//! eax.initialize(true, &[0x42u8; 16], &[0u8; 16]).unwrap();
//! eax.set_associated_data(b"header").unwrap();
//!
//! let mut ciphertext = vec![0u8; 5];
//! eax.transform(b"hello", &mut ciphertext).unwrap();
//! let _tag = eax.finalize(16).unwrap();
//! ```

pub mod ciphers;
pub mod drbg;
pub mod error;
pub mod key;
pub mod kms;
pub mod parallel;
pub mod primitives;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{KeyforgeError, Result};
pub use key::SymmetricKey;
pub use parallel::ParallelProfile;

/// Library version (matches Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Version string used in diagnostics and `tracing` spans.
pub fn version_info() -> String {
    format!("{} v{}", NAME, VERSION)
}
