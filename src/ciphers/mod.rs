//! Block-cipher modes: counter-mode keystream (§4.2) and the three AEAD
//! constructions built over it (§4.3-§4.5).

pub mod eax;
pub mod gcm;
pub mod icm;
pub mod ocb;

pub use eax::Eax;
pub use gcm::Gcm;
pub use icm::CounterMode;
pub use ocb::Ocb;

/// Minimum legal AEAD tag length, in bytes (spec §3 invariant 4).
pub const MIN_TAG_SIZE: usize = 12;
/// Block size shared by every mode in this module.
pub const BLOCK_SIZE: usize = 16;
