//! Capability traits for the keyed primitives every mode in this crate
//! builds on (spec §3 "BlockCipher (collaborator)" / "XOF (collaborator)"
//! and Design Notes "Re-express as a capability trait").
//!
//! Modes take these either as an owned value or a borrowed reference --
//! that is a lifetime decision made once at each call site (a generic
//! parameter), not a runtime "do I own this" flag.

pub mod block_cipher;
pub mod entropy;
mod keccak;
pub mod xof;

pub use block_cipher::{Aes128Cipher, Aes192Cipher, Aes256Cipher, BlockCipher};
pub use entropy::{EntropyProvider, OsEntropyProvider};
pub use xof::{KeccakMode, Xof};
