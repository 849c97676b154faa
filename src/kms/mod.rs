//! Hierarchical key-derivation client (§4.9): pre-computed transaction-key
//! cache, one-shot use, deterministic tag derivation from device ID and
//! counter.

pub mod hkds;

pub use hkds::HkdsClient;
