//! OS entropy source collaborator (spec §1 "OS entropy providers (CSP)
//! beyond the one-line contract they export").

use rand_core::RngCore;

use crate::error::{KeyforgeError, Result};

/// A source of fresh entropy for DRBG (re)seeding. Kept to the minimal
/// one-line contract spec §1 calls out: fill a buffer, or fail.
pub trait EntropyProvider: Send + Sync {
    fn fill(&self, buf: &mut [u8]) -> Result<()>;
}

/// Default provider backed by the operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropyProvider;

impl EntropyProvider for OsEntropyProvider {
    fn fill(&self, buf: &mut [u8]) -> Result<()> {
        let mut rng = rand::rngs::OsRng;
        rng.try_fill_bytes(buf)
            .map_err(|e| KeyforgeError::BadRead(e.to_string()))
    }
}
