//! Deterministic test doubles shared across this crate's unit tests.

use crate::error::{KeyforgeError, Result};
use crate::primitives::EntropyProvider;

/// A fixed byte stream used wherever a reproducible "entropy" trace is
/// required (spec §8 invariant 5: reseed behavior must be observable and
/// repeatable in tests).
pub struct FixedEntropyProvider {
    bytes: Vec<u8>,
}

impl FixedEntropyProvider {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// An endlessly-repeating provider built from a short pattern, useful
    /// when a test needs more bytes than it cares to spell out.
    pub fn repeating(pattern: u8) -> Self {
        Self {
            bytes: vec![pattern; 4096],
        }
    }
}

impl EntropyProvider for FixedEntropyProvider {
    fn fill(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() > self.bytes.len() {
            return Err(KeyforgeError::InvalidSize {
                expected: buf.len(),
                actual: self.bytes.len(),
            });
        }
        buf.copy_from_slice(&self.bytes[..buf.len()]);
        Ok(())
    }
}
