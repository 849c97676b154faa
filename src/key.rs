//! Secure storage and wire format for symmetric key material (spec §3, §6).
//!
//! All long-lived key/nonce/info buffers are stored `Zeroizing` so they are
//! wiped on drop regardless of how the owning state machine is torn down.

use zeroize::Zeroizing;

use crate::error::{KeyforgeError, Result};

/// A key plus its associated nonce and info (AD/customization) lanes.
///
/// Mirrors the CEX `SymmetricKey` container: three independently-sized
/// byte lanes that travel together through `initialize` calls.
#[derive(Clone)]
pub struct SymmetricKey {
    key: Zeroizing<Vec<u8>>,
    nonce: Zeroizing<Vec<u8>>,
    info: Zeroizing<Vec<u8>>,
}

impl SymmetricKey {
    pub fn new(key: Vec<u8>) -> Self {
        Self {
            key: Zeroizing::new(key),
            nonce: Zeroizing::new(Vec::new()),
            info: Zeroizing::new(Vec::new()),
        }
    }

    pub fn with_nonce(key: Vec<u8>, nonce: Vec<u8>) -> Self {
        Self {
            key: Zeroizing::new(key),
            nonce: Zeroizing::new(nonce),
            info: Zeroizing::new(Vec::new()),
        }
    }

    pub fn with_nonce_and_info(key: Vec<u8>, nonce: Vec<u8>, info: Vec<u8>) -> Self {
        Self {
            key: Zeroizing::new(key),
            nonce: Zeroizing::new(nonce),
            info: Zeroizing::new(info),
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    pub fn info(&self) -> &[u8] {
        &self.info
    }

    /// Length-prefixed wire encoding: `u16 key_len, u16 nonce_len, u16
    /// info_len, key, nonce, info` (spec §6 persisted-state format).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(6 + self.key.len() + self.nonce.len() + self.info.len());
        out.extend_from_slice(&(self.key.len() as u16).to_be_bytes());
        out.extend_from_slice(&(self.nonce.len() as u16).to_be_bytes());
        out.extend_from_slice(&(self.info.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.key);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.info);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 6 {
            return Err(KeyforgeError::InvalidSize {
                expected: 6,
                actual: bytes.len(),
            });
        }
        let key_len = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
        let nonce_len = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
        let info_len = u16::from_be_bytes([bytes[4], bytes[5]]) as usize;
        let expected = 6 + key_len + nonce_len + info_len;
        if bytes.len() != expected {
            return Err(KeyforgeError::InvalidSize {
                expected,
                actual: bytes.len(),
            });
        }

        let mut cursor = 6;
        let key = bytes[cursor..cursor + key_len].to_vec();
        cursor += key_len;
        let nonce = bytes[cursor..cursor + nonce_len].to_vec();
        cursor += nonce_len;
        let info = bytes[cursor..cursor + info_len].to_vec();

        Ok(Self::with_nonce_and_info(key, nonce, info))
    }
}

/// Legal `(key, nonce, info)` size combination for a keyed primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegalKeySize {
    pub key_size: usize,
    pub nonce_size: usize,
    pub info_size: usize,
}

impl LegalKeySize {
    pub const fn new(key_size: usize, nonce_size: usize, info_size: usize) -> Self {
        Self {
            key_size,
            nonce_size,
            info_size,
        }
    }
}

/// Validate `key.len()` against a legal-size table, producing spec §7's
/// `InvalidKey` error with the full list of accepted sizes on failure.
pub fn validate_key_size(key_len: usize, legal: &[LegalKeySize]) -> Result<()> {
    if legal.iter().any(|l| l.key_size == key_len) {
        Ok(())
    } else {
        Err(KeyforgeError::InvalidKey {
            expected: legal.iter().map(|l| l.key_size).collect(),
            actual: key_len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_wire_format() {
        let key = SymmetricKey::with_nonce_and_info(vec![1u8; 32], vec![2u8; 16], vec![3u8; 4]);
        let bytes = key.to_bytes();
        let decoded = SymmetricKey::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.key(), key.key());
        assert_eq!(decoded.nonce(), key.nonce());
        assert_eq!(decoded.info(), key.info());
    }

    #[test]
    fn rejects_truncated_payload() {
        let key = SymmetricKey::with_nonce_and_info(vec![1u8; 32], vec![2u8; 16], vec![3u8; 4]);
        let mut bytes = key.to_bytes();
        bytes.truncate(bytes.len() - 1);
        assert!(SymmetricKey::from_bytes(&bytes).is_err());
    }

    #[test]
    fn validates_legal_key_sizes() {
        let legal = [
            LegalKeySize::new(16, 16, 0),
            LegalKeySize::new(32, 16, 0),
        ];
        assert!(validate_key_size(16, &legal).is_ok());
        assert!(validate_key_size(32, &legal).is_ok());
        assert!(validate_key_size(24, &legal).is_err());
    }
}
