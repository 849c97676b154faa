//! HKDS client: a device dispenses single-use transaction keys from a
//! SHAKE-derived cache, keyed off a server-issued token and a strictly
//! incrementing KSN (spec §4.9).

use zeroize::Zeroizing;

use crate::error::{KeyforgeError, Result};
use crate::primitives::xof::{kmac, shake};
use crate::primitives::KeccakMode;

pub const HKDS_MESSAGE_SIZE: usize = 16;
pub const HKDS_TKC_SIZE: usize = 4;
pub const HKDS_DID_SIZE: usize = 10;
/// Cache multiplier fixed at build time; widens the pre-computed
/// transaction-key slab relative to the underlying Keccak rate.
const CACHE_MULTIPLIER: usize = 4;

/// Client half of a hierarchical key-derivation scheme for payment-style
/// tokens: a pre-computed cache of single-use transaction keys dispensed
/// in strict KSN order.
pub struct HkdsClient {
    device_id: Vec<u8>,
    embedded_device_key: Zeroizing<Vec<u8>>,
    mode: KeccakMode,
    ksn_counter: u32,
    key_cache: Vec<Zeroizing<Vec<u8>>>,
    cache_empty: bool,
    cache_size: usize,
}

impl HkdsClient {
    pub fn new(edk: &[u8], did: &[u8]) -> Result<Self> {
        if edk.len() != HKDS_MESSAGE_SIZE {
            return Err(KeyforgeError::InvalidKey {
                expected: vec![HKDS_MESSAGE_SIZE],
                actual: edk.len(),
            });
        }
        if did.len() != HKDS_DID_SIZE {
            return Err(KeyforgeError::InvalidSize {
                expected: HKDS_DID_SIZE,
                actual: did.len(),
            });
        }
        let mode = KeccakMode::from_did_byte(did[5])
            .ok_or_else(|| KeyforgeError::invalid_param("DID byte 5 is not a recognized mode"))?;
        let cache_size = CACHE_MULTIPLIER * mode.rate_bytes() / HKDS_MESSAGE_SIZE;

        Ok(Self {
            device_id: did.to_vec(),
            embedded_device_key: Zeroizing::new(edk.to_vec()),
            mode,
            ksn_counter: 0,
            key_cache: Vec::new(),
            cache_empty: true,
            cache_size,
        })
    }

    pub fn ksn(&self) -> Vec<u8> {
        let mut ksn = self.device_id.clone();
        ksn.extend_from_slice(&self.ksn_counter.to_be_bytes());
        ksn
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    /// Populate the transaction-key cache from a server-issued token for
    /// the current epoch.
    pub fn generate_key_cache(&mut self, token: &[u8]) -> Result<()> {
        let mut prf_key = token.to_vec();
        prf_key.extend_from_slice(&self.embedded_device_key);

        let mut stream = Zeroizing::new(vec![0u8; self.cache_size * HKDS_MESSAGE_SIZE]);
        shake(self.mode, &prf_key, &mut stream);

        self.key_cache = stream
            .chunks_exact(HKDS_MESSAGE_SIZE)
            .map(|slot| Zeroizing::new(slot.to_vec()))
            .collect();
        self.cache_empty = false;
        Ok(())
    }

    /// Decrypt a server-wrapped token using the key-stream derived from
    /// the current token-counter epoch and this client's identity.
    pub fn decrypt_token(&self, encrypted_token: &[u8]) -> Vec<u8> {
        let tok_counter = self.ksn_counter / self.cache_size as u32;

        let mut custom_string = Vec::with_capacity(HKDS_TKC_SIZE + self.mode.name().len() + self.device_id.len());
        custom_string.extend_from_slice(&tok_counter.to_be_bytes());
        custom_string.extend_from_slice(self.mode.name().as_bytes());
        custom_string.extend_from_slice(&self.device_id);

        let mut prf_key = custom_string;
        prf_key.extend_from_slice(&self.embedded_device_key);

        let mut stream = vec![0u8; encrypted_token.len()];
        shake(self.mode, &prf_key, &mut stream);

        encrypted_token
            .iter()
            .zip(stream.iter())
            .map(|(c, k)| c ^ k)
            .collect()
    }

    /// Consume the next cache slot, zeroing it and advancing the KSN.
    fn draw_transaction_key(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if self.cache_empty {
            return Err(KeyforgeError::NotInitialized);
        }
        let slot = (self.ksn_counter % self.cache_size as u32) as usize;
        if slot >= self.key_cache.len() {
            return Err(KeyforgeError::InvalidSize {
                expected: self.key_cache.len(),
                actual: slot,
            });
        }

        let key = self.key_cache[slot].clone();
        self.key_cache[slot] = Zeroizing::new(vec![0u8; HKDS_MESSAGE_SIZE]);
        self.ksn_counter = self.ksn_counter.wrapping_add(1);
        if slot == self.cache_size - 1 {
            self.cache_empty = true;
        }
        Ok(key)
    }

    pub fn encrypt(&mut self, message: &[u8]) -> Result<[u8; HKDS_MESSAGE_SIZE]> {
        if message.len() != HKDS_MESSAGE_SIZE {
            return Err(KeyforgeError::InvalidSize {
                expected: HKDS_MESSAGE_SIZE,
                actual: message.len(),
            });
        }
        let key = self.draw_transaction_key()?;
        let mut out = [0u8; HKDS_MESSAGE_SIZE];
        for i in 0..HKDS_MESSAGE_SIZE {
            out[i] = key[i] ^ message[i];
        }
        Ok(out)
    }

    /// Encrypt and tag in one call: the tag key is drawn from the *next*
    /// cache slot after the one spent on encryption, so each
    /// `encrypt_authenticate` call consumes two transaction keys.
    pub fn encrypt_authenticate(&mut self, message: &[u8], ad: &[u8]) -> Result<Vec<u8>> {
        let ciphertext = self.encrypt(message)?;
        let mac_key = self.draw_transaction_key()?;

        let mut mac_input = ad.to_vec();
        mac_input.extend_from_slice(&ciphertext);
        let tag = kmac(self.mode, &mac_key, &mac_input, 32);

        let mut out = Vec::with_capacity(HKDS_MESSAGE_SIZE + 32);
        out.extend_from_slice(&ciphertext);
        out.extend_from_slice(&tag);
        Ok(out)
    }
}
