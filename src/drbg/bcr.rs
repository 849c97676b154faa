//! Block-cipher counter DRBG: a CTR keystream fronted by an internal
//! buffer that amortizes the per-call cipher cost (spec §4.6).

use hkdf::Hkdf;
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

use super::MAX_RESEED;
use crate::ciphers::icm::CounterMode;
use crate::error::{KeyforgeError, Result};
use crate::parallel::ParallelProfile;
use crate::primitives::block_cipher::aes_for_key;
use crate::primitives::EntropyProvider;

const BUFFER_DEF: usize = 1024;
const RAW_SEED_SIZE: usize = 48;
const HKDF_INFO: &[u8] = b"keyforge-crypto/BCR";

/// Stretch `raw` entropy into a `(key, nonce)` pair via HKDF, picking
/// SHA-256 or SHA-512 by the target key length (SPEC_FULL.md BCR
/// supplement).
fn derive_key_and_nonce(raw: &[u8], key_len: usize) -> Zeroizing<Vec<u8>> {
    let mut okm = Zeroizing::new(vec![0u8; key_len + 16]);
    if key_len <= 32 {
        let hk = Hkdf::<Sha256>::new(None, raw);
        hk.expand(HKDF_INFO, &mut okm).expect("okm length is within HKDF's limit");
    } else {
        let hk = Hkdf::<Sha512>::new(None, raw);
        hk.expand(HKDF_INFO, &mut okm).expect("okm length is within HKDF's limit");
    }
    okm
}

pub struct Bcr {
    key_len: usize,
    ctr: CounterMode,
    buffer: Zeroizing<Vec<u8>>,
    buffer_index: usize,
    provider: Box<dyn EntropyProvider>,
    profile: ParallelProfile,
    parallel: bool,
    reseed_counter: u64,
    reseed_threshold: u64,
    reseed_requests: usize,
    max_reseed: usize,
    initialized: bool,
}

impl Bcr {
    pub fn new(
        key_len: usize,
        provider: Box<dyn EntropyProvider>,
        profile: ParallelProfile,
        parallel: bool,
        reseed_threshold: u64,
    ) -> Result<Self> {
        if !matches!(key_len, 16 | 24 | 32) {
            return Err(KeyforgeError::InvalidKey {
                expected: vec![16, 24, 32],
                actual: key_len,
            });
        }
        let mut this = Self {
            key_len,
            ctr: CounterMode::new(aes_for_key(&vec![0u8; key_len])?, profile),
            buffer: Zeroizing::new(Vec::new()),
            buffer_index: 0,
            provider,
            profile,
            parallel,
            reseed_counter: 0,
            reseed_threshold,
            reseed_requests: 0,
            max_reseed: MAX_RESEED,
            initialized: false,
        };
        this.reset()?;
        Ok(this)
    }

    /// Re-seed the cipher from fresh provider entropy and refill the
    /// internal buffer (spec §4.6 `reset`).
    pub fn reset(&mut self) -> Result<()> {
        let mut raw = Zeroizing::new(vec![0u8; RAW_SEED_SIZE]);
        self.provider.fill(&mut raw)?;
        let key_and_nonce = derive_key_and_nonce(&raw, self.key_len);

        let cipher = aes_for_key(&key_and_nonce[..self.key_len])?;
        self.ctr = CounterMode::new(cipher, self.profile);
        self.ctr.initialize(&key_and_nonce[self.key_len..])?;
        self.reseed_counter = 0;
        self.refill()?;
        tracing::debug!("bcr reset");
        Ok(())
    }

    fn refill(&mut self) -> Result<()> {
        let size = if self.parallel {
            self.profile.parallel_block_size()
        } else {
            BUFFER_DEF
        };
        let zeros = vec![0u8; size];
        let mut buf = vec![0u8; size];
        self.ctr.transform(&zeros, &mut buf)?;
        self.buffer = Zeroizing::new(buf);
        self.buffer_index = 0;
        self.initialized = true;
        Ok(())
    }

    pub fn generate(&mut self, out: &mut [u8]) -> Result<()> {
        if out.len() > super::MAX_REQUEST {
            return Err(KeyforgeError::max_exceeded(
                "BCR single-call request exceeds MAX_REQUEST",
            ));
        }
        self.reseed_counter += out.len() as u64;
        if self.reseed_counter >= self.reseed_threshold {
            self.reseed_requests += 1;
            if self.reseed_requests > self.max_reseed {
                return Err(KeyforgeError::max_exceeded(
                    "BCR reseed cap exceeded; the instance must be re-initialized",
                ));
            }
            self.reset()?;
        }

        let mut filled = 0;
        while filled < out.len() {
            if self.buffer_index == self.buffer.len() {
                self.refill()?;
            }
            let take = (out.len() - filled).min(self.buffer.len() - self.buffer_index);
            out[filled..filled + take]
                .copy_from_slice(&self.buffer[self.buffer_index..self.buffer_index + take]);
            filled += take;
            self.buffer_index += take;
        }
        Ok(())
    }
}
