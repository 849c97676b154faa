//! HMAC-based DRBG with counter-driven state advance and a
//! key-strengthening extract on reseed (spec §4.8).

use hmac::Hmac;
use hmac::Mac as HmacMac;
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

use super::MAX_RESEED;
use crate::error::{KeyforgeError, Result};
use crate::primitives::EntropyProvider;

enum AnyHmac {
    Sha256(Hmac<Sha256>),
    Sha512(Hmac<Sha512>),
}

impl AnyHmac {
    fn new(variant: HmacVariant, key: &[u8]) -> Self {
        match variant {
            HmacVariant::Sha256 => AnyHmac::Sha256(Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key length")),
            HmacVariant::Sha512 => AnyHmac::Sha512(Hmac::<Sha512>::new_from_slice(key).expect("HMAC accepts any key length")),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            AnyHmac::Sha256(m) => m.update(data),
            AnyHmac::Sha512(m) => m.update(data),
        }
    }

    fn finalize(self) -> Vec<u8> {
        match self {
            AnyHmac::Sha256(m) => m.finalize().into_bytes().to_vec(),
            AnyHmac::Sha512(m) => m.finalize().into_bytes().to_vec(),
        }
    }
}

#[derive(Clone, Copy)]
enum HmacVariant {
    Sha256,
    Sha512,
}

impl HmacVariant {
    fn for_key_len(key_len: usize) -> Self {
        if key_len <= 32 {
            HmacVariant::Sha256
        } else {
            HmacVariant::Sha512
        }
    }

    fn tag_size(self) -> usize {
        match self {
            HmacVariant::Sha256 => 32,
            HmacVariant::Sha512 => 64,
        }
    }

    fn block_size(self) -> usize {
        match self {
            HmacVariant::Sha256 => 64,
            HmacVariant::Sha512 => 128,
        }
    }
}

pub struct Hcg {
    variant: HmacVariant,
    key: Zeroizing<Vec<u8>>,
    hmac_state: Zeroizing<Vec<u8>>,
    seed_ctr: u64,
    state_ctr: u64,
    info: Vec<u8>,
    /// Unread tail of the last HMAC block, carried across `generate` calls
    /// so `state_ctr` always advances by a fixed `tag_size` per block
    /// regardless of where callers choose to split their reads.
    block_buf: Zeroizing<Vec<u8>>,
    block_pos: usize,
    provider: Option<Box<dyn EntropyProvider>>,
    reseed_counter: u64,
    reseed_threshold: u64,
    reseed_requests: usize,
    max_reseed: usize,
}

impl Hcg {
    pub fn new(
        key: &[u8],
        nonce: &[u8],
        info: &[u8],
        provider: Option<Box<dyn EntropyProvider>>,
        reseed_threshold: u64,
    ) -> Self {
        let variant = HmacVariant::for_key_len(key.len());
        let mut seed_mac = AnyHmac::new(variant, key);
        seed_mac.update(nonce);
        let hmac_state = seed_mac.finalize();

        let mut nonce_word = [0u8; 8];
        let take = nonce.len().min(8);
        nonce_word[..take].copy_from_slice(&nonce[..take]);

        Self {
            variant,
            key: Zeroizing::new(key.to_vec()),
            hmac_state: Zeroizing::new(hmac_state),
            seed_ctr: 0,
            state_ctr: u64::from_be_bytes(nonce_word),
            info: info.to_vec(),
            block_buf: Zeroizing::new(Vec::new()),
            block_pos: 0,
            provider,
            reseed_counter: 0,
            reseed_threshold,
            reseed_requests: 0,
            max_reseed: MAX_RESEED,
        }
    }

    /// Advance `state_ctr` by one fixed `tag_size` block and replace
    /// `hmac_state` with the freshly folded value.
    fn step(&mut self) {
        self.state_ctr = self.state_ctr.wrapping_add(self.hmac_state.len() as u64);
        let mut mac = AnyHmac::new(self.variant, &self.key);
        mac.update(&self.state_ctr.to_be_bytes());
        mac.update(&self.hmac_state);
        mac.update(&self.info);
        self.hmac_state = Zeroizing::new(mac.finalize());
    }

    pub fn generate(&mut self, out: &mut [u8]) -> Result<()> {
        if out.len() > super::MAX_REQUEST {
            return Err(KeyforgeError::max_exceeded(
                "HCG single-call request exceeds MAX_REQUEST",
            ));
        }

        let mut filled = 0;
        while filled < out.len() {
            if self.block_pos == self.block_buf.len() {
                self.step();
                self.block_buf = Zeroizing::new(self.hmac_state.to_vec());
                self.block_pos = 0;
            }
            let avail = self.block_buf.len() - self.block_pos;
            let take = (out.len() - filled).min(avail);
            out[filled..filled + take]
                .copy_from_slice(&self.block_buf[self.block_pos..self.block_pos + take]);
            self.block_pos += take;
            filled += take;
        }

        self.reseed_counter += out.len() as u64;
        if self.reseed_counter >= self.reseed_threshold {
            if let Some(provider) = self.provider.take() {
                self.reseed_requests += 1;
                if self.reseed_requests > self.max_reseed {
                    self.provider = Some(provider);
                    return Err(KeyforgeError::max_exceeded(
                        "HCG reseed cap exceeded; the instance must be re-initialized",
                    ));
                }
                let mut new_seed = vec![0u8; self.key.len()];
                provider.fill(&mut new_seed)?;
                self.reseed(&new_seed, provider.as_ref())?;
                self.provider = Some(provider);
            }
        }
        Ok(())
    }

    /// Key-strengthening extract: stretch `old_key || new_seed` across
    /// enough HMAC blocks to cover the key length, each block additionally
    /// salted with fresh provider entropy up to the hash's block size.
    fn reseed(&mut self, new_seed: &[u8], provider: &dyn EntropyProvider) -> Result<()> {
        let key_len = self.key.len();
        let tag_size = self.variant.tag_size();
        let block_size = self.variant.block_size();
        let blocks_needed = key_len.div_ceil(tag_size);

        let mut new_key = Zeroizing::new(Vec::with_capacity(blocks_needed * tag_size));
        for _ in 0..blocks_needed {
            self.seed_ctr = self.seed_ctr.wrapping_add(1);

            let mut data = Vec::with_capacity(8 + self.key.len() + new_seed.len());
            data.extend_from_slice(&self.seed_ctr.to_be_bytes());
            data.extend_from_slice(&self.key);
            data.extend_from_slice(new_seed);
            if data.len() % block_size != 0 {
                let pad_len = block_size - (data.len() % block_size);
                let mut pad = vec![0u8; pad_len];
                provider.fill(&mut pad)?;
                data.extend_from_slice(&pad);
            }

            let mut mac = AnyHmac::new(self.variant, &self.key);
            mac.update(&data);
            new_key.extend_from_slice(&mac.finalize());
        }
        new_key.truncate(key_len);

        self.key = Zeroizing::new(new_key.to_vec());
        let mut fresh_state = vec![0u8; tag_size];
        provider.fill(&mut fresh_state)?;
        self.hmac_state = Zeroizing::new(fresh_state);
        self.block_buf = Zeroizing::new(Vec::new());
        self.block_pos = 0;
        self.reseed_counter = 0;
        tracing::debug!("hcg reseeded");
        Ok(())
    }
}
