//! GCM: GHASH-accumulated authenticated encryption over a CTR keystream
//! (spec §4.4).
//!
//! `H = E_k(0^128)`; `J0` is the nonce packed to a counter block (direct
//! for 96-bit nonces, GHASH-derived otherwise); the tag is `E_k(J0) xor
//! GHASH_H(AD || pad || C || pad || len(AD) || len(C))`.

use generic_array::GenericArray;
use ghash::universal_hash::{KeyInit, UniversalHash};
use ghash::GHash;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::BLOCK_SIZE;
use crate::error::{KeyforgeError, Result};
use crate::primitives::block_cipher::aes_for_key;
use crate::primitives::BlockCipher;

const MIN_TAG_SIZE: usize = 12;
const MIN_NONCE_SIZE: usize = 8;
/// GCM's single-message limit (2^36 - 32 bytes, spec §4.4).
const MAX_MESSAGE_BYTES: u64 = (1u64 << 36) - 32;

/// GHASH accumulator with cross-call partial-block buffering, since
/// `transform` may be invoked many times with chunk sizes that don't
/// align to 16 bytes.
struct StreamingGhash {
    gh: GHash,
    buffer: Vec<u8>,
}

impl StreamingGhash {
    fn new(h: &GenericArray<u8, generic_array::typenum::U16>) -> Self {
        Self {
            gh: GHash::new(h),
            buffer: Vec::with_capacity(BLOCK_SIZE),
        }
    }

    fn absorb(&mut self, mut data: &[u8]) {
        if !self.buffer.is_empty() {
            let need = BLOCK_SIZE - self.buffer.len();
            let take = need.min(data.len());
            self.buffer.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.buffer.len() == BLOCK_SIZE {
                self.gh
                    .update(&[*GenericArray::from_slice(&self.buffer)]);
                self.buffer.clear();
            } else {
                return;
            }
        }
        let mut chunks = data.chunks_exact(BLOCK_SIZE);
        for block in &mut chunks {
            self.gh.update(&[*GenericArray::from_slice(block)]);
        }
        self.buffer.extend_from_slice(chunks.remainder());
    }

    /// Pad and absorb any leftover partial block, closing out a segment
    /// boundary (AD/C or end-of-stream) per spec §4.4's zero-padding.
    fn flush(&mut self) {
        if !self.buffer.is_empty() {
            self.gh.update_padded(&self.buffer);
            self.buffer.clear();
        }
    }

    fn finish(mut self) -> [u8; BLOCK_SIZE] {
        self.flush();
        let tag = self.gh.finalize();
        let mut out = [0u8; BLOCK_SIZE];
        out.copy_from_slice(&tag);
        out
    }
}

fn inc32(block: &mut [u8; BLOCK_SIZE]) {
    let mut ctr = u32::from_be_bytes([block[12], block[13], block[14], block[15]]);
    ctr = ctr.wrapping_add(1);
    block[12..16].copy_from_slice(&ctr.to_be_bytes());
}

fn derive_j0(cipher: &dyn BlockCipher, h: &GenericArray<u8, generic_array::typenum::U16>, nonce: &[u8]) -> [u8; BLOCK_SIZE] {
    if nonce.len() == 12 {
        let mut j0 = [0u8; BLOCK_SIZE];
        j0[..12].copy_from_slice(nonce);
        j0[15] = 1;
        return j0;
    }
    let mut gh = StreamingGhash::new(h);
    gh.absorb(nonce);
    gh.flush();
    let mut length_block = [0u8; BLOCK_SIZE];
    length_block[8..].copy_from_slice(&((nonce.len() as u64) * 8).to_be_bytes());
    gh.gh.update(&[*GenericArray::from_slice(&length_block)]);
    gh.finish()
}

pub struct Gcm {
    key: Zeroizing<Vec<u8>>,
    cipher: Option<Box<dyn BlockCipher>>,
    h: Option<GenericArray<u8, generic_array::typenum::U16>>,
    j0: [u8; BLOCK_SIZE],
    ej0: [u8; BLOCK_SIZE],
    counter: [u8; BLOCK_SIZE],
    /// Unused tail of the last keystream block, carried across `transform`
    /// calls so non-block-aligned chunk sizes don't desync the keystream.
    ks_block: [u8; BLOCK_SIZE],
    ks_used: usize,
    encrypting: bool,
    initialized: bool,
    finalized: bool,
    ad_loaded: bool,
    ad_preserve: bool,
    auto_increment: bool,
    nonce: Vec<u8>,
    ad_bits: u64,
    msg_bits: u64,
    msg_bytes_seen: u64,
    ghash: Option<StreamingGhash>,
}

impl Gcm {
    pub fn new() -> Self {
        Self {
            key: Zeroizing::new(Vec::new()),
            cipher: None,
            h: None,
            j0: [0u8; BLOCK_SIZE],
            ej0: [0u8; BLOCK_SIZE],
            counter: [0u8; BLOCK_SIZE],
            ks_block: [0u8; BLOCK_SIZE],
            ks_used: BLOCK_SIZE,
            encrypting: true,
            initialized: false,
            finalized: false,
            ad_loaded: false,
            ad_preserve: false,
            auto_increment: false,
            nonce: Vec::new(),
            ad_bits: 0,
            msg_bits: 0,
            msg_bytes_seen: 0,
            ghash: None,
        }
    }

    pub fn with_flags(mut self, ad_preserve: bool, auto_increment: bool) -> Self {
        self.ad_preserve = ad_preserve;
        self.auto_increment = auto_increment;
        self
    }

    pub fn initialize(&mut self, encrypting: bool, key: &[u8], nonce: &[u8]) -> Result<()> {
        if !matches!(key.len(), 16 | 24 | 32) {
            return Err(KeyforgeError::InvalidKey {
                expected: vec![16, 24, 32],
                actual: key.len(),
            });
        }
        if nonce.len() < MIN_NONCE_SIZE {
            return Err(KeyforgeError::InvalidNonce(format!(
                "nonce must be at least {MIN_NONCE_SIZE} bytes"
            )));
        }
        if self.initialized && !self.key.is_empty() && nonce == self.nonce.as_slice() {
            return Err(KeyforgeError::InvalidNonce(
                "nonce must differ from the previous vector under the same key".into(),
            ));
        }

        let cipher = aes_for_key(key)?;
        let mut h_bytes = [0u8; BLOCK_SIZE];
        cipher.encrypt_block(&[0u8; BLOCK_SIZE], &mut h_bytes);
        let h = *GenericArray::from_slice(&h_bytes);

        let j0 = derive_j0(cipher.as_ref(), &h, nonce);
        let mut ej0 = [0u8; BLOCK_SIZE];
        cipher.encrypt_block(&j0, &mut ej0);
        let mut counter = j0;
        inc32(&mut counter);

        self.key = Zeroizing::new(key.to_vec());
        self.nonce = nonce.to_vec();
        self.encrypting = encrypting;
        self.cipher = Some(cipher);
        self.h = Some(h);
        self.j0 = j0;
        self.ej0 = ej0;
        self.counter = counter;
        self.ks_used = BLOCK_SIZE;
        self.ad_loaded = false;
        self.ad_bits = 0;
        self.msg_bits = 0;
        self.msg_bytes_seen = 0;
        self.ghash = Some(StreamingGhash::new(&h));
        self.initialized = true;
        self.finalized = false;
        tracing::debug!("gcm initialized");
        Ok(())
    }

    pub fn set_associated_data(&mut self, ad: &[u8]) -> Result<()> {
        if !self.initialized {
            return Err(KeyforgeError::NotInitialized);
        }
        if self.ad_loaded && !self.ad_preserve {
            return Err(KeyforgeError::illegal(
                "set_associated_data called twice without ad_preserve",
            ));
        }
        let gh = self.ghash.as_mut().expect("initialized");
        gh.absorb(ad);
        gh.flush();
        self.ad_bits += (ad.len() as u64) * 8;
        self.ad_loaded = true;
        Ok(())
    }

    /// Buffered keystream XOR: draws a fresh block only when the buffered
    /// tail from the previous call (or previous block, mid-call) is spent.
    fn apply_keystream(&mut self, input: &[u8], output: &mut [u8]) {
        let mut pos = 0;
        while pos < input.len() {
            if self.ks_used == BLOCK_SIZE {
                let counter = self.counter;
                self.cipher
                    .as_ref()
                    .expect("initialized")
                    .encrypt_block(&counter, &mut self.ks_block);
                inc32(&mut self.counter);
                self.ks_used = 0;
            }
            let avail = BLOCK_SIZE - self.ks_used;
            let take = (input.len() - pos).min(avail);
            for i in 0..take {
                output[pos + i] = input[pos + i] ^ self.ks_block[self.ks_used + i];
            }
            self.ks_used += take;
            pos += take;
        }
    }

    pub fn transform(&mut self, input: &[u8], output: &mut [u8]) -> Result<()> {
        if !self.initialized {
            return Err(KeyforgeError::NotInitialized);
        }
        if input.len() != output.len() {
            return Err(KeyforgeError::InvalidSize {
                expected: input.len(),
                actual: output.len(),
            });
        }
        if self.msg_bytes_seen + input.len() as u64 > MAX_MESSAGE_BYTES {
            return Err(KeyforgeError::max_exceeded(
                "GCM single-message limit of 2^36 - 32 bytes exceeded",
            ));
        }

        if self.encrypting {
            self.apply_keystream(input, output);
            self.ghash.as_mut().expect("initialized").absorb(output);
        } else {
            self.ghash.as_mut().expect("initialized").absorb(input);
            self.apply_keystream(input, output);
        }
        self.msg_bytes_seen += input.len() as u64;
        self.msg_bits += (input.len() as u64) * 8;
        Ok(())
    }

    fn compute_tag(&mut self, tag_len: usize) -> Result<Vec<u8>> {
        if !(MIN_TAG_SIZE..=BLOCK_SIZE).contains(&tag_len) {
            return Err(KeyforgeError::invalid_param(format!(
                "tag_len must be in [{MIN_TAG_SIZE}, {BLOCK_SIZE}], got {tag_len}"
            )));
        }
        if !self.initialized {
            return Err(KeyforgeError::NotInitialized);
        }
        let mut gh = self.ghash.take().expect("initialized");
        gh.flush();
        let mut length_block = [0u8; BLOCK_SIZE];
        length_block[..8].copy_from_slice(&self.ad_bits.to_be_bytes());
        length_block[8..].copy_from_slice(&self.msg_bits.to_be_bytes());
        gh.gh.update(&[*GenericArray::from_slice(&length_block)]);
        let checksum = gh.finish();

        let mut tag = [0u8; BLOCK_SIZE];
        for i in 0..BLOCK_SIZE {
            tag[i] = self.ej0[i] ^ checksum[i];
        }
        Ok(tag[..tag_len].to_vec())
    }

    fn roll_after_finalize(&mut self) -> Result<()> {
        if !self.auto_increment {
            self.initialized = false;
            self.finalized = true;
            return Ok(());
        }
        let mut nonce = self.nonce.clone();
        for byte in nonce.iter_mut().rev() {
            let (next, carry) = byte.overflowing_add(1);
            *byte = next;
            if !carry {
                break;
            }
        }
        let key = self.key.to_vec();
        let encrypting = self.encrypting;
        self.nonce = Vec::new();
        self.initialize(encrypting, &key, &nonce)
    }

    pub fn finalize(&mut self, tag_len: usize) -> Result<Vec<u8>> {
        let tag = self.compute_tag(tag_len)?;
        self.roll_after_finalize()?;
        Ok(tag)
    }

    pub fn verify(&mut self, candidate: &[u8]) -> Result<bool> {
        if self.encrypting {
            return Err(KeyforgeError::illegal("verify is only legal on decryption instances"));
        }
        let tag = self.compute_tag(candidate.len())?;
        let matches: bool = tag.ct_eq(candidate).into();
        self.roll_after_finalize()?;
        Ok(matches)
    }
}

impl Default for Gcm {
    fn default() -> Self {
        Self::new()
    }
}
