//! OCB: single-pass authenticated encryption via offset chains (spec §4.5,
//! RFC 7253 construction).
//!
//! `offset_i = offset_{i-1} xor L[ntz(i)]`; interior blocks are enciphered
//! directly against their offset, the final partial block is masked with
//! `E_k(offset_last xor L*)`, and the tag folds the message checksum
//! against `E_k(checksum xor offset_last xor L$)` and the AD hash.
//!
//! `transform` may be called more than once per session, but every call
//! except the last must carry a whole number of 16-byte blocks -- the
//! first short call is treated as the message's tail and closes the
//! offset chain for good (further `transform` calls become illegal).

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::BLOCK_SIZE;
use crate::error::{KeyforgeError, Result};
use crate::primitives::block_cipher::aes_for_key;
use crate::primitives::BlockCipher;

const MIN_TAG_SIZE: usize = 12;

fn xor_block(a: [u8; BLOCK_SIZE], b: &[u8]) -> [u8; BLOCK_SIZE] {
    let mut out = a;
    for i in 0..b.len() {
        out[i] ^= b[i];
    }
    out
}

fn double_block(x: [u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
    let msb = (x[0] & 0x80) != 0;
    let mut out = [0u8; BLOCK_SIZE];
    let mut carry = 0u8;
    for i in (0..BLOCK_SIZE).rev() {
        let top = (x[i] & 0x80) >> 7;
        out[i] = (x[i] << 1) | carry;
        carry = top;
    }
    if msb {
        out[15] ^= 0x87;
    }
    out
}

/// Shift a big-endian bit string left by `bits`, keeping `out_len` bytes.
fn shift_left_bits(data: &[u8], bits: u32, out_len: usize) -> Vec<u8> {
    let byte_shift = (bits / 8) as usize;
    let bit_shift = bits % 8;
    let mut out = vec![0u8; out_len];
    for i in 0..out_len {
        let src_idx = i + byte_shift;
        if src_idx >= data.len() {
            continue;
        }
        let mut value = (data[src_idx] as u16) << bit_shift;
        if bit_shift > 0 && src_idx + 1 < data.len() {
            value |= (data[src_idx + 1] as u16) >> (8 - bit_shift);
        }
        out[i] = value as u8;
    }
    out
}

/// Derive `(offset_0, bottom, ktop)` from the nonce per RFC 7253's
/// stretch-and-shift construction (spec SPEC_FULL.md §4 OCB supplement).
fn derive_offset_0(cipher: &dyn BlockCipher, nonce: &[u8]) -> [u8; BLOCK_SIZE] {
    let bitlen = nonce.len() * 8;
    let mut value: u128 = 1;
    for &b in nonce {
        value = (value << 8) | b as u128;
    }
    let shift = 127 - bitlen as u32;
    let nonce_star = value << shift;

    let bottom = (nonce_star & 0x3F) as u32;
    let ktop_input = (nonce_star & !0x3Fu128).to_be_bytes();
    let mut ktop = [0u8; BLOCK_SIZE];
    cipher.encrypt_block(&ktop_input, &mut ktop);

    let mut stretch = [0u8; 24];
    stretch[..16].copy_from_slice(&ktop);
    for i in 0..8 {
        stretch[16 + i] = ktop[i] ^ ktop[i + 1];
    }

    let window = shift_left_bits(&stretch, bottom, BLOCK_SIZE);
    let mut offset_0 = [0u8; BLOCK_SIZE];
    offset_0.copy_from_slice(&window);
    offset_0
}

pub struct Ocb {
    key: Zeroizing<Vec<u8>>,
    cipher: Option<Box<dyn BlockCipher>>,
    l_star: [u8; BLOCK_SIZE],
    l_dollar: [u8; BLOCK_SIZE],
    l_cache: Vec<[u8; BLOCK_SIZE]>,
    offset_last: [u8; BLOCK_SIZE],
    block_count: u64,
    checksum: [u8; BLOCK_SIZE],
    ad_hash: [u8; BLOCK_SIZE],
    tail_processed: bool,
    encrypting: bool,
    initialized: bool,
    finalized: bool,
    ad_loaded: bool,
    ad_preserve: bool,
    auto_increment: bool,
    nonce: Vec<u8>,
}

impl Ocb {
    pub fn new() -> Self {
        Self {
            key: Zeroizing::new(Vec::new()),
            cipher: None,
            l_star: [0u8; BLOCK_SIZE],
            l_dollar: [0u8; BLOCK_SIZE],
            l_cache: Vec::new(),
            offset_last: [0u8; BLOCK_SIZE],
            block_count: 0,
            checksum: [0u8; BLOCK_SIZE],
            ad_hash: [0u8; BLOCK_SIZE],
            tail_processed: false,
            encrypting: true,
            initialized: false,
            finalized: false,
            ad_loaded: false,
            ad_preserve: false,
            auto_increment: false,
            nonce: Vec::new(),
        }
    }

    pub fn with_flags(mut self, ad_preserve: bool, auto_increment: bool) -> Self {
        self.ad_preserve = ad_preserve;
        self.auto_increment = auto_increment;
        self
    }

    fn l_value(&mut self, n: u32) -> [u8; BLOCK_SIZE] {
        while self.l_cache.len() <= n as usize {
            let prev = self.l_cache.last().copied().unwrap_or(self.l_dollar);
            self.l_cache.push(double_block(prev));
        }
        self.l_cache[n as usize]
    }

    pub fn initialize(&mut self, encrypting: bool, key: &[u8], nonce: &[u8]) -> Result<()> {
        if !matches!(key.len(), 16 | 24 | 32) {
            return Err(KeyforgeError::InvalidKey {
                expected: vec![16, 24, 32],
                actual: key.len(),
            });
        }
        if !(12..=15).contains(&nonce.len()) {
            return Err(KeyforgeError::InvalidNonce(
                "OCB nonce must be 12-15 bytes".into(),
            ));
        }
        if self.initialized && !self.key.is_empty() && nonce == self.nonce.as_slice() {
            return Err(KeyforgeError::InvalidNonce(
                "nonce must differ from the previous vector under the same key".into(),
            ));
        }

        let cipher = aes_for_key(key)?;
        let mut l_star = [0u8; BLOCK_SIZE];
        cipher.encrypt_block(&[0u8; BLOCK_SIZE], &mut l_star);
        let l_dollar = double_block(l_star);
        let offset_0 = derive_offset_0(cipher.as_ref(), nonce);

        self.key = Zeroizing::new(key.to_vec());
        self.nonce = nonce.to_vec();
        self.encrypting = encrypting;
        self.cipher = Some(cipher);
        self.l_star = l_star;
        self.l_dollar = l_dollar;
        self.l_cache = Vec::new();
        self.offset_last = offset_0;
        self.block_count = 0;
        self.checksum = [0u8; BLOCK_SIZE];
        self.ad_hash = [0u8; BLOCK_SIZE];
        self.tail_processed = false;
        self.ad_loaded = false;
        self.initialized = true;
        self.finalized = false;
        tracing::debug!("ocb initialized");
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
        let cipher = self.cipher.take().expect("initialized");
        let mut offset = [0u8; BLOCK_SIZE];
        let mut sum = self.ad_hash;
        let mut i: u32 = 1;
        let full_len = (ad.len() / BLOCK_SIZE) * BLOCK_SIZE;

        let mut idx = 0;
        while idx < full_len {
            let l = self.l_value(i.trailing_zeros());
            offset = xor_block(offset, &l);
            let y = xor_block(offset, &ad[idx..idx + BLOCK_SIZE]);
            let mut enc = [0u8; BLOCK_SIZE];
            cipher.encrypt_block(&y, &mut enc);
            sum = xor_block(sum, &enc);
            i += 1;
            idx += BLOCK_SIZE;
        }

        let tail = &ad[full_len..];
        if !tail.is_empty() {
            offset = xor_block(offset, &self.l_star);
            let mut padded = [0u8; BLOCK_SIZE];
            padded[..tail.len()].copy_from_slice(tail);
            padded[tail.len()] = 0x80;
            let y = xor_block(offset, &padded);
            let mut enc = [0u8; BLOCK_SIZE];
            cipher.encrypt_block(&y, &mut enc);
            sum = xor_block(sum, &enc);
        }

        self.ad_hash = sum;
        self.ad_loaded = true;
        self.cipher = Some(cipher);
        Ok(())
    }

    pub fn transform(&mut self, input: &[u8], output: &mut [u8]) -> Result<()> {
        if !self.initialized {
            return Err(KeyforgeError::NotInitialized);
        }
        if self.tail_processed {
            return Err(KeyforgeError::illegal(
                "OCB session already closed its offset chain with a tail block",
            ));
        }
        if input.len() != output.len() {
            return Err(KeyforgeError::InvalidSize {
                expected: input.len(),
                actual: output.len(),
            });
        }

        let cipher = self.cipher.take().expect("initialized");
        let full_len = (input.len() / BLOCK_SIZE) * BLOCK_SIZE;
        let mut idx = 0;
        while idx < full_len {
            self.block_count += 1;
            let l = self.l_value(self.block_count.trailing_zeros());
            self.offset_last = xor_block(self.offset_last, &l);
            let block_in = &input[idx..idx + BLOCK_SIZE];
            let out_block = &mut output[idx..idx + BLOCK_SIZE];

            if self.encrypting {
                let y = xor_block(self.offset_last, block_in);
                let mut enc = [0u8; BLOCK_SIZE];
                cipher.encrypt_block(&y, &mut enc);
                let c = xor_block(self.offset_last, &enc);
                out_block.copy_from_slice(&c[..BLOCK_SIZE]);
                self.checksum = xor_block(self.checksum, block_in);
            } else {
                let y = xor_block(self.offset_last, block_in);
                let mut dec = [0u8; BLOCK_SIZE];
                cipher.decrypt_block(&y, &mut dec);
                let p = xor_block(self.offset_last, &dec);
                out_block.copy_from_slice(&p[..BLOCK_SIZE]);
                self.checksum = xor_block(self.checksum, &p);
            }
            idx += BLOCK_SIZE;
        }

        let tail_in = &input[full_len..];
        if !tail_in.is_empty() {
            let offset_star = xor_block(self.offset_last, &self.l_star);
            let mut pad = [0u8; BLOCK_SIZE];
            cipher.encrypt_block(&offset_star, &mut pad);

            let out_tail = &mut output[full_len..];
            for i in 0..tail_in.len() {
                out_tail[i] = tail_in[i] ^ pad[i];
            }
            let plain_tail = if self.encrypting { tail_in } else { &*out_tail };
            let mut padded_plain = [0u8; BLOCK_SIZE];
            padded_plain[..plain_tail.len()].copy_from_slice(plain_tail);
            padded_plain[tail_in.len()] = 0x80;
            self.checksum = xor_block(self.checksum, &padded_plain);
            self.tail_processed = true;
        }

        self.cipher = Some(cipher);
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
        let cipher = self.cipher.take().expect("initialized");
        let pre_tag = xor_block(xor_block(self.checksum, &self.offset_last), &self.l_dollar);
        let mut enc = [0u8; BLOCK_SIZE];
        cipher.encrypt_block(&pre_tag, &mut enc);
        self.cipher = Some(cipher);
        let tag = xor_block(enc, &self.ad_hash);
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

impl Default for Ocb {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_block_reduces_on_msb() {
        let mut high = [0u8; BLOCK_SIZE];
        high[0] = 0x80;
        let doubled = double_block(high);
        assert_eq!(doubled[15] & 0x87, doubled[15]);
    }

    #[test]
    fn encrypt_decrypt_round_trips_and_verifies() {
        let key = [0x11u8; 16];
        let nonce = [0x22u8; 12];
        let plaintext = vec![0x33u8; 1024];
        let ad = vec![0x44u8; 64];

        let mut enc = Ocb::new();
        enc.initialize(true, &key, &nonce).unwrap();
        enc.set_associated_data(&ad).unwrap();
        let mut ciphertext = vec![0u8; plaintext.len()];
        enc.transform(&plaintext, &mut ciphertext).unwrap();
        let tag = enc.finalize(16).unwrap();

        let mut dec = Ocb::new();
        dec.initialize(false, &key, &nonce).unwrap();
        dec.set_associated_data(&ad).unwrap();
        let mut recovered = vec![0u8; ciphertext.len()];
        dec.transform(&ciphertext, &mut recovered).unwrap();
        assert!(dec.verify(&tag).unwrap());
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn non_block_aligned_message_round_trips() {
        let key = [0x55u8; 16];
        let nonce = [0x01u8; 12];
        let plaintext = vec![0x66u8; 1000]; // not a multiple of 16

        let mut enc = Ocb::new();
        enc.initialize(true, &key, &nonce).unwrap();
        enc.set_associated_data(&[]).unwrap();
        let mut ciphertext = vec![0u8; plaintext.len()];
        enc.transform(&plaintext, &mut ciphertext).unwrap();
        let tag = enc.finalize(16).unwrap();

        let mut dec = Ocb::new();
        dec.initialize(false, &key, &nonce).unwrap();
        dec.set_associated_data(&[]).unwrap();
        let mut recovered = vec![0u8; ciphertext.len()];
        dec.transform(&ciphertext, &mut recovered).unwrap();
        assert!(dec.verify(&tag).unwrap());
        assert_eq!(recovered, plaintext);
    }

    // S5 - two auto_increment encryptions of the same plaintext must
    // differ in every block.
    #[test]
    fn auto_increment_rounds_differ_in_every_block() {
        let key = [0x01u8; 16];
        let mut nonce = [0u8; 12];
        nonce[11] = 0; // counter byte
        let ad = vec![0xAAu8; 32];
        let plaintext = vec![0x55u8; 1024];

        let mut enc = Ocb::new().with_flags(false, true);
        enc.initialize(true, &key, &nonce).unwrap();
        enc.set_associated_data(&ad).unwrap();
        let mut first = vec![0u8; plaintext.len()];
        enc.transform(&plaintext, &mut first).unwrap();
        let _ = enc.finalize(16).unwrap();

        enc.set_associated_data(&ad).unwrap();
        let mut second = vec![0u8; plaintext.len()];
        enc.transform(&plaintext, &mut second).unwrap();
        let _ = enc.finalize(16).unwrap();

        for (a, b) in first.chunks(16).zip(second.chunks(16)) {
            assert_ne!(a, b);
        }
    }

    #[test]
    fn bit_flip_in_ciphertext_fails_verify() {
        let key = [0x11u8; 16];
        let nonce = [0x22u8; 12];
        let plaintext = vec![0xAAu8; 64];

        let mut enc = Ocb::new();
        enc.initialize(true, &key, &nonce).unwrap();
        enc.set_associated_data(&[]).unwrap();
        let mut ciphertext = vec![0u8; plaintext.len()];
        enc.transform(&plaintext, &mut ciphertext).unwrap();
        let tag = enc.finalize(16).unwrap();

        ciphertext[0] ^= 0x01;
        let mut dec = Ocb::new();
        dec.initialize(false, &key, &nonce).unwrap();
        dec.set_associated_data(&[]).unwrap();
        let mut recovered = vec![0u8; ciphertext.len()];
        dec.transform(&ciphertext, &mut recovered).unwrap();
        assert!(!dec.verify(&tag).unwrap());
    }
}
