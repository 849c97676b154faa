//! Block-cipher counter mode (CTR) with staggered parallel lanes (spec §4.2).
//!
//! The 16-byte counter block is treated as one big-endian 128-bit integer;
//! `initialize` seeds it from the caller's nonce and every processed block
//! advances it by one. Parallel dispatch only changes how that arithmetic
//! is scheduled across `rayon`, never its result (spec §8 invariant 10).

use rayon::prelude::*;

use super::BLOCK_SIZE;
use crate::error::{KeyforgeError, Result};
use crate::parallel::ParallelProfile;
use crate::primitives::BlockCipher;

pub struct CounterMode {
    cipher: Box<dyn BlockCipher>,
    counter: u128,
    profile: ParallelProfile,
    initialized: bool,
    /// Unused tail of the last keystream block, carried across `transform`
    /// calls so a non-block-aligned chunk never wastes or skips keystream
    /// bytes at a call boundary. `ks_used == BLOCK_SIZE` means empty.
    ks_block: [u8; BLOCK_SIZE],
    ks_used: usize,
}

impl CounterMode {
    pub fn new(cipher: Box<dyn BlockCipher>, profile: ParallelProfile) -> Self {
        Self {
            cipher,
            counter: 0,
            profile,
            initialized: false,
            ks_block: [0u8; BLOCK_SIZE],
            ks_used: BLOCK_SIZE,
        }
    }

    pub fn initialize(&mut self, nonce: &[u8]) -> Result<()> {
        if nonce.len() != BLOCK_SIZE {
            return Err(KeyforgeError::InvalidNonce(format!(
                "counter-mode nonce must be {} bytes, got {}",
                BLOCK_SIZE,
                nonce.len()
            )));
        }
        let mut buf = [0u8; BLOCK_SIZE];
        buf.copy_from_slice(nonce);
        self.counter = u128::from_be_bytes(buf);
        self.ks_used = BLOCK_SIZE;
        self.initialized = true;
        tracing::debug!("counter-mode initialized");
        Ok(())
    }

    /// XOR `input` with the keystream into `output`; encrypt and decrypt
    /// are the same operation in counter mode. Any buffered keystream tail
    /// left over from a previous, non-block-aligned call is drained first
    /// so parallel dispatch always starts from a fresh block boundary.
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

        let mut offset = 0;
        if self.ks_used < BLOCK_SIZE {
            let avail = BLOCK_SIZE - self.ks_used;
            let take = input.len().min(avail);
            for i in 0..take {
                output[i] = input[i] ^ self.ks_block[self.ks_used + i];
            }
            self.ks_used += take;
            offset = take;
        }

        let input = &input[offset..];
        let output = &mut output[offset..];
        let seg = self.profile.parallel_block_size();
        if self.profile.is_parallel() && input.len() >= seg {
            self.transform_parallel(input, output, seg);
        } else {
            self.transform_sequential(input, output);
        }
        Ok(())
    }

    /// Buffered one-block-at-a-time keystream XOR; leaves any unused tail
    /// of the final block in `ks_block`/`ks_used` for the next call.
    fn transform_sequential(&mut self, input: &[u8], output: &mut [u8]) {
        let mut pos = 0;
        while pos < input.len() {
            self.cipher
                .encrypt_block(&self.counter.to_be_bytes(), &mut self.ks_block);
            self.counter = self.counter.wrapping_add(1);

            let take = (input.len() - pos).min(BLOCK_SIZE);
            for i in 0..take {
                output[pos + i] = input[pos + i] ^ self.ks_block[i];
            }
            self.ks_used = take;
            pos += take;
        }
    }

    /// Splits one `seg`-byte segment into `max_degree` equal chunks, each
    /// keyed off a counter derived from the segment's starting counter
    /// (spec §4.2 "Parallel policy"); any residue below `seg` falls back
    /// to the sequential path.
    fn transform_parallel(&mut self, input: &[u8], output: &mut [u8], seg: usize) {
        let n = self.profile.parallel_max_degree();
        let chunk_bytes = seg / n;
        let chunk_blocks = (chunk_bytes / BLOCK_SIZE) as u128;
        let mut offset = 0;

        while input.len() - offset >= seg {
            let base_counter = self.counter;
            let cipher = self.cipher.as_ref();
            output[offset..offset + seg]
                .par_chunks_mut(chunk_bytes)
                .zip(input[offset..offset + seg].par_chunks(chunk_bytes))
                .enumerate()
                .for_each(|(i, (out_chunk, in_chunk))| {
                    let mut counter = base_counter.wrapping_add(chunk_blocks * i as u128);
                    for (in_block, out_block) in
                        in_chunk.chunks(BLOCK_SIZE).zip(out_chunk.chunks_mut(BLOCK_SIZE))
                    {
                        let mut keystream = [0u8; BLOCK_SIZE];
                        cipher.encrypt_block(&counter.to_be_bytes(), &mut keystream);
                        for k in 0..in_block.len() {
                            out_block[k] = in_block[k] ^ keystream[k];
                        }
                        counter = counter.wrapping_add(1);
                    }
                });
            self.counter = self.counter.wrapping_add((seg / BLOCK_SIZE) as u128);
            offset += seg;
        }

        if offset < input.len() {
            self.transform_sequential(&input[offset..], &mut output[offset..]);
        }
    }

    pub fn encrypt_block(&mut self, input: &[u8; BLOCK_SIZE], output: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        if !self.initialized {
            return Err(KeyforgeError::NotInitialized);
        }
        let mut keystream = [0u8; BLOCK_SIZE];
        self.cipher
            .encrypt_block(&self.counter.to_be_bytes(), &mut keystream);
        for i in 0..BLOCK_SIZE {
            output[i] = input[i] ^ keystream[i];
        }
        self.counter = self.counter.wrapping_add(1);
        Ok(())
    }

    pub fn decrypt_block(&mut self, input: &[u8; BLOCK_SIZE], output: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        self.encrypt_block(input, output)
    }
}
