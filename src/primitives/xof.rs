//! cSHAKE / SHAKE / KMAC framing (NIST SP 800-185) over the Keccak-f[1600]
//! permutation in `keccak.rs`.
//!
//! This is the "in scope" half of spec §1's XOF collaborator: domain
//! separation, `bytepad`/`encode_string`, and incremental squeeze
//! bookkeeping are owned by this crate because no dependency exposes the
//! non-standard SHAKE512/SHAKE1024 rates §4.7 needs.

use super::keccak::keccak_f1600;

/// Keccak-based XOF parameterization (spec §4.7 table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeccakMode {
    Shake128,
    Shake256,
    Shake512,
    Shake1024,
}

impl KeccakMode {
    /// Sponge rate, in bytes.
    pub fn rate_bytes(self) -> usize {
        match self {
            KeccakMode::Shake128 => 168,
            KeccakMode::Shake256 => 136,
            KeccakMode::Shake512 => 72,
            KeccakMode::Shake1024 => 72,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            KeccakMode::Shake128 => "SHAKE128",
            KeccakMode::Shake256 => "SHAKE256",
            KeccakMode::Shake512 => "SHAKE512",
            KeccakMode::Shake1024 => "SHAKE1024",
        }
    }

    /// Parse the mode byte embedded in an HKDS DID (spec §4.9).
    pub fn from_did_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(KeccakMode::Shake128),
            1 => Some(KeccakMode::Shake256),
            2 => Some(KeccakMode::Shake512),
            3 => Some(KeccakMode::Shake1024),
            _ => None,
        }
    }

    pub fn to_did_byte(self) -> u8 {
        match self {
            KeccakMode::Shake128 => 0,
            KeccakMode::Shake256 => 1,
            KeccakMode::Shake512 => 2,
            KeccakMode::Shake1024 => 3,
        }
    }
}

fn left_encode(value: u64) -> Vec<u8> {
    if value == 0 {
        return vec![1, 0];
    }
    let mut bytes = Vec::new();
    let mut v = value;
    while v > 0 {
        bytes.push((v & 0xFF) as u8);
        v >>= 8;
    }
    bytes.reverse();
    let mut out = vec![bytes.len() as u8];
    out.extend(bytes);
    out
}

fn right_encode(value: u64) -> Vec<u8> {
    if value == 0 {
        return vec![0, 1];
    }
    let mut bytes = Vec::new();
    let mut v = value;
    while v > 0 {
        bytes.push((v & 0xFF) as u8);
        v >>= 8;
    }
    bytes.reverse();
    bytes.push(bytes.len() as u8);
    bytes
}

fn encode_string(s: &[u8]) -> Vec<u8> {
    let mut out = left_encode((s.len() as u64) * 8);
    out.extend_from_slice(s);
    out
}

fn bytepad(x: &[u8], w: usize) -> Vec<u8> {
    let mut out = left_encode(w as u64);
    out.extend_from_slice(x);
    while out.len() % w != 0 {
        out.push(0);
    }
    out
}

fn absorb_block(state: &mut [u64; 25], block: &[u8], rate: usize) {
    for (i, word_bytes) in block[..rate].chunks_exact(8).enumerate() {
        let word = u64::from_le_bytes(word_bytes.try_into().unwrap());
        state[i] ^= word;
    }
    keccak_f1600(state);
}

/// A Keccak-based extendable output function, usable either as plain
/// SHAKE or, when `name`/`customization` are supplied, as cSHAKE.
pub struct Xof {
    rate: usize,
    state: [u64; 25],
    domain_byte: u8,
    pending: Vec<u8>,
    out_block: Vec<u8>,
    out_pos: usize,
    squeezing: bool,
}

impl Xof {
    pub fn new_shake(mode: KeccakMode) -> Self {
        Self::new_cshake(mode, &[], &[])
    }

    /// `name` is cSHAKE's function-name string `N`; `customization` is `S`.
    pub fn new_cshake(mode: KeccakMode, name: &[u8], customization: &[u8]) -> Self {
        let rate = mode.rate_bytes();
        let mut pending = Vec::new();
        let domain_byte = if name.is_empty() && customization.is_empty() {
            0x1F
        } else {
            let mut header = encode_string(name);
            header.extend_from_slice(&encode_string(customization));
            pending.extend_from_slice(&bytepad(&header, rate));
            0x04
        };

        Self {
            rate,
            state: [0u64; 25],
            domain_byte,
            pending,
            out_block: vec![0u8; rate],
            out_pos: rate,
            squeezing: false,
        }
    }

    /// Absorb more message bytes. Must be called before the first `squeeze`.
    pub fn absorb(&mut self, data: &[u8]) {
        debug_assert!(!self.squeezing, "cannot absorb after squeezing has begun");
        self.pending.extend_from_slice(data);
    }

    fn finalize(&mut self) {
        let buf = std::mem::take(&mut self.pending);
        let mut offset = 0;
        while buf.len() - offset >= self.rate {
            absorb_block(&mut self.state, &buf[offset..offset + self.rate], self.rate);
            offset += self.rate;
        }

        let remaining = &buf[offset..];
        let mut block = vec![0u8; self.rate];
        block[..remaining.len()].copy_from_slice(remaining);
        block[remaining.len()] ^= self.domain_byte;
        block[self.rate - 1] ^= 0x80;
        absorb_block(&mut self.state, &block, self.rate);

        self.squeezing = true;
        self.refill_out_block();
        self.out_pos = 0;
    }

    fn refill_out_block(&mut self) {
        for (i, chunk) in self.out_block.chunks_exact_mut(8).enumerate() {
            chunk.copy_from_slice(&self.state[i].to_le_bytes());
        }
    }

    /// Squeeze `out.len()` bytes, continuing the sponge output stream
    /// across calls (spec §4.7's "squeeze into output" repeated across
    /// `generate` calls on one DRBG instance).
    pub fn squeeze(&mut self, out: &mut [u8]) {
        if !self.squeezing {
            self.finalize();
        }

        let mut filled = 0;
        while filled < out.len() {
            if self.out_pos == self.rate {
                keccak_f1600(&mut self.state);
                self.refill_out_block();
                self.out_pos = 0;
            }
            let take = (out.len() - filled).min(self.rate - self.out_pos);
            out[filled..filled + take]
                .copy_from_slice(&self.out_block[self.out_pos..self.out_pos + take]);
            filled += take;
            self.out_pos += take;
        }
    }
}

/// One-shot SHAKE squeeze of `input` to `out.len()` bytes.
pub fn shake(mode: KeccakMode, input: &[u8], out: &mut [u8]) {
    let mut xof = Xof::new_shake(mode);
    xof.absorb(input);
    xof.squeeze(out);
}

/// KMAC (NIST SP 800-185) with a fixed output length, used by the HKDS
/// client's `encrypt_authenticate` (spec §4.9).
pub fn kmac(mode: KeccakMode, key: &[u8], data: &[u8], out_len: usize) -> Vec<u8> {
    let rate = mode.rate_bytes();
    let mut xof = Xof::new_cshake(mode, b"KMAC", &[]);
    xof.absorb(&bytepad(&encode_string(key), rate));
    xof.absorb(data);
    xof.absorb(&right_encode((out_len as u64) * 8));
    let mut out = vec![0u8; out_len];
    xof.squeeze(&mut out);
    out
}
