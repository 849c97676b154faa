//! Block cipher capability trait and AES realizations.
//!
//! The AES round function itself is out of scope for this spec (§1); we
//! take it as an opaque operation from the `aes` crate and expose it
//! through the capability trait the rest of the crate programs against.

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};
use generic_array::GenericArray;

use crate::error::{KeyforgeError, Result};
use crate::key::LegalKeySize;

/// Fixed block size (bytes) for the AES family this crate supports.
pub const BLOCK_SIZE: usize = 16;

/// A keyed, fixed-block-size cipher primitive (spec §3).
///
/// `encrypt_512/1024/2048` (the vectorized 4/8/16-lane batch calls spec §3
/// names) are realized as `encrypt_blocks`, which loops the scalar
/// `encrypt_block` call; `keyforge-crypto` relies on the scheduling layer
/// (`parallel::ParallelProfile` + `rayon`) for the actual lane fan-out
/// rather than hand-rolled SIMD intrinsics, which keeps scalar and
/// "vectorized" output identical by construction (spec §8 invariant 10).
pub trait BlockCipher: Send + Sync {
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn legal_key_sizes(&self) -> &'static [usize];

    fn encrypt_block(&self, input: &[u8; BLOCK_SIZE], output: &mut [u8; BLOCK_SIZE]);
    fn decrypt_block(&self, input: &[u8; BLOCK_SIZE], output: &mut [u8; BLOCK_SIZE]);

    fn encrypt_blocks(&self, input: &[u8], output: &mut [u8]) {
        debug_assert_eq!(input.len(), output.len());
        for (chunk_in, chunk_out) in input
            .chunks_exact(BLOCK_SIZE)
            .zip(output.chunks_exact_mut(BLOCK_SIZE))
        {
            let mut block_in = [0u8; BLOCK_SIZE];
            block_in.copy_from_slice(chunk_in);
            let mut block_out = [0u8; BLOCK_SIZE];
            self.encrypt_block(&block_in, &mut block_out);
            chunk_out.copy_from_slice(&block_out);
        }
    }
}

macro_rules! aes_cipher {
    ($name:ident, $inner:ty, $key_size:expr) => {
        pub struct $name {
            inner: $inner,
        }

        impl $name {
            pub fn new(key: &[u8]) -> Result<Self> {
                if key.len() != $key_size {
                    return Err(KeyforgeError::InvalidKey {
                        expected: vec![$key_size],
                        actual: key.len(),
                    });
                }
                let key_arr = GenericArray::from_slice(key);
                Ok(Self {
                    inner: <$inner as KeyInit>::new(key_arr),
                })
            }

            pub fn legal_key_size() -> LegalKeySize {
                LegalKeySize::new($key_size, 16, 0)
            }
        }

        impl BlockCipher for $name {
            fn legal_key_sizes(&self) -> &'static [usize] {
                &[$key_size]
            }

            fn encrypt_block(&self, input: &[u8; BLOCK_SIZE], output: &mut [u8; BLOCK_SIZE]) {
                let mut block = GenericArray::clone_from_slice(input);
                self.inner.encrypt_block(&mut block);
                output.copy_from_slice(&block);
            }

            fn decrypt_block(&self, input: &[u8; BLOCK_SIZE], output: &mut [u8; BLOCK_SIZE]) {
                let mut block = GenericArray::clone_from_slice(input);
                self.inner.decrypt_block(&mut block);
                output.copy_from_slice(&block);
            }
        }
    };
}

aes_cipher!(Aes128Cipher, Aes128, 16);
aes_cipher!(Aes192Cipher, Aes192, 24);
aes_cipher!(Aes256Cipher, Aes256, 32);

/// Construct the right AES variant for a given key length (16/24/32 bytes).
pub fn aes_for_key(key: &[u8]) -> Result<Box<dyn BlockCipher>> {
    match key.len() {
        16 => Ok(Box::new(Aes128Cipher::new(key)?)),
        24 => Ok(Box::new(Aes192Cipher::new(key)?)),
        32 => Ok(Box::new(Aes256Cipher::new(key)?)),
        other => Err(KeyforgeError::InvalidKey {
            expected: vec![16, 24, 32],
            actual: other,
        }),
    }
}
