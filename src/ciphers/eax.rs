//! EAX: CMAC-then-CTR authenticated encryption (Bellare-Rogaway-Wagner),
//! spec §4.3.
//!
//! `N_mac = CMAC(0x00||nonce)`, `H_mac = CMAC(0x01||ad)`, message keystream
//! keyed by `N_mac`, `T = CMAC(0x02||ciphertext) xor N_mac xor H_mac`.

use aes::{Aes128, Aes192, Aes256};
use cmac::Cmac;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use cmac::digest::Mac as CmacMac;

use super::icm::CounterMode;
use super::BLOCK_SIZE;
use crate::error::{KeyforgeError, Result};
use crate::parallel::ParallelProfile;
use crate::primitives::block_cipher::aes_for_key;

/// A CMAC instance over whichever AES variant the key size selects.
enum AnyCmac {
    Aes128(Cmac<Aes128>),
    Aes192(Cmac<Aes192>),
    Aes256(Cmac<Aes256>),
}

impl AnyCmac {
    fn new(key: &[u8]) -> Result<Self> {
        match key.len() {
            16 => Ok(AnyCmac::Aes128(Cmac::new_from_slice(key).map_err(|_| {
                KeyforgeError::InvalidKey {
                    expected: vec![16, 24, 32],
                    actual: key.len(),
                }
            })?)),
            24 => Ok(AnyCmac::Aes192(Cmac::new_from_slice(key).map_err(|_| {
                KeyforgeError::InvalidKey {
                    expected: vec![16, 24, 32],
                    actual: key.len(),
                }
            })?)),
            32 => Ok(AnyCmac::Aes256(Cmac::new_from_slice(key).map_err(|_| {
                KeyforgeError::InvalidKey {
                    expected: vec![16, 24, 32],
                    actual: key.len(),
                }
            })?)),
            other => Err(KeyforgeError::InvalidKey {
                expected: vec![16, 24, 32],
                actual: other,
            }),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            AnyCmac::Aes128(m) => m.update(data),
            AnyCmac::Aes192(m) => m.update(data),
            AnyCmac::Aes256(m) => m.update(data),
        }
    }

    fn finalize(self) -> [u8; BLOCK_SIZE] {
        let bytes = match self {
            AnyCmac::Aes128(m) => m.finalize().into_bytes().to_vec(),
            AnyCmac::Aes192(m) => m.finalize().into_bytes().to_vec(),
            AnyCmac::Aes256(m) => m.finalize().into_bytes().to_vec(),
        };
        let mut out = [0u8; BLOCK_SIZE];
        out.copy_from_slice(&bytes);
        out
    }
}

fn cmac_oneshot(key: &[u8], domain: u8, data: &[u8]) -> Result<[u8; BLOCK_SIZE]> {
    let mut mac = AnyCmac::new(key)?;
    mac.update(&[domain]);
    mac.update(data);
    Ok(mac.finalize())
}

fn xor3(a: [u8; BLOCK_SIZE], b: [u8; BLOCK_SIZE], c: [u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
    let mut out = [0u8; BLOCK_SIZE];
    for i in 0..BLOCK_SIZE {
        out[i] = a[i] ^ b[i] ^ c[i];
    }
    out
}

const MIN_TAG_SIZE: usize = 12;

pub struct Eax {
    key: Zeroizing<Vec<u8>>,
    profile: ParallelProfile,
    encrypting: bool,
    initialized: bool,
    finalized: bool,
    ad_loaded: bool,
    ad_preserve: bool,
    auto_increment: bool,
    nonce: Vec<u8>,
    n_mac: [u8; BLOCK_SIZE],
    ad_mac: Option<AnyCmac>,
    msg_mac: Option<AnyCmac>,
    ctr: Option<CounterMode>,
}

impl Eax {
    pub fn new(profile: ParallelProfile) -> Self {
        Self {
            key: Zeroizing::new(Vec::new()),
            profile,
            encrypting: true,
            initialized: false,
            finalized: false,
            ad_loaded: false,
            ad_preserve: false,
            auto_increment: false,
            nonce: Vec::new(),
            n_mac: [0u8; BLOCK_SIZE],
            ad_mac: None,
            msg_mac: None,
            ctr: None,
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
        if self.initialized && !self.key.is_empty() && nonce == self.nonce.as_slice() {
            return Err(KeyforgeError::InvalidNonce(
                "nonce must differ from the previous vector under the same key".into(),
            ));
        }

        self.key = Zeroizing::new(key.to_vec());
        self.nonce = nonce.to_vec();
        self.encrypting = encrypting;
        self.n_mac = cmac_oneshot(key, 0x00, nonce)?;

        let mut ad_mac = AnyCmac::new(key)?;
        ad_mac.update(&[0x01]);
        self.ad_mac = Some(ad_mac);

        let mut msg_mac = AnyCmac::new(key)?;
        msg_mac.update(&[0x02]);
        self.msg_mac = Some(msg_mac);

        let mut ctr = CounterMode::new(aes_for_key(key)?, self.profile);
        ctr.initialize(&self.n_mac)?;
        self.ctr = Some(ctr);

        self.ad_loaded = false;
        self.initialized = true;
        self.finalized = false;
        tracing::debug!("eax initialized");
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
        self.ad_mac.as_mut().expect("initialized").update(ad);
        self.ad_loaded = true;
        Ok(())
    }

    pub fn transform(&mut self, input: &[u8], output: &mut [u8]) -> Result<()> {
        if !self.initialized {
            return Err(KeyforgeError::NotInitialized);
        }
        if self.encrypting {
            self.ctr.as_mut().expect("initialized").transform(input, output)?;
            self.msg_mac.as_mut().expect("initialized").update(output);
        } else {
            self.msg_mac.as_mut().expect("initialized").update(input);
            self.ctr.as_mut().expect("initialized").transform(input, output)?;
        }
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
        let ad_mac = self.ad_mac.take().expect("initialized").finalize();
        let msg_mac = self.msg_mac.take().expect("initialized").finalize();
        let tag = xor3(self.n_mac, ad_mac, msg_mac);
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
        self.nonce = Vec::new(); // force initialize()'s reuse check to pass
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
