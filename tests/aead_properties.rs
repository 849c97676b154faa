//! Cross-cipher AEAD invariants (spec §8 invariants 1-3, 10).

use keyforge_crypto::ciphers::{CounterMode, Eax, Gcm, Ocb};
use keyforge_crypto::parallel::ParallelProfile;
use keyforge_crypto::primitives::{Aes128Cipher, BlockCipher};

fn scalar_profile() -> ParallelProfile {
    ParallelProfile::new(16, false, 0, false)
}

// Invariant 1: decrypt(encrypt(m)) = m, and any single-bit flip in
// ciphertext/tag/AD makes `verify` false.

#[test]
fn eax_round_trips_and_rejects_tampering() {
    let key = [0x10u8; 24];
    let nonce = [0x20u8; 12];
    let ad = b"order-42".to_vec();
    let plaintext = b"transfer 100 credits to account 7".to_vec();

    let mut enc = Eax::new(scalar_profile());
    enc.initialize(true, &key, &nonce).unwrap();
    enc.set_associated_data(&ad).unwrap();
    let mut ciphertext = vec![0u8; plaintext.len()];
    enc.transform(&plaintext, &mut ciphertext).unwrap();
    let tag = enc.finalize(16).unwrap();

    let mut dec = Eax::new(scalar_profile());
    dec.initialize(false, &key, &nonce).unwrap();
    dec.set_associated_data(&ad).unwrap();
    let mut recovered = vec![0u8; ciphertext.len()];
    dec.transform(&ciphertext, &mut recovered).unwrap();
    assert!(dec.verify(&tag).unwrap());
    assert_eq!(recovered, plaintext);

    let mut bad_ct = ciphertext.clone();
    bad_ct[0] ^= 1;
    let mut dec2 = Eax::new(scalar_profile());
    dec2.initialize(false, &key, &nonce).unwrap();
    dec2.set_associated_data(&ad).unwrap();
    let mut out2 = vec![0u8; bad_ct.len()];
    dec2.transform(&bad_ct, &mut out2).unwrap();
    assert!(!dec2.verify(&tag).unwrap());

    let mut bad_tag = tag.clone();
    bad_tag[0] ^= 1;
    let mut dec3 = Eax::new(scalar_profile());
    dec3.initialize(false, &key, &nonce).unwrap();
    dec3.set_associated_data(&ad).unwrap();
    let mut out3 = vec![0u8; ciphertext.len()];
    dec3.transform(&ciphertext, &mut out3).unwrap();
    assert!(!dec3.verify(&bad_tag).unwrap());

    let mut dec4 = Eax::new(scalar_profile());
    dec4.initialize(false, &key, &nonce).unwrap();
    dec4.set_associated_data(b"tampered-ad").unwrap();
    let mut out4 = vec![0u8; ciphertext.len()];
    dec4.transform(&ciphertext, &mut out4).unwrap();
    assert!(!dec4.verify(&tag).unwrap());
}

#[test]
fn gcm_round_trips_and_rejects_tampering() {
    let key = [0x30u8; 32];
    let nonce = [0x40u8; 12];
    let ad = b"header".to_vec();
    let plaintext = vec![0x5Cu8; 300];

    let mut enc = Gcm::new();
    enc.initialize(true, &key, &nonce).unwrap();
    enc.set_associated_data(&ad).unwrap();
    let mut ciphertext = vec![0u8; plaintext.len()];
    enc.transform(&plaintext, &mut ciphertext).unwrap();
    let tag = enc.finalize(16).unwrap();

    let mut bad_ct = ciphertext.clone();
    bad_ct[100] ^= 0x80;
    let mut dec = Gcm::new();
    dec.initialize(false, &key, &nonce).unwrap();
    dec.set_associated_data(&ad).unwrap();
    let mut recovered = vec![0u8; bad_ct.len()];
    dec.transform(&bad_ct, &mut recovered).unwrap();
    assert!(!dec.verify(&tag).unwrap());

    let mut good = Gcm::new();
    good.initialize(false, &key, &nonce).unwrap();
    good.set_associated_data(&ad).unwrap();
    let mut plain = vec![0u8; ciphertext.len()];
    good.transform(&ciphertext, &mut plain).unwrap();
    assert!(good.verify(&tag).unwrap());
    assert_eq!(plain, plaintext);
}

#[test]
fn ocb_round_trips_and_rejects_tampering() {
    let key = [0x01u8; 16];
    let nonce = [0x02u8; 15];
    let ad = vec![0xCDu8; 20];
    let plaintext = vec![0xEFu8; 77]; // not block-aligned

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

    let mut bad_tag = tag;
    bad_tag[5] ^= 1;
    let mut dec2 = Ocb::new();
    dec2.initialize(false, &key, &nonce).unwrap();
    dec2.set_associated_data(&ad).unwrap();
    let mut out2 = vec![0u8; ciphertext.len()];
    dec2.transform(&ciphertext, &mut out2).unwrap();
    assert!(!dec2.verify(&bad_tag).unwrap());
}

// Invariant 2: for a fixed (key, nonce, ad, m), encrypt is byte-for-byte
// deterministic.
#[test]
fn encrypt_is_deterministic_across_instances() {
    let key = [0x77u8; 16];
    let nonce = [0x88u8; 12];
    let ad = b"ad".to_vec();
    let plaintext = vec![0x01u8; 50];

    let run = || {
        let mut enc = Gcm::new();
        enc.initialize(true, &key, &nonce).unwrap();
        enc.set_associated_data(&ad).unwrap();
        let mut ct = vec![0u8; plaintext.len()];
        enc.transform(&plaintext, &mut ct).unwrap();
        let tag = enc.finalize(16).unwrap();
        (ct, tag)
    };

    assert_eq!(run(), run());
}

// Invariant 3: auto_increment over N calls equals N independent calls with
// nonces n, n+1, ..., n+N-1. (Already unit-tested per-cipher; this checks
// EAX and GCM agree with each other's nonce-rolling behavior independently
// derived, as a cross-cipher sanity check.)
#[test]
fn auto_increment_rolls_nonce_for_gcm() {
    let key = [0x5Au8; 16];
    let start_nonce = [0u8; 12];
    let plaintext = vec![0x9Au8; 40];

    let mut rolling = Gcm::new().with_flags(false, true);
    rolling.initialize(true, &key, &start_nonce).unwrap();
    let mut rolling_outputs = Vec::new();
    for _ in 0..3 {
        rolling.set_associated_data(&[]).unwrap();
        let mut ct = vec![0u8; plaintext.len()];
        rolling.transform(&plaintext, &mut ct).unwrap();
        let tag = rolling.finalize(16).unwrap();
        rolling_outputs.push((ct, tag));
    }

    let mut expected = Vec::new();
    for i in 0u8..3 {
        let mut nonce = start_nonce;
        nonce[11] = i;
        let mut fresh = Gcm::new();
        fresh.initialize(true, &key, &nonce).unwrap();
        fresh.set_associated_data(&[]).unwrap();
        let mut ct = vec![0u8; plaintext.len()];
        fresh.transform(&plaintext, &mut ct).unwrap();
        let tag = fresh.finalize(16).unwrap();
        expected.push((ct, tag));
    }

    assert_eq!(rolling_outputs, expected);
}

// Invariant 10: parallel-dispatched ICM transform equals scalar transform
// bit-for-bit, including residues that don't evenly divide the lane count.
#[test]
fn icm_parallel_matches_scalar_through_the_public_api() {
    let cipher = || -> Box<dyn BlockCipher> { Box::new(Aes128Cipher::new(&[0x3Cu8; 16]).unwrap()) };

    let scalar_profile = ParallelProfile::new(16, false, 0, false);
    let parallel_profile = ParallelProfile::new(16, true, 8192, false);
    let seg = parallel_profile.parallel_block_size();
    let len = seg * 3 + 21;
    let plaintext: Vec<u8> = (0..len).map(|i| (i % 200) as u8).collect();

    let mut scalar = CounterMode::new(cipher(), scalar_profile);
    scalar.initialize(&[0u8; 16]).unwrap();
    let mut scalar_out = vec![0u8; len];
    scalar.transform(&plaintext, &mut scalar_out).unwrap();

    let mut parallel = CounterMode::new(cipher(), parallel_profile);
    parallel.initialize(&[0u8; 16]).unwrap();
    let mut parallel_out = vec![0u8; len];
    parallel.transform(&plaintext, &mut parallel_out).unwrap();

    assert_eq!(scalar_out, parallel_out);
}
