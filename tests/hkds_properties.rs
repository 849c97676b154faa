//! HKDS client invariants (spec §8 invariants 7-8, scenario S6).

use keyforge_crypto::kms::hkds::{HkdsClient, HKDS_DID_SIZE, HKDS_MESSAGE_SIZE};
use keyforge_crypto::primitives::xof::shake;
use keyforge_crypto::primitives::KeccakMode;

fn shake128_did() -> Vec<u8> {
    let mut did = vec![0u8; HKDS_DID_SIZE];
    did[5] = KeccakMode::Shake128.to_did_byte();
    did
}

// Invariant 7: the i-th transaction key returned after a fresh
// `generate_key_cache(tok)` equals the i-th 16-byte slot of
// `SHAKE(tok || edk)`; using it twice is impossible.
#[test]
fn transaction_keys_match_shake_derivation_and_are_single_use() {
    let edk = [0xABu8; 16];
    let did = shake128_did();
    let token = [0x00u8; 16];

    let mut client = HkdsClient::new(&edk, &did).unwrap();
    client.generate_key_cache(&token).unwrap();

    let mut prf_key = token.to_vec();
    prf_key.extend_from_slice(&edk);
    let mut expected_cache = vec![0u8; client.cache_size() * HKDS_MESSAGE_SIZE];
    shake(KeccakMode::Shake128, &prf_key, &mut expected_cache);

    let zero = [0u8; HKDS_MESSAGE_SIZE];
    for i in 0..4 {
        let expected_slot = &expected_cache[i * 16..(i + 1) * 16];
        let ciphertext = client.encrypt(&zero).unwrap();
        // c = slot xor message, message is all-zero here, so c == slot.
        assert_eq!(&ciphertext[..], expected_slot);
    }

    // Exhaust the remaining cache; the draw after exhaustion must fail.
    for _ in 4..client.cache_size() {
        client.encrypt(&zero).unwrap();
    }
    assert!(client.encrypt(&zero).is_err());
}

// Invariant 8: encrypt(m) xor the same transaction key reproduces m (test
// harness only -- production code never exposes the key).
#[test]
fn encrypt_then_xor_with_recovered_key_reproduces_message() {
    let edk = [0x13u8; 16];
    let did = shake128_did();
    let token = [0x77u8; 16];

    let mut prf_key = token.to_vec();
    prf_key.extend_from_slice(&edk);
    let mut cache = vec![0u8; 4 * KeccakMode::Shake128.rate_bytes()];
    shake(KeccakMode::Shake128, &prf_key, &mut cache);
    let slot0 = &cache[..16];

    let mut client = HkdsClient::new(&edk, &did).unwrap();
    client.generate_key_cache(&token).unwrap();
    let message = [0x5Eu8; HKDS_MESSAGE_SIZE];
    let ciphertext = client.encrypt(&message).unwrap();

    let mut recovered = [0u8; HKDS_MESSAGE_SIZE];
    for i in 0..HKDS_MESSAGE_SIZE {
        recovered[i] = ciphertext[i] ^ slot0[i];
    }
    assert_eq!(recovered, message);
}

// S6 - HKDS encrypt then decrypt-by-server-oracle: the server independently
// derives the same cache from (token, edk) and can recover each message by
// re-deriving the slot the client consumed, in KSN order.
#[test]
fn server_oracle_recovers_sequential_messages_in_ksn_order() {
    let edk = [0xABu8; 16];
    let did = shake128_did();
    let token = [0u8; 16];

    let mut client = HkdsClient::new(&edk, &did).unwrap();
    client.generate_key_cache(&token).unwrap();

    let mut prf_key = token.to_vec();
    prf_key.extend_from_slice(&edk);
    let mut server_cache = vec![0u8; client.cache_size() * HKDS_MESSAGE_SIZE];
    shake(KeccakMode::Shake128, &prf_key, &mut server_cache);

    let messages: Vec<[u8; HKDS_MESSAGE_SIZE]> = (0..3)
        .map(|i| {
            let mut m = [0u8; HKDS_MESSAGE_SIZE];
            m.fill(i as u8 + 1);
            m
        })
        .collect();

    let mut ciphertexts = Vec::new();
    for m in &messages {
        ciphertexts.push(client.encrypt(m).unwrap());
    }

    for (i, (ct, m)) in ciphertexts.iter().zip(messages.iter()).enumerate() {
        let slot = &server_cache[i * 16..(i + 1) * 16];
        let mut recovered = [0u8; HKDS_MESSAGE_SIZE];
        for k in 0..HKDS_MESSAGE_SIZE {
            recovered[k] = ct[k] ^ slot[k];
        }
        assert_eq!(&recovered, m);
    }

    // After cache_size calls the client's cache is exhausted.
    let remaining = client.cache_size() - messages.len();
    for _ in 0..remaining {
        client.encrypt(&[0u8; HKDS_MESSAGE_SIZE]).unwrap();
    }
    assert!(client.encrypt(&[0u8; HKDS_MESSAGE_SIZE]).is_err());
}
