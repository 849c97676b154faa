//! Known-answer tests seeded directly from spec §8's concrete scenarios.

use keyforge_crypto::primitives::{KeccakMode, Xof};

// S1 - cSHAKE DRBG KAT (SHAKE128, CSG): seed = 00010203, custom = "Email
// Signature", name = empty; expected first 32 bytes given in the spec.
#[test]
fn s1_cshake128_known_answer() {
    let seed = hex::decode("00010203").unwrap();
    let mut xof = Xof::new_cshake(KeccakMode::Shake128, &[], b"Email Signature");
    xof.absorb(&seed);
    let mut out = [0u8; 32];
    xof.squeeze(&mut out);

    let expected = hex::decode("C1C36925B6409A04F1B504FCBCA9D82B4017277CB5ED2B2065FC1D3814D5AAF5")
        .unwrap();
    assert_eq!(&out[..], &expected[..]);
}

// S2 - cSHAKE DRBG KAT (SHAKE256, CSG): seed = 00010203...C7 (200 bytes
// counting up), custom = same as S1; expected first 64 bytes given in the
// spec.
#[test]
fn s2_cshake256_known_answer() {
    let seed: Vec<u8> = (0u16..200).map(|i| (i % 256) as u8).collect();
    let mut xof = Xof::new_cshake(KeccakMode::Shake256, &[], b"Email Signature");
    xof.absorb(&seed);
    let mut out = [0u8; 64];
    xof.squeeze(&mut out);

    let expected = hex::decode(
        "07DC27B11E51FBAC75BC7B3C1D983E8B4B85FB1DEFAF218912AC86430273091\
         727F42B17ED1DF63E8EC118F04B23633C1DFB1574C8FB55CB45DA8E25AFB092BB",
    )
    .unwrap();
    assert_eq!(out.len(), expected.len());
    assert_eq!(&out[..], &expected[..]);
}
