use std::panic;

use beacon_codec::ad;
use beacon_codec::payload::build;
use beacon_codec::DEFAULT_IDENTITY;

fn xorshift64(state: &mut u64) -> u64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    *state
}

fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut s = seed.max(1);
    let mut out = vec![0_u8; len];
    for b in &mut out {
        *b = (xorshift64(&mut s) & 0xFF) as u8;
    }
    out
}

fn read_all(bytes: &[u8]) {
    let total: usize = ad::iter(bytes).map(|s| s.data.len() + 2).sum();
    assert!(total <= bytes.len());
    let _ = ad::manufacturer_data(bytes);
    let _ = ad::flags(bytes);
}

#[test]
fn random_inputs_never_panic() {
    for seed in 1..2_000_u64 {
        let len = (seed as usize * 7) % 64;
        let bytes = random_bytes(seed, len);
        let result = panic::catch_unwind(|| read_all(&bytes));
        assert!(result.is_ok(), "reader panicked for seed {seed}");
    }
}

#[test]
fn truncated_payloads_never_panic() {
    let encoded = build(&DEFAULT_IDENTITY, true);
    for cut in 0..=encoded.len() {
        let result = panic::catch_unwind(|| read_all(&encoded[..cut]));
        assert!(result.is_ok(), "reader panicked at cut {cut}");
    }
    assert!(ad::manufacturer_data(&encoded[..encoded.len() - 1]).is_none());
}

#[test]
fn bit_flipped_payloads_never_panic() {
    let encoded = build(&DEFAULT_IDENTITY, true);
    for i in 0..encoded.len() {
        for bit in 0..8 {
            let mut mutated = encoded.clone();
            mutated[i] ^= 1 << bit;
            let result = panic::catch_unwind(|| read_all(&mutated));
            assert!(result.is_ok(), "reader panicked at byte {i} bit {bit}");
        }
    }
}
