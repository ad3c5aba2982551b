//! End-to-end scenarios across all three schemes.

use std::collections::BTreeSet;

use rand::{rngs::StdRng, SeedableRng};

use redactset::keys::{PairingSigningKey, RsaSigningKey};
use redactset::schemes::{derler, large, small, SchemeError};

fn set(members: &[&str]) -> BTreeSet<String> {
    members.iter().map(|s| s.to_string()).collect()
}

fn rsa_keys(seed: u8) -> (RsaSigningKey, redactset::RsaVerificationKey) {
    let mut rng = StdRng::from_seed([seed; 32]);
    let sk = RsaSigningKey::generate_with_bits(256, &mut rng);
    let vk = sk.verification_key();
    (sk, vk)
}

#[test]
fn large_universe_deep_policy() {
    let (sk, vk) = rsa_keys(101);
    let mut rng = StdRng::from_seed([102u8; 32]);

    let s = set(&["a", "b", "c", "d"]);
    let policy = "(a and b) or (c and d)";
    let sig = large::sign(&sk, &s, policy, &mut rng).unwrap();
    assert!(large::verify(&vk, &sig, &s));

    // Redacting to one satisfying conjunct keeps a valid signature.
    let sub = set(&["a", "b"]);
    let redacted = large::redact(&s, &sub, &sig, Some("a and b"))
        .unwrap()
        .expect("admissible redaction");
    assert!(large::verify(&vk, &redacted, &sub));

    // A subset cutting across both conjuncts satisfies neither; any
    // replacement policy is irrelevant.
    for replacement in [Some("a or c"), Some("a and c"), None] {
        assert_eq!(
            large::redact(&s, &set(&["a", "c"]), &sig, replacement).unwrap(),
            None
        );
    }
}

#[test]
fn small_universe_bit_string_policy() {
    let (sk, vk) = rsa_keys(103);
    let universe = small::Universe::from_members(
        ["hello", "good", "fun", "dog", "cat"].iter().map(|s| s.to_string()),
    )
    .unwrap();

    let s = set(&["hello", "good", "fun", "dog", "cat"]);
    let sig = small::sign(&sk, &universe, &s, "11111, 11000, 00111").unwrap();
    assert!(small::verify(&vk, &universe, &sig, &s));

    let sub = set(&["hello", "good"]);
    let redacted = small::redact(&universe, &s, &sub, &sig, "11000")
        .unwrap()
        .expect("admissible redaction");
    assert!(small::verify(&vk, &universe, &redacted, &sub));

    // {hello, cat} has characteristic 10001, which the policy never listed.
    assert_eq!(
        small::redact(&universe, &s, &set(&["hello", "cat"]), &sig, "10001").unwrap(),
        None
    );
}

#[test]
fn accumulator_only_scheme() {
    let mut rng = StdRng::from_seed([104u8; 32]);
    let sk = PairingSigningKey::generate(&mut rng);
    let vk = sk.verification_key();

    let s = set(&["alpha", "beta", "gamma"]);
    let sig = derler::sign(&sk, &s).unwrap();
    assert!(derler::verify(&vk, &sig, &s));

    let sub = set(&["alpha"]);
    let redacted = derler::redact(&s, &sub, &sig).expect("admissible redaction");
    assert!(derler::verify(&vk, &redacted, &sub));

    // beta's witness is gone from the redacted signature.
    assert!(!derler::verify(&vk, &redacted, &set(&["alpha", "beta"])));
}

#[test]
fn tampered_ecdsa_rejects_without_panicking() {
    // Flip one byte of the ECDSA component in each scheme's signature:
    // verification must return false, never panic.
    let (sk, vk) = rsa_keys(105);
    let mut rng = StdRng::from_seed([106u8; 32]);

    let s = set(&["a", "b"]);
    let mut sig = large::sign(&sk, &s, "a and b", &mut rng).unwrap();
    *sig.ecdsa.first_mut().unwrap() ^= 0x40;
    assert!(!large::verify(&vk, &sig, &s));

    let universe =
        small::Universe::from_members(["a", "b"].iter().map(|s| s.to_string())).unwrap();
    let mut sig = small::sign(&sk, &universe, &s, "11").unwrap();
    *sig.ecdsa.first_mut().unwrap() ^= 0x40;
    assert!(!small::verify(&vk, &universe, &sig, &s));

    let psk = PairingSigningKey::generate(&mut rng);
    let pvk = psk.verification_key();
    let mut sig = derler::sign(&psk, &s).unwrap();
    *sig.ecdsa.first_mut().unwrap() ^= 0x40;
    assert!(!derler::verify(&pvk, &sig, &s));
}

#[test]
fn truncated_policy_is_an_argument_error() {
    let (sk, _) = rsa_keys(107);
    let mut rng = StdRng::from_seed([108u8; 32]);
    let s = set(&["a", "b"]);
    assert!(matches!(
        large::sign(&sk, &s, "a and", &mut rng),
        Err(SchemeError::InvalidArgument(_))
    ));
}

#[test]
fn der_round_trips_re_verify() {
    let (sk, vk) = rsa_keys(109);
    let mut rng = StdRng::from_seed([110u8; 32]);

    let s = set(&["a", "b", "c", "d"]);
    let sig = large::sign(&sk, &s, "(a and b) or (c and d)", &mut rng).unwrap();
    let decoded = large::Signature::from_der(&sig.to_der()).unwrap();
    assert!(large::verify(&vk, &decoded, &s));

    let universe = small::Universe::from_members(
        ["a", "b", "c", "d"].iter().map(|s| s.to_string()),
    )
    .unwrap();
    let sig = small::sign(&sk, &universe, &s, "1111, 1100").unwrap();
    let decoded = small::Signature::from_der(&sig.to_der()).unwrap();
    assert!(small::verify(&vk, &universe, &decoded, &s));

    let psk = PairingSigningKey::generate(&mut rng);
    let pvk = psk.verification_key();
    let sig = derler::sign(&psk, &s).unwrap();
    let decoded = derler::Signature::from_der(&sig.to_der()).unwrap();
    assert!(derler::verify(&pvk, &decoded, &s));
}

#[test]
fn key_files_round_trip_through_base64_framing() {
    use redactset::keys::{decode_key_line, encode_key_line};
    use redactset::RsaVerificationKey;

    let (sk, vk) = rsa_keys(113);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ver.key");
    std::fs::write(&path, format!("{}\n", encode_key_line(&vk.to_der().unwrap()))).unwrap();

    let line = std::fs::read_to_string(&path).unwrap();
    let reloaded = RsaVerificationKey::from_der(&decode_key_line(&line).unwrap()).unwrap();

    // The reloaded verification key still verifies signatures made with
    // the original signing key.
    let mut rng = StdRng::from_seed([114u8; 32]);
    let s = set(&["a", "b"]);
    let sig = large::sign(&sk, &s, "a and b", &mut rng).unwrap();
    assert!(large::verify(&reloaded, &sig, &s));
}

#[test]
fn redaction_chains_compose() {
    // Redact twice: {a,b,c,d} -> {a,b,c} -> {a,b} under a policy every
    // intermediate set satisfies.
    let (sk, vk) = rsa_keys(111);
    let mut rng = StdRng::from_seed([112u8; 32]);

    let s = set(&["a", "b", "c", "d"]);
    let sig = large::sign(&sk, &s, "a and b", &mut rng).unwrap();

    let mid = set(&["a", "b", "c"]);
    let once = large::redact(&s, &mid, &sig, None).unwrap().unwrap();
    assert!(large::verify(&vk, &once, &mid));

    let sub = set(&["a", "b"]);
    let twice = large::redact(&mid, &sub, &once, None).unwrap().unwrap();
    assert!(large::verify(&vk, &twice, &sub));

    // The accumulator and ECDSA bytes never changed along the chain.
    assert_eq!(twice.acc, sig.acc);
    assert_eq!(twice.ecdsa, sig.ecdsa);
}
