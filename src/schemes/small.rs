//! Small-universe redactable signatures
//!
//! The member universe is fixed at key generation and every set is
//! represented by its characteristic bit-string (bit *i* set iff the
//! member at universe index *i* is present). A policy is a comma-separated
//! list of acceptable characteristic strings; signing accumulates the
//! listed strings in the RSA accumulator and binds the accumulator bytes
//! under ECDSA. Verification needs exactly one witness: the one for the
//! presented set's characteristic.
//!
//! Redaction keeps the witnesses whose 1-bits are a subset of the redacted
//! characteristic's — every further subset listed in the original policy
//! stays reachable. The filter is deliberately not narrowed beyond that.

#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use num_bigint::BigUint;
use tracing::debug;

use crate::der::{self, DerError, Reader};
use crate::keys::{ec_sign, ec_verify, RsaSigningKey, RsaVerificationKey};
use crate::rsa_acc;
use crate::schemes::{signed_bytes, SchemeError};

/// The declared member universe: member → zero-based index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Universe {
    indices: BTreeMap<String, usize>,
    size: usize,
}

impl Universe {
    /// Build a universe from members in index order.
    ///
    /// Fails on an empty listing or a repeated member.
    pub fn from_members<I>(members: I) -> Result<Universe, SchemeError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut indices = BTreeMap::new();
        let mut size = 0usize;
        for member in members {
            if indices.insert(member.clone(), size).is_some() {
                return Err(SchemeError::InvalidArgument(format!(
                    "universe member `{member}` is listed twice"
                )));
            }
            size += 1;
        }
        if size == 0 {
            return Err(SchemeError::InvalidArgument("universe is empty".into()));
        }
        Ok(Universe { indices, size })
    }

    /// Number of universe members.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the universe has no members (never true for a constructed
    /// universe; present for completeness).
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Characteristic bit-string of `set`.
    ///
    /// Fails when `set` contains a member outside the universe.
    pub fn characteristic(&self, set: &BTreeSet<String>) -> Result<String, SchemeError> {
        let mut bits = vec![b'0'; self.size];
        for member in set {
            let idx = self.indices.get(member).ok_or_else(|| {
                SchemeError::InvalidArgument(format!(
                    "member `{member}` is outside the declared universe"
                ))
            })?;
            bits[*idx] = b'1';
        }
        Ok(String::from_utf8(bits).expect("ascii bit-string"))
    }
}

/// Parse a comma-separated characteristic list, validating every entry
/// against the universe width.
fn parse_char_list(text: &str, width: usize) -> Result<Vec<String>, SchemeError> {
    let mut out = Vec::new();
    for raw in text.split(',') {
        let entry = raw.trim();
        if entry.is_empty() {
            return Err(SchemeError::InvalidArgument(
                "empty entry in characteristic policy".into(),
            ));
        }
        if entry.len() != width {
            return Err(SchemeError::InvalidArgument(format!(
                "characteristic `{entry}` has length {}, expected {width}",
                entry.len()
            )));
        }
        if !entry.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(SchemeError::InvalidArgument(format!(
                "characteristic `{entry}` contains a character other than 0/1"
            )));
        }
        out.push(entry.to_string());
    }
    if out.is_empty() {
        return Err(SchemeError::InvalidArgument(
            "characteristic policy is empty".into(),
        ));
    }
    Ok(out)
}

/// Bitwise OR of two equal-length characteristic strings.
fn or_bits(a: &str, b: &str) -> Option<String> {
    if a.len() != b.len() {
        return None;
    }
    let bits = a
        .bytes()
        .zip(b.bytes())
        .map(|(x, y)| if x == b'1' || y == b'1' { b'1' } else { b'0' })
        .collect();
    String::from_utf8(bits).ok()
}

/// A small-universe signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// RSA accumulator value.
    pub acc: BigUint,
    /// The characteristic-list policy text.
    pub policy: String,
    /// ASN.1 DER ECDSA signature over the accumulator bytes.
    pub ecdsa: Vec<u8>,
    /// Characteristic string → accumulator witness.
    pub witnesses: BTreeMap<String, BigUint>,
}

/// Sign `set` under the characteristic-list policy.
///
/// The set's own characteristic must appear in the list; otherwise the
/// policy is unsatisfied. A set outside the universe, or a malformed
/// list, is an argument error.
pub fn sign(
    sk: &RsaSigningKey,
    universe: &Universe,
    set: &BTreeSet<String>,
    policy_text: &str,
) -> Result<Signature, SchemeError> {
    let listed = parse_char_list(policy_text, universe.len())?;
    let current = universe.characteristic(set)?;
    if !listed.contains(&current) {
        return Err(SchemeError::PolicyUnsatisfied);
    }

    // Accumulate each distinct listed characteristic once.
    let distinct: BTreeSet<String> = listed.into_iter().collect();
    let pk = sk.rsa.public();
    let (acc, aux) = rsa_acc::eval(&pk, distinct.iter().map(String::as_str));

    let mut witnesses = BTreeMap::new();
    for entry in &distinct {
        witnesses.insert(entry.clone(), rsa_acc::witness(&pk, entry, &aux));
    }

    let ecdsa = ec_sign(&sk.ec, &signed_bytes(&acc));
    debug!(
        characteristics = witnesses.len(),
        "signed set under small-universe scheme"
    );
    Ok(Signature {
        acc,
        policy: policy_text.to_string(),
        ecdsa,
        witnesses,
    })
}

/// Redact `sig` from `set` down to `subset`, installing `new_policy`.
///
/// Returns `Ok(None)` when `subset` is not contained in `set` or its
/// characteristic has no witness. Witnesses whose 1-bits are not a subset
/// of the redacted characteristic's are dropped.
pub fn redact(
    universe: &Universe,
    set: &BTreeSet<String>,
    subset: &BTreeSet<String>,
    sig: &Signature,
    new_policy: &str,
) -> Result<Option<Signature>, SchemeError> {
    if !subset.is_subset(set) {
        return Ok(None);
    }
    let current = universe.characteristic(subset)?;
    if !sig.witnesses.contains_key(&current) {
        return Ok(None);
    }
    parse_char_list(new_policy, universe.len())?;

    let mut redacted = sig.clone();
    redacted
        .witnesses
        .retain(|key, _| or_bits(&current, key).as_deref() == Some(current.as_str()));
    redacted.policy = new_policy.to_string();
    debug!(kept = redacted.witnesses.len(), "redacted small-universe signature");
    Ok(Some(redacted))
}

/// Verify `sig` over `set`: the set's characteristic must carry a valid
/// witness and the ECDSA binding must hold. Sets outside the universe are
/// simply invalid.
pub fn verify(
    vk: &RsaVerificationKey,
    universe: &Universe,
    sig: &Signature,
    set: &BTreeSet<String>,
) -> bool {
    let Ok(current) = universe.characteristic(set) else {
        return false;
    };
    let Some(witness) = sig.witnesses.get(&current) else {
        return false;
    };
    if !rsa_acc::verify(&vk.rsa, &sig.acc, witness, &current) {
        return false;
    }
    ec_verify(&vk.ec, &signed_bytes(&sig.acc), &sig.ecdsa)
}

impl Signature {
    /// Encode to the wire form:
    /// `SEQUENCE(OCTETS acc, UTF8 policy, OCTETS ecdsa,
    ///  SEQUENCE OF SEQUENCE(UTF8 charSeq, OCTETS witness))`.
    pub fn to_der(&self) -> Vec<u8> {
        let mut entries = Vec::new();
        for (charseq, witness) in &self.witnesses {
            let mut entry = der::encode_utf8_string(charseq);
            entry.extend_from_slice(&der::encode_octet_string(&witness.to_bytes_be()));
            entries.extend_from_slice(&der::encode_sequence(&entry));
        }

        let mut body = der::encode_octet_string(&self.acc.to_bytes_be());
        body.extend_from_slice(&der::encode_utf8_string(&self.policy));
        body.extend_from_slice(&der::encode_octet_string(&self.ecdsa));
        body.extend_from_slice(&der::encode_sequence(&entries));
        der::encode_sequence(&body)
    }

    /// Decode from the wire form.
    pub fn from_der(bytes: &[u8]) -> Result<Signature, DerError> {
        let mut outer = Reader::new(bytes);
        let mut seq = outer.read_sequence()?;
        outer.finish()?;

        let acc = BigUint::from_bytes_be(seq.read_octet_string()?);
        let policy = seq.read_utf8_string()?;
        let ecdsa = seq.read_octet_string()?.to_vec();

        let mut witnesses = BTreeMap::new();
        let mut list = seq.read_sequence()?;
        while !list.is_empty() {
            let mut entry = list.read_sequence()?;
            let charseq = entry.read_utf8_string()?;
            let witness = BigUint::from_bytes_be(entry.read_octet_string()?);
            entry.finish()?;
            witnesses.insert(charseq, witness);
        }
        seq.finish()?;

        Ok(Signature { acc, policy, ecdsa, witnesses })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn universe() -> Universe {
        Universe::from_members(
            ["hello", "good", "fun", "dog", "cat"]
                .iter()
                .map(|s| s.to_string()),
        )
        .unwrap()
    }

    fn keys() -> (RsaSigningKey, RsaVerificationKey) {
        let mut rng = StdRng::from_seed([81u8; 32]);
        let sk = RsaSigningKey::generate_with_bits(256, &mut rng);
        let vk = sk.verification_key();
        (sk, vk)
    }

    fn set(members: &[&str]) -> BTreeSet<String> {
        members.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn characteristics_follow_declaration_order() {
        let u = universe();
        assert_eq!(u.len(), 5);
        assert_eq!(u.characteristic(&set(&[])).unwrap(), "00000");
        assert_eq!(u.characteristic(&set(&["hello", "good"])).unwrap(), "11000");
        assert_eq!(u.characteristic(&set(&["hello", "cat"])).unwrap(), "10001");
        assert!(u.characteristic(&set(&["zebra"])).is_err());
    }

    #[test]
    fn universe_rejects_duplicates_and_emptiness() {
        assert!(Universe::from_members(std::iter::empty()).is_err());
        assert!(Universe::from_members(
            ["a", "b", "a"].iter().map(|s| s.to_string())
        )
        .is_err());
    }

    #[test]
    fn bit_string_policy_sign_verify_redact() {
        let (sk, vk) = keys();
        let u = universe();
        let s = set(&["hello", "good", "fun", "dog", "cat"]);
        let sig = sign(&sk, &u, &s, "11111, 11000, 00111").unwrap();
        assert!(verify(&vk, &u, &sig, &s));

        // Redact to the 11000 subset.
        let sub = set(&["hello", "good"]);
        let redacted = redact(&u, &s, &sub, &sig, "11000").unwrap().unwrap();
        assert!(verify(&vk, &u, &redacted, &sub));
        assert_eq!(redacted.acc, sig.acc);
        assert_eq!(redacted.ecdsa, sig.ecdsa);
        // Only 11000's 1-bits are inside 11000; the rest are dropped.
        assert_eq!(
            redacted.witnesses.keys().collect::<Vec<_>>(),
            vec!["11000"]
        );

        // {hello, cat} has characteristic 10001, which was never listed.
        assert_eq!(
            redact(&u, &s, &set(&["hello", "cat"]), &sig, "10001").unwrap(),
            None
        );
    }

    #[test]
    fn sign_precondition_failures() {
        let (sk, _) = keys();
        let u = universe();

        // Set outside the universe.
        assert!(matches!(
            sign(&sk, &u, &set(&["zebra"]), "11111"),
            Err(SchemeError::InvalidArgument(_))
        ));
        // Malformed characteristic entries.
        for bad in ["", "110", "11a00", "11000,"] {
            assert!(
                matches!(
                    sign(&sk, &u, &set(&["hello"]), bad),
                    Err(SchemeError::InvalidArgument(_))
                ),
                "{bad:?}"
            );
        }
        // Characteristic of the signed set is not listed.
        assert!(matches!(
            sign(&sk, &u, &set(&["hello"]), "11000"),
            Err(SchemeError::PolicyUnsatisfied)
        ));
    }

    #[test]
    fn non_subset_redaction_is_refused() {
        let (sk, _) = keys();
        let u = universe();
        let s = set(&["hello", "good"]);
        let sig = sign(&sk, &u, &s, "11000").unwrap();
        assert_eq!(
            redact(&u, &s, &set(&["hello", "dog"]), &sig, "10010").unwrap(),
            None
        );
    }

    #[test]
    fn subset_filter_keeps_contained_characteristics() {
        let (sk, vk) = keys();
        let u = universe();
        let s = set(&["hello", "good", "fun"]);
        // 10000 is a strict subset of the redaction target 11000 and must
        // survive the filter even though it is not the target itself.
        let sig = sign(&sk, &u, &s, "11100, 11000, 10000, 00100").unwrap();

        let sub = set(&["hello", "good"]);
        let redacted = redact(&u, &s, &sub, &sig, "11000").unwrap().unwrap();
        assert_eq!(
            redacted.witnesses.keys().collect::<Vec<_>>(),
            vec!["10000", "11000"]
        );
        assert!(verify(&vk, &u, &redacted, &sub));
        // A further redaction to {hello} still finds its witness.
        let deeper = redact(&u, &sub, &set(&["hello"]), &redacted, "10000")
            .unwrap()
            .unwrap();
        assert!(verify(&vk, &u, &deeper, &set(&["hello"])));
    }

    #[test]
    fn tampered_ecdsa_rejects() {
        let (sk, vk) = keys();
        let u = universe();
        let s = set(&["hello"]);
        let mut sig = sign(&sk, &u, &s, "10000").unwrap();
        *sig.ecdsa.last_mut().unwrap() ^= 0x01;
        assert!(!verify(&vk, &u, &sig, &s));
    }

    #[test]
    fn der_round_trip_preserves_validity() {
        let (sk, vk) = keys();
        let u = universe();
        let s = set(&["hello", "good"]);
        let sig = sign(&sk, &u, &s, "11000, 10000").unwrap();
        let decoded = Signature::from_der(&sig.to_der()).unwrap();
        assert_eq!(decoded, sig);
        assert!(verify(&vk, &u, &decoded, &s));
    }
}
