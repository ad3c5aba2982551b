//! Large-universe redactable signatures
//!
//! Policies are monotone `and`/`or` formulas over arbitrary member
//! strings. Signing distributes shares of a fresh root secret over the
//! policy tree, accumulates each member **annotated with its share** in
//! the RSA accumulator, and ECDSA-signs the accumulator bytes followed by
//! the reconstructed secret. A verifier that holds a subset satisfying the
//! policy can rebuild the same secret from the surviving shares; one that
//! does not cannot, and the ECDSA binding fails.
//!
//! The accumulated preimage of a member is the textual
//! `member:(x, y)` form with decimal coordinates; members that are not
//! policy atoms carry the empty share `(0, 0)`. On the wire and in memory
//! the share travels as a structured `(x, y, witness)` record keyed by the
//! plain member string — the textual form is only ever a hash input.
//!
//! `redact` replaces the stored policy text with the caller's new policy
//! without re-signing. Verifiers evaluate the replacement, so a redactor
//! can tighten the published policy; publishing one the subset does not
//! satisfy only produces a signature that never verifies, since the bound
//! secret is still the one distributed under the original formula.

#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use num_bigint::BigUint;
use num_traits::Zero;
use rand::{CryptoRng, RngCore};
use tracing::debug;

use crate::der::{self, DerError, Reader};
use crate::keys::{ec_sign, ec_verify, RsaSigningKey, RsaVerificationKey};
use crate::policy::Policy;
use crate::rsa_acc;
use crate::schemes::{signed_bytes, SchemeError};
use crate::shamir::Share;

/// Per-member signature material: the member's policy share (or `(0, 0)`
/// when the member is not a policy atom) and its accumulator witness.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberRecord {
    /// Share abscissa.
    pub x: BigUint,
    /// Share value.
    pub y: BigUint,
    /// RSA accumulator witness for the annotated member.
    pub witness: BigUint,
}

impl MemberRecord {
    /// Whether this record carries a real policy share.
    fn has_share(&self) -> bool {
        !(self.x.is_zero() && self.y.is_zero())
    }
}

/// A large-universe signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// RSA accumulator value.
    pub acc: BigUint,
    /// Policy text the verifier evaluates.
    pub policy: String,
    /// ASN.1 DER ECDSA signature over `acc ‖ secret`.
    pub ecdsa: Vec<u8>,
    /// Member → share and witness.
    pub members: BTreeMap<String, MemberRecord>,
}

/// The accumulated preimage: `member:(x, y)` with decimal coordinates.
fn annotate(member: &str, x: &BigUint, y: &BigUint) -> String {
    format!("{member}:({x}, {y})")
}

fn parse_policy(text: &str) -> Result<Policy, SchemeError> {
    Policy::parse(text).map_err(|e| SchemeError::InvalidArgument(e.to_string()))
}

/// Sign `set` under `policy_text`.
///
/// Fails with [`SchemeError::InvalidArgument`] on an empty, unparsable,
/// or repeated-atom policy and with [`SchemeError::PolicyUnsatisfied`]
/// when the set does not satisfy it.
pub fn sign<R: RngCore + CryptoRng>(
    sk: &RsaSigningKey,
    set: &BTreeSet<String>,
    policy_text: &str,
    rng: &mut R,
) -> Result<Signature, SchemeError> {
    if policy_text.trim().is_empty() {
        return Err(SchemeError::InvalidArgument(
            "the large-universe scheme requires a policy".into(),
        ));
    }
    let policy = parse_policy(policy_text)?;
    if !policy.evaluate(set) {
        return Err(SchemeError::PolicyUnsatisfied);
    }

    let (shares, root_secret) = policy.distribute_shares(rng);
    let secret = policy
        .reconstruct(&shares)
        .ok_or_else(|| SchemeError::Crypto("full share map failed to reconstruct".into()))?;
    debug_assert_eq!(secret, root_secret);

    // Annotated members in the set's (deterministic) iteration order.
    let empty_x = BigUint::zero();
    let empty_y = BigUint::zero();
    let annotated: Vec<(String, String)> = set
        .iter()
        .map(|m| {
            let (x, y) = match shares.get(m) {
                Some(share) => (&share.x, &share.y),
                None => (&empty_x, &empty_y),
            };
            (m.clone(), annotate(m, x, y))
        })
        .collect();

    let pk = sk.rsa.public();
    let (acc, aux) = rsa_acc::eval(&pk, annotated.iter().map(|(_, a)| a.as_str()));

    let mut members = BTreeMap::new();
    for (member, annotated_member) in &annotated {
        let witness = rsa_acc::witness(&pk, annotated_member, &aux);
        let (x, y) = match shares.get(member) {
            Some(share) => (share.x.clone(), share.y.clone()),
            None => (BigUint::zero(), BigUint::zero()),
        };
        members.insert(member.clone(), MemberRecord { x, y, witness });
    }

    let mut message = signed_bytes(&acc);
    message.extend_from_slice(&signed_bytes(&secret));
    let ecdsa = ec_sign(&sk.ec, &message);

    debug!(
        members = members.len(),
        atoms = policy.atoms().len(),
        "signed set under large-universe scheme"
    );
    Ok(Signature {
        acc,
        policy: policy_text.to_string(),
        ecdsa,
        members,
    })
}

/// Redact `sig` from `set` down to `subset`, optionally replacing the
/// published policy.
///
/// Returns `Ok(None)` — the not-valid marker — when `subset` is not
/// contained in `set`, when the stored policy is not satisfied by
/// `subset`, or when the replacement policy is not satisfied by `subset`.
/// Unparsable policy text is an argument error, not a quiet `None`.
pub fn redact(
    set: &BTreeSet<String>,
    subset: &BTreeSet<String>,
    sig: &Signature,
    new_policy: Option<&str>,
) -> Result<Option<Signature>, SchemeError> {
    if !subset.is_subset(set) {
        return Ok(None);
    }
    let current = parse_policy(&sig.policy)?;
    if !current.evaluate(subset) {
        return Ok(None);
    }
    if let Some(text) = new_policy {
        let replacement = parse_policy(text)?;
        if !replacement.evaluate(subset) {
            return Ok(None);
        }
    }

    let mut redacted = sig.clone();
    for removed in set.difference(subset) {
        redacted.members.remove(removed);
    }
    if let Some(text) = new_policy {
        redacted.policy = text.to_string();
    }
    debug!(
        kept = redacted.members.len(),
        replaced_policy = new_policy.is_some(),
        "redacted large-universe signature"
    );
    Ok(Some(redacted))
}

/// Verify `sig` over `set`.
///
/// Every member must carry a record whose annotated form has a valid
/// accumulator witness; the stored policy must be satisfied by `set`; and
/// the secret rebuilt from the surviving shares must match the ECDSA
/// binding. Any failure — including unparsable stored policy text —
/// yields `false`.
pub fn verify(vk: &RsaVerificationKey, sig: &Signature, set: &BTreeSet<String>) -> bool {
    for member in set {
        let Some(record) = sig.members.get(member) else {
            return false;
        };
        let annotated_member = annotate(member, &record.x, &record.y);
        if !rsa_acc::verify(&vk.rsa, &sig.acc, &record.witness, &annotated_member) {
            return false;
        }
    }

    let Ok(policy) = Policy::parse(&sig.policy) else {
        return false;
    };
    if !policy.evaluate(set) {
        return false;
    }

    let shares: BTreeMap<String, Share> = sig
        .members
        .iter()
        .filter(|(_, record)| record.has_share())
        .map(|(member, record)| {
            (
                member.clone(),
                Share { x: record.x.clone(), y: record.y.clone() },
            )
        })
        .collect();
    let Some(secret) = policy.reconstruct(&shares) else {
        return false;
    };

    let mut message = signed_bytes(&sig.acc);
    message.extend_from_slice(&signed_bytes(&secret));
    ec_verify(&vk.ec, &message, &sig.ecdsa)
}

impl Signature {
    /// Encode to the wire form:
    /// `SEQUENCE(INTEGER acc, UTF8 policy, OCTETS ecdsa,
    ///  SEQUENCE OF SEQUENCE(UTF8 member, INTEGER x, INTEGER y, INTEGER witness))`.
    pub fn to_der(&self) -> Vec<u8> {
        let mut entries = Vec::new();
        for (member, record) in &self.members {
            let mut entry = der::encode_utf8_string(member);
            entry.extend_from_slice(&der::encode_uint(&record.x));
            entry.extend_from_slice(&der::encode_uint(&record.y));
            entry.extend_from_slice(&der::encode_uint(&record.witness));
            entries.extend_from_slice(&der::encode_sequence(&entry));
        }

        let mut body = der::encode_uint(&self.acc);
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

        let acc = seq.read_uint()?;
        let policy = seq.read_utf8_string()?;
        let ecdsa = seq.read_octet_string()?.to_vec();

        let mut members = BTreeMap::new();
        let mut list = seq.read_sequence()?;
        while !list.is_empty() {
            let mut entry = list.read_sequence()?;
            let member = entry.read_utf8_string()?;
            let x = entry.read_uint()?;
            let y = entry.read_uint()?;
            let witness = entry.read_uint()?;
            entry.finish()?;
            members.insert(member, MemberRecord { x, y, witness });
        }
        seq.finish()?;

        Ok(Signature { acc, policy, ecdsa, members })
    }
}

// ============================================================================
// Tests
// ============================================================================
