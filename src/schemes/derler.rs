//! Accumulator-only redactable signatures
//!
//! The simplest composition: accumulate the set in the pairing
//! accumulator, witness every member, and ECDSA-sign the accumulator
//! bytes. Redaction is pure forgetting — the witnesses of removed members
//! are dropped and nothing else changes.

#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::bilinear_acc;
use crate::der::{self, DerError, Reader};
use crate::group::g1_to_bytes;
use crate::keys::{ec_sign, ec_verify, PairingSigningKey, PairingVerificationKey};
use crate::schemes::SchemeError;

/// An accumulator-only signature: the accumulator value, the ECDSA
/// binding over it, and one witness per signed member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// Compressed G1 accumulator value.
    pub acc: Vec<u8>,
    /// ASN.1 DER ECDSA signature over `acc`.
    pub ecdsa: Vec<u8>,
    /// Member → compressed G1 witness.
    pub witnesses: BTreeMap<String, Vec<u8>>,
}

/// Sign a member set.
pub fn sign(sk: &PairingSigningKey, set: &BTreeSet<String>) -> Result<Signature, SchemeError> {
    let acc = bilinear_acc::eval(&sk.acc, set.iter().map(String::as_str));
    let acc_bytes = g1_to_bytes(&acc);

    let mut witnesses = BTreeMap::new();
    for member in set {
        let w = bilinear_acc::witness(&sk.acc, &acc, member)
            .map_err(|e| SchemeError::Crypto(e.to_string()))?;
        witnesses.insert(member.clone(), g1_to_bytes(&w));
    }

    let ecdsa = ec_sign(&sk.ec, &acc_bytes);
    debug!(members = set.len(), "signed set under accumulator-only scheme");
    Ok(Signature { acc: acc_bytes, ecdsa, witnesses })
}

/// Redact `sig` from `set` down to `subset`.
///
/// Returns `None` when `subset` is not contained in `set`; otherwise the
/// witnesses of removed members are forgotten and the accumulator and
/// ECDSA bytes are carried over unchanged.
pub fn redact(
    set: &BTreeSet<String>,
    subset: &BTreeSet<String>,
    sig: &Signature,
) -> Option<Signature> {
    if !subset.is_subset(set) {
        return None;
    }
    let mut redacted = sig.clone();
    for removed in set.difference(subset) {
        redacted.witnesses.remove(removed);
    }
    debug!(
        kept = redacted.witnesses.len(),
        dropped = sig.witnesses.len() - redacted.witnesses.len(),
        "redacted accumulator-only signature"
    );
    Some(redacted)
}

/// Verify `sig` over `set`: every member needs a verifying witness, and
/// the ECDSA binding over the accumulator bytes must hold.
pub fn verify(vk: &PairingVerificationKey, sig: &Signature, set: &BTreeSet<String>) -> bool {
    for member in set {
        let Some(witness) = sig.witnesses.get(member) else {
            return false;
        };
        if !bilinear_acc::verify(&vk.acc, &sig.acc, witness, member) {
            return false;
        }
    }
    ec_verify(&vk.ec, &sig.acc, &sig.ecdsa)
}

impl Signature {
    /// Encode to the wire form:
    /// `SEQUENCE(OCTETS acc, OCTETS ecdsa, SEQUENCE OF SEQUENCE(UTF8 member, OCTETS witness))`.
    pub fn to_der(&self) -> Vec<u8> {
        let mut entries = Vec::new();
        for (member, witness) in &self.witnesses {
            let mut entry = der::encode_utf8_string(member);
            entry.extend_from_slice(&der::encode_octet_string(witness));
            entries.extend_from_slice(&der::encode_sequence(&entry));
        }

        let mut body = der::encode_octet_string(&self.acc);
        body.extend_from_slice(&der::encode_octet_string(&self.ecdsa));
        body.extend_from_slice(&der::encode_sequence(&entries));
        der::encode_sequence(&body)
    }

    /// Decode from the wire form.
    pub fn from_der(bytes: &[u8]) -> Result<Signature, DerError> {
        let mut outer = Reader::new(bytes);
        let mut seq = outer.read_sequence()?;
        outer.finish()?;

        let acc = seq.read_octet_string()?.to_vec();
        let ecdsa = seq.read_octet_string()?.to_vec();

        let mut witnesses = BTreeMap::new();
        let mut list = seq.read_sequence()?;
        while !list.is_empty() {
            let mut entry = list.read_sequence()?;
            let member = entry.read_utf8_string()?;
            let witness = entry.read_octet_string()?.to_vec();
            entry.finish()?;
            witnesses.insert(member, witness);
        }
        seq.finish()?;

        Ok(Signature { acc, ecdsa, witnesses })
    }
}

// ============================================================================
// Tests
// ============================================================================
