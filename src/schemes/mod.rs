//! Redactable set signature schemes
//!
//! Three compositions over the shared primitives:
//!
//! - [`large`] — policies are monotone `and`/`or` formulas over arbitrary
//!   member strings; binds the RSA accumulator and the policy-tree secret
//!   sharing.
//! - [`small`] — policies are lists of characteristic bit-strings over a
//!   fixed universe; binds the RSA accumulator only.
//! - [`derler`] — no policies; binds the pairing accumulator.
//!
//! All three finalize with the same ECDSA primitive and share one failure
//! discipline: **algorithmic preconditions are errors, cryptographic
//! non-validity is a value.** `sign` returns `Err` on bad arguments or an
//! unsatisfied policy; `verify` returns plain `bool` and never errors;
//! `redact` returns `Ok(None)` as the not-valid marker and reserves `Err`
//! for malformed arguments.
//!
//! Redaction never touches the accumulator value or the ECDSA bytes — it
//! only shrinks witness and share maps, so a redacted signature is
//! indistinguishable from one the signer produced over the subset's
//! surviving material.

#![forbid(unsafe_code)]

use num_bigint::{BigInt, BigUint, Sign};

pub mod derler;
pub mod large;
pub mod small;

/// Scheme-level failures; see the module docs for when these surface
/// versus a `false`/`None` result.
#[derive(Debug, thiserror::Error)]
pub enum SchemeError {
    /// Malformed input: unparsable or repeated-atom policy, empty policy
    /// where one is required, member outside the declared universe,
    /// malformed characteristic string.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The set does not satisfy the policy at signing time.
    #[error("set does not satisfy the policy")]
    PolicyUnsatisfied,

    /// A cryptographic sub-operation failed in a way that indicates broken
    /// key material rather than an invalid signature.
    #[error("cryptographic failure: {0}")]
    Crypto(String),
}

/// Minimal two's-complement big-endian encoding of a non-negative integer,
/// the byte form bound under ECDSA for accumulator values and
/// reconstructed secrets.
pub(crate) fn signed_bytes(value: &BigUint) -> Vec<u8> {
    BigInt::from_biguint(Sign::Plus, value.clone()).to_signed_bytes_be()
}
