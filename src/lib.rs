//! Redactable set signatures over cryptographic accumulators
//!
//! A signer produces one signature over an unordered set of strings,
//! after which **any holder of the signature** — without the signing
//! secret — can derive a valid signature over a subset, as long as the
//! subset still satisfies the redaction policy fixed at signing time.
//!
//! Three scheme variants compose the same primitives differently:
//!
//! - [`schemes::large`] — the policy is a monotone `and`/`or` formula
//!   over arbitrary member strings. Shares of a fresh secret are
//!   distributed over the formula tree ([`policy`] driving [`shamir`]),
//!   members annotated with their shares are accumulated in an RSA
//!   accumulator ([`rsa_acc`]), and an ECDSA signature binds the
//!   accumulator value together with the reconstructed secret.
//! - [`schemes::small`] — the policy lists acceptable characteristic
//!   bit-strings over a fixed universe; only the RSA accumulator is used.
//! - [`schemes::derler`] — no policy; the pairing accumulator
//!   ([`bilinear_acc`]) witnesses each member directly.
//!
//! ## Invariants
//!
//! - **Redaction only forgets.** A valid redaction shrinks witness and
//!   share maps; the accumulator value and the ECDSA bytes are carried
//!   over unchanged. This works because accumulator witnesses depend on
//!   the other members only through the accumulator value itself.
//! - **Non-validity is a value, not an error.** `verify` returns `bool`,
//!   `redact` returns `Ok(None)` for an inadmissible subset. Errors are
//!   reserved for malformed arguments and broken key material
//!   ([`schemes::SchemeError`]).
//! - **No global state.** The bilinear group (BN254, see [`group`]) and
//!   the sharing field (FFDHE2048, see [`shamir`]) are compiled-in
//!   constants; every operation is a pure function of its inputs plus OS
//!   randomness where key or share generation demands it.
//!
//! ## Trust model
//!
//! The signer is trusted: the holder of an accumulator trapdoor can forge
//! witnesses for strings that were never accumulated. Redaction hides the
//! removed members' witnesses and shares but does not hide that a
//! redaction took place.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms)]

/// Big-integer modular arithmetic, primality, and hash-to-prime.
pub mod arith;
/// Pairing membership accumulator (witnesses survive redaction).
pub mod bilinear_acc;
/// Strict DER codec for key and signature bodies.
pub mod der;
/// Bilinear group aliases and codecs (BN254).
pub mod group;
/// Key material: per-scheme keypairs, PKCS#8/SPKI embedding, base64 framing.
pub mod keys;
/// Monotone policy formulas: parsing, evaluation, tree-based sharing.
pub mod policy;
/// RSA accumulator with hash-to-prime members.
pub mod rsa_acc;
/// The three redactable signature schemes.
pub mod schemes;
/// Threshold secret sharing over the FFDHE2048 field.
pub mod shamir;

pub use keys::{
    KeyError, PairingSigningKey, PairingVerificationKey, RsaSigningKey, RsaVerificationKey,
};
pub use policy::{Policy, PolicyError};
pub use schemes::SchemeError;
