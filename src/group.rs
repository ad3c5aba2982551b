//! Bilinear group abstraction
//!
//! The crate fixes a Type-III pairing `e: G1 × G2 → GT` on **BN254** and
//! centralizes the aliases here, the same way the crate root of a
//! commitment library pins its field and curve. All group parameters are
//! compiled into the curve crate; there is no runtime parameter file and
//! hence no process-global state to initialise.
//!
//! Group elements are plain values (`Copy` affine points); exponentiation
//! never mutates its operand, so one element can safely feed several
//! pairing equations.
//!
//! Signatures produced over this group are bit-incompatible with other
//! parameter sets; the curve choice is part of the wire format.

#![forbid(unsafe_code)]

use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use sha2::{Digest, Sha256};

/// Scalar field of the pairing groups.
pub type Zr = ark_bn254::Fr;

/// First pairing group; accumulator values and witnesses live here.
pub type G1 = ark_bn254::G1Affine;

/// Second pairing group; verification key material lives here.
pub type G2 = ark_bn254::G2Affine;

/// The pairing engine.
pub type Engine = ark_bn254::Bn254;

/// Group-element decoding failures.
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    /// Compressed bytes did not decode to a valid element.
    #[error("failed to decode {0} element")]
    Decode(&'static str),
}

/// Deterministic hash from bytes into the scalar field.
///
/// Expands the input to 64 bytes with two domain-separated SHA-256
/// invocations, then reduces little-endian modulo the field order. The
/// expansion keeps the reduction bias negligible.
pub fn hash_to_zr(input: &[u8]) -> Zr {
    use ark_ff::PrimeField;

    let mut wide = [0u8; 64];
    let mut h0 = Sha256::new();
    h0.update([0u8]);
    h0.update(input);
    wide[..32].copy_from_slice(&h0.finalize());

    let mut h1 = Sha256::new();
    h1.update([1u8]);
    h1.update(input);
    wide[32..].copy_from_slice(&h1.finalize());

    Zr::from_le_bytes_mod_order(&wide)
}

/// Compressed encoding of a G1 element.
pub fn g1_to_bytes(p: &G1) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(32);
    p.serialize_compressed(&mut bytes).expect("serialize G1");
    bytes
}

/// Decode a compressed G1 element, validating the point.
pub fn g1_from_bytes(bytes: &[u8]) -> Result<G1, GroupError> {
    G1::deserialize_compressed(bytes).map_err(|_| GroupError::Decode("G1"))
}

/// Compressed encoding of a G2 element.
pub fn g2_to_bytes(p: &G2) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(64);
    p.serialize_compressed(&mut bytes).expect("serialize G2");
    bytes
}

/// Decode a compressed G2 element, validating the point.
pub fn g2_from_bytes(bytes: &[u8]) -> Result<G2, GroupError> {
    G2::deserialize_compressed(bytes).map_err(|_| GroupError::Decode("G2"))
}

/// Canonical encoding of a scalar.
pub fn zr_to_bytes(s: &Zr) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(32);
    s.serialize_compressed(&mut bytes).expect("serialize Zr");
    bytes
}

/// Decode a canonical scalar encoding.
pub fn zr_from_bytes(bytes: &[u8]) -> Result<Zr, GroupError> {
    Zr::deserialize_compressed(bytes).map_err(|_| GroupError::Decode("Zr"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::AffineRepr;
    use ark_ff::UniformRand;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn hash_to_zr_is_deterministic_and_spread() {
        let a = hash_to_zr(b"alpha");
        let b = hash_to_zr(b"alpha");
        let c = hash_to_zr(b"beta");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn point_codecs_round_trip() {
        let mut rng = StdRng::from_seed([3u8; 32]);
        let g1 = G1::generator();
        assert_eq!(g1_from_bytes(&g1_to_bytes(&g1)).unwrap(), g1);

        let g2 = G2::generator();
        assert_eq!(g2_from_bytes(&g2_to_bytes(&g2)).unwrap(), g2);

        let s = Zr::rand(&mut rng);
        assert_eq!(zr_from_bytes(&zr_to_bytes(&s)).unwrap(), s);
    }

    #[test]
    fn point_decode_rejects_garbage() {
        assert!(g1_from_bytes(&[0xffu8; 32]).is_err());
        assert!(g2_from_bytes(b"short").is_err());
    }
}
