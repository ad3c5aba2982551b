//! Pairing-based dynamic membership accumulator
//!
//! The accumulator value for a set `S` is `acc = g^{Π_{s∈S}(H(s)+x)}` in
//! G1, where `x` is the trapdoor and `H` hashes members into the scalar
//! field. A member's witness is `acc^{(H(s)+x)^{-1}}`, so it depends only
//! on the *other* members through `acc` itself — forgetting some members'
//! witnesses never invalidates the rest, which is exactly the property
//! redaction needs.
//!
//! Verification is the pairing product check
//! `e(w, g2^{H(s)} · pk) · e(acc^{-1}, g2) = 1` with `pk = g2^x`,
//! evaluated as one multi-Miller loop.
//!
//! The holder of `x` can forge witnesses for arbitrary strings; the signer
//! is trusted here (documented threat, not defended).

#![forbid(unsafe_code)]

use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_ff::{Field, One, UniformRand};
use rand::{CryptoRng, RngCore};

use crate::group::{g1_from_bytes, hash_to_zr, Engine, G1, G2, Zr};

/// Trapdoor half of an accumulator keypair.
#[derive(Clone, Debug)]
pub struct AccSecretKey {
    /// G1 generator the accumulator is computed over.
    pub g: G1,
    /// Trapdoor scalar.
    pub x: Zr,
}

/// Public half of an accumulator keypair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccPublicKey {
    /// G2 generator.
    pub g2: G2,
    /// `g2^x`.
    pub pk: G2,
}

/// Failures during accumulation; verification never errors.
#[derive(Debug, thiserror::Error)]
pub enum BilinearAccError {
    /// `H(s) + x = 0`, so the member's exponent has no inverse. With a
    /// random trapdoor this has negligible probability.
    #[error("member hash collides with the accumulator trapdoor")]
    DegenerateMember,
}

/// Sample a fresh accumulator keypair.
pub fn key_gen<R: RngCore + CryptoRng>(rng: &mut R) -> (AccPublicKey, AccSecretKey) {
    let x = Zr::rand(rng);
    let g = G1::generator();
    let g2 = G2::generator();
    let pk = (g2.into_group() * x).into_affine();
    (AccPublicKey { g2, pk }, AccSecretKey { g, x })
}

/// Accumulate a set of members into a single G1 value.
///
/// Members hash through [`hash_to_zr`]; duplicates in the input would
/// accumulate twice (multiset semantics), so callers pass de-duplicated
/// sets.
pub fn eval<'a, I>(sk: &AccSecretKey, members: I) -> G1
where
    I: IntoIterator<Item = &'a str>,
{
    let mut phi = Zr::one();
    for m in members {
        phi *= hash_to_zr(m.as_bytes()) + sk.x;
    }
    (sk.g.into_group() * phi).into_affine()
}

/// Compute the membership witness for `member` under `acc`.
pub fn witness(
    sk: &AccSecretKey,
    acc: &G1,
    member: &str,
) -> Result<G1, BilinearAccError> {
    let e = hash_to_zr(member.as_bytes()) + sk.x;
    let inv = e.inverse().ok_or(BilinearAccError::DegenerateMember)?;
    Ok((acc.into_group() * inv).into_affine())
}

/// Check a membership witness against the accumulator value.
///
/// Both the accumulator and the witness arrive as untrusted compressed
/// bytes; any decoding failure yields `false`, never an error.
pub fn verify(pk: &AccPublicKey, acc_bytes: &[u8], witness_bytes: &[u8], member: &str) -> bool {
    let acc = match g1_from_bytes(acc_bytes) {
        Ok(p) => p,
        Err(_) => return false,
    };
    let w = match g1_from_bytes(witness_bytes) {
        Ok(p) => p,
        Err(_) => return false,
    };

    let h = hash_to_zr(member.as_bytes());
    // g2^{H(s)} · pk
    let rhs = (pk.g2.into_group() * h + pk.pk.into_group()).into_affine();

    let g1_terms = [
        <Engine as Pairing>::G1Prepared::from(w),
        <Engine as Pairing>::G1Prepared::from(-acc),
    ];
    let g2_terms = [
        <Engine as Pairing>::G2Prepared::from(rhs),
        <Engine as Pairing>::G2Prepared::from(pk.g2),
    ];

    let mlo = Engine::multi_miller_loop(g1_terms, g2_terms);
    match Engine::final_exponentiation(mlo) {
        Some(out) => out.0.is_one(),
        None => false,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::g1_to_bytes;
    use rand::{rngs::StdRng, SeedableRng};

    fn keypair() -> (AccPublicKey, AccSecretKey) {
        let mut rng = StdRng::from_seed([9u8; 32]);
        key_gen(&mut rng)
    }

    #[test]
    fn accumulated_members_verify() {
        let (pk, sk) = keypair();
        let members = ["alpha", "beta", "gamma"];
        let acc = eval(&sk, members.iter().copied());
        let acc_bytes = g1_to_bytes(&acc);

        for m in members {
            let w = witness(&sk, &acc, m).unwrap();
            assert!(verify(&pk, &acc_bytes, &g1_to_bytes(&w), m), "{m}");
        }
    }

    #[test]
    fn witnesses_survive_forgetting_others() {
        // Redaction drops witness entries but leaves acc untouched; each
        // remaining witness must still verify in isolation.
        let (pk, sk) = keypair();
        let acc = eval(&sk, ["a", "b", "c", "d"].into_iter());
        let acc_bytes = g1_to_bytes(&acc);
        let w_a = witness(&sk, &acc, "a").unwrap();
        assert!(verify(&pk, &acc_bytes, &g1_to_bytes(&w_a), "a"));
    }

    #[test]
    fn wrong_member_or_witness_rejects() {
        let (pk, sk) = keypair();
        let acc = eval(&sk, ["a", "b"].into_iter());
        let acc_bytes = g1_to_bytes(&acc);
        let w_a = witness(&sk, &acc, "a").unwrap();

        // Witness bound to a different member.
        assert!(!verify(&pk, &acc_bytes, &g1_to_bytes(&w_a), "b"));
        assert!(!verify(&pk, &acc_bytes, &g1_to_bytes(&w_a), "zzz"));

        // Garbage bytes in either slot.
        assert!(!verify(&pk, &acc_bytes, &[0u8; 32], "a"));
        assert!(!verify(&pk, &[0u8; 32], &g1_to_bytes(&w_a), "a"));
    }

    #[test]
    fn adversarial_witnesses_fail_without_trapdoor() {
        // Bounded seeded trials: random G1 points standing in for forged
        // witnesses of a non-member.
        let (pk, sk) = keypair();
        let acc = eval(&sk, ["a", "b", "c"].into_iter());
        let acc_bytes = g1_to_bytes(&acc);

        let mut rng = StdRng::from_seed([11u8; 32]);
        for _ in 0..16 {
            let forged = (G1::generator().into_group() * Zr::rand(&mut rng)).into_affine();
            assert!(!verify(&pk, &acc_bytes, &g1_to_bytes(&forged), "outsider"));
        }
    }
}
