//! RSA accumulator with hash-to-prime members
//!
//! Members map to probable primes via [`crate::arith::hash_to_prime`]; the
//! accumulator for a set is `g^{Π primes} mod n` and a member's witness is
//! the same power with that member's prime left out, so
//! `w^{prime} ≡ acc (mod n)` checks membership. The `(prime, counter)`
//! pair is kept as auxiliary data so witness computation re-derives each
//! element unambiguously — two elements are the same member only when both
//! fields match.
//!
//! The modulus factors are the trapdoor. Nothing here needs them after key
//! generation (accumulation exponentiates directly), but they are part of
//! the signing key material and their product must reproduce `n`.

#![forbid(unsafe_code)]

use num_bigint::{BigUint, RandBigInt};
use num_traits::One;
use rand::{CryptoRng, RngCore};

use crate::arith::{gen_prime, hash_to_prime};

/// Default width of each modulus factor.
pub const DEFAULT_PRIME_BITS: u64 = 2048;

/// Trapdoor half of an RSA accumulator keypair.
#[derive(Clone, Debug)]
pub struct RsaSecretKey {
    /// Accumulator base, uniform in `(1, n)`.
    pub g: BigUint,
    /// First modulus factor.
    pub p: BigUint,
    /// Second modulus factor.
    pub q: BigUint,
}

/// Public half of an RSA accumulator keypair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RsaPublicKey {
    /// Accumulator base.
    pub g: BigUint,
    /// Modulus `n = pq`.
    pub n: BigUint,
}

/// A member's prime representative together with the hash counter that
/// produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimeRepr {
    /// The probable prime the member hashed to.
    pub prime: BigUint,
    /// Counter value at which hashing succeeded.
    pub counter: u64,
}

impl PrimeRepr {
    /// Derive the representative for an element's byte form.
    pub fn for_element(element: &str) -> PrimeRepr {
        let (prime, counter) = hash_to_prime(element.as_bytes());
        PrimeRepr { prime, counter }
    }
}

impl RsaSecretKey {
    /// The public half; `n` is recomputed from the stored factors.
    pub fn public(&self) -> RsaPublicKey {
        RsaPublicKey {
            g: self.g.clone(),
            n: &self.p * &self.q,
        }
    }
}

/// Sample a keypair with [`DEFAULT_PRIME_BITS`]-bit factors.
pub fn key_gen<R: RngCore + CryptoRng>(rng: &mut R) -> (RsaPublicKey, RsaSecretKey) {
    key_gen_with_bits(DEFAULT_PRIME_BITS, rng)
}

/// Sample a keypair with `bits`-bit factors. Tests use reduced widths;
/// anything below [`DEFAULT_PRIME_BITS`] is not for production key
/// material.
pub fn key_gen_with_bits<R: RngCore + CryptoRng>(
    bits: u64,
    rng: &mut R,
) -> (RsaPublicKey, RsaSecretKey) {
    let p = gen_prime(bits, rng);
    let q = loop {
        let q = gen_prime(bits, rng);
        if q != p {
            break q;
        }
    };
    let n = &p * &q;
    let two = BigUint::from(2u32);
    let g = rng.gen_biguint_range(&two, &n);
    let sk = RsaSecretKey { g, p, q };
    (sk.public(), sk)
}

/// Accumulate `elements`, returning the value and the per-element
/// auxiliary `(prime, counter)` data in input order.
pub fn eval<'a, I>(pk: &RsaPublicKey, elements: I) -> (BigUint, Vec<PrimeRepr>)
where
    I: IntoIterator<Item = &'a str>,
{
    let aux: Vec<PrimeRepr> = elements
        .into_iter()
        .map(PrimeRepr::for_element)
        .collect();
    let mut exponent = BigUint::one();
    for repr in &aux {
        exponent *= &repr.prime;
    }
    (pk.g.modpow(&exponent, &pk.n), aux)
}

/// Witness for `element`: the accumulator exponent with every copy of the
/// element's own representative removed.
pub fn witness(pk: &RsaPublicKey, element: &str, aux: &[PrimeRepr]) -> BigUint {
    let own = PrimeRepr::for_element(element);
    let mut exponent = BigUint::one();
    for repr in aux {
        if *repr != own {
            exponent *= &repr.prime;
        }
    }
    pk.g.modpow(&exponent, &pk.n)
}

/// Membership check: `w^{prime} ≡ acc (mod n)`.
pub fn verify(pk: &RsaPublicKey, acc: &BigUint, witness: &BigUint, element: &str) -> bool {
    let own = PrimeRepr::for_element(element);
    witness.modpow(&own.prime, &pk.n) == *acc
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn keypair() -> (RsaPublicKey, RsaSecretKey) {
        let mut rng = StdRng::from_seed([21u8; 32]);
        key_gen_with_bits(256, &mut rng)
    }

    #[test]
    fn accumulated_elements_verify() {
        let (pk, _) = keypair();
        let members = ["hello", "good", "fun"];
        let (acc, aux) = eval(&pk, members.iter().copied());
        for m in members {
            let w = witness(&pk, m, &aux);
            assert!(verify(&pk, &acc, &w, m), "{m}");
        }
    }

    #[test]
    fn non_member_rejects() {
        let (pk, _) = keypair();
        let (acc, aux) = eval(&pk, ["a", "b"].into_iter());
        let w = witness(&pk, "a", &aux);
        assert!(!verify(&pk, &acc, &w, "c"));

        // The witness-for-everything-else of an outsider equals the full
        // accumulator power, which must not verify either.
        let w_out = witness(&pk, "outsider", &aux);
        assert!(!verify(&pk, &acc, &w_out, "outsider"));
    }

    #[test]
    fn adversarial_witness_trials_fail() {
        let (pk, _) = keypair();
        let (acc, _) = eval(&pk, ["a", "b", "c"].into_iter());
        let mut rng = StdRng::from_seed([22u8; 32]);
        for _ in 0..32 {
            let forged = rng.gen_biguint_below(&pk.n);
            assert!(!verify(&pk, &acc, &forged, "outsider"));
        }
    }

    #[test]
    fn witness_excludes_every_duplicate_copy() {
        let (pk, _) = keypair();
        // Same element accumulated twice: the witness must strip both
        // copies, leaving only the other member's prime.
        let (_, aux) = eval(&pk, ["dup", "dup", "other"].into_iter());
        let w = witness(&pk, "dup", &aux);
        let other = PrimeRepr::for_element("other");
        assert_eq!(w, pk.g.modpow(&other.prime, &pk.n));
    }

    #[test]
    fn secret_reproduces_public_modulus() {
        let (pk, sk) = keypair();
        assert_eq!(sk.public(), pk);
    }
}
