//! Big-integer modular arithmetic and primality
//!
//! Everything in this module operates on `num-bigint` values and is
//! deterministic unless it explicitly takes an RNG. The primality test uses
//! **fixed Miller-Rabin bases** (the first `rounds` primes) so that a given
//! candidate always classifies the same way across runs — `hash_to_prime`
//! relies on this to return a stable `(prime, counter)` pair for a given
//! input.

#![forbid(unsafe_code)]

use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

/// Miller-Rabin rounds for hash-to-prime candidates.
pub const MR_ROUNDS_HASH: usize = 10;

/// Miller-Rabin rounds for freshly generated key-material primes.
pub const MR_ROUNDS_KEYGEN: usize = 40;

/// The first forty primes; used both for trial division and as the
/// deterministic Miller-Rabin base set.
const SMALL_PRIMES: [u32; 40] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67,
    71, 73, 79, 83, 89, 97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149,
    151, 157, 163, 167, 173,
];

/// Modular inverse via the extended Euclidean algorithm.
///
/// Returns `None` when `gcd(a, m) != 1` (no inverse exists) or `m < 2`.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    if *m < BigUint::from(2u32) {
        return None;
    }
    let a = BigInt::from(a.clone()) % BigInt::from(m.clone());
    let m_int = BigInt::from(m.clone());
    let ext = a.extended_gcd(&m_int);
    if !ext.gcd.is_one() {
        return None;
    }
    // ext.x may be negative; normalize into [0, m).
    let mut inv = ext.x % &m_int;
    if inv < BigInt::zero() {
        inv += &m_int;
    }
    inv.to_biguint()
}

/// Deterministic Miller-Rabin probable-prime test.
///
/// The bases are the first `rounds` entries of the small-prime table
/// (capped at the table length), so the verdict for a fixed `n` never
/// varies between invocations.
pub fn is_probable_prime(n: &BigUint, rounds: usize) -> bool {
    let two = BigUint::from(2u32);
    if *n < two {
        return false;
    }
    // Trial division also catches every n that equals a table entry.
    for &p in SMALL_PRIMES.iter() {
        let p = BigUint::from(p);
        if *n == p {
            return true;
        }
        if (n % &p).is_zero() {
            return false;
        }
    }

    // n - 1 = d * 2^s with d odd.
    let n_minus_1 = n - BigUint::one();
    let s = n_minus_1.trailing_zeros().unwrap_or(0);
    let d = &n_minus_1 >> s;

    let rounds = rounds.min(SMALL_PRIMES.len());
    'witness: for &a in SMALL_PRIMES.iter().take(rounds) {
        let a = BigUint::from(a);
        let mut x = a.modpow(&d, n);
        if x.is_one() || x == n_minus_1 {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Sample a probable prime of exactly `bits` bits.
///
/// Candidates are uniform odd integers with the top bit forced, retried
/// until one passes [`is_probable_prime`] at [`MR_ROUNDS_KEYGEN`].
pub fn gen_prime<R: RngCore + CryptoRng>(bits: u64, rng: &mut R) -> BigUint {
    assert!(bits >= 2, "prime width must be at least 2 bits");
    loop {
        let mut candidate = rng.gen_biguint(bits);
        candidate.set_bit(bits - 1, true);
        candidate.set_bit(0, true);
        if is_probable_prime(&candidate, MR_ROUNDS_KEYGEN) {
            return candidate;
        }
    }
}

/// Deterministically map arbitrary bytes to a probable prime.
///
/// Computes `SHA-256(input || counter_le)` for an 8-byte little-endian
/// counter starting at 0, interprets the digest as a big-endian unsigned
/// integer, and increments the counter until the result passes
/// [`is_probable_prime`] at [`MR_ROUNDS_HASH`]. The successful counter is
/// returned with the prime; re-deriving the prime for witness computation
/// requires both fields to match.
pub fn hash_to_prime(input: &[u8]) -> (BigUint, u64) {
    let mut counter: u64 = 0;
    loop {
        let mut hasher = Sha256::new();
        hasher.update(input);
        hasher.update(counter.to_le_bytes());
        let candidate = BigUint::from_bytes_be(&hasher.finalize());
        if is_probable_prime(&candidate, MR_ROUNDS_HASH) {
            return (candidate, counter);
        }
        counter += 1;
    }
}

// ============================================================================
// Tests
// ============================================================================
