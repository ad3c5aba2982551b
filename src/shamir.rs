//! Threshold secret sharing over a fixed prime field
//!
//! Classical Shamir `(t, n)` sharing: the secret is the constant term of a
//! random degree-`t-1` polynomial, shares are evaluations at `1..=n`, and
//! reconstruction is Lagrange interpolation at zero. The field is the
//! FFDHE2048 modulus (RFC 7919), large enough that policy secrets bound
//! into signatures are unguessable.
//!
//! Sharing polynomials exist only inside [`share`]; nothing retains them.

#![forbid(unsafe_code)]

use std::sync::OnceLock;

use num_bigint::{BigUint, RandBigInt};
use num_traits::Zero;
use rand::{CryptoRng, RngCore};

use crate::arith::mod_inverse;

/// FFDHE2048 modulus from RFC 7919, appendix A.1.
const FIELD_PRIME_HEX: &str = concat!(
    "FFFFFFFFFFFFFFFFADF85458A2BB4A9AAFDC5620273D3CF1",
    "D8B9C583CE2D3695A9E13641146433FBCC939DCE249B3EF9",
    "7D2FE363630C75D8F681B202AEC4617AD3DF1ED5D5FD6561",
    "2433F51F5F066ED0856365553DED1AF3B557135E7F57C935",
    "984F0C70E0E68B77E2A689DAF3EFE8721DF158A136ADE735",
    "30ACCA4F483A797ABC0AB182B324FB61D108A94BB2C8E3FB",
    "B96ADAB760D7F4681D4F42A3DE394DF4AE56EDE76372BB19",
    "0B07A7C8EE0A6D709E02FCE1CDF7E2ECC03404CD28342F61",
    "9172FE9CE98583FF8E4F1232EEF28183C3FE3B1B4C6FAD73",
    "3BB5FCBC2EC22005C58EF1837D1683B2C6F34A26C1B2EFFA",
    "886B423861285C97FFFFFFFFFFFFFFFF",
);

/// The sharing field's prime modulus. Parsed once, held immutably.
pub fn field_prime() -> &'static BigUint {
    static PRIME: OnceLock<BigUint> = OnceLock::new();
    PRIME.get_or_init(|| {
        BigUint::parse_bytes(FIELD_PRIME_HEX.as_bytes(), 16).expect("ffdhe2048 modulus")
    })
}

/// Sample a uniform field element.
pub fn random_field_element<R: RngCore + CryptoRng>(rng: &mut R) -> BigUint {
    rng.gen_biguint_below(field_prime())
}

/// One share: the abscissa and the polynomial value there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Share {
    /// Evaluation point (never 0 for issued shares).
    pub x: BigUint,
    /// Polynomial value `f(x)`.
    pub y: BigUint,
}

/// Split `secret` into `n` shares with reconstruction threshold `t`.
///
/// Shares are issued at abscissas `1..=n`. Requires `1 <= t <= n` and the
/// secret already reduced into the field.
pub fn share<R: RngCore + CryptoRng>(
    secret: &BigUint,
    t: u32,
    n: u32,
    rng: &mut R,
) -> Vec<Share> {
    assert!(t >= 1 && n >= t, "threshold must satisfy 1 <= t <= n");
    let p = field_prime();

    // f(X) = secret + a_1 X + ... + a_{t-1} X^{t-1}
    let mut coeffs = Vec::with_capacity(t as usize);
    coeffs.push(secret % p);
    for _ in 1..t {
        coeffs.push(rng.gen_biguint_below(p));
    }

    (1..=n)
        .map(|i| {
            let x = BigUint::from(i);
            let mut y = BigUint::zero();
            for coeff in coeffs.iter().rev() {
                y = (y * &x + coeff) % p;
            }
            Share { x, y }
        })
        .collect()
}

/// Lagrange-interpolate the supplied shares at `X = 0`.
///
/// Callers pass exactly the shares they want combined. Returns `None` for
/// an empty list or duplicate abscissas (the interpolation denominators
/// vanish).
pub fn reconstruct(shares: &[Share]) -> Option<BigUint> {
    if shares.is_empty() {
        return None;
    }
    let p = field_prime();

    let mut acc = BigUint::zero();
    for (i, si) in shares.iter().enumerate() {
        // l_i(0) = Π_{j≠i} x_j / (x_j - x_i)
        let mut num = BigUint::from(1u32);
        let mut den = BigUint::from(1u32);
        for (j, sj) in shares.iter().enumerate() {
            if i == j {
                continue;
            }
            num = num * (&sj.x % p) % p;
            let diff = (p + (&sj.x % p) - (&si.x % p)) % p;
            den = den * diff % p;
        }
        let den_inv = mod_inverse(&den, p)?;
        acc = (acc + (&si.y % p) * num % p * den_inv) % p;
    }
    Some(acc)
}

// ============================================================================
// Tests
// ============================================================================
