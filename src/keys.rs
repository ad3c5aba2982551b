//! Signing and verification key material
//!
//! Each scheme pairs an accumulator keypair with an ECDSA (P-256,
//! SHA-256) keypair. The RSA-accumulator composition serves the large-
//! and small-universe schemes, the pairing-accumulator composition the
//! accumulator-only scheme. Verification keys derive from signing keys;
//! there is no independent verification-key generation.
//!
//! ## Wire formats
//!
//! Key bodies are DER (see [`crate::der`]):
//!
//! ```text
//! rsa signing       SEQUENCE( SEQUENCE(INTEGER g, INTEGER p, INTEGER q), PKCS#8 )
//! rsa verification  SEQUENCE( SEQUENCE(INTEGER g, INTEGER n),            SPKI   )
//! pairing signing   SEQUENCE( SEQUENCE(OCTETS g1, OCTETS x),             PKCS#8 )
//! pairing verif.    SEQUENCE( SEQUENCE(OCTETS g2, OCTETS pk),            SPKI   )
//! ```
//!
//! The embedded ECDSA documents are standard PKCS#8 / SubjectPublicKeyInfo
//! as produced by the `p256` crate and travel verbatim inside the outer
//! `SEQUENCE`. Files carry a single base64 line of the DER body
//! ([`encode_key_line`] / [`decode_key_line`]); the small-universe scheme
//! appends a second line naming its universe file, which is a CLI concern.

#![forbid(unsafe_code)]

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey as EcSigningKey, VerifyingKey as EcVerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rand::{CryptoRng, RngCore};

use crate::bilinear_acc::{self, AccPublicKey, AccSecretKey};
use crate::der::{self, DerError, Reader};
use crate::group::{g1_from_bytes, g1_to_bytes, g2_from_bytes, g2_to_bytes, zr_from_bytes, zr_to_bytes, GroupError};
use crate::rsa_acc::{self, RsaPublicKey, RsaSecretKey};

/// Key encoding and decoding failures.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// Malformed outer DER structure.
    #[error("key DER: {0}")]
    Der(#[from] DerError),

    /// Malformed group element inside a pairing key.
    #[error("key group element: {0}")]
    Group(#[from] GroupError),

    /// The embedded PKCS#8 / SPKI document did not parse.
    #[error("embedded EC key: {0}")]
    Ec(String),

    /// Base64 framing was not decodable.
    #[error("key base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// A key file was structurally empty.
    #[error("key material is empty")]
    Empty,
}

// ----------------------------------------------------------------------------
// RSA-accumulator keypairs (large- and small-universe schemes)
// ----------------------------------------------------------------------------

/// Signing key for the RSA-accumulator schemes.
#[derive(Clone, Debug)]
pub struct RsaSigningKey {
    /// Accumulator trapdoor.
    pub rsa: RsaSecretKey,
    /// ECDSA signing half.
    pub ec: EcSigningKey,
}

/// Verification key for the RSA-accumulator schemes.
#[derive(Clone, Debug)]
pub struct RsaVerificationKey {
    /// Accumulator public half.
    pub rsa: RsaPublicKey,
    /// ECDSA verification half.
    pub ec: EcVerifyingKey,
}

impl RsaSigningKey {
    /// Generate with production-size accumulator factors.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::generate_with_bits(rsa_acc::DEFAULT_PRIME_BITS, rng)
    }

    /// Generate with `bits`-bit accumulator factors (tests use small ones).
    pub fn generate_with_bits<R: RngCore + CryptoRng>(bits: u64, rng: &mut R) -> Self {
        let (_, rsa) = rsa_acc::key_gen_with_bits(bits, rng);
        let ec = EcSigningKey::random(rng);
        RsaSigningKey { rsa, ec }
    }

    /// Derive the matching verification key.
    pub fn verification_key(&self) -> RsaVerificationKey {
        RsaVerificationKey {
            rsa: self.rsa.public(),
            ec: *self.ec.verifying_key(),
        }
    }

    /// Encode to the DER body.
    pub fn to_der(&self) -> Result<Vec<u8>, KeyError> {
        let mut acc = Vec::new();
        acc.extend_from_slice(&der::encode_uint(&self.rsa.g));
        acc.extend_from_slice(&der::encode_uint(&self.rsa.p));
        acc.extend_from_slice(&der::encode_uint(&self.rsa.q));

        let pkcs8 = self
            .ec
            .to_pkcs8_der()
            .map_err(|e| KeyError::Ec(e.to_string()))?;

        let mut body = der::encode_sequence(&acc);
        body.extend_from_slice(pkcs8.as_bytes());
        Ok(der::encode_sequence(&body))
    }

    /// Decode from the DER body.
    pub fn from_der(bytes: &[u8]) -> Result<Self, KeyError> {
        let mut outer = Reader::new(bytes);
        let mut seq = outer.read_sequence()?;
        outer.finish()?;

        let mut acc = seq.read_sequence()?;
        let g = acc.read_uint()?;
        let p = acc.read_uint()?;
        let q = acc.read_uint()?;
        acc.finish()?;

        let pkcs8 = seq.read_raw()?;
        seq.finish()?;

        let ec = EcSigningKey::from_pkcs8_der(pkcs8).map_err(|e| KeyError::Ec(e.to_string()))?;
        Ok(RsaSigningKey {
            rsa: RsaSecretKey { g, p, q },
            ec,
        })
    }
}

impl RsaVerificationKey {
    /// Encode to the DER body.
    pub fn to_der(&self) -> Result<Vec<u8>, KeyError> {
        let mut acc = Vec::new();
        acc.extend_from_slice(&der::encode_uint(&self.rsa.g));
        acc.extend_from_slice(&der::encode_uint(&self.rsa.n));

        let spki = self
            .ec
            .to_public_key_der()
            .map_err(|e| KeyError::Ec(e.to_string()))?;

        let mut body = der::encode_sequence(&acc);
        body.extend_from_slice(spki.as_bytes());
        Ok(der::encode_sequence(&body))
    }

    /// Decode from the DER body.
    pub fn from_der(bytes: &[u8]) -> Result<Self, KeyError> {
        let mut outer = Reader::new(bytes);
        let mut seq = outer.read_sequence()?;
        outer.finish()?;

        let mut acc = seq.read_sequence()?;
        let g = acc.read_uint()?;
        let n = acc.read_uint()?;
        acc.finish()?;

        let spki = seq.read_raw()?;
        seq.finish()?;

        let ec =
            EcVerifyingKey::from_public_key_der(spki).map_err(|e| KeyError::Ec(e.to_string()))?;
        Ok(RsaVerificationKey {
            rsa: RsaPublicKey { g, n },
            ec,
        })
    }
}

// ----------------------------------------------------------------------------
// Pairing-accumulator keypairs (accumulator-only scheme)
// ----------------------------------------------------------------------------

/// Signing key for the accumulator-only scheme.
#[derive(Clone, Debug)]
pub struct PairingSigningKey {
    /// Accumulator trapdoor half.
    pub acc: AccSecretKey,
    /// ECDSA signing half.
    pub ec: EcSigningKey,
}

/// Verification key for the accumulator-only scheme.
#[derive(Clone, Debug)]
pub struct PairingVerificationKey {
    /// Accumulator public half.
    pub acc: AccPublicKey,
    /// ECDSA verification half.
    pub ec: EcVerifyingKey,
}

impl PairingSigningKey {
    /// Generate a fresh keypair.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let (_, acc) = bilinear_acc::key_gen(rng);
        let ec = EcSigningKey::random(rng);
        PairingSigningKey { acc, ec }
    }

    /// Derive the matching verification key.
    pub fn verification_key(&self) -> PairingVerificationKey {
        use ark_ec::{AffineRepr, CurveGroup};
        let g2 = crate::group::G2::generator();
        let pk = (g2.into_group() * self.acc.x).into_affine();
        PairingVerificationKey {
            acc: AccPublicKey { g2, pk },
            ec: *self.ec.verifying_key(),
        }
    }

    /// Encode to the DER body.
    pub fn to_der(&self) -> Result<Vec<u8>, KeyError> {
        let mut acc = Vec::new();
        acc.extend_from_slice(&der::encode_octet_string(&g1_to_bytes(&self.acc.g)));
        acc.extend_from_slice(&der::encode_octet_string(&zr_to_bytes(&self.acc.x)));

        let pkcs8 = self
            .ec
            .to_pkcs8_der()
            .map_err(|e| KeyError::Ec(e.to_string()))?;

        let mut body = der::encode_sequence(&acc);
        body.extend_from_slice(pkcs8.as_bytes());
        Ok(der::encode_sequence(&body))
    }

    /// Decode from the DER body.
    pub fn from_der(bytes: &[u8]) -> Result<Self, KeyError> {
        let mut outer = Reader::new(bytes);
        let mut seq = outer.read_sequence()?;
        outer.finish()?;

        let mut acc = seq.read_sequence()?;
        let g = g1_from_bytes(acc.read_octet_string()?)?;
        let x = zr_from_bytes(acc.read_octet_string()?)?;
        acc.finish()?;

        let pkcs8 = seq.read_raw()?;
        seq.finish()?;

        let ec = EcSigningKey::from_pkcs8_der(pkcs8).map_err(|e| KeyError::Ec(e.to_string()))?;
        Ok(PairingSigningKey {
            acc: AccSecretKey { g, x },
            ec,
        })
    }
}

impl PairingVerificationKey {
    /// Encode to the DER body.
    pub fn to_der(&self) -> Result<Vec<u8>, KeyError> {
        let mut acc = Vec::new();
        acc.extend_from_slice(&der::encode_octet_string(&g2_to_bytes(&self.acc.g2)));
        acc.extend_from_slice(&der::encode_octet_string(&g2_to_bytes(&self.acc.pk)));

        let spki = self
            .ec
            .to_public_key_der()
            .map_err(|e| KeyError::Ec(e.to_string()))?;

        let mut body = der::encode_sequence(&acc);
        body.extend_from_slice(spki.as_bytes());
        Ok(der::encode_sequence(&body))
    }

    /// Decode from the DER body.
    pub fn from_der(bytes: &[u8]) -> Result<Self, KeyError> {
        let mut outer = Reader::new(bytes);
        let mut seq = outer.read_sequence()?;
        outer.finish()?;

        let mut acc = seq.read_sequence()?;
        let g2 = g2_from_bytes(acc.read_octet_string()?)?;
        let pk = g2_from_bytes(acc.read_octet_string()?)?;
        acc.finish()?;

        let spki = seq.read_raw()?;
        seq.finish()?;

        let ec =
            EcVerifyingKey::from_public_key_der(spki).map_err(|e| KeyError::Ec(e.to_string()))?;
        Ok(PairingVerificationKey {
            acc: AccPublicKey { g2, pk },
            ec,
        })
    }
}

// ----------------------------------------------------------------------------
// The EC signature primitive (used as an interface only)
// ----------------------------------------------------------------------------

/// ECDSA-sign `message` (SHA-256 digest), returning the ASN.1 DER form.
pub fn ec_sign(key: &EcSigningKey, message: &[u8]) -> Vec<u8> {
    let sig: Signature = key.sign(message);
    sig.to_der().as_bytes().to_vec()
}

/// Verify an ASN.1 DER ECDSA signature. Undecodable signatures are simply
/// invalid.
pub fn ec_verify(key: &EcVerifyingKey, message: &[u8], sig_der: &[u8]) -> bool {
    match Signature::from_der(sig_der) {
        Ok(sig) => key.verify(message, &sig).is_ok(),
        Err(_) => false,
    }
}

// ----------------------------------------------------------------------------
// Base64 line framing
// ----------------------------------------------------------------------------

/// One base64 line over a DER body (no wrapping).
pub fn encode_key_line(der: &[u8]) -> String {
    BASE64.encode(der)
}

/// Decode a base64 line back to the DER body.
pub fn decode_key_line(line: &str) -> Result<Vec<u8>, KeyError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(KeyError::Empty);
    }
    Ok(BASE64.decode(trimmed)?)
}

// ============================================================================
// Tests
// ============================================================================
