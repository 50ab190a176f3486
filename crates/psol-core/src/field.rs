//! Canonical BN254 scalar-field elements and their 32-byte encoding.
//!
//! All field elements cross process boundaries as 32 bytes, big-endian,
//! zero-padded on the left. Decoding rejects any integer at or above the
//! modulus: out-of-range inputs are an error at the boundary, never a silent
//! reduction.

use std::fmt;

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use rand::RngCore;
use zeroize::Zeroize;

use crate::error::CoreError;

/// BN254 scalar field modulus, big-endian.
///
/// r = 21888242871839275222246405745257275088548364400416034343698204186575808495617
pub const FR_MODULUS_BE: [u8; 32] = [
    0x30, 0x64, 0x4e, 0x72, 0xe1, 0x31, 0xa0, 0x29, 0xb8, 0x50, 0x45, 0xb6, 0x81, 0x81, 0x58,
    0x5d, 0x28, 0x33, 0xe8, 0x48, 0x79, 0xb9, 0x70, 0x91, 0x43, 0xe1, 0xf5, 0x93, 0xf0, 0x00,
    0x00, 0x01,
];

/// Returns true when `value < modulus`, comparing big-endian bytes.
/// Equality is not canonical.
pub(crate) fn is_below(value: &[u8; 32], modulus: &[u8; 32]) -> bool {
    for (v, m) in value.iter().zip(modulus.iter()) {
        if v < m {
            return true;
        }
        if v > m {
            return false;
        }
    }
    false
}

/// A canonical element of the BN254 scalar field.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Element(Fr);

impl Element {
    /// The additive identity. Also the canonical empty Merkle leaf.
    pub const ZERO: Self = Self(ark_ff::MontFp!("0"));

    /// Decodes a big-endian 32-byte string, rejecting values `>= r`.
    pub fn from_be32(bytes: &[u8; 32]) -> Result<Self, CoreError> {
        if !is_below(bytes, &FR_MODULUS_BE) {
            return Err(CoreError::NonCanonicalScalar);
        }
        // The range check above makes this a plain (non-reducing) decode.
        Ok(Self(Fr::from_be_bytes_mod_order(bytes)))
    }

    /// Encodes as 32 bytes, big-endian, left-padded.
    pub fn to_be32(self) -> [u8; 32] {
        let repr = self.0.into_bigint().to_bytes_be();
        let mut out = [0u8; 32];
        let start = 32usize.saturating_sub(repr.len());
        out[start..].copy_from_slice(&repr);
        out
    }

    /// Lifts a machine word into the field. Always canonical.
    pub fn from_u64(value: u64) -> Self {
        Self(Fr::from(value))
    }

    /// True for the additive identity.
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }

    /// Parses a decimal string, rejecting non-canonical values.
    ///
    /// This is the representation used by snarkjs JSON artifacts and note
    /// files.
    pub fn from_decimal_str(s: &str) -> Result<Self, CoreError> {
        let value = s
            .parse::<BigUint>()
            .map_err(|_| CoreError::InvalidDecimal(s.to_owned()))?;
        let digits = value.to_bytes_be();
        if digits.len() > 32 {
            return Err(CoreError::NonCanonicalScalar);
        }
        let mut bytes = [0u8; 32];
        let start = 32usize.saturating_sub(digits.len());
        bytes[start..].copy_from_slice(&digits);
        let element = Self::from_be32(&bytes);
        bytes.zeroize();
        element
    }

    /// Renders as a decimal string (no leading zeros).
    pub fn to_decimal_string(self) -> String {
        BigUint::from_bytes_be(&self.to_be32()).to_str_radix(10)
    }

    /// Samples a uniform field element from a cryptographic RNG.
    ///
    /// Raw 32-byte draws at or above the modulus are rejected and redrawn,
    /// never reduced, so the distribution stays uniform over `[0, r)`.
    pub fn random<R: RngCore>(rng: &mut R) -> Self {
        let mut buf = [0u8; 32];
        loop {
            rng.fill_bytes(&mut buf);
            if is_below(&buf, &FR_MODULUS_BE) {
                let element = Self(Fr::from_be_bytes_mod_order(&buf));
                buf.zeroize();
                return element;
            }
        }
    }

    /// Maps a 32-byte public key to a field element by the canonical
    /// drop-last-byte rule: `0x00 ‖ pk[0..31]`.
    ///
    /// The forced zero high byte keeps the result below 2^248 < r, so the
    /// mapping is total. It must match the on-chain derivation exactly; any
    /// other mapping invalidates proofs bound to a recipient or relayer.
    pub fn from_pubkey(pk: &[u8; 32]) -> Self {
        let mut bytes = [0u8; 32];
        bytes[1..32].copy_from_slice(&pk[0..31]);
        // Canonical by construction.
        Self(Fr::from_be_bytes_mod_order(&bytes))
    }

    /// Wraps a raw arkworks scalar.
    pub fn from_fr(fr: Fr) -> Self {
        Self(fr)
    }

    /// Unwraps into the arkworks scalar for prover-side arithmetic.
    pub fn into_fr(self) -> Fr {
        self.0
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element(0x{})", hex::encode(self.to_be32()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal_string())
    }
}

impl From<u64> for Element {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}
