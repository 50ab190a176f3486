//! BN254 curve-point byte layouts.
//!
//! The on-chain verifier consumes points in the Solana alt_bn128 syscall
//! encoding: big-endian coordinates, G1 as `x ‖ y` (64 bytes), G2 as
//! `x_im ‖ x_re ‖ y_im ‖ y_re` (128 bytes). snarkjs JSON artifacts carry the
//! opposite G2 coefficient order (`c0` before `c1`); the swap happens in this
//! module and nowhere else.

use ark_bn254::{Fq, Fq2, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;

use crate::error::CoreError;
use crate::field::is_below;

/// BN254 base field modulus, big-endian.
///
/// p = 21888242871839275222246405745257275088696311157297823662689037894645226208583
pub const FQ_MODULUS_BE: [u8; 32] = [
    0x30, 0x64, 0x4e, 0x72, 0xe1, 0x31, 0xa0, 0x29, 0xb8, 0x50, 0x45, 0xb6, 0x81, 0x81, 0x58,
    0x5d, 0x97, 0x81, 0x6a, 0x91, 0x68, 0x71, 0xca, 0x8d, 0x3c, 0x20, 0x8c, 0x16, 0xd8, 0x7c,
    0xfd, 0x47,
];

/// Parses one base-field coordinate from a decimal string, rejecting values
/// `>= p`.
pub fn fq_from_decimal(s: &str) -> Result<[u8; 32], CoreError> {
    let value = s
        .parse::<BigUint>()
        .map_err(|_| CoreError::InvalidDecimal(s.to_owned()))?;
    let digits = value.to_bytes_be();
    if digits.len() > 32 {
        return Err(CoreError::NonCanonicalCoordinate);
    }
    let mut bytes = [0u8; 32];
    let start = 32usize.saturating_sub(digits.len());
    bytes[start..].copy_from_slice(&digits);
    if !is_below(&bytes, &FQ_MODULUS_BE) {
        return Err(CoreError::NonCanonicalCoordinate);
    }
    Ok(bytes)
}

/// Builds the 64-byte G1 encoding from snarkjs decimal coordinates.
pub fn g1_from_decimal(x: &str, y: &str) -> Result<[u8; 64], CoreError> {
    let mut out = [0u8; 64];
    out[0..32].copy_from_slice(&fq_from_decimal(x)?);
    out[32..64].copy_from_slice(&fq_from_decimal(y)?);
    Ok(out)
}

/// Builds the 128-byte G2 encoding from snarkjs decimal coordinates.
///
/// snarkjs orders each coordinate `[c0, c1]` (real first); the wire layout
/// wants the imaginary part first. Reversing this swap produces a
/// valid-looking encoding that every verifier rejects.
pub fn g2_from_decimal(
    x_re: &str,
    x_im: &str,
    y_re: &str,
    y_im: &str,
) -> Result<[u8; 128], CoreError> {
    let mut out = [0u8; 128];
    out[0..32].copy_from_slice(&fq_from_decimal(x_im)?);
    out[32..64].copy_from_slice(&fq_from_decimal(x_re)?);
    out[64..96].copy_from_slice(&fq_from_decimal(y_im)?);
    out[96..128].copy_from_slice(&fq_from_decimal(y_re)?);
    Ok(out)
}

fn fq_to_be32(v: &Fq) -> [u8; 32] {
    let repr = v.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    let start = 32usize.saturating_sub(repr.len());
    out[start..].copy_from_slice(&repr);
    out
}

fn fq_from_be32(bytes: &[u8; 32]) -> Result<Fq, CoreError> {
    if !is_below(bytes, &FQ_MODULUS_BE) {
        return Err(CoreError::NonCanonicalCoordinate);
    }
    Ok(Fq::from_be_bytes_mod_order(bytes))
}

/// Encodes a G1 point as `x ‖ y`. The identity encodes as all zeros.
pub fn g1_to_bytes(point: &G1Affine) -> [u8; 64] {
    let mut out = [0u8; 64];
    if let Some((x, y)) = point.xy() {
        out[0..32].copy_from_slice(&fq_to_be32(x));
        out[32..64].copy_from_slice(&fq_to_be32(y));
    }
    out
}

/// Decodes a G1 point, validating canonicity, curve membership and the
/// subgroup. All zeros decodes to the identity.
pub fn g1_from_bytes(bytes: &[u8; 64]) -> Result<G1Affine, CoreError> {
    if bytes.iter().all(|&b| b == 0) {
        return Ok(G1Affine::identity());
    }
    let mut x = [0u8; 32];
    let mut y = [0u8; 32];
    x.copy_from_slice(&bytes[0..32]);
    y.copy_from_slice(&bytes[32..64]);
    let point = G1Affine::new_unchecked(fq_from_be32(&x)?, fq_from_be32(&y)?);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(CoreError::PointNotOnCurve);
    }
    Ok(point)
}

/// Encodes a G2 point as `x_im ‖ x_re ‖ y_im ‖ y_re`. The identity encodes
/// as all zeros.
pub fn g2_to_bytes(point: &G2Affine) -> [u8; 128] {
    let mut out = [0u8; 128];
    if let Some((x, y)) = point.xy() {
        out[0..32].copy_from_slice(&fq_to_be32(&x.c1));
        out[32..64].copy_from_slice(&fq_to_be32(&x.c0));
        out[64..96].copy_from_slice(&fq_to_be32(&y.c1));
        out[96..128].copy_from_slice(&fq_to_be32(&y.c0));
    }
    out
}

/// Decodes a G2 point from the imaginary-first layout, validating
/// canonicity, curve membership and the subgroup.
pub fn g2_from_bytes(bytes: &[u8; 128]) -> Result<G2Affine, CoreError> {
    if bytes.iter().all(|&b| b == 0) {
        return Ok(G2Affine::identity());
    }
    let mut x_im = [0u8; 32];
    let mut x_re = [0u8; 32];
    let mut y_im = [0u8; 32];
    let mut y_re = [0u8; 32];
    x_im.copy_from_slice(&bytes[0..32]);
    x_re.copy_from_slice(&bytes[32..64]);
    y_im.copy_from_slice(&bytes[64..96]);
    y_re.copy_from_slice(&bytes[96..128]);
    let x = Fq2::new(fq_from_be32(&x_re)?, fq_from_be32(&x_im)?);
    let y = Fq2::new(fq_from_be32(&y_re)?, fq_from_be32(&y_im)?);
    let point = G2Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(CoreError::PointNotOnCurve);
    }
    Ok(point)
}
