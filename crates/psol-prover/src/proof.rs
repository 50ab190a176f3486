//! The 256-byte settlement proof blob.

use psol_core::curve::{FQ_MODULUS_BE, g1_from_decimal, g2_from_decimal};
use serde::Deserialize;

use crate::error::ProverError;

/// Length of a serialized Groth16 proof: `A(64) ‖ B(128) ‖ C(64)`.
pub const PROOF_LEN: usize = 256;

/// A Groth16 proof in on-chain byte layout.
///
/// `A` and `C` are G1 (`x ‖ y`), `B` is G2 with the imaginary coefficient of
/// each coordinate first. All eight 32-byte scalars are big-endian and
/// strictly below the base-field modulus.
#[derive(Clone, PartialEq, Eq)]
pub struct SettlementProof([u8; PROOF_LEN]);

impl SettlementProof {
    /// Wraps raw proof bytes, checking every coordinate for canonicity.
    pub fn from_bytes(bytes: [u8; PROOF_LEN]) -> Result<Self, ProverError> {
        for (i, chunk) in bytes.chunks_exact(32).enumerate() {
            let mut scalar = [0u8; 32];
            scalar.copy_from_slice(chunk);
            if !below_fq(&scalar) {
                return Err(ProverError::ProofDecoding(format!(
                    "coordinate {i} is not below the base-field modulus"
                )));
            }
        }
        Ok(Self(bytes))
    }

    /// Converts a parsed snarkjs `proof.json`.
    ///
    /// snarkjs emits projective G1 points (the trailing `"1"` is dropped)
    /// and real-first G2 coefficients (swapped here).
    pub fn from_snarkjs(proof: &SnarkjsProofJson) -> Result<Self, ProverError> {
        let [a_x, a_y] = two(&proof.pi_a, "pi_a")?;
        let [c_x, c_y] = two(&proof.pi_c, "pi_c")?;
        if proof.pi_b.len() < 2 {
            return Err(ProverError::ProofDecoding("pi_b has fewer than 2 coordinates".into()));
        }
        let [b_x_re, b_x_im] = two(&proof.pi_b[0], "pi_b[0]")?;
        let [b_y_re, b_y_im] = two(&proof.pi_b[1], "pi_b[1]")?;

        let mut bytes = [0u8; PROOF_LEN];
        bytes[0..64].copy_from_slice(&g1_from_decimal(a_x, a_y)?);
        bytes[64..192].copy_from_slice(&g2_from_decimal(b_x_re, b_x_im, b_y_re, b_y_im)?);
        bytes[192..256].copy_from_slice(&g1_from_decimal(c_x, c_y)?);
        Ok(Self(bytes))
    }

    /// The raw 256-byte blob.
    pub fn as_bytes(&self) -> &[u8; PROOF_LEN] {
        &self.0
    }

    /// The `A` block (G1, 64 bytes).
    pub fn a(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out.copy_from_slice(&self.0[0..64]);
        out
    }

    /// The `B` block (G2, 128 bytes, imaginary-first).
    pub fn b(&self) -> [u8; 128] {
        let mut out = [0u8; 128];
        out.copy_from_slice(&self.0[64..192]);
        out
    }

    /// The `C` block (G1, 64 bytes).
    pub fn c(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out.copy_from_slice(&self.0[192..256]);
        out
    }
}

impl std::fmt::Debug for SettlementProof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementProof(0x{}…)", hex::encode(&self.0[0..8]))
    }
}

fn below_fq(scalar: &[u8; 32]) -> bool {
    for (v, m) in scalar.iter().zip(FQ_MODULUS_BE.iter()) {
        if v < m {
            return true;
        }
        if v > m {
            return false;
        }
    }
    false
}

fn two<'a>(coords: &'a [String], name: &str) -> Result<[&'a str; 2], ProverError> {
    match coords {
        [x, y, ..] => Ok([x.as_str(), y.as_str()]),
        _ => Err(ProverError::ProofDecoding(format!(
            "{name} has fewer than 2 coordinates"
        ))),
    }
}

/// The snarkjs `proof.json` shape.
#[derive(Debug, Clone, Deserialize)]
pub struct SnarkjsProofJson {
    /// G1 point `A` as projective decimal strings.
    pub pi_a: Vec<String>,
    /// G2 point `B` as projective decimal coordinate pairs, `c0` first.
    pub pi_b: Vec<Vec<String>>,
    /// G1 point `C` as projective decimal strings.
    pub pi_c: Vec<String>,
}
