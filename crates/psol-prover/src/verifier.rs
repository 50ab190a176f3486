//! Local Groth16 self-check against the circuit's verifying key.
//!
//! The chain is the verifier of record; this pairing check runs before
//! submission so an encoding or key mismatch halts the sequencer locally
//! instead of burning a transaction.

use ark_bn254::Bn254;
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, prepare_verifying_key};
use psol_core::Element;
use psol_core::curve::{g1_from_bytes, g2_from_bytes};

use crate::error::ProverError;
use crate::proof::SettlementProof;
use crate::vk::VerifyingKey;

/// A prepared pairing verifier for one verifying key.
pub struct LocalVerifier {
    pvk: PreparedVerifyingKey<Bn254>,
    n_public: usize,
}

impl LocalVerifier {
    /// Builds the verifier, decoding every key point.
    ///
    /// The same byte layouts the chain consumes are decoded here, so a key
    /// that passes construction is bit-compatible with the on-chain one.
    pub fn from_key(vk: &VerifyingKey) -> Result<Self, ProverError> {
        let mut gamma_abc_g1 = Vec::with_capacity(vk.ic.len());
        for point in &vk.ic {
            gamma_abc_g1.push(g1_from_bytes(point)?);
        }
        let ark_vk = ark_groth16::VerifyingKey::<Bn254> {
            alpha_g1: g1_from_bytes(&vk.alpha_g1)?,
            beta_g2: g2_from_bytes(&vk.beta_g2)?,
            gamma_g2: g2_from_bytes(&vk.gamma_g2)?,
            delta_g2: g2_from_bytes(&vk.delta_g2)?,
            gamma_abc_g1,
        };
        Ok(Self {
            pvk: prepare_verifying_key(&ark_vk),
            n_public: vk.n_public,
        })
    }

    /// Runs the pairing check.
    pub fn verify(
        &self,
        proof: &SettlementProof,
        public_inputs: &[Element],
    ) -> Result<bool, ProverError> {
        if public_inputs.len() != self.n_public {
            return Err(ProverError::PublicInputCount {
                expected: self.n_public,
                actual: public_inputs.len(),
            });
        }
        let proof = Proof::<Bn254> {
            a: g1_from_bytes(&proof.a())?,
            b: g2_from_bytes(&proof.b())?,
            c: g1_from_bytes(&proof.c())?,
        };
        let inputs: Vec<_> = public_inputs.iter().map(|e| e.into_fr()).collect();
        Groth16::<Bn254>::verify_proof(&self.pvk, &proof, &inputs)
            .map_err(|e| ProverError::Verification(e.to_string()))
    }
}
