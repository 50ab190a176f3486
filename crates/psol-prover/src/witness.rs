//! Witness assembly and public-input construction for the batch circuit.

use psol_core::Element;
use psol_merkle::BatchSimulation;
use serde_json::{Value, json};
use sha2::{Digest as _, Sha256};

use crate::error::ProverError;

/// Fully assembled inputs for one settlement proof.
///
/// The commitment and path arrays are padded to the circuit's hard-coded
/// fan-in: zero field elements for unused commitment slots and all-zero
/// sibling paths for unused path slots. The circuit ignores padded slots but
/// still hashes the padded commitment buffer, so the padding here must match
/// it byte for byte.
#[derive(Debug, Clone)]
pub struct BatchWitness {
    max_batch_size: usize,
    depth: usize,
    old_root: Element,
    new_root: Element,
    start_index: u64,
    batch_size: usize,
    commitments: Vec<Element>,
    path_elements: Vec<Vec<Element>>,
}

impl BatchWitness {
    /// Builds the witness from a batch simulation.
    ///
    /// `commitments` is the unpadded batch; `simulation` must have been
    /// produced for exactly these commitments.
    pub fn build(
        old_root: Element,
        commitments: &[Element],
        simulation: &BatchSimulation,
        max_batch_size: usize,
        depth: u8,
    ) -> Result<Self, ProverError> {
        if commitments.len() > max_batch_size {
            return Err(ProverError::BatchTooLarge {
                max: max_batch_size,
                actual: commitments.len(),
            });
        }
        if commitments.len() != simulation.paths.len() {
            return Err(ProverError::WitnessGeneration(format!(
                "simulation covers {} commitments, batch has {}",
                simulation.paths.len(),
                commitments.len()
            )));
        }

        let depth = usize::from(depth);
        let mut padded_commitments = commitments.to_vec();
        padded_commitments.resize(max_batch_size, Element::ZERO);

        let mut path_elements: Vec<Vec<Element>> = simulation
            .paths
            .iter()
            .map(|path| path.siblings.clone())
            .collect();
        path_elements.resize(max_batch_size, vec![Element::ZERO; depth]);

        Ok(Self {
            max_batch_size,
            depth,
            old_root,
            new_root: simulation.new_root,
            start_index: simulation.start_index,
            batch_size: commitments.len(),
            commitments: padded_commitments,
            path_elements,
        })
    }

    /// First leaf index of the batch.
    pub fn start_index(&self) -> u64 {
        self.start_index
    }

    /// Number of real (unpadded) commitments.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Root before the batch.
    pub fn old_root(&self) -> Element {
        self.old_root
    }

    /// Root after the batch.
    pub fn new_root(&self) -> Element {
        self.new_root
    }

    /// The commitments-hash binding: SHA-256 over all `max_batch_size`
    /// 32-byte slots (zero-padded past `batch_size`), folded into the field.
    ///
    /// This value defines what the circuit commits to; it must be computed
    /// from the same padded big-endian encoding the circuit hashes.
    pub fn commitments_hash(&self) -> Result<Element, ProverError> {
        let mut hasher = Sha256::new();
        for commitment in &self.commitments {
            hasher.update(commitment.to_be32());
        }
        let digest: [u8; 32] = hasher.finalize().into();
        Ok(fold_sha256_to_element(&digest)?)
    }

    /// Public inputs in verifier order:
    /// `old_root, new_root, start_index, batch_size, commitments_hash`.
    pub fn public_inputs(&self) -> Result<[Element; 5], ProverError> {
        Ok([
            self.old_root,
            self.new_root,
            Element::from_u64(self.start_index),
            Element::from_u64(self.batch_size as u64),
            self.commitments_hash()?,
        ])
    }

    /// Renders the witness-generator input file (decimal strings, signal
    /// names as the circuit declares them).
    pub fn to_input_json(&self) -> Result<Value, ProverError> {
        let commitments: Vec<String> = self
            .commitments
            .iter()
            .map(|c| c.to_decimal_string())
            .collect();
        let path_elements: Vec<Vec<String>> = self
            .path_elements
            .iter()
            .map(|path| path.iter().map(|e| e.to_decimal_string()).collect())
            .collect();
        Ok(json!({
            "oldRoot": self.old_root.to_decimal_string(),
            "newRoot": self.new_root.to_decimal_string(),
            "startIndex": self.start_index.to_string(),
            "batchSize": self.batch_size.to_string(),
            "commitmentsHash": self.commitments_hash()?.to_decimal_string(),
            "commitments": commitments,
            "pathElements": path_elements,
        }))
    }

    /// The circuit fan-in this witness was padded to.
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// The Merkle depth of the padded paths.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Folds a SHA-256 digest into the scalar field by clearing the top three
/// bits of the leading byte (i.e. reducing modulo 2^253, which is below r).
///
/// Must match the circuit's digest-to-field template exactly.
pub fn fold_sha256_to_element(digest: &[u8; 32]) -> Result<Element, psol_core::CoreError> {
    let mut bytes = *digest;
    bytes[0] &= 0x1F;
    Element::from_be32(&bytes)
}

/// Public inputs of a withdrawal proof, in verifier order.
///
/// The sequencer never builds these; they live here so wallet-side tooling
/// shares the same pubkey-to-scalar mapping the verifier applies.
#[derive(Debug, Clone)]
pub struct WithdrawPublicInputs {
    /// A known root of the commitment tree.
    pub merkle_root: Element,
    /// The spend tag being recorded.
    pub nullifier_hash: Element,
    /// Asset being withdrawn.
    pub asset_id: Element,
    /// Recipient public key.
    pub recipient: [u8; 32],
    /// Amount before fees.
    pub amount: u64,
    /// Relayer public key.
    pub relayer: [u8; 32],
    /// Fee paid to the relayer.
    pub relayer_fee: u64,
    /// Hash of optional encrypted metadata; zero when absent.
    pub public_data_hash: Element,
}

impl WithdrawPublicInputs {
    /// Serializes in verifier order with the canonical pubkey mapping.
    pub fn to_elements(&self) -> [Element; 8] {
        [
            self.merkle_root,
            self.nullifier_hash,
            self.asset_id,
            Element::from_pubkey(&self.recipient),
            Element::from_u64(self.amount),
            Element::from_pubkey(&self.relayer),
            Element::from_u64(self.relayer_fee),
            self.public_data_hash,
        ]
    }
}
