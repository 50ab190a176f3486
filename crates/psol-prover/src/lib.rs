//! Witness assembly and Groth16 proof handling for batch settlement.
//!
//! The circuit itself is an external artifact (a WASM witness generator plus
//! a proving key); this crate prepares its inputs, drives the toolchain, and
//! converts everything crossing the prover/verifier boundary into the exact
//! byte layouts the on-chain program consumes.

mod error;
mod kinds;
mod proof;
mod prover;
mod verifier;
mod vk;
mod witness;

pub use error::ProverError;
pub use kinds::ProofKind;
pub use proof::{PROOF_LEN, SettlementProof, SnarkjsProofJson};
pub use prover::{BatchProver, MockProver, SnarkjsProver};
pub use verifier::LocalVerifier;
pub use vk::{VerifyingKey, VerifyingKeyJson};
pub use witness::{BatchWitness, WithdrawPublicInputs, fold_sha256_to_element};
