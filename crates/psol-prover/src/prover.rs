//! Proof generation backends.

use std::path::PathBuf;
use std::process::Command;

use psol_core::Element;
use sha2::{Digest as _, Sha256};

use crate::error::ProverError;
use crate::proof::{PROOF_LEN, SettlementProof, SnarkjsProofJson};
use crate::witness::BatchWitness;

/// Generates one settlement proof per assembled witness.
///
/// One batch is in flight at a time; implementations are synchronous,
/// CPU-bound, and free of local side effects.
pub trait BatchProver {
    /// Proves the batch transition described by `witness`.
    fn prove(&self, witness: &BatchWitness) -> Result<SettlementProof, ProverError>;
}

/// Drives the external circuit toolchain: the WASM witness generator plus
/// the proving key, via the snarkjs CLI.
///
/// The circuit is an opaque artifact. Its public signals are cross-checked
/// against the locally computed inputs after every run; any disagreement is
/// an encoding bug and is fatal.
#[derive(Debug, Clone)]
pub struct SnarkjsProver {
    command: PathBuf,
    wasm_path: PathBuf,
    zkey_path: PathBuf,
}

impl SnarkjsProver {
    /// Creates a prover for the given witness-generator and proving-key
    /// artifacts.
    pub fn new(wasm_path: PathBuf, zkey_path: PathBuf) -> Self {
        Self {
            command: PathBuf::from("snarkjs"),
            wasm_path,
            zkey_path,
        }
    }

    /// Overrides the toolchain executable (defaults to `snarkjs` on PATH).
    pub fn with_command(mut self, command: PathBuf) -> Self {
        self.command = command;
        self
    }
}

impl BatchProver for SnarkjsProver {
    fn prove(&self, witness: &BatchWitness) -> Result<SettlementProof, ProverError> {
        let workdir = tempfile::tempdir()?;
        let input_path = workdir.path().join("input.json");
        let proof_path = workdir.path().join("proof.json");
        let public_path = workdir.path().join("public.json");

        let input = witness.to_input_json()?;
        std::fs::write(&input_path, serde_json::to_vec(&input)?)?;

        tracing::debug!(
            start_index = witness.start_index(),
            batch_size = witness.batch_size(),
            "running witness generator and prover"
        );
        let output = Command::new(&self.command)
            .arg("groth16")
            .arg("fullprove")
            .arg(&input_path)
            .arg(&self.wasm_path)
            .arg(&self.zkey_path)
            .arg(&proof_path)
            .arg(&public_path)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            // The toolchain conflates bad witnesses and operational failures;
            // circuit assertion messages surface as the encoding-bug class.
            if stderr.contains("Assert Failed") || stderr.contains("Error in template") {
                return Err(ProverError::WitnessGeneration(stderr));
            }
            return Err(ProverError::ToolchainFailed {
                status: output.status.to_string(),
                stderr,
            });
        }

        let proof_json: SnarkjsProofJson =
            serde_json::from_str(&std::fs::read_to_string(&proof_path)?)?;
        let proof = SettlementProof::from_snarkjs(&proof_json)?;

        let publics: Vec<String> = serde_json::from_str(&std::fs::read_to_string(&public_path)?)?;
        check_public_signals(&publics, &witness.public_inputs()?)?;

        Ok(proof)
    }
}

/// Compares the circuit's emitted public signals with the locally computed
/// inputs. A mismatch means the two sides disagree about encoding.
fn check_public_signals(
    emitted: &[String],
    expected: &[Element; 5],
) -> Result<(), ProverError> {
    if emitted.len() != expected.len() {
        return Err(ProverError::WitnessGeneration(format!(
            "circuit emitted {} public signals, expected {}",
            emitted.len(),
            expected.len()
        )));
    }
    for (i, (signal, input)) in emitted.iter().zip(expected.iter()).enumerate() {
        let signal_element = Element::from_decimal_str(signal)?;
        if signal_element != *input {
            return Err(ProverError::WitnessGeneration(format!(
                "public signal {i} mismatch: circuit {signal_element}, local {input}"
            )));
        }
    }
    Ok(())
}

/// A deterministic stand-in prover for tests and dry runs.
///
/// Emits canonical-looking bytes derived from the public inputs. The output
/// is not a valid pairing; it exercises every byte path except the pairing
/// check itself.
#[derive(Debug, Clone, Default)]
pub struct MockProver {
    fail: bool,
}

impl MockProver {
    /// A mock prover that always succeeds.
    pub fn new() -> Self {
        Self { fail: false }
    }

    /// A mock prover that fails every proof, for halt-path tests.
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl BatchProver for MockProver {
    fn prove(&self, witness: &BatchWitness) -> Result<SettlementProof, ProverError> {
        if self.fail {
            return Err(ProverError::WitnessGeneration(
                "mock prover configured to fail".into(),
            ));
        }
        let inputs = witness.public_inputs()?;
        let mut bytes = [0u8; PROOF_LEN];
        for (i, chunk) in bytes.chunks_exact_mut(32).enumerate() {
            let mut hasher = Sha256::new();
            hasher.update(b"psol:mock-proof:v1");
            hasher.update([i as u8]);
            for input in &inputs {
                hasher.update(input.to_be32());
            }
            let digest: [u8; 32] = hasher.finalize().into();
            chunk.copy_from_slice(&digest);
            // Keep every coordinate canonical.
            chunk[0] &= 0x1F;
        }
        SettlementProof::from_bytes(bytes)
    }
}
