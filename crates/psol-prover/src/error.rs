//! Error type for proof assembly and verification.

use psol_core::CoreError;

/// Errors produced while assembling witnesses, driving the circuit
/// toolchain, or decoding proof material.
#[derive(Debug, thiserror::Error)]
pub enum ProverError {
    /// A batch larger than the circuit's fan-in was requested.
    #[error("batch of {actual} commitments exceeds circuit fan-in {max}")]
    BatchTooLarge {
        /// The circuit's hard-coded maximum batch size.
        max: usize,
        /// The requested batch size.
        actual: usize,
    },
    /// The circuit rejected the witness, or its public signals disagree with
    /// the locally computed ones. Always an encoding bug; never retried.
    #[error("witness generation failed: {0}")]
    WitnessGeneration(String),
    /// A circuit artifact could not be read, or the toolchain could not be
    /// executed.
    #[error("artifact I/O failure: {0}")]
    ToolchainIo(#[from] std::io::Error),
    /// The external proving toolchain exited with a failure.
    #[error("proving toolchain exited with {status}: {stderr}")]
    ToolchainFailed {
        /// Process exit status.
        status: String,
        /// Captured stderr, trimmed.
        stderr: String,
    },
    /// Proof bytes or JSON did not decode.
    #[error("proof decoding failed: {0}")]
    ProofDecoding(String),
    /// The verifying key JSON is structurally invalid.
    #[error("verifying key format error: {0}")]
    VkFormat(String),
    /// `IC` length does not match the declared public-input count.
    #[error("verifying key IC length {actual} does not match nPublic + 1 = {expected}")]
    IcLengthMismatch {
        /// Expected `nPublic + 1`.
        expected: usize,
        /// Actual `IC` length.
        actual: usize,
    },
    /// A verifying-key point is the identity.
    #[error("verifying key contains an identity point: {0}")]
    IdentityPoint(&'static str),
    /// Wrong number of public inputs for the proof kind or key.
    #[error("expected {expected} public inputs, got {actual}")]
    PublicInputCount {
        /// Expected count.
        expected: usize,
        /// Supplied count.
        actual: usize,
    },
    /// The pairing check itself failed to run.
    #[error("proof verification failed to run: {0}")]
    Verification(String),
    /// Field or curve decoding failure.
    #[error(transparent)]
    Core(#[from] CoreError),
    /// JSON (de)serialization failure.
    #[error("artifact JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
