//! Sequencer error taxonomy.
//!
//! Only transient submission errors are recovered locally (inside the retry
//! loop); everything surfacing here halts the sequencer for operator
//! inspection.

use psol_chain::ChainError;
use psol_core::CoreError;
use psol_merkle::MerkleError;
use psol_prover::ProverError;

/// Fatal conditions that stop the polling loop.
#[derive(Debug, thiserror::Error)]
pub enum SequencerError {
    /// The chain's current root disagrees with the local mirror and the
    /// chain has not simply advanced past us. Another writer, or an
    /// operator reset. `--force` bypasses this for known-safe dev flows.
    #[error("root mismatch: chain {chain}, local {local}")]
    RootMismatch {
        /// Chain root, hex.
        chain: String,
        /// Local root, hex.
        local: String,
    },
    /// Leaf counters disagree while roots agree; local state is corrupt.
    #[error("index mismatch: chain next index {chain}, local {local}")]
    IndexMismatch {
        /// Chain's next leaf index.
        chain: u64,
        /// Local next leaf index.
        local: u64,
    },
    /// The configured depth does not match the on-chain tree.
    #[error("depth mismatch: chain tree depth {chain}, configured {configured}")]
    DepthMismatch {
        /// Depth stored in the tree account.
        chain: u8,
        /// Depth from configuration.
        configured: u8,
    },
    /// Rebuild could not recover a settled leaf. Never papered over with a
    /// placeholder.
    #[error("rebuild is missing leaf {index} (chain has settled {settled})")]
    MissingLeaf {
        /// The unrecoverable index.
        index: u64,
        /// Total leaves the chain reports settled.
        settled: u64,
    },
    /// Rebuild recovered every leaf but the replayed root still disagrees
    /// with the chain.
    #[error("rebuilt root {local} does not match chain root {chain}")]
    RebuildRootMismatch {
        /// Chain root, hex.
        chain: String,
        /// Replayed root, hex.
        local: String,
    },
    /// The pre-submission pairing self-check rejected our own proof.
    #[error("local proof self-check failed for {batch}")]
    SelfCheckFailed {
        /// Summary of the refused batch.
        batch: String,
    },
    /// Submission gave up (transient retries exhausted, or a fatal
    /// rejection).
    #[error("submission failed: {0}")]
    Submit(#[source] ChainError),
    /// Chain read failure (after retries).
    #[error("chain read failed: {0}")]
    ChainRead(#[source] ChainError),
    /// Local tree failure.
    #[error(transparent)]
    Merkle(#[from] MerkleError),
    /// Witness or proof failure.
    #[error(transparent)]
    Prover(#[from] ProverError),
    /// Field decoding failure on data read from chain.
    #[error(transparent)]
    Core(#[from] CoreError),
    /// Persisted-state file failure.
    #[error("state file error: {0}")]
    State(String),
    /// Configuration rejected during validation.
    #[error("invalid configuration: {0}")]
    Config(String),
}
