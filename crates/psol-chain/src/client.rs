//! The opaque chain-client boundary.

use crate::accounts::PendingCommitment;
use crate::error::ChainError;
use crate::events::CommitmentInserted;

/// The slice of on-chain tree state the sequencer acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainTreeState {
    /// Tree depth, as configured at pool initialization.
    pub depth: u8,
    /// Next leaf index the chain will assign.
    pub next_leaf_index: u64,
    /// The chain's current root.
    pub current_root: [u8; 32],
}

/// Everything the sequencer asks of the chain.
///
/// Implementations wrap whatever transport reaches the deployed program;
/// each method is a suspension point. The trait is deliberately narrow: the
/// sequencer reads tree state and the pending buffer, submits one settlement
/// instruction at a time, and scans settlement events during rebuild.
pub trait ChainClient {
    /// Reads `depth`, `next_leaf_index` and `current_root` from the tree
    /// account.
    fn tree_state(&self) -> Result<ChainTreeState, ChainError>;

    /// Reads the pending-commitment buffer, in chain-assigned order.
    fn pending_commitments(&self) -> Result<Vec<PendingCommitment>, ChainError>;

    /// Submits a settlement instruction; returns the transaction signature
    /// once the chain confirms it.
    fn submit_settlement(&mut self, instruction_data: &[u8]) -> Result<String, ChainError>;

    /// Scans historical settlement events, ordered as emitted.
    fn commitment_events(&self) -> Result<Vec<CommitmentInserted>, ChainError>;
}
