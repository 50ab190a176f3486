//! Error type for the chain boundary.

/// Errors crossing the chain-client boundary.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Account bytes did not match the expected layout. Fatal: the layout is
    /// fixed against a deployed build, never inferred.
    #[error("account data layout error: {0}")]
    Layout(String),
    /// A transient transport failure (timeout, node behind, congestion).
    /// The only kind recovered locally, via bounded backoff.
    #[error("transient chain error: {0}")]
    Transient(String),
    /// The program rejected the submission for a non-transient reason
    /// (verification failure, stale root, malformed instruction).
    #[error("submission rejected: {0}")]
    Rejected(String),
    /// The tree advanced past the submitted batch; a replayed submission
    /// landed after its batch was already settled.
    #[error("chain state already advanced past the submitted batch")]
    AlreadyAdvanced,
    /// A withdrawal tried to spend a nullifier the chain has already
    /// recorded. Surfaced to the wallet caller; never a sequencer concern.
    #[error("nullifier already spent")]
    NullifierAlreadySpent,
}

impl ChainError {
    /// True only for errors worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
