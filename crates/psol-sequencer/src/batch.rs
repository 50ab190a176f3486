//! Batch identity for logs and halt summaries.

use psol_core::Element;
use sha2::{Digest as _, Sha256};

/// A settled or in-flight batch, summarized for operators.
///
/// The id is `sha256(old_root ‖ new_root ‖ start_index ‖ batch_size)[0..8]`
/// (integers as 8-byte big-endian words), hex-encoded. Purely a log handle;
/// nothing on chain consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// Short content-derived identifier.
    pub batch_id: String,
    /// Root before the batch.
    pub old_root: [u8; 32],
    /// Root after the batch.
    pub new_root: [u8; 32],
    /// First leaf index.
    pub start_index: u64,
    /// Number of commitments.
    pub batch_size: usize,
}

impl BatchSummary {
    /// Derives the summary for a root transition.
    pub fn derive(
        old_root: Element,
        new_root: Element,
        start_index: u64,
        batch_size: usize,
    ) -> Self {
        let old_root = old_root.to_be32();
        let new_root = new_root.to_be32();
        let mut hasher = Sha256::new();
        hasher.update(old_root);
        hasher.update(new_root);
        hasher.update(start_index.to_be_bytes());
        hasher.update((batch_size as u64).to_be_bytes());
        let digest = hasher.finalize();
        Self {
            batch_id: hex::encode(&digest[0..8]),
            old_root,
            new_root,
            start_index,
            batch_size,
        }
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "batch {} (old_root={}, new_root={}, start_index={}, batch_size={})",
            self.batch_id,
            hex::encode(self.old_root),
            hex::encode(self.new_root),
            self.start_index,
            self.batch_size
        )
    }
}
