//! Append-only incremental Merkle tree over Poseidon.
//!
//! The sequencer's local mirror of the on-chain commitment tree: fixed depth,
//! `O(depth)` insertion through cached filled subtrees, a bounded ring of
//! recent roots, and a batch-insert simulation that produces per-commitment
//! authentication paths without mutating the tree.

mod path;
mod ring;
mod tree;

pub use path::{AuthPath, verify};
pub use ring::RootRing;
pub use tree::{
    BatchSimulation, DEFAULT_ROOT_HISTORY, MAX_DEPTH, MIN_DEPTH, MIN_ROOT_HISTORY, MerkleTree,
};

use psol_core::CoreError;

/// Errors produced by tree operations.
#[derive(Debug, thiserror::Error)]
pub enum MerkleError {
    /// The tree already holds `2^depth` leaves.
    #[error("merkle tree is full ({capacity} leaves)")]
    TreeFull {
        /// Total leaf capacity of the tree.
        capacity: u64,
    },
    /// A batch was built against a stale or foreign tree position.
    #[error("batch start index {actual} does not match local next index {expected}")]
    IndexMismatch {
        /// The tree's next free leaf index.
        expected: u64,
        /// The start index the caller supplied.
        actual: u64,
    },
    /// Batches must settle at least one commitment.
    #[error("batch contains no commitments")]
    EmptyBatch,
    /// Depth outside the supported range.
    #[error("tree depth {depth} outside supported range {MIN_DEPTH}..={MAX_DEPTH}")]
    DepthOutOfRange {
        /// The rejected depth.
        depth: u8,
    },
    /// Root history ring smaller than the reorg-absorption floor.
    #[error("root history capacity {capacity} below minimum {MIN_ROOT_HISTORY}")]
    HistoryTooSmall {
        /// The rejected capacity.
        capacity: usize,
    },
    /// A proof was requested for a leaf that has not been inserted.
    #[error("leaf index {index} is not occupied (next index {next_index})")]
    LeafOutOfRange {
        /// The requested index.
        index: u64,
        /// The tree's next free leaf index.
        next_index: u64,
    },
    /// Hashing failure from the core primitives.
    #[error(transparent)]
    Core(#[from] CoreError),
}
