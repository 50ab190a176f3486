//! The incremental tree and its batch-insert simulation.

use psol_core::{Element, h2};

use crate::MerkleError;
use crate::path::AuthPath;
use crate::ring::RootRing;

/// Smallest supported depth.
pub const MIN_DEPTH: u8 = 4;
/// Largest supported depth (the on-chain account stores depth in one byte
/// and caps capacity at 2^24 leaves).
pub const MAX_DEPTH: u8 = 24;
/// Reorg-absorption floor for the root-history ring.
pub const MIN_ROOT_HISTORY: usize = 30;
/// Default root-history capacity.
pub const DEFAULT_ROOT_HISTORY: usize = 100;

/// The result of simulating a batch insertion.
///
/// `paths[i]` authenticates `commitments[i]` against the root that exists
/// immediately after that commitment is appended, which is exactly the view
/// the batch circuit checks.
#[derive(Debug, Clone)]
pub struct BatchSimulation {
    /// First leaf index of the batch.
    pub start_index: u64,
    /// Per-commitment authentication paths, captured at insertion time.
    pub paths: Vec<AuthPath>,
    /// The root after the whole batch is appended.
    pub new_root: Element,
}

/// Append-only incremental Merkle tree of fixed depth.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    depth: u8,
    leaves: Vec<Element>,
    /// `zeros[0] = 0`, `zeros[i + 1] = h2(zeros[i], zeros[i])`.
    zeros: Vec<Element>,
    /// Rightmost completed subtree hash per level.
    filled_subtrees: Vec<Element>,
    current_root: Element,
    history: RootRing,
}

impl MerkleTree {
    /// Creates an empty tree. The empty root is `zeros[depth]`.
    pub fn new(depth: u8, root_history: usize) -> Result<Self, MerkleError> {
        if !(MIN_DEPTH..=MAX_DEPTH).contains(&depth) {
            return Err(MerkleError::DepthOutOfRange { depth });
        }
        if root_history < MIN_ROOT_HISTORY {
            return Err(MerkleError::HistoryTooSmall {
                capacity: root_history,
            });
        }

        let levels = usize::from(depth);
        let mut zeros = Vec::with_capacity(levels.saturating_add(1));
        zeros.push(Element::ZERO);
        for level in 0..levels {
            let prev = zeros[level];
            zeros.push(h2(prev, prev)?);
        }

        let filled_subtrees = zeros[..levels].to_vec();
        let current_root = zeros[levels];
        let mut history = RootRing::new(root_history);
        history.push(current_root);

        Ok(Self {
            depth,
            leaves: Vec::new(),
            zeros,
            filled_subtrees,
            current_root,
            history,
        })
    }

    /// Creates an empty tree with the default root-history capacity.
    pub fn with_default_history(depth: u8) -> Result<Self, MerkleError> {
        Self::new(depth, DEFAULT_ROOT_HISTORY)
    }

    /// Tree depth.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Total leaf capacity, `2^depth`.
    pub fn capacity(&self) -> u64 {
        1u64 << u32::from(self.depth)
    }

    /// The next free leaf index (equals the number of inserted leaves).
    pub fn next_index(&self) -> u64 {
        self.leaves.len() as u64
    }

    /// True once all `2^depth` leaves are occupied.
    pub fn is_full(&self) -> bool {
        self.next_index() >= self.capacity()
    }

    /// The current root.
    pub fn root(&self) -> Element {
        self.current_root
    }

    /// The inserted leaves, in index order.
    pub fn leaves(&self) -> &[Element] {
        &self.leaves
    }

    /// The precomputed zero-subtree hash at `level`.
    pub fn zero_at(&self, level: usize) -> Option<Element> {
        self.zeros.get(level).copied()
    }

    /// True when `root` is the current root or still in the history ring.
    pub fn is_known_root(&self, root: &Element) -> bool {
        *root == self.current_root || self.history.contains(root)
    }

    /// Appends one leaf, returning its index.
    ///
    /// Exactly `depth` Poseidon invocations; the previous roots remain
    /// queryable through [`MerkleTree::is_known_root`] until the ring evicts
    /// them.
    pub fn insert(&mut self, leaf: Element) -> Result<u64, MerkleError> {
        if self.is_full() {
            return Err(MerkleError::TreeFull {
                capacity: self.capacity(),
            });
        }
        let index = self.next_index();

        // Walk on scratch state so a hashing failure cannot leave the tree
        // half-updated.
        let mut filled = self.filled_subtrees.clone();
        let new_root = Self::ascend(&mut filled, &self.zeros, self.depth, index, leaf)?;

        self.leaves.push(leaf);
        self.filled_subtrees = filled;
        // Ring append happens before the root becomes current.
        self.history.push(new_root);
        self.current_root = new_root;
        Ok(index)
    }

    /// Hashes a freshly appended leaf up to the root, updating the
    /// filled-subtree cache in place.
    fn ascend(
        filled: &mut [Element],
        zeros: &[Element],
        depth: u8,
        index: u64,
        leaf: Element,
    ) -> Result<Element, MerkleError> {
        let mut node = leaf;
        let mut idx = index;
        for level in 0..usize::from(depth) {
            if idx & 1 == 1 {
                node = h2(filled[level], node)?;
            } else {
                filled[level] = node;
                node = h2(node, zeros[level])?;
            }
            idx >>= 1;
        }
        Ok(node)
    }

    /// Produces the authentication path for an occupied leaf against the
    /// current root.
    ///
    /// Siblings missing inside an unfilled level are the zero-subtree hashes,
    /// never fresh values.
    pub fn prove(&self, index: u64) -> Result<AuthPath, MerkleError> {
        if index >= self.next_index() {
            return Err(MerkleError::LeafOutOfRange {
                index,
                next_index: self.next_index(),
            });
        }

        let mut level_nodes = self.leaves.clone();
        let mut siblings = Vec::with_capacity(usize::from(self.depth));
        let mut idx = index as usize;
        for level in 0..usize::from(self.depth) {
            let sibling = level_nodes
                .get(idx ^ 1)
                .copied()
                .unwrap_or(self.zeros[level]);
            siblings.push(sibling);

            let mut next_level = Vec::with_capacity(level_nodes.len().div_ceil(2));
            for pair in level_nodes.chunks(2) {
                let left = pair[0];
                let right = pair.get(1).copied().unwrap_or(self.zeros[level]);
                next_level.push(h2(left, right)?);
            }
            level_nodes = next_level;
            idx >>= 1;
        }

        Ok(AuthPath { siblings, index })
    }

    /// Simulates appending `commitments` starting at `start_index` without
    /// mutating the tree.
    ///
    /// Each returned path is the one that authenticates its commitment at
    /// the moment it is appended. Mutation happens only through
    /// [`MerkleTree::commit_batch`] after on-chain confirmation.
    pub fn simulate_batch_insert(
        &self,
        start_index: u64,
        commitments: &[Element],
    ) -> Result<BatchSimulation, MerkleError> {
        if commitments.is_empty() {
            return Err(MerkleError::EmptyBatch);
        }
        if start_index != self.next_index() {
            return Err(MerkleError::IndexMismatch {
                expected: self.next_index(),
                actual: start_index,
            });
        }
        let end = start_index.saturating_add(commitments.len() as u64);
        if end > self.capacity() {
            return Err(MerkleError::TreeFull {
                capacity: self.capacity(),
            });
        }

        let mut filled = self.filled_subtrees.clone();
        let mut new_root = self.current_root;
        let mut paths = Vec::with_capacity(commitments.len());

        for (offset, commitment) in commitments.iter().enumerate() {
            let index = start_index.saturating_add(offset as u64);
            let mut siblings = Vec::with_capacity(usize::from(self.depth));
            let mut idx = index;
            // An appended leaf is always on the frontier: the sibling is the
            // filled subtree on the left or the zero subtree on the right.
            for level in 0..usize::from(self.depth) {
                if idx & 1 == 1 {
                    siblings.push(filled[level]);
                } else {
                    siblings.push(self.zeros[level]);
                }
                idx >>= 1;
            }
            new_root = Self::ascend(&mut filled, &self.zeros, self.depth, index, *commitment)?;
            paths.push(AuthPath { siblings, index });
        }

        Ok(BatchSimulation {
            start_index,
            paths,
            new_root,
        })
    }

    /// Appends a confirmed batch in order, returning the occupied index
    /// range.
    pub fn commit_batch(
        &mut self,
        commitments: &[Element],
    ) -> Result<std::ops::Range<u64>, MerkleError> {
        if commitments.is_empty() {
            return Err(MerkleError::EmptyBatch);
        }
        let start = self.next_index();
        let end = start.saturating_add(commitments.len() as u64);
        if end > self.capacity() {
            return Err(MerkleError::TreeFull {
                capacity: self.capacity(),
            });
        }
        for commitment in commitments {
            self.insert(*commitment)?;
        }
        Ok(start..end)
    }
}
