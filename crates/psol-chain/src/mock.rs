//! An in-memory chain for tests and dry runs.
//!
//! Enforces the settlement program's acceptance rules (batch continuity,
//! non-empty batches, rejection of submissions that arrive after the tree
//! has advanced) without verifying proofs. State transitions mirror the
//! on-chain handler: the tree account advances only on an accepted
//! settlement, and every settled leaf is written to the log transcript that
//! rebuild later parses.

use std::collections::VecDeque;

use crate::accounts::PendingCommitment;
use crate::client::{ChainClient, ChainTreeState};
use crate::error::ChainError;
use crate::events::{CommitmentInserted, format_settled_leaf, parse_log_events};
use crate::instruction::{SETTLE_INSTRUCTION_NAME, instruction_discriminator};

/// In-memory stand-in for the deployed pool.
#[derive(Debug, Clone)]
pub struct MockChain {
    depth: u8,
    next_leaf_index: u64,
    current_root: [u8; 32],
    pending: VecDeque<PendingCommitment>,
    log: Vec<String>,
    slot: u64,
    submissions: u64,
    queued_transient_failures: u32,
}

impl MockChain {
    /// Creates a freshly initialized pool with the given empty-tree root.
    pub fn new(depth: u8, empty_root: [u8; 32]) -> Self {
        Self {
            depth,
            next_leaf_index: 0,
            current_root: empty_root,
            pending: VecDeque::new(),
            log: Vec::new(),
            slot: 1,
            submissions: 0,
            queued_transient_failures: 0,
        }
    }

    /// Records a deposit into the pending buffer, returning its slot.
    pub fn enqueue_deposit(
        &mut self,
        commitment: [u8; 32],
        amount: u64,
        asset_id: [u8; 32],
    ) -> u64 {
        let slot = self.slot;
        self.slot = self.slot.saturating_add(1);
        self.pending.push_back(PendingCommitment {
            commitment,
            amount,
            asset_id,
            enqueue_slot: slot,
        });
        slot
    }

    /// Reinitializes the pool, dropping all settled and pending state.
    /// Models an operator chain reset out from under the sequencer.
    pub fn reset_pool(&mut self, empty_root: [u8; 32]) {
        self.next_leaf_index = 0;
        self.current_root = empty_root;
        self.pending.clear();
        self.log.clear();
    }

    /// Makes the next `count` submissions fail with a transient error.
    pub fn inject_transient_failures(&mut self, count: u32) {
        self.queued_transient_failures = count;
    }

    /// The raw log transcript.
    pub fn log_lines(&self) -> &[String] {
        &self.log
    }

    /// Number of accepted settlements.
    pub fn accepted_settlements(&self) -> u64 {
        self.submissions
    }

    fn handle_settle(&mut self, data: &[u8]) -> Result<String, ChainError> {
        const EXPECTED_LEN: usize = 8 + 256 + 32 + 2;
        if data.len() != EXPECTED_LEN {
            return Err(ChainError::Rejected(format!(
                "instruction data is {} bytes, expected {EXPECTED_LEN}",
                data.len()
            )));
        }
        if data[0..8] != instruction_discriminator(SETTLE_INSTRUCTION_NAME) {
            return Err(ChainError::Rejected("unknown instruction".to_owned()));
        }

        let mut new_root = [0u8; 32];
        new_root.copy_from_slice(&data[264..296]);
        let batch_size = usize::from(u16::from_le_bytes([data[296], data[297]]));

        if batch_size == 0 {
            return Err(ChainError::Rejected("empty batch".to_owned()));
        }
        if batch_size > self.pending.len() {
            // The buffer no longer holds this batch: either a replay after
            // the tree advanced, or a build against stale state.
            return Err(ChainError::AlreadyAdvanced);
        }

        let start = self.next_leaf_index;
        for offset in 0..batch_size {
            if let Some(record) = self.pending.pop_front() {
                let event = CommitmentInserted {
                    leaf_index: start.saturating_add(offset as u64),
                    commitment: record.commitment,
                };
                self.log.push(format_settled_leaf(&event));
            }
        }
        self.next_leaf_index = start.saturating_add(batch_size as u64);
        self.current_root = new_root;
        self.submissions = self.submissions.saturating_add(1);
        Ok(format!("mock-sig-{}", self.submissions))
    }
}

impl ChainClient for MockChain {
    fn tree_state(&self) -> Result<ChainTreeState, ChainError> {
        Ok(ChainTreeState {
            depth: self.depth,
            next_leaf_index: self.next_leaf_index,
            current_root: self.current_root,
        })
    }

    fn pending_commitments(&self) -> Result<Vec<PendingCommitment>, ChainError> {
        Ok(self.pending.iter().copied().collect())
    }

    fn submit_settlement(&mut self, instruction_data: &[u8]) -> Result<String, ChainError> {
        if self.queued_transient_failures > 0 {
            self.queued_transient_failures -= 1;
            return Err(ChainError::Transient("injected rpc timeout".to_owned()));
        }
        self.handle_settle(instruction_data)
    }

    fn commitment_events(&self) -> Result<Vec<CommitmentInserted>, ChainError> {
        parse_log_events(&self.log)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests")]

    use super::*;
    use crate::instruction::encode_settle_instruction;

    fn settle(chain: &mut MockChain, new_root: [u8; 32], batch_size: u16) -> Result<String, ChainError> {
        let data = encode_settle_instruction(&[0u8; 256], &new_root, batch_size);
        chain.submit_settlement(&data)
    }

    #[test]
    fn settle_drains_pending_and_advances() {
        let mut chain = MockChain::new(20, [0xEE; 32]);
        chain.enqueue_deposit([1; 32], 100, [0; 32]);
        chain.enqueue_deposit([2; 32], 200, [0; 32]);

        let sig = settle(&mut chain, [0xAB; 32], 2).unwrap();
        assert_eq!(sig, "mock-sig-1");

        let state = chain.tree_state().unwrap();
        assert_eq!(state.next_leaf_index, 2);
        assert_eq!(state.current_root, [0xAB; 32]);
        assert!(chain.pending_commitments().unwrap().is_empty());

        let events = chain.commitment_events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].leaf_index, 0);
        assert_eq!(events[0].commitment, [1; 32]);
        assert_eq!(events[1].leaf_index, 1);
    }

    #[test]
    fn replay_after_advance_is_rejected() {
        let mut chain = MockChain::new(20, [0xEE; 32]);
        chain.enqueue_deposit([1; 32], 100, [0; 32]);
        settle(&mut chain, [0xAB; 32], 1).unwrap();

        // Same instruction again: the buffer is drained, the tree advanced.
        assert!(matches!(
            settle(&mut chain, [0xAB; 32], 1),
            Err(ChainError::AlreadyAdvanced)
        ));
        assert_eq!(chain.tree_state().unwrap().next_leaf_index, 1);
    }

    #[test]
    fn empty_and_oversized_batches_are_rejected() {
        let mut chain = MockChain::new(20, [0xEE; 32]);
        chain.enqueue_deposit([1; 32], 100, [0; 32]);
        assert!(matches!(
            settle(&mut chain, [0xAB; 32], 0),
            Err(ChainError::Rejected(_))
        ));
        assert!(matches!(
            settle(&mut chain, [0xAB; 32], 2),
            Err(ChainError::AlreadyAdvanced)
        ));
    }

    #[test]
    fn transient_failures_then_success() {
        let mut chain = MockChain::new(20, [0xEE; 32]);
        chain.enqueue_deposit([1; 32], 100, [0; 32]);
        chain.inject_transient_failures(2);

        let data = encode_settle_instruction(&[0u8; 256], &[0xAB; 32], 1);
        assert!(chain.submit_settlement(&data).unwrap_err().is_transient());
        assert!(chain.submit_settlement(&data).unwrap_err().is_transient());
        assert!(chain.submit_settlement(&data).is_ok());
    }

    #[test]
    fn reset_pool_forgets_everything() {
        let mut chain = MockChain::new(20, [0xEE; 32]);
        chain.enqueue_deposit([1; 32], 100, [0; 32]);
        settle(&mut chain, [0xAB; 32], 1).unwrap();

        chain.reset_pool([0xEE; 32]);
        let state = chain.tree_state().unwrap();
        assert_eq!(state.next_leaf_index, 0);
        assert_eq!(state.current_root, [0xEE; 32]);
        assert!(chain.commitment_events().unwrap().is_empty());
    }
}
