//! End-to-end sequencer cycles against the in-memory chain.

#![allow(clippy::unwrap_used, reason = "Tests")]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use psol_chain::{
    ChainClient, ChainError, ChainTreeState, CommitmentInserted, MockChain, PendingCommitment,
    encode_settle_instruction,
};
use psol_core::{AssetId, Element, FR_MODULUS_BE, note};
use psol_merkle::MerkleTree;
use psol_prover::MockProver;
use psol_sequencer::{CycleOutcome, Sequencer, SequencerConfig, SequencerError};
use tempfile::TempDir;

fn validated_config(
    dir: &TempDir,
    depth: u8,
    max_batch: usize,
    min_batch: usize,
) -> psol_sequencer::ValidatedSequencerConfig {
    SequencerConfig {
        program_id: "PsoLProgram".into(),
        pool_config: "Pool".into(),
        merkle_tree: "Tree".into(),
        pending_buffer: "Pending".into(),
        vk_account: None,
        max_batch_size: max_batch,
        min_batch_size: min_batch,
        merkle_depth: depth,
        root_history_size: 30,
        poll_interval_ms: 10,
        max_retries: 3,
        retry_base_delay_ms: 1,
        compute_units: None,
        priority_fee: None,
        witness_wasm: PathBuf::from("batch.wasm"),
        proving_key: PathBuf::from("batch.zkey"),
        verifying_key_json: None,
        state_file: dir.path().join("state.json"),
    }
    .validate()
    .unwrap()
}

fn empty_root(depth: u8) -> [u8; 32] {
    MerkleTree::new(depth, 30).unwrap().root().to_be32()
}

fn commitment(v: u64) -> [u8; 32] {
    Element::from_u64(v).to_be32()
}

fn sequencer(
    dir: &TempDir,
    depth: u8,
    max_batch: usize,
    min_batch: usize,
    chain: MockChain,
) -> Sequencer<MockChain, MockProver> {
    Sequencer::new(
        validated_config(dir, depth, max_batch, min_batch),
        chain,
        MockProver::new(),
    )
    .unwrap()
}

#[test]
fn settles_a_single_commitment_on_an_empty_tree() {
    // The §8 walk-through: one deposited note, depth-20 pool.
    let secret = Element::from_u64(0x1234);
    let nullifier = Element::from_u64(0x5678);
    let mut asset_bytes = [0u8; 32];
    asset_bytes[30] = 0xAB;
    asset_bytes[31] = 0xCD;
    let asset = AssetId::from_bytes(asset_bytes).unwrap();
    let deposit = note::compute_commitment(secret, nullifier, 1_000, asset).unwrap();

    let dir = TempDir::new().unwrap();
    let mut chain = MockChain::new(20, empty_root(20));
    chain.enqueue_deposit(deposit.to_be32(), 1_000, asset_bytes);

    let mut seq = sequencer(&dir, 20, 16, 1, chain);
    let outcome = seq.run_once().unwrap();

    let CycleOutcome::Settled { summary, signature } = outcome else {
        panic!("expected settlement, got {outcome:?}");
    };
    assert_eq!(summary.start_index, 0);
    assert_eq!(summary.batch_size, 1);
    assert_eq!(signature, "mock-sig-1");

    let chain_state = seq.chain().tree_state().unwrap();
    assert_eq!(chain_state.next_leaf_index, 1);
    assert_eq!(chain_state.current_root, seq.tree().root().to_be32());
    assert_eq!(seq.state().last_processed_index, 1);
    assert_eq!(seq.state().commitments[0], deposit.to_be32());

    // The persisted file survives a reload.
    let reloaded = psol_sequencer::SequencerStateFile::load(&dir.path().join("state.json"))
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.last_processed_index, 1);
    assert_eq!(reloaded.last_tx_signature.as_deref(), Some("mock-sig-1"));
}

#[test]
fn drains_a_backlog_in_fan_in_sized_batches() {
    let dir = TempDir::new().unwrap();
    let mut chain = MockChain::new(8, empty_root(8));
    for v in 1..=20u64 {
        chain.enqueue_deposit(commitment(v), v, [0u8; 32]);
    }

    let mut seq = sequencer(&dir, 8, 16, 1, chain);

    let first = seq.run_once().unwrap();
    assert!(matches!(
        first,
        CycleOutcome::Settled { ref summary, .. } if summary.batch_size == 16
    ));
    let second = seq.run_once().unwrap();
    assert!(matches!(
        second,
        CycleOutcome::Settled { ref summary, .. } if summary.batch_size == 4 && summary.start_index == 16
    ));
    assert!(matches!(seq.run_once().unwrap(), CycleOutcome::Idle));

    let chain_state = seq.chain().tree_state().unwrap();
    assert_eq!(chain_state.next_leaf_index, 20);
    assert_eq!(chain_state.current_root, seq.tree().root().to_be32());
    assert_eq!(seq.state().last_processed_index, 20);
}

#[test]
fn waits_below_the_minimum_batch_size() {
    let dir = TempDir::new().unwrap();
    let mut chain = MockChain::new(8, empty_root(8));
    chain.enqueue_deposit(commitment(1), 1, [0u8; 32]);
    chain.enqueue_deposit(commitment(2), 2, [0u8; 32]);

    let mut seq = sequencer(&dir, 8, 16, 3, chain);
    assert!(matches!(seq.run_once().unwrap(), CycleOutcome::Idle));

    seq.chain_mut().enqueue_deposit(commitment(3), 3, [0u8; 32]);
    assert!(matches!(
        seq.run_once().unwrap(),
        CycleOutcome::Settled { ref summary, .. } if summary.batch_size == 3
    ));
}

#[test]
fn halts_on_root_mismatch_after_a_chain_reset() {
    let dir = TempDir::new().unwrap();
    let mut chain = MockChain::new(8, empty_root(8));
    for v in 1..=3u64 {
        chain.enqueue_deposit(commitment(v), v, [0u8; 32]);
    }

    let mut seq = sequencer(&dir, 8, 16, 1, chain);
    seq.run_once().unwrap();
    assert_eq!(seq.state().last_processed_index, 3);

    // Operator reinitializes the pool out from under us.
    seq.chain_mut().reset_pool(empty_root(8));
    seq.chain_mut().enqueue_deposit(commitment(9), 9, [0u8; 32]);

    let err = seq.run_once().unwrap_err();
    assert!(matches!(err, SequencerError::RootMismatch { .. }));
    // Nothing was submitted after the halt.
    assert_eq!(seq.chain().accepted_settlements(), 1);
    assert_eq!(seq.state().last_processed_index, 3);
}

#[test]
fn force_bypasses_the_root_mismatch_halt() {
    let dir = TempDir::new().unwrap();
    let mut chain = MockChain::new(8, empty_root(8));
    chain.enqueue_deposit(commitment(1), 1, [0u8; 32]);

    let mut seq = sequencer(&dir, 8, 16, 1, chain);
    seq.run_once().unwrap();

    seq.chain_mut().reset_pool(empty_root(8));
    // With force the cycle proceeds (and, the chain being empty, idles)
    // instead of halting.
    let mut seq = seq.with_force(true);
    assert!(matches!(seq.run_once().unwrap(), CycleOutcome::Idle));
}

#[test]
fn replay_after_a_crash_between_submit_and_persist() {
    let dir = TempDir::new().unwrap();
    let mut chain = MockChain::new(8, empty_root(8));
    chain.enqueue_deposit(commitment(1), 1, [0u8; 32]);
    chain.enqueue_deposit(commitment(2), 2, [0u8; 32]);

    // First sequencer settles batch one and persists.
    let mut seq = sequencer(&dir, 8, 16, 1, chain);
    seq.run_once().unwrap();

    // Batch two is submitted and confirmed, but the sequencer "crashes"
    // before persisting: we apply the settlement directly to the chain.
    seq.chain_mut().enqueue_deposit(commitment(3), 3, [0u8; 32]);
    seq.chain_mut().enqueue_deposit(commitment(4), 4, [0u8; 32]);
    let mut replayed = MerkleTree::new(8, 30).unwrap();
    for v in 1..=4u64 {
        replayed.insert(Element::from_u64(v)).unwrap();
    }
    let instruction =
        encode_settle_instruction(&[0u8; 256], &replayed.root().to_be32(), 2);
    let chain = seq.chain_mut();
    chain.submit_settlement(&instruction).unwrap();

    // Restart from the persisted state (which predates batch two).
    let chain = seq.chain().clone();
    let mut restarted = sequencer(&dir, 8, 16, 1, chain);
    assert_eq!(restarted.state().last_processed_index, 2);

    // The first cycle observes the chain four leaves ahead, replays the two
    // missing settlements from the event log, then idles.
    assert!(matches!(restarted.run_once().unwrap(), CycleOutcome::Idle));
    assert_eq!(restarted.state().last_processed_index, 4);
    assert_eq!(restarted.state().commitments[2], commitment(3));
    assert_eq!(restarted.state().commitments[3], commitment(4));
    assert_eq!(
        restarted.tree().root().to_be32(),
        restarted.chain().tree_state().unwrap().current_root
    );
}

#[test]
fn rebuild_reconstructs_three_settled_commitments() {
    let settle_dir = TempDir::new().unwrap();
    let mut chain = MockChain::new(8, empty_root(8));
    for v in 5..=7u64 {
        chain.enqueue_deposit(commitment(v), v, [0u8; 32]);
    }
    let mut seq = sequencer(&settle_dir, 8, 16, 1, chain);
    seq.run_once().unwrap();

    // A brand-new sequencer with no local state rebuilds from events.
    let rebuild_dir = TempDir::new().unwrap();
    let chain = seq.chain().clone();
    let mut fresh = sequencer(&rebuild_dir, 8, 16, 1, chain);
    fresh.rebuild().unwrap();

    assert_eq!(fresh.state().last_processed_index, 3);
    assert_eq!(
        fresh.state().commitments,
        vec![commitment(5), commitment(6), commitment(7)]
    );
    assert_eq!(
        fresh.tree().root().to_be32(),
        fresh.chain().tree_state().unwrap().current_root
    );
    assert!(matches!(fresh.run_once().unwrap(), CycleOutcome::Idle));
}

/// A chain whose event log lost one settled leaf.
#[derive(Clone)]
struct GappyChain {
    inner: MockChain,
    missing_index: u64,
}

impl ChainClient for GappyChain {
    fn tree_state(&self) -> Result<ChainTreeState, ChainError> {
        self.inner.tree_state()
    }

    fn pending_commitments(&self) -> Result<Vec<PendingCommitment>, ChainError> {
        self.inner.pending_commitments()
    }

    fn submit_settlement(&mut self, instruction_data: &[u8]) -> Result<String, ChainError> {
        self.inner.submit_settlement(instruction_data)
    }

    fn commitment_events(&self) -> Result<Vec<CommitmentInserted>, ChainError> {
        Ok(self
            .inner
            .commitment_events()?
            .into_iter()
            .filter(|event| event.leaf_index != self.missing_index)
            .collect())
    }
}

#[test]
fn rebuild_with_a_missing_leaf_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut chain = MockChain::new(8, empty_root(8));
    for v in 1..=3u64 {
        chain.enqueue_deposit(commitment(v), v, [0u8; 32]);
    }
    let mut seq = sequencer(&dir, 8, 16, 1, chain);
    seq.run_once().unwrap();

    let gappy = GappyChain {
        inner: seq.chain().clone(),
        missing_index: 1,
    };
    let rebuild_dir = TempDir::new().unwrap();
    let mut fresh = Sequencer::new(
        validated_config(&rebuild_dir, 8, 16, 1),
        gappy,
        MockProver::new(),
    )
    .unwrap();

    assert!(matches!(
        fresh.rebuild().unwrap_err(),
        SequencerError::MissingLeaf { index: 1, settled: 3 }
    ));
}

#[test]
fn transient_submission_failures_are_retried() {
    let dir = TempDir::new().unwrap();
    let mut chain = MockChain::new(8, empty_root(8));
    chain.enqueue_deposit(commitment(1), 1, [0u8; 32]);
    chain.inject_transient_failures(2);

    let mut seq = sequencer(&dir, 8, 16, 1, chain);
    assert!(matches!(
        seq.run_once().unwrap(),
        CycleOutcome::Settled { .. }
    ));
    assert_eq!(seq.chain().accepted_settlements(), 1);
}

#[test]
fn exhausted_retries_halt_without_advancing_local_state() {
    let dir = TempDir::new().unwrap();
    let mut chain = MockChain::new(8, empty_root(8));
    chain.enqueue_deposit(commitment(1), 1, [0u8; 32]);
    chain.inject_transient_failures(10);

    let mut seq = sequencer(&dir, 8, 16, 1, chain);
    let err = seq.run_once().unwrap_err();
    assert!(matches!(err, SequencerError::Submit(ChainError::Transient(_))));
    assert_eq!(seq.state().last_processed_index, 0);
    assert_eq!(seq.tree().next_index(), 0);
}

#[test]
fn non_canonical_commitment_bytes_are_fatal() {
    let dir = TempDir::new().unwrap();
    let mut chain = MockChain::new(8, empty_root(8));
    chain.enqueue_deposit(FR_MODULUS_BE, 1, [0u8; 32]);

    let mut seq = sequencer(&dir, 8, 16, 1, chain);
    assert!(matches!(
        seq.run_once().unwrap_err(),
        SequencerError::Core(_)
    ));
    assert_eq!(seq.chain().accepted_settlements(), 0);
}

#[test]
fn prover_failure_halts_the_cycle() {
    let dir = TempDir::new().unwrap();
    let mut chain = MockChain::new(8, empty_root(8));
    chain.enqueue_deposit(commitment(1), 1, [0u8; 32]);

    let mut seq = Sequencer::new(
        validated_config(&dir, 8, 16, 1),
        chain,
        MockProver::failing(),
    )
    .unwrap();
    assert!(matches!(
        seq.run_once().unwrap_err(),
        SequencerError::Prover(_)
    ));
}

#[test]
fn depth_mismatch_is_fatal() {
    let dir = TempDir::new().unwrap();
    let chain = MockChain::new(10, empty_root(10));
    let mut seq = sequencer(&dir, 8, 16, 1, chain);
    assert!(matches!(
        seq.run_once().unwrap_err(),
        SequencerError::DepthMismatch {
            chain: 10,
            configured: 8
        }
    ));
}

#[test]
fn run_returns_immediately_when_stopped() {
    let dir = TempDir::new().unwrap();
    let chain = MockChain::new(8, empty_root(8));
    let mut seq = sequencer(&dir, 8, 16, 1, chain);

    let stop = AtomicBool::new(true);
    stop.store(true, Ordering::SeqCst);
    seq.run(&stop).unwrap();
}
