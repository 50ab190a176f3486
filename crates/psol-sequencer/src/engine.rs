//! The single-writer polling loop.
//!
//! One cycle performs the entire read → build → prove → submit → commit
//! sequence before yielding. The local tree and state file are mutated only
//! here, and only after the chain confirms a settlement; between any two
//! suspension points the local tree's next index equals the persisted
//! `last_processed_index`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use psol_chain::{
    ChainClient, ChainError, ChainTreeState, encode_settle_instruction, retry_with_backoff,
};
use psol_core::Element;
use psol_merkle::{BatchSimulation, MerkleTree};
use psol_prover::{BatchProver, BatchWitness, LocalVerifier};
use tracing::{debug, error, info, warn};

use crate::batch::BatchSummary;
use crate::config::ValidatedSequencerConfig;
use crate::error::SequencerError;
use crate::state::SequencerStateFile;

/// Outcome of one polling cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Nothing to settle this cycle.
    Idle,
    /// A batch was confirmed on chain and mirrored locally.
    Settled {
        /// Summary of the settled batch.
        summary: BatchSummary,
        /// Confirmed transaction signature.
        signature: String,
    },
    /// The chain advanced past the submitted batch; the next cycle
    /// re-reads chain state and reconciles before building again.
    Raced,
}

/// The batch-settlement sequencer.
pub struct Sequencer<C, P> {
    config: ValidatedSequencerConfig,
    chain: C,
    prover: P,
    verifier: Option<LocalVerifier>,
    force: bool,
    tree: MerkleTree,
    state: SequencerStateFile,
}

impl<C: ChainClient, P: BatchProver> Sequencer<C, P> {
    /// Creates a sequencer, restoring the local tree from the persisted
    /// state file when one exists.
    pub fn new(
        config: ValidatedSequencerConfig,
        chain: C,
        prover: P,
    ) -> Result<Self, SequencerError> {
        let state = SequencerStateFile::load(&config.state_file)?.unwrap_or_else(|| {
            debug!(path = %config.state_file.display(), "no state file; starting fresh");
            SequencerStateFile::empty()
        });

        let mut tree = MerkleTree::new(config.merkle_depth, config.root_history_size)?;
        if !state.commitments.is_empty() {
            let leaves = parse_commitments(&state.commitments)?;
            tree.commit_batch(&leaves)?;
        }
        info!(
            leaves = state.last_processed_index,
            root = %hex::encode(tree.root().to_be32()),
            "local tree restored"
        );

        Ok(Self {
            config,
            chain,
            prover,
            verifier: None,
            force: false,
            tree,
            state,
        })
    }

    /// Attaches the pre-submission pairing self-check.
    pub fn with_verifier(mut self, verifier: LocalVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Bypasses the root-mismatch halt. Operator override only.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// The local tree mirror.
    pub fn tree(&self) -> &MerkleTree {
        &self.tree
    }

    /// The in-memory copy of the persisted state.
    pub fn state(&self) -> &SequencerStateFile {
        &self.state
    }

    /// The chain client.
    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Mutable access to the chain client (tests and dry runs).
    pub fn chain_mut(&mut self) -> &mut C {
        &mut self.chain
    }

    /// Runs one full polling cycle.
    pub fn run_once(&mut self) -> Result<CycleOutcome, SequencerError> {
        let chain_state = self.read_tree_state()?;
        if chain_state.depth != self.config.merkle_depth {
            return Err(SequencerError::DepthMismatch {
                chain: chain_state.depth,
                configured: self.config.merkle_depth,
            });
        }
        self.reconcile(&chain_state)?;

        let pending = retry_with_backoff(&self.config.retry_policy, || {
            self.chain.pending_commitments()
        })
        .map_err(SequencerError::ChainRead)?;

        if pending.is_empty() {
            debug!("no pending commitments");
            return Ok(CycleOutcome::Idle);
        }
        if pending.len() < self.config.min_batch_size {
            debug!(
                pending = pending.len(),
                min = self.config.min_batch_size,
                "below minimum batch size; waiting"
            );
            return Ok(CycleOutcome::Idle);
        }

        let batch_size = pending.len().min(self.config.max_batch_size);
        let commitment_bytes: Vec<[u8; 32]> = pending
            .iter()
            .take(batch_size)
            .map(|p| p.commitment)
            .collect();
        // Non-canonical bytes from the chain are fatal, never reduced.
        let commitments = parse_commitments(&commitment_bytes)?;

        let start_index = self.tree.next_index();
        let old_root = self.tree.root();
        let simulation = self.tree.simulate_batch_insert(start_index, &commitments)?;
        let summary =
            BatchSummary::derive(old_root, simulation.new_root, start_index, batch_size);
        info!(%summary, "building settlement batch");

        match self.prove_and_submit(&summary, old_root, &commitments, &simulation) {
            Ok(Some(signature)) => {
                self.commit_confirmed(&summary, &commitment_bytes, &commitments, &simulation, &signature)?;
                Ok(CycleOutcome::Settled { summary, signature })
            }
            Ok(None) => {
                warn!(%summary, "chain already advanced past this batch; will re-read and rebuild");
                Ok(CycleOutcome::Raced)
            }
            Err(e) => {
                error!(%summary, error = %e, "sequencer halting");
                Err(e)
            }
        }
    }

    /// Continuous mode: poll until the stop flag is raised or a fatal error
    /// halts the loop. An in-flight batch always completes first.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<(), SequencerError> {
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "sequencer entering continuous mode"
        );
        while !stop.load(Ordering::SeqCst) {
            match self.run_once()? {
                CycleOutcome::Idle => self.sleep_poll(stop),
                CycleOutcome::Settled { .. } | CycleOutcome::Raced => {}
            }
        }
        info!("stop requested; sequencer exiting after completing the in-flight cycle");
        Ok(())
    }

    /// Resets local state and reconstructs it from the chain's settlement
    /// events.
    ///
    /// Fails fatally when any leaf in `[0, next_leaf_index)` cannot be
    /// recovered; a placeholder leaf would silently fork the tree.
    pub fn rebuild(&mut self) -> Result<(), SequencerError> {
        let chain_state = self.read_tree_state()?;
        if chain_state.depth != self.config.merkle_depth {
            return Err(SequencerError::DepthMismatch {
                chain: chain_state.depth,
                configured: self.config.merkle_depth,
            });
        }
        let settled = chain_state.next_leaf_index;
        let events = retry_with_backoff(&self.config.retry_policy, || {
            self.chain.commitment_events()
        })
        .map_err(SequencerError::ChainRead)?;

        let mut slots: Vec<Option<[u8; 32]>> = vec![None; settled as usize];
        for event in events {
            let Some(slot) = slots.get_mut(event.leaf_index as usize) else {
                continue;
            };
            match slot {
                None => *slot = Some(event.commitment),
                Some(existing) if *existing == event.commitment => {}
                Some(_) => {
                    return Err(SequencerError::State(format!(
                        "conflicting settlement events for leaf {}",
                        event.leaf_index
                    )));
                }
            }
        }

        let mut commitment_bytes = Vec::with_capacity(slots.len());
        for (index, slot) in slots.iter().enumerate() {
            match slot {
                Some(bytes) => commitment_bytes.push(*bytes),
                None => {
                    return Err(SequencerError::MissingLeaf {
                        index: index as u64,
                        settled,
                    });
                }
            }
        }

        let mut tree = MerkleTree::new(self.config.merkle_depth, self.config.root_history_size)?;
        if !commitment_bytes.is_empty() {
            let leaves = parse_commitments(&commitment_bytes)?;
            tree.commit_batch(&leaves)?;
        }
        if tree.root().to_be32() != chain_state.current_root {
            return Err(SequencerError::RebuildRootMismatch {
                chain: hex::encode(chain_state.current_root),
                local: hex::encode(tree.root().to_be32()),
            });
        }

        let mut state = SequencerStateFile::empty();
        if !commitment_bytes.is_empty() {
            state.record_batch(&commitment_bytes, None);
        }
        state.store(&self.config.state_file)?;
        self.tree = tree;
        self.state = state;
        info!(leaves = settled, "local state rebuilt from chain events");
        Ok(())
    }

    fn read_tree_state(&self) -> Result<ChainTreeState, SequencerError> {
        retry_with_backoff(&self.config.retry_policy, || self.chain.tree_state())
            .map_err(SequencerError::ChainRead)
    }

    /// Lines the local mirror up with the chain before building anything.
    fn reconcile(&mut self, chain_state: &ChainTreeState) -> Result<(), SequencerError> {
        let local_root = self.tree.root().to_be32();
        let local_next = self.tree.next_index();

        if chain_state.current_root == local_root {
            if chain_state.next_leaf_index != local_next {
                return Err(SequencerError::IndexMismatch {
                    chain: chain_state.next_leaf_index,
                    local: local_next,
                });
            }
            return Ok(());
        }

        if chain_state.next_leaf_index > local_next {
            // The chain confirmed settlements we have not mirrored: a crash
            // between submission and persist, or a batch whose confirmation
            // we never observed. Replay the gap from the event log.
            return self.catch_up(chain_state);
        }

        if self.force {
            warn!(
                chain = %hex::encode(chain_state.current_root),
                local = %hex::encode(local_root),
                "root mismatch bypassed by force; proceeding with local state"
            );
            return Ok(());
        }

        Err(SequencerError::RootMismatch {
            chain: hex::encode(chain_state.current_root),
            local: hex::encode(local_root),
        })
    }

    /// Replays settled leaves `[local_next, chain_next)` from the event
    /// log, then requires the roots to agree.
    fn catch_up(&mut self, chain_state: &ChainTreeState) -> Result<(), SequencerError> {
        let local_next = self.tree.next_index();
        let target = chain_state.next_leaf_index;
        let events = retry_with_backoff(&self.config.retry_policy, || {
            self.chain.commitment_events()
        })
        .map_err(SequencerError::ChainRead)?;

        let mut commitment_bytes = Vec::with_capacity((target.saturating_sub(local_next)) as usize);
        for index in local_next..target {
            let found = events
                .iter()
                .find(|event| event.leaf_index == index)
                .map(|event| event.commitment);
            match found {
                Some(bytes) => commitment_bytes.push(bytes),
                None => {
                    return Err(SequencerError::MissingLeaf {
                        index,
                        settled: target,
                    });
                }
            }
        }

        let leaves = parse_commitments(&commitment_bytes)?;
        self.tree.commit_batch(&leaves)?;
        if self.tree.root().to_be32() != chain_state.current_root {
            return Err(SequencerError::RootMismatch {
                chain: hex::encode(chain_state.current_root),
                local: hex::encode(self.tree.root().to_be32()),
            });
        }

        self.state.record_batch(&commitment_bytes, None);
        self.state.store(&self.config.state_file)?;
        info!(
            recovered = commitment_bytes.len(),
            next_index = target,
            "caught up with settlements confirmed while we were away"
        );
        Ok(())
    }

    fn prove_and_submit(
        &mut self,
        summary: &BatchSummary,
        old_root: Element,
        commitments: &[Element],
        simulation: &BatchSimulation,
    ) -> Result<Option<String>, SequencerError> {
        let witness = BatchWitness::build(
            old_root,
            commitments,
            simulation,
            self.config.max_batch_size,
            self.config.merkle_depth,
        )?;
        let proof = self.prover.prove(&witness)?;

        if let Some(verifier) = &self.verifier {
            let inputs = witness.public_inputs()?;
            if !verifier.verify(&proof, &inputs)? {
                return Err(SequencerError::SelfCheckFailed {
                    batch: summary.to_string(),
                });
            }
            debug!(batch_id = %summary.batch_id, "local pairing self-check passed");
        }

        let instruction = encode_settle_instruction(
            proof.as_bytes(),
            &summary.new_root,
            summary.batch_size as u16,
        );
        match retry_with_backoff(&self.config.retry_policy, || {
            self.chain.submit_settlement(&instruction)
        }) {
            Ok(signature) => Ok(Some(signature)),
            Err(ChainError::AlreadyAdvanced) => Ok(None),
            Err(e) => Err(SequencerError::Submit(e)),
        }
    }

    /// Mirrors a confirmed batch locally and persists, in that order.
    fn commit_confirmed(
        &mut self,
        summary: &BatchSummary,
        commitment_bytes: &[[u8; 32]],
        commitments: &[Element],
        simulation: &BatchSimulation,
        signature: &str,
    ) -> Result<(), SequencerError> {
        self.tree.commit_batch(commitments)?;
        if self.tree.root() != simulation.new_root {
            return Err(SequencerError::State(format!(
                "committed root diverged from simulation for {summary}"
            )));
        }
        self.state
            .record_batch(commitment_bytes, Some(signature.to_owned()));
        self.state.store(&self.config.state_file)?;
        info!(%summary, signature, "batch settled and mirrored");
        Ok(())
    }

    fn sleep_poll(&self, stop: &AtomicBool) {
        let mut remaining = self.config.poll_interval;
        let slice = Duration::from_millis(100);
        while remaining > Duration::ZERO && !stop.load(Ordering::SeqCst) {
            let nap = remaining.min(slice);
            std::thread::sleep(nap);
            remaining = remaining.saturating_sub(nap);
        }
    }
}

fn parse_commitments(bytes: &[[u8; 32]]) -> Result<Vec<Element>, SequencerError> {
    bytes
        .iter()
        .map(|b| Element::from_be32(b).map_err(SequencerError::from))
        .collect()
}
