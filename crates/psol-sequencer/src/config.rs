//! Sequencer configuration: a JSON file validated into typed form.

use std::path::{Path, PathBuf};
use std::time::Duration;

use psol_chain::RetryPolicy;
use psol_merkle::{MAX_DEPTH, MIN_DEPTH, MIN_ROOT_HISTORY};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::SequencerError;

/// The batch circuit's hard-coded fan-in. `max_batch_size` may be lower but
/// never higher.
pub const CIRCUIT_MAX_BATCH: usize = 16;

fn default_max_batch_size() -> usize {
    CIRCUIT_MAX_BATCH
}
fn default_min_batch_size() -> usize {
    1
}
fn default_merkle_depth() -> u8 {
    20
}
fn default_root_history_size() -> usize {
    100
}
fn default_poll_interval_ms() -> u64 {
    5_000
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    1_000
}

/// The on-disk configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SequencerConfig {
    /// Deployed program address (opaque).
    pub program_id: String,
    /// Pool config account address (opaque).
    pub pool_config: String,
    /// Merkle tree account address (opaque).
    pub merkle_tree: String,
    /// Pending-commitment buffer account address (opaque).
    pub pending_buffer: String,
    /// Verifying-key account address (opaque), if the deployment uses one.
    #[serde(default)]
    pub vk_account: Option<String>,

    /// Commitments per proof; must not exceed the circuit fan-in.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Below this many pending commitments the sequencer idles instead of
    /// proving a tiny batch.
    #[serde(default = "default_min_batch_size")]
    pub min_batch_size: usize,
    /// Local tree depth; must equal the on-chain tree's depth.
    #[serde(default = "default_merkle_depth")]
    pub merkle_depth: u8,
    /// Root-history ring capacity.
    #[serde(default = "default_root_history_size")]
    pub root_history_size: usize,
    /// Sleep between idle polling cycles, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Submission retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay of the submission backoff, in milliseconds.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Compute-unit limit passthrough for the submission transaction.
    #[serde(default)]
    pub compute_units: Option<u32>,
    /// Priority-fee passthrough for the submission transaction.
    #[serde(default)]
    pub priority_fee: Option<u64>,

    /// Path to the circuit's WASM witness generator.
    pub witness_wasm: PathBuf,
    /// Path to the proving key.
    pub proving_key: PathBuf,
    /// Path to the verifying-key JSON for the pre-submission self-check.
    #[serde(default)]
    pub verifying_key_json: Option<PathBuf>,
    /// Path of the durable sequencer state file.
    pub state_file: PathBuf,
}

impl SequencerConfig {
    /// Reads and parses the configuration file.
    pub fn from_file(path: &Path) -> Result<Self, SequencerError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| SequencerError::Config(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| SequencerError::Config(format!("{}: {e}", path.display())))
    }

    /// Validates ranges and produces the typed form.
    pub fn validate(self) -> Result<ValidatedSequencerConfig, SequencerError> {
        if self.max_batch_size == 0 || self.max_batch_size > CIRCUIT_MAX_BATCH {
            return Err(SequencerError::Config(format!(
                "max_batch_size {} outside 1..={CIRCUIT_MAX_BATCH}",
                self.max_batch_size
            )));
        }
        if self.min_batch_size == 0 || self.min_batch_size > self.max_batch_size {
            return Err(SequencerError::Config(format!(
                "min_batch_size {} outside 1..={}",
                self.min_batch_size, self.max_batch_size
            )));
        }
        if !(MIN_DEPTH..=MAX_DEPTH).contains(&self.merkle_depth) {
            return Err(SequencerError::Config(format!(
                "merkle_depth {} outside {MIN_DEPTH}..={MAX_DEPTH}",
                self.merkle_depth
            )));
        }
        if self.root_history_size < MIN_ROOT_HISTORY {
            return Err(SequencerError::Config(format!(
                "root_history_size {} below minimum {MIN_ROOT_HISTORY}",
                self.root_history_size
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(SequencerError::Config(
                "poll_interval_ms must be non-zero".to_owned(),
            ));
        }

        let retry_policy = RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_base_delay_ms.saturating_mul(16)),
            backoff_factor: 2,
        };
        let poll_interval = Duration::from_millis(self.poll_interval_ms);

        Ok(ValidatedSequencerConfig {
            raw: self,
            retry_policy,
            poll_interval,
        })
    }
}

/// A configuration that passed validation, with typed derived fields.
#[derive(Debug, Clone)]
pub struct ValidatedSequencerConfig {
    raw: SequencerConfig,
    /// Submission retry schedule.
    pub retry_policy: RetryPolicy,
    /// Sleep between idle cycles.
    pub poll_interval: Duration,
}

impl std::ops::Deref for ValidatedSequencerConfig {
    type Target = SequencerConfig;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}
