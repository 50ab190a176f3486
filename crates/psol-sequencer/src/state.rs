//! Durable sequencer state.
//!
//! Written after every confirmed batch, read at startup to rebuild the
//! local tree. The write is atomic (temp file + rename) so a crash can only
//! lose the latest batch, never corrupt the file; the recovery path
//! re-derives anything lost from chain state.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::hex::Hex;
use serde_with::serde_as;

use crate::error::SequencerError;

/// The persisted state file.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencerStateFile {
    /// Number of leaves settled and locally mirrored; equals the next leaf
    /// index.
    pub last_processed_index: u64,
    /// Every settled commitment, in leaf order.
    #[serde_as(as = "Vec<Hex>")]
    pub commitments: Vec<[u8; 32]>,
    /// Signature of the last confirmed settlement transaction.
    #[serde(default)]
    pub last_tx_signature: Option<String>,
    /// When this file was last written.
    pub last_updated: DateTime<Utc>,
}

impl SequencerStateFile {
    /// Fresh state for an empty pool.
    pub fn empty() -> Self {
        Self {
            last_processed_index: 0,
            commitments: Vec::new(),
            last_tx_signature: None,
            last_updated: Utc::now(),
        }
    }

    /// Loads the state file; `None` when it does not exist yet.
    pub fn load(path: &Path) -> Result<Option<Self>, SequencerError> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SequencerError::State(format!("{}: {e}", path.display())));
            }
        };
        let state: Self = serde_json::from_str(&json)
            .map_err(|e| SequencerError::State(format!("{}: {e}", path.display())))?;
        if state.last_processed_index != state.commitments.len() as u64 {
            return Err(SequencerError::State(format!(
                "{}: last_processed_index {} disagrees with {} stored commitments",
                path.display(),
                state.last_processed_index,
                state.commitments.len()
            )));
        }
        Ok(Some(state))
    }

    /// Writes the file atomically.
    pub fn store(&self, path: &Path) -> Result<(), SequencerError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SequencerError::State(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| SequencerError::State(format!("{}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, path)
            .map_err(|e| SequencerError::State(format!("{}: {e}", path.display())))?;
        Ok(())
    }

    /// Appends a confirmed batch and stamps the write time. A `None`
    /// signature (event-log recovery) keeps the previous one.
    pub fn record_batch(&mut self, commitments: &[[u8; 32]], signature: Option<String>) {
        self.commitments.extend_from_slice(commitments);
        self.last_processed_index = self.commitments.len() as u64;
        if signature.is_some() {
            self.last_tx_signature = signature;
        }
        self.last_updated = Utc::now();
    }
}
