//! Byte layouts of the on-chain accounts the sequencer reads.
//!
//! Both layouts are fixed against the deployed program build. The parsers
//! read exactly the fields the sequencer needs and treat everything past
//! them as opaque.

use sha2::{Digest as _, Sha256};

use crate::error::ChainError;

/// Length of one pending-commitment record:
/// `32B commitment ‖ 8B LE amount ‖ 32B asset_id ‖ 8B LE enqueue_slot`.
pub const PENDING_RECORD_LEN: usize = 80;

/// Anchor-style account discriminator: `sha256("account:<Name>")[0..8]`.
pub fn account_discriminator(name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("account:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[0..8]);
    out
}

/// The Merkle-tree account, as read from chain.
///
/// Layout: `8B discriminator ‖ 32B pool ‖ 1B depth ‖ 4B LE next_leaf_index ‖
/// 32B current_root ‖ 32B × root_history_size ring ‖ …opaque`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeAccountState {
    /// Pool this tree belongs to.
    pub pool: [u8; 32],
    /// Tree depth.
    pub depth: u8,
    /// Next free leaf index.
    pub next_leaf_index: u32,
    /// Current root.
    pub current_root: [u8; 32],
    /// Root-history ring contents (positional; staleness is implicit).
    pub root_history: Vec<[u8; 32]>,
}

impl TreeAccountState {
    const HEADER_LEN: usize = 8 + 32 + 1 + 4 + 32;

    /// Parses the account, reading a ring of `root_history_size` entries.
    pub fn parse(data: &[u8], root_history_size: usize) -> Result<Self, ChainError> {
        let ring_len = root_history_size.saturating_mul(32);
        let need = Self::HEADER_LEN.saturating_add(ring_len);
        if data.len() < need {
            return Err(ChainError::Layout(format!(
                "merkle tree account: {} bytes, need at least {need}",
                data.len()
            )));
        }

        let mut pool = [0u8; 32];
        pool.copy_from_slice(&data[8..40]);
        let depth = data[40];
        let mut next = [0u8; 4];
        next.copy_from_slice(&data[41..45]);
        let mut current_root = [0u8; 32];
        current_root.copy_from_slice(&data[45..77]);

        let mut root_history = Vec::with_capacity(root_history_size);
        for i in 0..root_history_size {
            let start = Self::HEADER_LEN.saturating_add(i.saturating_mul(32));
            let mut root = [0u8; 32];
            root.copy_from_slice(&data[start..start.saturating_add(32)]);
            root_history.push(root);
        }

        Ok(Self {
            pool,
            depth,
            next_leaf_index: u32::from_le_bytes(next),
            current_root,
            root_history,
        })
    }

    /// Serializes back to account bytes (mock chain and tests).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            Self::HEADER_LEN.saturating_add(self.root_history.len().saturating_mul(32)),
        );
        out.extend_from_slice(&account_discriminator("MerkleTreeV2"));
        out.extend_from_slice(&self.pool);
        out.push(self.depth);
        out.extend_from_slice(&self.next_leaf_index.to_le_bytes());
        out.extend_from_slice(&self.current_root);
        for root in &self.root_history {
            out.extend_from_slice(root);
        }
        out
    }
}

/// One deposit awaiting settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCommitment {
    /// The note commitment.
    pub commitment: [u8; 32],
    /// Deposited amount in base units.
    pub amount: u64,
    /// Asset identifier.
    pub asset_id: [u8; 32],
    /// Slot at which the deposit was enqueued.
    pub enqueue_slot: u64,
}

/// The pending-commitment buffer account.
///
/// Layout: `8B discriminator ‖ 32B pool ‖ 2B LE count ‖ count × 80B records`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBufferState {
    /// Pool this buffer belongs to.
    pub pool: [u8; 32],
    /// Records, in chain-assigned order.
    pub records: Vec<PendingCommitment>,
}

impl PendingBufferState {
    const HEADER_LEN: usize = 8 + 32 + 2;

    /// Parses the account. The declared count must fit inside the data; a
    /// short record area is a layout error, not a truncation.
    pub fn parse(data: &[u8]) -> Result<Self, ChainError> {
        if data.len() < Self::HEADER_LEN {
            return Err(ChainError::Layout(format!(
                "pending buffer: {} bytes, need at least {}",
                data.len(),
                Self::HEADER_LEN
            )));
        }
        let mut pool = [0u8; 32];
        pool.copy_from_slice(&data[8..40]);
        let count = usize::from(u16::from_le_bytes([data[40], data[41]]));

        let need = Self::HEADER_LEN.saturating_add(count.saturating_mul(PENDING_RECORD_LEN));
        if data.len() < need {
            return Err(ChainError::Layout(format!(
                "pending buffer declares {count} records but holds {} bytes (need {need})",
                data.len()
            )));
        }

        let mut records = Vec::with_capacity(count);
        for i in 0..count {
            let start = Self::HEADER_LEN.saturating_add(i.saturating_mul(PENDING_RECORD_LEN));
            let record = &data[start..start.saturating_add(PENDING_RECORD_LEN)];
            let mut commitment = [0u8; 32];
            commitment.copy_from_slice(&record[0..32]);
            let mut amount = [0u8; 8];
            amount.copy_from_slice(&record[32..40]);
            let mut asset_id = [0u8; 32];
            asset_id.copy_from_slice(&record[40..72]);
            let mut slot = [0u8; 8];
            slot.copy_from_slice(&record[72..80]);
            records.push(PendingCommitment {
                commitment,
                amount: u64::from_le_bytes(amount),
                asset_id,
                enqueue_slot: u64::from_le_bytes(slot),
            });
        }

        Ok(Self { pool, records })
    }

    /// Serializes back to account bytes (mock chain and tests).
    pub fn encode(&self) -> Result<Vec<u8>, ChainError> {
        let count = u16::try_from(self.records.len()).map_err(|_| {
            ChainError::Layout(format!("{} records overflow the u16 count", self.records.len()))
        })?;
        let mut out = Vec::with_capacity(
            Self::HEADER_LEN.saturating_add(self.records.len().saturating_mul(PENDING_RECORD_LEN)),
        );
        out.extend_from_slice(&account_discriminator("PendingDepositsBuffer"));
        out.extend_from_slice(&self.pool);
        out.extend_from_slice(&count.to_le_bytes());
        for record in &self.records {
            out.extend_from_slice(&record.commitment);
            out.extend_from_slice(&record.amount.to_le_bytes());
            out.extend_from_slice(&record.asset_id);
            out.extend_from_slice(&record.enqueue_slot.to_le_bytes());
        }
        Ok(out)
    }
}
