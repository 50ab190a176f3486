//! The chain boundary: byte-exact account layouts, instruction encoding,
//! settlement-event parsing, and the opaque client the sequencer drives.
//!
//! The transport itself (RPC submission, account fetches, log
//! subscriptions) is an external collaborator; this crate fixes the byte
//! formats crossing that boundary and ships an in-memory chain that enforces
//! the settlement program's acceptance rules for tests and dry runs.

mod accounts;
mod client;
mod error;
mod events;
mod instruction;
mod mock;
mod retry;

pub use accounts::{
    PENDING_RECORD_LEN, PendingBufferState, PendingCommitment, TreeAccountState,
    account_discriminator,
};
pub use client::{ChainClient, ChainTreeState};
pub use error::ChainError;
pub use events::{CommitmentInserted, format_settled_leaf, parse_log_events, parse_settled_leaf};
pub use instruction::{
    SETTLE_INSTRUCTION_NAME, encode_settle_instruction, instruction_discriminator,
};
pub use mock::MockChain;
pub use retry::{RetryPolicy, retry_with_backoff};
