//! Settlement-event parsing from structured program logs.
//!
//! The settlement handler emits one recovery line per settled leaf:
//! `SETTLED_LEAF idx=<index> commit=<hex64>`. Rebuild replays these to
//! reconstruct the local tree; they are the event log keyed by leaf index.

use crate::error::ChainError;

/// One settled commitment, as recovered from the program log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitmentInserted {
    /// The leaf index the chain assigned.
    pub leaf_index: u64,
    /// The settled commitment.
    pub commitment: [u8; 32],
}

/// Parses a single `SETTLED_LEAF` line. Returns `None` for unrelated lines.
pub fn parse_settled_leaf(line: &str) -> Option<Result<CommitmentInserted, ChainError>> {
    let rest = line.trim().strip_prefix("SETTLED_LEAF ")?;
    Some(parse_fields(rest))
}

fn parse_fields(rest: &str) -> Result<CommitmentInserted, ChainError> {
    let mut leaf_index = None;
    let mut commitment = None;
    for field in rest.split_whitespace() {
        if let Some(value) = field.strip_prefix("idx=") {
            let index = value
                .parse::<u64>()
                .map_err(|_| ChainError::Layout(format!("bad leaf index {value:?}")))?;
            leaf_index = Some(index);
        } else if let Some(value) = field.strip_prefix("commit=") {
            let bytes = hex::decode(value)
                .map_err(|_| ChainError::Layout(format!("bad commitment hex {value:?}")))?;
            let array: [u8; 32] = bytes.try_into().map_err(|_| {
                ChainError::Layout("commitment is not 32 bytes".to_owned())
            })?;
            commitment = Some(array);
        }
    }
    match (leaf_index, commitment) {
        (Some(leaf_index), Some(commitment)) => Ok(CommitmentInserted {
            leaf_index,
            commitment,
        }),
        _ => Err(ChainError::Layout(
            "SETTLED_LEAF line missing idx or commit field".to_owned(),
        )),
    }
}

/// Formats the log line for a settled leaf (emitted by the mock chain, and
/// the reference for what the parser accepts).
pub fn format_settled_leaf(event: &CommitmentInserted) -> String {
    format!(
        "SETTLED_LEAF idx={} commit={}",
        event.leaf_index,
        hex::encode(event.commitment)
    )
}

/// Extracts every settlement event from a log transcript, in order.
pub fn parse_log_events(lines: &[String]) -> Result<Vec<CommitmentInserted>, ChainError> {
    let mut events = Vec::new();
    for line in lines {
        if let Some(parsed) = parse_settled_leaf(line) {
            events.push(parsed?);
        }
    }
    Ok(events)
}
