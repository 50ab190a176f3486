//! Settlement instruction encoding.

use sha2::{Digest as _, Sha256};

/// Name of the settlement instruction.
pub const SETTLE_INSTRUCTION_NAME: &str = "settle_deposits_batch";

/// Anchor-style instruction discriminator: `sha256("global:<name>")[0..8]`.
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("global:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[0..8]);
    out
}

/// Encodes the settlement instruction payload:
/// `8B discriminator ‖ 256B proof ‖ 32B new_root ‖ 2B LE batch_size`.
pub fn encode_settle_instruction(
    proof: &[u8; 256],
    new_root: &[u8; 32],
    batch_size: u16,
) -> Vec<u8> {
    let mut data = Vec::with_capacity(8 + 256 + 32 + 2);
    data.extend_from_slice(&instruction_discriminator(SETTLE_INSTRUCTION_NAME));
    data.extend_from_slice(proof);
    data.extend_from_slice(new_root);
    data.extend_from_slice(&batch_size.to_le_bytes());
    data
}
