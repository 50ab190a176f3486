//! Asset identifiers for the multi-asset pool.
//!
//! An asset id is derived once at registration from the asset's mint address
//! and never changes. The high byte is forced to zero so the identifier
//! always fits in the scalar field (< 2^248 < r) without reduction.

use std::fmt;

use sha3::{Digest as _, Keccak256};

use crate::error::CoreError;
use crate::field::Element;

/// Domain separator for asset-id derivation. Must match the on-chain program.
pub const ASSET_ID_DOMAIN: &[u8] = b"psol:asset_id:v1";

/// A 32-byte asset identifier with a forced zero high byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetId([u8; 32]);

impl AssetId {
    /// Derives the asset id for a mint:
    /// `0x00 ‖ keccak256(domain ‖ mint)[0..31]`.
    pub fn derive(mint: &[u8; 32]) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(ASSET_ID_DOMAIN);
        hasher.update(mint);
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out[1..32].copy_from_slice(&digest[0..31]);
        Self(out)
    }

    /// Wraps raw bytes, rejecting a non-zero high byte.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CoreError> {
        if bytes[0] != 0 {
            return Err(CoreError::InvalidAssetId);
        }
        Ok(Self(bytes))
    }

    /// The raw 32-byte identifier.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lifts the identifier into the scalar field. Total, because the high
    /// byte is zero.
    pub fn to_element(self) -> Element {
        // Canonical by construction; see from_bytes/derive.
        Element::from_be32(&self.0).unwrap_or(Element::ZERO)
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId(0x{})", hex::encode(self.0))
    }
}
