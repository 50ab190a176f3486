//! Error type for the core primitives.

/// Errors produced by field, curve, hash and note operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Bytes or decimal string encode an integer that is not below the BN254
    /// scalar modulus. Callers must surface this; values are never reduced.
    #[error("non-canonical scalar: value is not below the BN254 scalar field modulus")]
    NonCanonicalScalar,
    /// A curve-point coordinate is not below the BN254 base field modulus.
    #[error("non-canonical coordinate: value is not below the BN254 base field modulus")]
    NonCanonicalCoordinate,
    /// A decimal string did not parse as an unsigned integer.
    #[error("invalid decimal field element {0:?}")]
    InvalidDecimal(String),
    /// Decoded coordinates do not lie on the expected curve.
    #[error("point is not on the BN254 curve (or not in the prime-order subgroup)")]
    PointNotOnCurve,
    /// An asset id with a non-zero high byte was supplied.
    #[error("invalid asset id: high byte must be zero")]
    InvalidAssetId,
    /// The Poseidon backend rejected the requested configuration.
    #[error("poseidon hashing failed: {0}")]
    Poseidon(String),
    /// A nullifier hash was requested for a note that has not been settled.
    #[error("note has no leaf index; it has not been settled into the tree")]
    NoLeafIndex,
    /// A note file failed structural validation.
    #[error("invalid note file: {0}")]
    InvalidNoteFile(String),
    /// Note encryption failed.
    #[error("note encryption failed")]
    Encrypt,
    /// Note decryption failed (wrong password or corrupted envelope).
    #[error("note decryption failed: wrong password or corrupted envelope")]
    Decrypt,
}

impl From<light_poseidon::PoseidonError> for CoreError {
    fn from(e: light_poseidon::PoseidonError) -> Self {
        Self::Poseidon(e.to_string())
    }
}
