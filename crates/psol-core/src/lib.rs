//! Core cryptographic primitives for the pSOL shielded pool.
//!
//! Everything downstream (the Merkle tree, the prover, the sequencer) builds
//! on the types in this crate: canonical BN254 field elements and curve-point
//! byte layouts, the circom-parameter Poseidon hash, asset identifiers, and
//! the note/commitment model.
//!
//! Byte encodings here must match the on-chain program bit for bit; a single
//! swapped coefficient or silently reduced scalar produces proofs that look
//! valid locally and verify nowhere.

pub mod asset;
pub mod curve;
mod error;
pub mod field;
pub mod note;
pub mod poseidon;

pub use ark_bn254::Fr;
pub use asset::AssetId;
pub use error::CoreError;
pub use field::{Element, FR_MODULUS_BE};
pub use note::{EncryptedNote, Note, NoteFile};
pub use poseidon::{h2, h4};
