//! Bounded ring of recently valid roots.

use psol_core::Element;

/// Circular buffer of roots, indexed by insertion position modulo capacity.
///
/// Withdrawal proofs are accepted against any root still in the ring, which
/// absorbs settlements that land while a proof is in flight.
#[derive(Debug, Clone)]
pub struct RootRing {
    slots: Vec<Element>,
    next: usize,
    filled: usize,
}

impl RootRing {
    /// Creates an empty ring. Capacity must be non-zero (the tree
    /// constructor validates the real floor).
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Element::ZERO; capacity.max(1)],
            next: 0,
            filled: 0,
        }
    }

    /// Records a root, overwriting the oldest entry once full.
    pub fn push(&mut self, root: Element) {
        if let Some(slot) = self.slots.get_mut(self.next) {
            *slot = root;
        }
        self.next = self.next.wrapping_add(1) % self.slots.len();
        self.filled = self.filled.saturating_add(1).min(self.slots.len());
    }

    /// True when the root is still in the ring.
    pub fn contains(&self, root: &Element) -> bool {
        self.slots
            .iter()
            .take(self.filled)
            .any(|slot| slot == root)
    }

    /// The ring capacity.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
