//! The proof kinds the pool's verifier dispatches on.

/// A proof family understood by the on-chain program.
///
/// Each kind fixes the number of public inputs its verifying key expects and
/// the seed under which that key's account is derived. Which deployment
/// scheme (`vk` vs `vk_v2`) an address actually uses is configuration, not
/// code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofKind {
    /// Proves a freshly deposited commitment is well-formed.
    Deposit,
    /// Proves membership plus nullifier linkage for a withdrawal.
    Withdraw,
    /// Extended withdrawal with compliance fields.
    WithdrawV2,
    /// Proves a batched root transition for settlement.
    MerkleBatchUpdate,
}

impl ProofKind {
    /// Number of public inputs the verifier feeds the pairing check.
    pub const fn public_input_count(self) -> usize {
        match self {
            Self::Deposit => 3,
            Self::Withdraw => 8,
            Self::WithdrawV2 => 12,
            Self::MerkleBatchUpdate => 5,
        }
    }

    /// Expected `IC` length of this kind's verifying key.
    pub const fn ic_len(self) -> usize {
        self.public_input_count() + 1
    }

    /// PDA seed for the kind's verifying-key account.
    pub const fn vk_seed(self) -> &'static [u8] {
        match self {
            Self::Deposit => b"vk_deposit",
            Self::Withdraw => b"vk_withdraw",
            Self::WithdrawV2 => b"vk_withdraw_v2",
            Self::MerkleBatchUpdate => b"vk_merkle_batch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settlement_kind_matches_public_input_order() {
        // old_root, new_root, start_index, batch_size, commitments_hash
        assert_eq!(ProofKind::MerkleBatchUpdate.public_input_count(), 5);
        assert_eq!(ProofKind::MerkleBatchUpdate.ic_len(), 6);
    }

    #[test]
    fn seeds_are_distinct() {
        let seeds = [
            ProofKind::Deposit.vk_seed(),
            ProofKind::Withdraw.vk_seed(),
            ProofKind::WithdrawV2.vk_seed(),
            ProofKind::MerkleBatchUpdate.vk_seed(),
        ];
        for (i, a) in seeds.iter().enumerate() {
            for b in seeds.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
