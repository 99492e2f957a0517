//! Outcome of processing one transaction.

use super::error::InvalidReason;
use super::frame::Log;

/// Result of applying a transaction to world state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionResult {
    /// The transaction executed to completion and its mutations were
    /// committed.
    Success {
        logs: Vec<Log>,
        gas_used: u64,
        gas_refunded: u64,
        output: Vec<u8>,
    },
    /// The transaction was valid but execution halted or reverted; fees
    /// were settled, execution mutations were discarded. `reason` is set
    /// for halts; a plain revert carries only its revert data.
    Failed {
        gas_used: u64,
        gas_refunded: u64,
        reason: Option<InvalidReason>,
        revert_reason: Option<Vec<u8>>,
    },
    /// The transaction never executed; world state is untouched.
    Invalid { reason: InvalidReason },
}

impl TransactionResult {
    /// Builds a successful result.
    pub fn successful(
        logs: Vec<Log>,
        gas_used: u64,
        gas_refunded: u64,
        output: Vec<u8>,
    ) -> Self {
        TransactionResult::Success {
            logs,
            gas_used,
            gas_refunded,
            output,
        }
    }

    /// Builds a failed result.
    pub fn failed(
        gas_used: u64,
        gas_refunded: u64,
        reason: Option<InvalidReason>,
        revert_reason: Option<Vec<u8>>,
    ) -> Self {
        TransactionResult::Failed {
            gas_used,
            gas_refunded,
            reason,
            revert_reason,
        }
    }

    /// Builds an invalid result.
    pub fn invalid(reason: InvalidReason) -> Self {
        TransactionResult::Invalid { reason }
    }

    /// Returns true if the transaction executed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, TransactionResult::Success { .. })
    }

    /// Returns true if the transaction never executed.
    pub fn is_invalid(&self) -> bool {
        matches!(self, TransactionResult::Invalid { .. })
    }

    /// Gas consumed by the transaction; zero when it never executed.
    pub fn gas_used(&self) -> u64 {
        match self {
            TransactionResult::Success { gas_used, .. }
            | TransactionResult::Failed { gas_used, .. } => *gas_used,
            TransactionResult::Invalid { .. } => 0,
        }
    }

    /// The rejection or failure reason, if any.
    pub fn reason(&self) -> Option<&InvalidReason> {
        match self {
            TransactionResult::Success { .. } => None,
            TransactionResult::Failed { reason, .. } => reason.as_ref(),
            TransactionResult::Invalid { reason } => Some(reason),
        }
    }
}
