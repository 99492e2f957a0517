//! Error taxonomy for validation, execution, and world-state access.

use thiserror::Error;

use super::frame::HaltReason;
use crate::trie::TrieError;

/// Why a transaction was rejected or failed.
///
/// These reasons are user-visible: they drive receipts and mempool
/// decisions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    #[error("invalid signature: {0}")]
    SignatureInvalid(String),
    #[error("wrong chain id: {0}")]
    WrongChainId(String),
    #[error("replay protected signatures are not supported")]
    ReplayProtectedUnsupported,
    #[error("invalid transaction format: {0}")]
    InvalidTransactionFormat(String),
    #[error("nonce must be less than 2^64-1")]
    NonceOverflow,
    #[error("initcode too large: {0}")]
    InitcodeTooLarge(String),
    #[error("gas price is less than the current base fee: {0}")]
    GasPriceBelowBaseFee(String),
    #[error("max priority fee per gas cannot be greater than max fee per gas")]
    MaxPriorityFeeExceedsMaxFee,
    #[error("intrinsic gas cost exceeds gas limit: {0}")]
    IntrinsicGasExceedsLimit(String),
    #[error("up-front gas cost cannot exceed 2^256 wei")]
    UpfrontCostExceedsUint256,
    #[error("up-front cost exceeds sender balance: {0}")]
    UpfrontCostExceedsBalance(String),
    #[error("nonce too low: {0}")]
    NonceTooLow(String),
    #[error("nonce too high: {0}")]
    NonceTooHigh(String),
    #[error("sender has deployed code and is not authorized to send transactions")]
    TxSenderNotAuthorized,
    #[error("invalid blobs: {0}")]
    InvalidBlobs(String),
    #[error("total blob gas too high: {0}")]
    TotalBlobGasTooHigh(String),
    #[error("blob gas price below current blob base fee: {0}")]
    BlobGasPriceBelowBase(String),
    #[error("execution halted: {0}")]
    ExecutionHalted(HaltReason),
    #[error("invalid code: {0}")]
    EofCodeInvalid(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

/// Failures raised by the world-state backing store.
///
/// `Corrupted` is the recoverable heal signal: it must be re-raised to the
/// caller, never degraded to an internal error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("corrupted state: {0}")]
    Corrupted(String),
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl From<TrieError> for StateError {
    fn from(err: TrieError) -> Self {
        match err {
            TrieError::Corrupted(detail) => StateError::Corrupted(detail),
            other => StateError::Backend(other.to_string()),
        }
    }
}

/// Failures the transaction processor re-raises to its caller.
///
/// Everything else is reported inside the returned result; corruption
/// alone escapes, so the caller can trigger a heal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessorError {
    #[error("corrupted state: {0}")]
    Corruption(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trie_corruption_stays_distinct() {
        let err: StateError = TrieError::Corrupted("missing node".into()).into();
        assert!(matches!(err, StateError::Corrupted(_)));

        let err: StateError = TrieError::NotFound.into();
        assert!(matches!(err, StateError::Backend(_)));
    }

    #[test]
    fn test_reason_messages() {
        assert_eq!(
            InvalidReason::NonceOverflow.to_string(),
            "nonce must be less than 2^64-1"
        );
        assert!(InvalidReason::NonceTooLow("tx 1 below account 2".into())
            .to_string()
            .contains("nonce too low"));
    }
}
