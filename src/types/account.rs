//! Ethereum account state.

use primitive_types::H256;

use super::Wei;
use crate::crypto::EMPTY_KECCAK;
use crate::rlp::{RlpDecoder, RlpEncoder, RlpError};
use crate::trie::EMPTY_ROOT;

/// Keccak-256 hash of empty code.
pub const EMPTY_CODE_HASH: H256 = H256(EMPTY_KECCAK);

/// Largest representable nonce; a transaction may never carry it.
pub const MAX_NONCE: u64 = u64::MAX;

/// An Ethereum account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// Account nonce.
    pub nonce: u64,
    /// Account balance.
    pub balance: Wei,
    /// Code hash (keccak256 of code, or the empty-code hash).
    pub code_hash: H256,
    /// Storage trie root hash.
    pub storage_root: H256,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: Wei::zero(),
            code_hash: EMPTY_CODE_HASH,
            storage_root: H256(EMPTY_ROOT),
        }
    }
}

impl Account {
    /// Creates a new empty account.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an account with the given balance.
    pub fn with_balance(balance: Wei) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }

    /// Returns true if this is an empty account: zero nonce, zero balance,
    /// no code.
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code_hash == EMPTY_CODE_HASH
    }

    /// Returns true if the account holds deployed code.
    pub fn has_code(&self) -> bool {
        self.code_hash != EMPTY_CODE_HASH
    }

    /// Encodes the account as its state-trie leaf value:
    /// rlp([nonce, balance, storage_root, code_hash]).
    pub fn rlp_encode(&self) -> Vec<u8> {
        let mut enc = RlpEncoder::new();
        enc.encode_list(|e| {
            e.encode_u64(self.nonce);
            e.encode_u256(&self.balance.as_u256());
            e.encode_h256(&self.storage_root);
            e.encode_h256(&self.code_hash);
        });
        enc.into_bytes()
    }

    /// Decodes an account from its state-trie leaf value.
    pub fn rlp_decode(data: &[u8]) -> Result<Self, RlpError> {
        let mut dec = RlpDecoder::new(data);
        dec.enter_list()?;
        let nonce = dec.read_u64_scalar()?;
        let balance = Wei::new(dec.read_u256_scalar()?);
        let storage_root = dec.read_h256()?;
        let code_hash = dec.read_h256()?;
        dec.leave_list()?;
        Ok(Self {
            nonce,
            balance,
            code_hash,
            storage_root,
        })
    }
}
