//! Consensus value types: scalars, accounts, transactions, block headers.

mod account;
mod block_header;
mod codec;
mod transaction;
mod wei;

pub use account::{Account, EMPTY_CODE_HASH, MAX_NONCE};
pub use block_header::{BlockHeader, MAX_EXTRA_DATA_BYTES};
pub use transaction::{
    AccessListEntry, Authorization, BlobSidecar, SignatureData, Transaction, TxType,
};
pub use wei::Wei;

use primitive_types::H160;

use crate::crypto::keccak256;
use crate::rlp::RlpEncoder;

/// A 20-byte account address.
pub type Address = H160;

/// Computes the address of a contract created by `sender` at `nonce`:
/// the low 20 bytes of keccak256(rlp([sender, nonce])).
pub fn contract_address(sender: &Address, nonce: u64) -> Address {
    let mut enc = RlpEncoder::new();
    enc.encode_list(|e| {
        e.encode_address(sender);
        e.encode_u64(nonce);
    });
    let hash = keccak256(enc.as_bytes());
    Address::from_slice(&hash[12..])
}
