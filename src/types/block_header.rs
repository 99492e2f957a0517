//! Block header and its RLP codec.

use std::sync::OnceLock;

use primitive_types::{H256, U256};

use super::{Address, Wei};
use crate::crypto::keccak256;
use crate::rlp::{RlpDecoder, RlpEncoder, RlpError};

/// Maximum size of the extra-data field.
pub const MAX_EXTRA_DATA_BYTES: usize = 32;

/// A block header.
///
/// Trailing optional fields appear in the RLP encoding only as a contiguous
/// suffix: base fee, withdrawals root, (blob gas used, excess blob gas),
/// parent beacon root, requests root. Any valid truncation point is
/// accepted on read.
#[derive(Debug)]
pub struct BlockHeader {
    pub parent_hash: H256,
    pub ommers_hash: H256,
    pub coinbase: Address,
    pub state_root: H256,
    pub transactions_root: H256,
    pub receipts_root: H256,
    pub logs_bloom: Vec<u8>,
    pub difficulty: U256,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Vec<u8>,
    /// Mix hash under proof-of-work, prev-randao after the merge.
    pub mix_hash: H256,
    pub nonce: u64,
    pub base_fee: Option<Wei>,
    pub withdrawals_root: Option<H256>,
    pub blob_gas_used: Option<u64>,
    pub excess_blob_gas: Option<u64>,
    pub parent_beacon_root: Option<H256>,
    pub requests_root: Option<H256>,
    /// Memoized header hash; a pure function of the fields above.
    hash: OnceLock<H256>,
}

impl Default for BlockHeader {
    fn default() -> Self {
        Self {
            parent_hash: H256::zero(),
            ommers_hash: H256::zero(),
            coinbase: Address::zero(),
            state_root: H256::zero(),
            transactions_root: H256::zero(),
            receipts_root: H256::zero(),
            logs_bloom: vec![0; 256],
            difficulty: U256::zero(),
            number: 0,
            gas_limit: 0,
            gas_used: 0,
            timestamp: 0,
            extra_data: Vec::new(),
            mix_hash: H256::zero(),
            nonce: 0,
            base_fee: None,
            withdrawals_root: None,
            blob_gas_used: None,
            excess_blob_gas: None,
            parent_beacon_root: None,
            requests_root: None,
            hash: OnceLock::new(),
        }
    }
}

impl Clone for BlockHeader {
    fn clone(&self) -> Self {
        Self {
            parent_hash: self.parent_hash,
            ommers_hash: self.ommers_hash,
            coinbase: self.coinbase,
            state_root: self.state_root,
            transactions_root: self.transactions_root,
            receipts_root: self.receipts_root,
            logs_bloom: self.logs_bloom.clone(),
            difficulty: self.difficulty,
            number: self.number,
            gas_limit: self.gas_limit,
            gas_used: self.gas_used,
            timestamp: self.timestamp,
            extra_data: self.extra_data.clone(),
            mix_hash: self.mix_hash,
            nonce: self.nonce,
            base_fee: self.base_fee,
            withdrawals_root: self.withdrawals_root,
            blob_gas_used: self.blob_gas_used,
            excess_blob_gas: self.excess_blob_gas,
            parent_beacon_root: self.parent_beacon_root,
            requests_root: self.requests_root,
            hash: OnceLock::new(),
        }
    }
}

impl PartialEq for BlockHeader {
    fn eq(&self, other: &Self) -> bool {
        self.rlp_encode() == other.rlp_encode()
    }
}

impl Eq for BlockHeader {}

impl BlockHeader {
    /// Returns the header hash, computing it on first access.
    pub fn hash(&self) -> H256 {
        *self
            .hash
            .get_or_init(|| H256(keccak256(&self.rlp_encode())))
    }

    /// Encodes the header as an RLP list.
    pub fn rlp_encode(&self) -> Vec<u8> {
        let mut enc = RlpEncoder::new();
        self.write_to(&mut enc);
        enc.into_bytes()
    }

    /// Writes the header fields to an encoder.
    pub fn write_to(&self, enc: &mut RlpEncoder) {
        enc.encode_list(|e| {
            e.encode_h256(&self.parent_hash);
            e.encode_h256(&self.ommers_hash);
            e.encode_address(&self.coinbase);
            e.encode_h256(&self.state_root);
            e.encode_h256(&self.transactions_root);
            e.encode_h256(&self.receipts_root);
            e.encode_bytes(&self.logs_bloom);
            e.encode_u256(&self.difficulty);
            e.encode_u64(self.number);
            e.encode_u64(self.gas_limit);
            e.encode_u64(self.gas_used);
            e.encode_u64(self.timestamp);
            e.encode_bytes(&self.extra_data);
            e.encode_h256(&self.mix_hash);
            e.encode_bytes(&self.nonce.to_be_bytes());

            // Trailing optionals are written as a contiguous suffix only.
            loop {
                let Some(base_fee) = self.base_fee else { break };
                e.encode_u256(&base_fee.as_u256());

                let Some(withdrawals_root) = self.withdrawals_root else {
                    break;
                };
                e.encode_h256(&withdrawals_root);

                let (Some(blob_gas_used), Some(excess_blob_gas)) =
                    (self.blob_gas_used, self.excess_blob_gas)
                else {
                    break;
                };
                e.encode_u64(blob_gas_used);
                e.encode_u64(excess_blob_gas);

                let Some(parent_beacon_root) = self.parent_beacon_root else {
                    break;
                };
                e.encode_h256(&parent_beacon_root);

                let Some(requests_root) = self.requests_root else { break };
                e.encode_h256(&requests_root);
                break;
            }
        });
    }

    /// Reads a header from a decoder, accepting any valid truncation of the
    /// optional suffix. Extra data beyond the known fields is an error.
    pub fn read_from(dec: &mut RlpDecoder<'_>) -> Result<Self, RlpError> {
        dec.enter_list()?;
        let mut header = BlockHeader {
            parent_hash: dec.read_h256()?,
            ommers_hash: dec.read_h256()?,
            coinbase: dec.read_address()?,
            state_root: dec.read_h256()?,
            transactions_root: dec.read_h256()?,
            receipts_root: dec.read_h256()?,
            logs_bloom: dec.read_bytes()?.to_vec(),
            difficulty: dec.read_u256_scalar()?,
            number: dec.read_u64_scalar()?,
            gas_limit: dec.read_u64_scalar()?,
            gas_used: dec.read_u64_scalar()?,
            timestamp: dec.read_u64_scalar()?,
            extra_data: dec.read_bytes()?.to_vec(),
            mix_hash: dec.read_h256()?,
            ..Default::default()
        };

        if header.extra_data.len() > MAX_EXTRA_DATA_BYTES {
            return Err(RlpError::WrongLength {
                expected: MAX_EXTRA_DATA_BYTES,
                actual: header.extra_data.len(),
            });
        }

        let nonce_bytes = dec.read_bytes()?;
        if nonce_bytes.len() != 8 {
            return Err(RlpError::WrongLength {
                expected: 8,
                actual: nonce_bytes.len(),
            });
        }
        let mut nonce = [0u8; 8];
        nonce.copy_from_slice(nonce_bytes);
        header.nonce = u64::from_be_bytes(nonce);

        loop {
            if dec.is_list_finished() {
                break;
            }
            header.base_fee = Some(Wei::new(dec.read_u256_scalar()?));

            if dec.is_list_finished() {
                break;
            }
            header.withdrawals_root = Some(dec.read_h256()?);

            if dec.is_list_finished() {
                break;
            }
            header.blob_gas_used = Some(dec.read_u64_scalar()?);
            header.excess_blob_gas = Some(dec.read_u64_scalar()?);

            if dec.is_list_finished() {
                break;
            }
            header.parent_beacon_root = Some(dec.read_h256()?);

            if dec.is_list_finished() {
                break;
            }
            header.requests_root = Some(dec.read_h256()?);
            break;
        }

        dec.leave_list()?;
        Ok(header)
    }
}
