//! Transaction types and fee accessors.

use primitive_types::{H256, U256};

use super::{Address, Wei};

/// Transaction type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TxType {
    /// Untyped pre-Berlin transaction.
    Legacy,
    /// EIP-2930 access-list transaction (type 1).
    AccessList,
    /// EIP-1559 dynamic-fee transaction (type 2).
    Eip1559,
    /// EIP-4844 blob transaction (type 3).
    Blob,
    /// EIP-7702 set-code transaction (type 4).
    SetCode,
}

impl TxType {
    /// Wire type byte; legacy transactions have none.
    pub fn type_byte(&self) -> Option<u8> {
        match self {
            TxType::Legacy => None,
            TxType::AccessList => Some(1),
            TxType::Eip1559 => Some(2),
            TxType::Blob => Some(3),
            TxType::SetCode => Some(4),
        }
    }

    /// Returns true for types priced with max-fee / max-priority-fee.
    pub fn supports_1559_fee_market(&self) -> bool {
        matches!(self, TxType::Eip1559 | TxType::Blob | TxType::SetCode)
    }

    /// Returns true for types that carry blobs.
    pub fn supports_blob(&self) -> bool {
        matches!(self, TxType::Blob)
    }
}

/// An access-list entry: an address and the storage keys warmed for it.
///
/// Duplicates are permitted; gas is charged per entry and per key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessListEntry {
    pub address: Address,
    pub storage_keys: Vec<H256>,
}

/// Blobs with their KZG commitments and proofs, carried alongside a blob
/// transaction. Parallel to the transaction's versioned hashes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlobSidecar {
    pub blobs: Vec<Vec<u8>>,
    pub commitments: Vec<[u8; 48]>,
    pub proofs: Vec<[u8; 48]>,
}

/// An EIP-7702 authorization: lets `address`'s code act for the signer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authorization {
    pub chain_id: u64,
    pub address: Address,
    pub nonce: u64,
    pub signature: SignatureData,
}

/// ECDSA signature fields.
///
/// `v` is 0/1 for typed transactions; legacy transactions use 27/28 or the
/// EIP-155 chain-id encoding (chain_id * 2 + 35 + recovery_id).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SignatureData {
    pub r: U256,
    pub s: U256,
    pub v: u64,
}

impl SignatureData {
    /// Extracts the recovery id (0 or 1) from `v`.
    pub fn recovery_id(&self) -> Option<u8> {
        match self.v {
            0 | 1 => Some(self.v as u8),
            27 | 28 => Some((self.v - 27) as u8),
            v if v >= 35 => Some(((v - 35) % 2) as u8),
            _ => None,
        }
    }

    /// Extracts the EIP-155 chain id from a legacy `v`, if present.
    pub fn legacy_chain_id(&self) -> Option<u64> {
        if self.v >= 35 {
            Some((self.v - 35) / 2)
        } else {
            None
        }
    }
}

/// A single transaction of any supported type.
///
/// Fields not applicable to the tagged type stay at their defaults; the
/// accessors below pick the right fee fields per type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub tx_type: TxType,
    pub chain_id: Option<u64>,
    pub nonce: u64,
    pub gas_limit: u64,
    /// Destination; absent means contract creation.
    pub to: Option<Address>,
    pub value: Wei,
    pub payload: Vec<u8>,
    /// Explicit gas price (legacy and access-list types).
    pub gas_price: Option<Wei>,
    /// EIP-1559 priority fee cap.
    pub max_priority_fee_per_gas: Option<Wei>,
    /// EIP-1559 total fee cap.
    pub max_fee_per_gas: Option<Wei>,
    /// EIP-4844 blob fee cap.
    pub max_fee_per_blob_gas: Option<Wei>,
    pub access_list: Vec<AccessListEntry>,
    /// EIP-4844 versioned blob hashes.
    pub versioned_hashes: Vec<H256>,
    /// Blob payload; present only when the sidecar travels with the tx.
    pub blob_sidecar: Option<BlobSidecar>,
    /// EIP-7702 authorization list.
    pub authorization_list: Vec<Authorization>,
    pub signature: SignatureData,
    /// Recovered sender; attached by the ingest layer after recovery.
    pub sender: Address,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            tx_type: TxType::Legacy,
            chain_id: None,
            nonce: 0,
            gas_limit: 0,
            to: None,
            value: Wei::zero(),
            payload: Vec::new(),
            gas_price: None,
            max_priority_fee_per_gas: None,
            max_fee_per_gas: None,
            max_fee_per_blob_gas: None,
            access_list: Vec::new(),
            versioned_hashes: Vec::new(),
            blob_sidecar: None,
            authorization_list: Vec::new(),
            signature: SignatureData::default(),
            sender: Address::zero(),
        }
    }
}

impl Transaction {
    /// Returns true when the transaction creates a contract.
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    /// Number of blobs referenced by the transaction.
    pub fn blob_count(&self) -> usize {
        self.versioned_hashes.len()
    }

    /// Number of set-code authorizations.
    pub fn authorization_list_size(&self) -> usize {
        self.authorization_list.len()
    }

    /// The most the sender can pay per unit of gas: the fee cap for
    /// 1559-typed transactions, the explicit price otherwise.
    pub fn max_gas_price(&self) -> Wei {
        if self.tx_type.supports_1559_fee_market() {
            self.max_fee_per_gas.unwrap_or_else(Wei::zero)
        } else {
            self.gas_price.unwrap_or_else(Wei::zero)
        }
    }

    /// Gas charged up front: gas_limit x price + blob_gas x blob_price.
    /// `None` when the product overflows 256 bits.
    pub fn upfront_gas_cost(&self, price: Wei, blob_price: Wei, blob_gas: u64) -> Option<Wei> {
        let execution = price.checked_mul_gas(self.gas_limit)?;
        let blob = blob_price.checked_mul_gas(blob_gas)?;
        execution.checked_add(blob)
    }

    /// Maximum wei the sender must hold at validation time:
    /// gas_limit x max price + value + blob_gas x blob fee cap.
    /// `None` when the total overflows 256 bits.
    pub fn upfront_cost(&self, blob_gas: u64) -> Option<Wei> {
        let blob_fee_cap = self.max_fee_per_blob_gas.unwrap_or_else(Wei::zero);
        self.max_gas_price()
            .checked_mul_gas(self.gas_limit)?
            .checked_add(self.value)?
            .checked_add(blob_fee_cap.checked_mul_gas(blob_gas)?)
    }
}
