//! Transaction wire codec: typed envelopes over RLP.
//!
//! The first byte selects the typed payload (1 = access list, 2 = EIP-1559,
//! 3 = blob, 4 = set-code); anything else is a bare legacy RLP list.

use primitive_types::H256;

use super::transaction::{AccessListEntry, Authorization, SignatureData, Transaction, TxType};
use super::Wei;
use crate::rlp::{RlpDecoder, RlpEncoder, RlpError};

impl Transaction {
    /// Decodes a transaction from its wire representation.
    ///
    /// The sender is not recoverable here; it stays zeroed until the ingest
    /// layer attaches the recovered address.
    pub fn decode(data: &[u8]) -> Result<Transaction, RlpError> {
        match data.first() {
            None => Err(RlpError::UnexpectedEof),
            Some(1) => decode_typed(TxType::AccessList, &data[1..]),
            Some(2) => decode_typed(TxType::Eip1559, &data[1..]),
            Some(3) => decode_typed(TxType::Blob, &data[1..]),
            Some(4) => decode_typed(TxType::SetCode, &data[1..]),
            Some(b) if *b >= 0xc0 => decode_legacy(data),
            Some(_) => Err(RlpError::InvalidPrefix),
        }
    }

    /// Encodes the transaction to its wire representation.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(type_byte) = self.tx_type.type_byte() {
            out.push(type_byte);
        }
        let mut enc = RlpEncoder::new();
        enc.encode_list(|e| match self.tx_type {
            TxType::Legacy => encode_legacy_fields(self, e),
            TxType::AccessList => encode_access_list_fields(self, e),
            TxType::Eip1559 | TxType::Blob | TxType::SetCode => encode_dynamic_fields(self, e),
        });
        out.extend_from_slice(enc.as_bytes());
        out
    }
}

fn encode_to(enc: &mut RlpEncoder, to: &Option<super::Address>) {
    match to {
        Some(address) => enc.encode_address(address),
        None => enc.encode_empty(),
    }
}

fn encode_access_list(enc: &mut RlpEncoder, access_list: &[AccessListEntry]) {
    enc.encode_list(|e| {
        for entry in access_list {
            e.encode_list(|e| {
                e.encode_address(&entry.address);
                e.encode_list(|e| {
                    for key in &entry.storage_keys {
                        e.encode_h256(key);
                    }
                });
            });
        }
    });
}

fn encode_signature(enc: &mut RlpEncoder, signature: &SignatureData) {
    enc.encode_u64(signature.v);
    enc.encode_u256(&signature.r);
    enc.encode_u256(&signature.s);
}

fn encode_legacy_fields(tx: &Transaction, enc: &mut RlpEncoder) {
    enc.encode_u64(tx.nonce);
    enc.encode_u256(&tx.gas_price.unwrap_or_else(Wei::zero).as_u256());
    enc.encode_u64(tx.gas_limit);
    encode_to(enc, &tx.to);
    enc.encode_u256(&tx.value.as_u256());
    enc.encode_bytes(&tx.payload);
    encode_signature(enc, &tx.signature);
}

fn encode_access_list_fields(tx: &Transaction, enc: &mut RlpEncoder) {
    enc.encode_u64(tx.chain_id.unwrap_or_default());
    enc.encode_u64(tx.nonce);
    enc.encode_u256(&tx.gas_price.unwrap_or_else(Wei::zero).as_u256());
    enc.encode_u64(tx.gas_limit);
    encode_to(enc, &tx.to);
    enc.encode_u256(&tx.value.as_u256());
    enc.encode_bytes(&tx.payload);
    encode_access_list(enc, &tx.access_list);
    encode_signature(enc, &tx.signature);
}

fn encode_dynamic_fields(tx: &Transaction, enc: &mut RlpEncoder) {
    enc.encode_u64(tx.chain_id.unwrap_or_default());
    enc.encode_u64(tx.nonce);
    enc.encode_u256(&tx.max_priority_fee_per_gas.unwrap_or_else(Wei::zero).as_u256());
    enc.encode_u256(&tx.max_fee_per_gas.unwrap_or_else(Wei::zero).as_u256());
    enc.encode_u64(tx.gas_limit);
    encode_to(enc, &tx.to);
    enc.encode_u256(&tx.value.as_u256());
    enc.encode_bytes(&tx.payload);
    encode_access_list(enc, &tx.access_list);
    match tx.tx_type {
        TxType::Blob => {
            enc.encode_u256(&tx.max_fee_per_blob_gas.unwrap_or_else(Wei::zero).as_u256());
            enc.encode_list(|e| {
                for hash in &tx.versioned_hashes {
                    e.encode_h256(hash);
                }
            });
        }
        TxType::SetCode => {
            enc.encode_list(|e| {
                for auth in &tx.authorization_list {
                    e.encode_list(|e| {
                        e.encode_u64(auth.chain_id);
                        e.encode_address(&auth.address);
                        e.encode_u64(auth.nonce);
                        encode_signature(e, &auth.signature);
                    });
                }
            });
        }
        _ => {}
    }
    encode_signature(enc, &tx.signature);
}

fn decode_access_list(dec: &mut RlpDecoder<'_>) -> Result<Vec<AccessListEntry>, RlpError> {
    let mut entries = Vec::new();
    dec.enter_list()?;
    while !dec.is_list_finished() {
        dec.enter_list()?;
        let address = dec.read_address()?;
        let mut storage_keys: Vec<H256> = Vec::new();
        dec.enter_list()?;
        while !dec.is_list_finished() {
            storage_keys.push(dec.read_h256()?);
        }
        dec.leave_list()?;
        dec.leave_list()?;
        entries.push(AccessListEntry {
            address,
            storage_keys,
        });
    }
    dec.leave_list()?;
    Ok(entries)
}

fn decode_signature(dec: &mut RlpDecoder<'_>) -> Result<SignatureData, RlpError> {
    let v = dec.read_u64_scalar()?;
    let r = dec.read_u256_scalar()?;
    let s = dec.read_u256_scalar()?;
    Ok(SignatureData { r, s, v })
}

fn decode_legacy(data: &[u8]) -> Result<Transaction, RlpError> {
    let mut dec = RlpDecoder::new(data);
    dec.enter_list()?;
    let nonce = dec.read_u64_scalar()?;
    let gas_price = Wei::new(dec.read_u256_scalar()?);
    let gas_limit = dec.read_u64_scalar()?;
    let to = dec.read_optional_address()?;
    let value = Wei::new(dec.read_u256_scalar()?);
    let payload = dec.read_bytes()?.to_vec();
    let signature = decode_signature(&mut dec)?;
    dec.leave_list()?;
    if !dec.is_done() {
        return Err(RlpError::TrailingBytes);
    }

    Ok(Transaction {
        tx_type: TxType::Legacy,
        chain_id: signature.legacy_chain_id(),
        nonce,
        gas_limit,
        to,
        value,
        payload,
        gas_price: Some(gas_price),
        signature,
        ..Default::default()
    })
}

fn decode_typed(tx_type: TxType, data: &[u8]) -> Result<Transaction, RlpError> {
    let mut dec = RlpDecoder::new(data);
    dec.enter_list()?;
    let chain_id = dec.read_u64_scalar()?;
    let nonce = dec.read_u64_scalar()?;

    let mut tx = Transaction {
        tx_type,
        chain_id: Some(chain_id),
        nonce,
        ..Default::default()
    };

    if tx_type.supports_1559_fee_market() {
        tx.max_priority_fee_per_gas = Some(Wei::new(dec.read_u256_scalar()?));
        tx.max_fee_per_gas = Some(Wei::new(dec.read_u256_scalar()?));
    } else {
        tx.gas_price = Some(Wei::new(dec.read_u256_scalar()?));
    }

    tx.gas_limit = dec.read_u64_scalar()?;
    tx.to = dec.read_optional_address()?;
    tx.value = Wei::new(dec.read_u256_scalar()?);
    tx.payload = dec.read_bytes()?.to_vec();
    tx.access_list = decode_access_list(&mut dec)?;

    match tx_type {
        TxType::Blob => {
            tx.max_fee_per_blob_gas = Some(Wei::new(dec.read_u256_scalar()?));
            dec.enter_list()?;
            while !dec.is_list_finished() {
                tx.versioned_hashes.push(dec.read_h256()?);
            }
            dec.leave_list()?;
        }
        TxType::SetCode => {
            dec.enter_list()?;
            while !dec.is_list_finished() {
                dec.enter_list()?;
                let chain_id = dec.read_u64_scalar()?;
                let address = dec.read_address()?;
                let nonce = dec.read_u64_scalar()?;
                let signature = decode_signature(&mut dec)?;
                dec.leave_list()?;
                tx.authorization_list.push(Authorization {
                    chain_id,
                    address,
                    nonce,
                    signature,
                });
            }
            dec.leave_list()?;
        }
        _ => {}
    }

    tx.signature = decode_signature(&mut dec)?;
    dec.leave_list()?;
    if !dec.is_done() {
        return Err(RlpError::TrailingBytes);
    }
    Ok(tx)
}
