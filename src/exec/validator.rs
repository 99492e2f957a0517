//! Staged transaction validation against consensus rules.

use hashbrown::HashSet;
use tracing::debug;

use super::error::InvalidReason;
use crate::crypto::{
    kzg_versioned_hash, signature_algorithm, KzgVerifier, SenderRecovery,
    VERSIONED_HASH_VERSION_KZG,
};
use crate::gas::{FeeMarket, GasCalculator};
use crate::types::{Account, Transaction, TxType, Wei, EMPTY_CODE_HASH, MAX_NONCE};

/// Knobs loosening validation outside block import.
#[derive(Clone, Copy, Debug, Default)]
pub struct ValidationParams {
    /// Accept transactions priced below the current base fees.
    pub allow_underpriced: bool,
    /// Accept nonces above the sender's current nonce.
    pub allow_future_nonce: bool,
    /// Accept senders that hold deployed code.
    pub allow_contract_sender: bool,
}

impl ValidationParams {
    /// Strict parameters used when importing a block.
    pub fn block_import() -> Self {
        Self::default()
    }

    /// Mempool admission: future nonces are fine, prices are not.
    pub fn mempool() -> Self {
        Self {
            allow_future_nonce: true,
            ..Self::default()
        }
    }
}

/// Validates transactions in stages, short-circuiting on the first failure.
///
/// `validate` needs no account state; `validate_for_sender` runs the checks
/// that do.
pub struct TransactionValidator {
    gas_calculator: GasCalculator,
    fee_market: FeeMarket,
    chain_id: Option<u64>,
    accepted_types: HashSet<TxType>,
    disallow_malleability: bool,
    recovery: Box<dyn SenderRecovery>,
    kzg: Box<dyn KzgVerifier>,
}

impl TransactionValidator {
    pub fn new(
        gas_calculator: GasCalculator,
        fee_market: FeeMarket,
        chain_id: Option<u64>,
        accepted_types: impl IntoIterator<Item = TxType>,
        disallow_malleability: bool,
        recovery: Box<dyn SenderRecovery>,
        kzg: Box<dyn KzgVerifier>,
    ) -> Self {
        Self {
            gas_calculator,
            fee_market,
            chain_id,
            accepted_types: accepted_types.into_iter().collect(),
            disallow_malleability,
            recovery,
            kzg,
        }
    }

    /// Runs the stateless validation stages.
    pub fn validate(
        &self,
        tx: &Transaction,
        base_fee: Option<Wei>,
        blob_fee: Option<Wei>,
        params: &ValidationParams,
    ) -> Result<(), InvalidReason> {
        self.validate_signature(tx)?;
        self.validate_type(tx)?;
        if tx.tx_type.supports_blob() {
            self.validate_blob_preflight(tx)?;
            if tx.blob_sidecar.is_some() {
                self.validate_blobs(tx)?;
            }
        }
        if tx.nonce == MAX_NONCE {
            return Err(InvalidReason::NonceOverflow);
        }
        self.validate_initcode_size(tx)?;
        self.validate_cost_and_fee(tx, base_fee, blob_fee, params)
    }

    /// Runs the checks that need the sender's account.
    pub fn validate_for_sender(
        &self,
        tx: &Transaction,
        sender: Option<&Account>,
        params: &ValidationParams,
    ) -> Result<(), InvalidReason> {
        let (balance, nonce, code_hash) = match sender {
            Some(account) => (account.balance, account.nonce, account.code_hash),
            None => (Wei::zero(), 0, EMPTY_CODE_HASH),
        };

        let blob_gas = self.gas_calculator.blob_gas_cost(tx.blob_count());
        let upfront = tx
            .upfront_cost(blob_gas)
            .ok_or(InvalidReason::UpfrontCostExceedsUint256)?;
        if upfront > balance {
            return Err(InvalidReason::UpfrontCostExceedsBalance(format!(
                "up-front cost {upfront} exceeds sender balance {balance}"
            )));
        }

        if tx.nonce < nonce {
            return Err(InvalidReason::NonceTooLow(format!(
                "transaction nonce {} below sender account nonce {}",
                tx.nonce, nonce
            )));
        }
        if !params.allow_future_nonce && tx.nonce != nonce {
            return Err(InvalidReason::NonceTooHigh(format!(
                "transaction nonce {} does not match sender account nonce {}",
                tx.nonce, nonce
            )));
        }

        if !params.allow_contract_sender && code_hash != EMPTY_CODE_HASH {
            return Err(InvalidReason::TxSenderNotAuthorized);
        }

        Ok(())
    }

    fn validate_signature(&self, tx: &Transaction) -> Result<(), InvalidReason> {
        match (self.chain_id, tx.chain_id) {
            (Some(ours), Some(theirs)) if ours != theirs => {
                return Err(InvalidReason::WrongChainId(format!(
                    "transaction was meant for chain id {theirs}, not {ours}"
                )));
            }
            (None, Some(_)) => {
                return Err(InvalidReason::ReplayProtectedUnsupported);
            }
            _ => {}
        }

        if self.disallow_malleability
            && tx.signature.s > signature_algorithm().half_curve_order()
        {
            return Err(InvalidReason::SignatureInvalid(
                "signature s value is above the half curve order".into(),
            ));
        }

        if self.recovery.recover(tx).is_none() {
            return Err(InvalidReason::SignatureInvalid(
                "sender could not be extracted from transaction signature".into(),
            ));
        }
        Ok(())
    }

    fn validate_type(&self, tx: &Transaction) -> Result<(), InvalidReason> {
        if !self.accepted_types.contains(&tx.tx_type) {
            return Err(InvalidReason::InvalidTransactionFormat(format!(
                "transaction type {:?} is not accepted",
                tx.tx_type
            )));
        }
        Ok(())
    }

    fn validate_blob_preflight(&self, tx: &Transaction) -> Result<(), InvalidReason> {
        if tx.to.is_none() {
            return Err(InvalidReason::InvalidTransactionFormat(
                "blob transactions must have a to address".into(),
            ));
        }
        if tx.versioned_hashes.is_empty() {
            return Err(InvalidReason::InvalidBlobs(
                "blob transactions must specify one or more versioned hashes".into(),
            ));
        }
        Ok(())
    }

    fn validate_blobs(&self, tx: &Transaction) -> Result<(), InvalidReason> {
        let sidecar = tx
            .blob_sidecar
            .as_ref()
            .ok_or_else(|| InvalidReason::InvalidBlobs("blobs are missing".into()))?;

        if sidecar.blobs.len() != sidecar.commitments.len()
            || sidecar.blobs.len() != sidecar.proofs.len()
        {
            return Err(InvalidReason::InvalidBlobs(
                "blobs, commitments, and proofs are not the same size".into(),
            ));
        }
        if tx.versioned_hashes.len() != sidecar.commitments.len() {
            return Err(InvalidReason::InvalidBlobs(
                "versioned hashes and commitments are not the same size".into(),
            ));
        }

        for (hash, commitment) in tx.versioned_hashes.iter().zip(&sidecar.commitments) {
            if hash.as_bytes()[0] != VERSIONED_HASH_VERSION_KZG {
                return Err(InvalidReason::InvalidBlobs(format!(
                    "versioned hash version {} is not supported",
                    hash.as_bytes()[0]
                )));
            }
            if *hash != kzg_versioned_hash(commitment) {
                return Err(InvalidReason::InvalidBlobs(
                    "versioned hash does not match commitment".into(),
                ));
            }
        }

        if !self
            .kzg
            .verify_blob_proof_batch(&sidecar.blobs, &sidecar.commitments, &sidecar.proofs)
        {
            return Err(InvalidReason::InvalidBlobs(
                "kzg proof verification failed".into(),
            ));
        }
        Ok(())
    }

    fn validate_initcode_size(&self, tx: &Transaction) -> Result<(), InvalidReason> {
        if let Some(max) = self.gas_calculator.max_initcode_size() {
            if tx.is_contract_creation() && tx.payload.len() > max {
                return Err(InvalidReason::InitcodeTooLarge(format!(
                    "initcode size {} exceeds maximum size {max}",
                    tx.payload.len()
                )));
            }
        }
        Ok(())
    }

    fn validate_cost_and_fee(
        &self,
        tx: &Transaction,
        base_fee: Option<Wei>,
        blob_fee: Option<Wei>,
        params: &ValidationParams,
    ) -> Result<(), InvalidReason> {
        if let Some(base) = base_fee {
            let price = self.fee_market.transaction_price(tx, base_fee);
            if !params.allow_underpriced && price < base {
                debug!(%price, %base, "transaction underpriced");
                return Err(InvalidReason::GasPriceBelowBaseFee(format!(
                    "effective price {price} is less than the current base fee {base}"
                )));
            }
            if tx.tx_type.supports_1559_fee_market() {
                let priority = tx.max_priority_fee_per_gas.unwrap_or_else(Wei::zero);
                let max_fee = tx.max_fee_per_gas.unwrap_or_else(Wei::zero);
                if priority > max_fee {
                    return Err(InvalidReason::MaxPriorityFeeExceedsMaxFee);
                }
            }
        }

        if tx.tx_type.supports_blob() {
            let blob_gas = self.gas_calculator.blob_gas_cost(tx.blob_count());
            let limit = self.gas_calculator.current_blob_gas_limit();
            if blob_gas > limit {
                return Err(InvalidReason::TotalBlobGasTooHigh(format!(
                    "total blob gas {blob_gas} exceeds max blob gas per block {limit}"
                )));
            }
            let blob_fee = blob_fee.ok_or_else(|| {
                InvalidReason::InternalError(
                    "blob fee must be provided for blocks containing blobs".into(),
                )
            })?;
            let fee_cap = tx.max_fee_per_blob_gas.unwrap_or_else(Wei::zero);
            if !params.allow_underpriced && blob_fee > fee_cap {
                return Err(InvalidReason::BlobGasPriceBelowBase(format!(
                    "max fee per blob gas {fee_cap} is less than the blob base fee {blob_fee}"
                )));
            }
        }

        let intrinsic = self
            .gas_calculator
            .transaction_intrinsic_gas_cost(&tx.payload, tx.is_contract_creation())
            + self.gas_calculator.access_list_gas_cost(
                tx.access_list.len(),
                tx.access_list.iter().map(|e| e.storage_keys.len()).sum(),
            )
            + self
                .gas_calculator
                .set_code_gas_cost(tx.authorization_list_size());
        if intrinsic > tx.gas_limit {
            return Err(InvalidReason::IntrinsicGasExceedsLimit(format!(
                "intrinsic gas cost {intrinsic} exceeds gas limit {}",
                tx.gas_limit
            )));
        }

        let blob_gas = self.gas_calculator.blob_gas_cost(tx.blob_count());
        if tx.upfront_cost(blob_gas).is_none() {
            return Err(InvalidReason::UpfrontCostExceedsUint256);
        }
        Ok(())
    }
}
