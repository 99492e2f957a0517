//! The transaction processor: validation, execution, and fee settlement.

use primitive_types::H256;
use tracing::{debug, error, trace};

use super::error::{InvalidReason, ProcessorError, StateError};
use super::frame::{
    precompile_addresses, FrameStack, FrameState, FrameType, HaltReason, MessageFrame,
};
use super::result::TransactionResult;
use super::tracer::Tracer;
use super::validator::{TransactionValidator, ValidationParams};
use super::world::{StagedUpdater, Updater, WorldState};
use crate::gas::{FeeMarket, GasCalculator};
use crate::types::{contract_address, Address, BlockHeader, Transaction, Wei};

/// Lookup of ancestor block hashes for the BLOCKHASH operation.
pub trait BlockHashLookup {
    fn hash(&self, block_number: u64) -> H256;
}

/// The injected EVM: advances the top frame of the stack.
///
/// Each call must either move the top frame toward a terminal state or push
/// a child frame; completed children are popped and folded into their
/// parents by the implementation. A frame that halts exceptionally must
/// leave zero remaining gas.
pub trait MessageProcessor {
    fn process(
        &mut self,
        stack: &mut FrameStack,
        world: &mut dyn Updater,
        block_hashes: &dyn BlockHashLookup,
        tracer: &mut dyn Tracer,
    ) -> Result<(), StateError>;
}

/// Applies EIP-7702 authorizations ahead of execution.
///
/// Application is idempotent per (chain id, address, nonce) and rejects
/// authorizations whose signer holds contract code. Returns the authorized
/// addresses so they can be warmed.
pub trait AuthorityProcessor {
    fn apply(
        &mut self,
        world: &mut dyn Updater,
        transaction: &Transaction,
    ) -> Result<Vec<Address>, StateError>;

    /// Clears any per-transaction authorization state.
    fn reset(&mut self) {}
}

/// Validates a single transaction against consensus rules, drives its
/// frames to completion, settles gas and fees, and commits or discards the
/// world-state mutations atomically.
pub struct TransactionProcessor {
    gas_calculator: GasCalculator,
    validator: TransactionValidator,
    fee_market: FeeMarket,
    message_processor: Box<dyn MessageProcessor>,
    authority_processor: Option<Box<dyn AuthorityProcessor>>,
    clear_empty_accounts: bool,
    warm_coinbase: bool,
}

impl TransactionProcessor {
    pub fn new(
        gas_calculator: GasCalculator,
        validator: TransactionValidator,
        fee_market: FeeMarket,
        message_processor: Box<dyn MessageProcessor>,
        authority_processor: Option<Box<dyn AuthorityProcessor>>,
        clear_empty_accounts: bool,
        warm_coinbase: bool,
    ) -> Self {
        Self {
            gas_calculator,
            validator,
            fee_market,
            message_processor,
            authority_processor,
            clear_empty_accounts,
            warm_coinbase,
        }
    }

    /// Applies a transaction to the given world state.
    ///
    /// On success and on execution failure, fee settlement is committed; an
    /// invalid transaction leaves the world untouched. State corruption is
    /// re-raised as [`ProcessorError::Corruption`] so the caller can
    /// trigger a heal; any other internal failure degrades to an
    /// `InternalError` result.
    #[allow(clippy::too_many_arguments)]
    pub fn process_transaction<W: WorldState>(
        &mut self,
        world: &mut W,
        header: &BlockHeader,
        transaction: &Transaction,
        coinbase: Address,
        block_hashes: &dyn BlockHashLookup,
        tracer: &mut dyn Tracer,
        params: &ValidationParams,
        blob_gas_price: Option<Wei>,
    ) -> Result<TransactionResult, ProcessorError> {
        let mut updater = StagedUpdater::new(world);
        let outcome = self.execute(
            &mut updater,
            header,
            transaction,
            coinbase,
            block_hashes,
            tracer,
            params,
            blob_gas_price,
        );

        match outcome {
            Ok(result) => {
                if !result.is_invalid() {
                    if let Err(err) = updater.commit() {
                        return self.handle_state_error(err, transaction, tracer);
                    }
                }
                Ok(result)
            }
            Err(err) => self.handle_state_error(err, transaction, tracer),
        }
    }

    /// Corruption escapes after the tracer sees an empty end-of-transaction
    /// event; everything else becomes an invalid result.
    fn handle_state_error(
        &mut self,
        err: StateError,
        transaction: &Transaction,
        tracer: &mut dyn Tracer,
    ) -> Result<TransactionResult, ProcessorError> {
        tracer.end_transaction(transaction, false, &[], &[], 0);
        match err {
            StateError::Corrupted(detail) => Err(ProcessorError::Corruption(detail)),
            StateError::Backend(detail) => {
                error!(%detail, "critical failure processing transaction");
                Ok(TransactionResult::invalid(InvalidReason::InternalError(
                    detail,
                )))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn execute<W: WorldState>(
        &mut self,
        updater: &mut StagedUpdater<'_, W>,
        header: &BlockHeader,
        transaction: &Transaction,
        coinbase: Address,
        block_hashes: &dyn BlockHashLookup,
        tracer: &mut dyn Tracer,
        params: &ValidationParams,
        blob_gas_price: Option<Wei>,
    ) -> Result<TransactionResult, StateError> {
        trace!(?transaction, "starting execution");
        let base_fee = header.base_fee;

        // Intrinsic validity comes first; the sender may not even be
        // extractable from a badly signed transaction.
        if let Err(reason) =
            self.validator
                .validate(transaction, base_fee, blob_gas_price, params)
        {
            debug!(%reason, "invalid transaction");
            return Ok(TransactionResult::invalid(reason));
        }

        let sender_address = transaction.sender;
        let sender_account = Updater::account(updater, &sender_address)?;
        if let Err(reason) =
            self.validator
                .validate_for_sender(transaction, sender_account.as_ref(), params)
        {
            debug!(%reason, "invalid transaction");
            return Ok(TransactionResult::invalid(reason));
        }

        tracer.prepare(transaction);

        let mut authorized_addresses = Vec::new();
        if !transaction.authorization_list.is_empty() {
            let authority = self.authority_processor.as_mut().ok_or_else(|| {
                StateError::Backend(
                    "authority processor is required for set-code transactions".into(),
                )
            })?;
            authorized_addresses = authority.apply(updater, transaction)?;
        }

        let previous_nonce = updater.increment_nonce(&sender_address)?;
        trace!(
            sender = ?sender_address,
            from = previous_nonce,
            to = previous_nonce + 1,
            "incremented sender nonce"
        );

        let price = self.fee_market.transaction_price(transaction, base_fee);
        let blob_gas = self.gas_calculator.blob_gas_cost(transaction.blob_count());
        let blob_price = blob_gas_price.unwrap_or_else(Wei::zero);
        let upfront = transaction
            .upfront_gas_cost(price, blob_price, blob_gas)
            .ok_or_else(|| StateError::Backend("up-front gas cost overflows".into()))?;
        updater.decrement_balance(&sender_address, upfront)?;
        trace!(sender = ?sender_address, %upfront, "deducted up-front gas cost");

        let storage_key_count: usize = transaction
            .access_list
            .iter()
            .map(|entry| entry.storage_keys.len())
            .sum();
        let intrinsic_gas = self
            .gas_calculator
            .transaction_intrinsic_gas_cost(&transaction.payload, transaction.is_contract_creation());
        let access_list_gas = self
            .gas_calculator
            .access_list_gas_cost(transaction.access_list.len(), storage_key_count);
        let set_code_gas = self
            .gas_calculator
            .set_code_gas_cost(transaction.authorization_list_size());
        let gas_available = transaction.gas_limit - intrinsic_gas - access_list_gas - set_code_gas;
        trace!(
            gas_available,
            gas_limit = transaction.gas_limit,
            intrinsic_gas,
            access_list_gas,
            set_code_gas,
            "gas available for execution"
        );

        // Execution runs in a nested layer committed only on success; the
        // nonce bump and fee debit above stay in the root layer.
        updater.begin();
        tracer.start_transaction(transaction);

        let mut builder = MessageFrame::builder()
            .sender(sender_address)
            .value(transaction.value)
            .gas_price(price)
            .blob_gas_price(blob_price)
            .initial_gas(gas_available)
            .versioned_hashes(transaction.versioned_hashes.clone())
            .warm_addresses(authorized_addresses)
            .warm_addresses(precompile_addresses());
        if self.warm_coinbase {
            builder = builder.warm_address(coinbase);
        }
        for entry in &transaction.access_list {
            builder = builder
                .warm_address(entry.address)
                .warm_storage(entry.address, entry.storage_keys.iter().copied());
        }

        let initial_frame = if transaction.is_contract_creation() {
            let contract = contract_address(&sender_address, previous_nonce);
            builder
                .frame_type(FrameType::ContractCreation)
                .recipient(contract)
                .contract(contract)
                .code(transaction.payload.clone())
                .build()
        } else {
            let to = transaction
                .to
                .ok_or_else(|| StateError::Backend("message call without destination".into()))?;
            let code = match Updater::account(updater, &to)? {
                Some(account) => Updater::code(updater, &account.code_hash)?,
                None => Vec::new(),
            };
            builder
                .frame_type(FrameType::MessageCall)
                .recipient(to)
                .code(code)
                .input_data(transaction.payload.clone())
                .build()
        };

        let mut stack = FrameStack::new(initial_frame);
        while !stack.is_settled() {
            self.message_processor
                .process(&mut stack, updater, block_hashes, tracer)?;
        }
        let initial_frame = stack.into_initial();

        let success = initial_frame.state == FrameState::CompletedSuccess;
        let mut failure_reason = None;
        if success {
            updater.commit_layer();
        } else {
            updater.revert_layer();
            failure_reason = match &initial_frame.halt_reason {
                Some(HaltReason::InvalidCode) => Some(InvalidReason::EofCodeInvalid(
                    HaltReason::InvalidCode.to_string(),
                )),
                Some(reason) => Some(InvalidReason::ExecutionHalted(reason.clone())),
                None => None,
            };
        }

        trace!(
            by_transaction = transaction.gas_limit - initial_frame.remaining_gas,
            by_execution = gas_available - initial_frame.remaining_gas,
            "gas used"
        );

        // Refund the sender, then pay the coinbase; doing them in that
        // order keeps the math right even if they are the same account.
        let refunded_gas = self.gas_calculator.refunded(
            transaction.gas_limit,
            initial_frame.remaining_gas,
            initial_frame.gas_refund,
            initial_frame.self_destructs.len(),
        );
        let refunded_wei = price.mul_gas(refunded_gas);
        updater.increment_balance(&sender_address, refunded_wei)?;
        trace!(sender = ?sender_address, %refunded_wei, "refunded sender");

        let gas_used = transaction.gas_limit - initial_frame.remaining_gas;
        let coinbase_gas = transaction.gas_limit - refunded_gas;

        if let Some(base) = base_fee {
            if price < base {
                return Ok(TransactionResult::failed(
                    gas_used,
                    refunded_gas,
                    Some(InvalidReason::GasPriceBelowBaseFee(
                        "transaction price must be greater than base fee".into(),
                    )),
                    None,
                ));
            }
        }

        let coinbase_delta = self.fee_market.coinbase_delta(coinbase_gas, price, base_fee);
        tracer.before_reward(transaction, coinbase_delta);
        updater.increment_balance(&coinbase, coinbase_delta)?;

        if let Some(authority) = self.authority_processor.as_mut() {
            authority.reset();
        }

        tracer.end_transaction(
            transaction,
            success,
            &initial_frame.output_data,
            &initial_frame.logs,
            gas_used,
        );

        for address in &initial_frame.self_destructs {
            updater.delete(address);
        }
        if self.clear_empty_accounts {
            updater.clear_empty_accounts()?;
        }

        if success {
            Ok(TransactionResult::successful(
                initial_frame.logs,
                gas_used,
                refunded_gas,
                initial_frame.output_data,
            ))
        } else {
            if let Some(reason) = &initial_frame.halt_reason {
                debug!(%reason, "transaction processing halted");
            }
            if initial_frame.revert_reason.is_some() {
                debug!("transaction reverted");
            }
            Ok(TransactionResult::failed(
                gas_used,
                refunded_gas,
                failure_reason,
                initial_frame.revert_reason,
            ))
        }
    }
}

/// Block-hash lookup that knows no ancestors.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAncestors;

impl BlockHashLookup for NoAncestors {
    fn hash(&self, _block_number: u64) -> H256 {
        H256::zero()
    }
}
