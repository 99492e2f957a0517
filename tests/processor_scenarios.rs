//! End-to-end processor scenarios over an in-memory world state.
//!
//! The EVM is a scripted stand-in: each script advances the initial frame
//! through the state machine and performs the value transfers a real
//! interpreter would, so the processor's accounting is exercised without
//! interpreting opcodes.

use ethexec::crypto::{keccak256, kzg_versioned_hash, KzgVerifier, SenderRecovery};
use ethexec::exec::{
    BlockHashLookup, FrameStack, FrameState, HaltReason, InvalidReason, MessageProcessor,
    NoAncestors, NoTracer, StateError, TransactionProcessor, TransactionResult,
    TransactionValidator, Updater, ValidationParams, MemoryWorldState, WorldView,
};
use ethexec::gas::{FeeMarket, GasCalculator};
use ethexec::types::{
    contract_address, Account, Address, BlobSidecar, BlockHeader, Transaction, TxType, Wei,
};
use primitive_types::{H256, U256};

struct AcceptingRecovery;

impl SenderRecovery for AcceptingRecovery {
    fn recover(&self, tx: &Transaction) -> Option<Address> {
        Some(tx.sender)
    }
}

struct AcceptAllKzg;

impl KzgVerifier for AcceptAllKzg {
    fn verify_blob_proof_batch(
        &self,
        _blobs: &[Vec<u8>],
        _commitments: &[[u8; 48]],
        _proofs: &[[u8; 48]],
    ) -> bool {
        true
    }
}

/// What the scripted interpreter does once the initial frame executes.
#[derive(Clone)]
enum Script {
    /// Transfer the value, consume `gas` of the available gas, succeed.
    Transfer { gas: u64 },
    /// Write a little state, then run out of gas.
    OutOfGas,
    /// Consume `gas`, then revert with the given data.
    Revert { gas: u64, data: Vec<u8> },
    /// Deploy: store the runtime code at the frame recipient.
    Deploy { runtime_code: Vec<u8>, gas: u64 },
}

struct ScriptedEvm {
    script: Script,
}

impl MessageProcessor for ScriptedEvm {
    fn process(
        &mut self,
        stack: &mut FrameStack,
        world: &mut dyn Updater,
        _block_hashes: &dyn BlockHashLookup,
        _tracer: &mut dyn ethexec::exec::Tracer,
    ) -> Result<(), StateError> {
        let frame = stack.top_mut();
        match frame.state {
            FrameState::NotStarted => {
                frame.state = FrameState::CodeExecuting;
                Ok(())
            }
            FrameState::CodeExecuting => {
                match &self.script {
                    Script::Transfer { gas } => {
                        world.decrement_balance(&frame.sender, frame.value)?;
                        world.increment_balance(&frame.recipient, frame.value)?;
                        let spend = (*gas).min(frame.remaining_gas);
                        frame.remaining_gas -= spend;
                        frame.state = FrameState::CompletedSuccess;
                    }
                    Script::OutOfGas => {
                        // Stage changes that must be discarded with the halt
                        world.increment_balance(&frame.recipient, Wei::from_u64(999))?;
                        world.set_storage(frame.recipient, H256::repeat_byte(0x01), U256::from(1));
                        frame.halt(HaltReason::OutOfGas);
                    }
                    Script::Revert { gas, data } => {
                        world.increment_balance(&frame.recipient, Wei::from_u64(999))?;
                        let spend = (*gas).min(frame.remaining_gas);
                        frame.remaining_gas -= spend;
                        frame.revert_reason = Some(data.clone());
                        frame.state = FrameState::Revert;
                    }
                    Script::Deploy { runtime_code, gas } => {
                        world.decrement_balance(&frame.sender, frame.value)?;
                        let account = world.get_or_create(&frame.recipient)?;
                        account.nonce = 1;
                        account.balance = account.balance.saturating_add(frame.value);
                        let code_hash = world.store_code(runtime_code.clone());
                        world.get_or_create(&frame.recipient)?.code_hash = code_hash;
                        let spend = (*gas).min(frame.remaining_gas);
                        frame.remaining_gas -= spend;
                        frame.output_data = runtime_code.clone();
                        frame.state = FrameState::CompletedSuccess;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

const SENDER: Address = Address::repeat_byte(0xAA);
const RECIPIENT: Address = Address::repeat_byte(0xBB);
const COINBASE: Address = Address::repeat_byte(0xCC);

fn validator() -> TransactionValidator {
    TransactionValidator::new(
        GasCalculator::cancun(),
        FeeMarket::London,
        Some(1),
        [
            TxType::Legacy,
            TxType::AccessList,
            TxType::Eip1559,
            TxType::Blob,
            TxType::SetCode,
        ],
        true,
        Box::new(AcceptingRecovery),
        Box::new(AcceptAllKzg),
    )
}

fn processor(script: Script) -> TransactionProcessor {
    TransactionProcessor::new(
        GasCalculator::cancun(),
        validator(),
        FeeMarket::London,
        Box::new(ScriptedEvm { script }),
        None,
        true,
        true,
    )
}

fn header_with_base_fee(base_fee: u64) -> BlockHeader {
    let mut header = BlockHeader::default();
    header.number = 1;
    header.gas_limit = 30_000_000;
    header.base_fee = Some(Wei::from_u64(base_fee));
    header
}

fn world_with_sender(balance: u64, nonce: u64) -> MemoryWorldState {
    let mut world = MemoryWorldState::new();
    world.insert_account(
        SENDER,
        Account {
            nonce,
            balance: Wei::from_u64(balance),
            ..Default::default()
        },
    );
    world
}

fn transfer_tx(gas_limit: u64, value: u64, max_fee: u64, priority: u64, nonce: u64) -> Transaction {
    Transaction {
        tx_type: TxType::Eip1559,
        chain_id: Some(1),
        nonce,
        gas_limit,
        to: Some(RECIPIENT),
        value: Wei::from_u64(value),
        max_priority_fee_per_gas: Some(Wei::from_u64(priority)),
        max_fee_per_gas: Some(Wei::from_u64(max_fee)),
        sender: SENDER,
        ..Default::default()
    }
}

fn balance(world: &MemoryWorldState, address: &Address) -> Wei {
    world
        .account(address)
        .unwrap()
        .map(|a| a.balance)
        .unwrap_or_else(Wei::zero)
}

#[test]
fn simple_value_transfer() {
    // base fee 10, effective price min(20, 10 + 10) = 20
    let mut world = world_with_sender(1_000_000, 0);
    let mut processor = processor(Script::Transfer { gas: 0 });
    let tx = transfer_tx(21_000, 1_000, 20, 10, 0);

    let result = processor
        .process_transaction(
            &mut world,
            &header_with_base_fee(10),
            &tx,
            COINBASE,
            &NoAncestors,
            &mut NoTracer,
            &ValidationParams::block_import(),
            None,
        )
        .unwrap();

    match &result {
        TransactionResult::Success {
            gas_used,
            gas_refunded,
            ..
        } => {
            assert_eq!(*gas_used, 21_000);
            assert_eq!(*gas_refunded, 0);
        }
        other => panic!("expected success, got {other:?}"),
    }

    // Sender pays 21000 * 20 for gas plus the 1000 transferred
    assert_eq!(
        balance(&world, &SENDER),
        Wei::from_u64(1_000_000 - 21_000 * 20 - 1_000)
    );
    // Coinbase earns the priority portion: 21000 * (20 - 10)
    assert_eq!(balance(&world, &COINBASE), Wei::from_u64(210_000));
    assert_eq!(balance(&world, &RECIPIENT), Wei::from_u64(1_000));
    // Nonce advanced
    assert_eq!(world.account(&SENDER).unwrap().unwrap().nonce, 1);
}

#[test]
fn out_of_gas_discards_execution_state() {
    let mut world = world_with_sender(10_000_000, 0);
    let mut processor = processor(Script::OutOfGas);
    let tx = transfer_tx(25_000, 0, 20, 10, 0);

    let result = processor
        .process_transaction(
            &mut world,
            &header_with_base_fee(10),
            &tx,
            COINBASE,
            &NoAncestors,
            &mut NoTracer,
            &ValidationParams::block_import(),
            None,
        )
        .unwrap();

    match &result {
        TransactionResult::Failed {
            gas_used,
            gas_refunded,
            reason,
            ..
        } => {
            assert_eq!(*gas_used, 25_000);
            assert_eq!(*gas_refunded, 0);
            assert_eq!(
                reason.as_ref(),
                Some(&InvalidReason::ExecutionHalted(HaltReason::OutOfGas))
            );
        }
        other => panic!("expected failure, got {other:?}"),
    }

    // The staged balance bump and storage write never landed
    assert_eq!(balance(&world, &RECIPIENT), Wei::zero());
    assert_eq!(
        world.storage(&RECIPIENT, &H256::repeat_byte(0x01)).unwrap(),
        U256::zero()
    );
    // But the full fee was taken and the nonce advanced
    assert_eq!(
        balance(&world, &SENDER),
        Wei::from_u64(10_000_000 - 25_000 * 20)
    );
    assert_eq!(world.account(&SENDER).unwrap().unwrap().nonce, 1);
}

#[test]
fn revert_returns_reason_and_pays_coinbase() {
    // base 10, priority 5, max 100: effective price 15
    let mut world = world_with_sender(100_000_000, 0);
    // Intrinsic is 21000; burning 19000 more lands total gas used at 40000
    let mut processor = processor(Script::Revert {
        gas: 19_000,
        data: b"bad".to_vec(),
    });
    let tx = transfer_tx(40_000, 0, 100, 5, 0);

    let result = processor
        .process_transaction(
            &mut world,
            &header_with_base_fee(10),
            &tx,
            COINBASE,
            &NoAncestors,
            &mut NoTracer,
            &ValidationParams::block_import(),
            None,
        )
        .unwrap();

    match &result {
        TransactionResult::Failed {
            gas_used,
            reason,
            revert_reason,
            ..
        } => {
            assert_eq!(*gas_used, 40_000);
            assert_eq!(reason, &None);
            assert_eq!(revert_reason.as_deref(), Some(b"bad".as_slice()));
        }
        other => panic!("expected failure, got {other:?}"),
    }

    // Coinbase gets used_gas * priority
    assert_eq!(balance(&world, &COINBASE), Wei::from_u64(40_000 * 5));
    // The reverted balance bump never landed
    assert_eq!(balance(&world, &RECIPIENT), Wei::zero());
}

#[test]
fn nonce_too_high_is_invalid_without_state_change() {
    let mut world = world_with_sender(1_000_000, 5);
    let mut processor = processor(Script::Transfer { gas: 0 });
    let tx = transfer_tx(21_000, 0, 20, 10, 7);

    let result = processor
        .process_transaction(
            &mut world,
            &header_with_base_fee(10),
            &tx,
            COINBASE,
            &NoAncestors,
            &mut NoTracer,
            &ValidationParams::block_import(),
            None,
        )
        .unwrap();

    assert!(matches!(
        result,
        TransactionResult::Invalid {
            reason: InvalidReason::NonceTooHigh(_)
        }
    ));

    // Nothing moved
    assert_eq!(balance(&world, &SENDER), Wei::from_u64(1_000_000));
    assert_eq!(world.account(&SENDER).unwrap().unwrap().nonce, 5);
    assert!(world.account(&COINBASE).unwrap().is_none());
}

#[test]
fn contract_creation_deploys_runtime_code() {
    let runtime_code = vec![0x5Au8; 32];
    let mut world = world_with_sender(100_000_000, 0);
    let mut processor = processor(Script::Deploy {
        runtime_code: runtime_code.clone(),
        gas: 10_000,
    });

    let initcode = vec![0x60, 0x00, 0x60, 0x00];
    let tx = Transaction {
        tx_type: TxType::Eip1559,
        chain_id: Some(1),
        nonce: 0,
        gas_limit: 100_000,
        to: None,
        value: Wei::zero(),
        payload: initcode,
        max_priority_fee_per_gas: Some(Wei::from_u64(1)),
        max_fee_per_gas: Some(Wei::from_u64(20)),
        sender: SENDER,
        ..Default::default()
    };

    let result = processor
        .process_transaction(
            &mut world,
            &header_with_base_fee(10),
            &tx,
            COINBASE,
            &NoAncestors,
            &mut NoTracer,
            &ValidationParams::block_import(),
            None,
        )
        .unwrap();
    assert!(result.is_success());

    // The address is derived from the sender and pre-increment nonce
    let expected = contract_address(&SENDER, 0);
    let contract = world.account(&expected).unwrap().expect("contract exists");
    assert_eq!(contract.code_hash, H256(keccak256(&runtime_code)));
    assert_eq!(world.code(&contract.code_hash).unwrap(), runtime_code);

    // Sender nonce advanced to 1
    assert_eq!(world.account(&SENDER).unwrap().unwrap().nonce, 1);
}

#[test]
fn blob_transaction_with_bad_commitment_is_invalid() {
    let mut commitments = vec![[0x11u8; 48], [0x22u8; 48], [0x33u8; 48]];
    let versioned_hashes: Vec<H256> = commitments.iter().map(|c| kzg_versioned_hash(c)).collect();
    // Corrupt one byte of the third commitment after hashing
    commitments[2][7] ^= 0x01;

    let mut world = world_with_sender(100_000_000_000, 3);
    let mut processor = processor(Script::Transfer { gas: 0 });
    let tx = Transaction {
        tx_type: TxType::Blob,
        chain_id: Some(1),
        nonce: 3,
        gas_limit: 21_000,
        to: Some(RECIPIENT),
        max_priority_fee_per_gas: Some(Wei::from_u64(1)),
        max_fee_per_gas: Some(Wei::from_u64(20)),
        max_fee_per_blob_gas: Some(Wei::from_u64(10)),
        versioned_hashes,
        blob_sidecar: Some(BlobSidecar {
            blobs: vec![vec![0u8; 64]; 3],
            commitments,
            proofs: vec![[0x44u8; 48]; 3],
        }),
        sender: SENDER,
        ..Default::default()
    };

    let result = processor
        .process_transaction(
            &mut world,
            &header_with_base_fee(10),
            &tx,
            COINBASE,
            &NoAncestors,
            &mut NoTracer,
            &ValidationParams::block_import(),
            Some(Wei::from_u64(1)),
        )
        .unwrap();

    assert!(matches!(
        result,
        TransactionResult::Invalid {
            reason: InvalidReason::InvalidBlobs(_)
        }
    ));

    // No balance or nonce change
    assert_eq!(balance(&world, &SENDER), Wei::from_u64(100_000_000_000));
    assert_eq!(world.account(&SENDER).unwrap().unwrap().nonce, 3);
}

#[test]
fn gas_refund_counter_is_honored_and_capped() {
    // A successful call that accrues a refund counter larger than the cap
    struct RefundingEvm;
    impl MessageProcessor for RefundingEvm {
        fn process(
            &mut self,
            stack: &mut FrameStack,
            _world: &mut dyn Updater,
            _block_hashes: &dyn BlockHashLookup,
            _tracer: &mut dyn ethexec::exec::Tracer,
        ) -> Result<(), StateError> {
            let frame = stack.top_mut();
            frame.remaining_gas = 0;
            frame.gas_refund = 1_000_000;
            frame.state = FrameState::CompletedSuccess;
            Ok(())
        }
    }

    let mut world = world_with_sender(100_000_000, 0);
    let mut processor = TransactionProcessor::new(
        GasCalculator::cancun(),
        validator(),
        FeeMarket::London,
        Box::new(RefundingEvm),
        None,
        true,
        true,
    );
    let tx = transfer_tx(100_000, 0, 20, 10, 0);

    let result = processor
        .process_transaction(
            &mut world,
            &header_with_base_fee(10),
            &tx,
            COINBASE,
            &NoAncestors,
            &mut NoTracer,
            &ValidationParams::block_import(),
            None,
        )
        .unwrap();

    // All 100_000 gas was consumed; the refund is capped at used / 5
    match result {
        TransactionResult::Success {
            gas_used,
            gas_refunded,
            ..
        } => {
            assert_eq!(gas_used, 100_000);
            assert_eq!(gas_refunded, 20_000);
        }
        other => panic!("expected success, got {other:?}"),
    }

    // Coinbase is paid for gas_limit - refunded = 80_000 units
    assert_eq!(balance(&world, &COINBASE), Wei::from_u64(80_000 * 10));
}

#[test]
fn set_code_authorizations_are_applied_and_charged() {
    use ethexec::exec::AuthorityProcessor;
    use ethexec::types::{Authorization, SignatureData};

    /// Records the authorized address like the real authority processor,
    /// skipping signers that hold code.
    struct RecordingAuthority {
        authorized: Address,
    }

    impl AuthorityProcessor for RecordingAuthority {
        fn apply(
            &mut self,
            world: &mut dyn Updater,
            transaction: &Transaction,
        ) -> Result<Vec<Address>, StateError> {
            for auth in &transaction.authorization_list {
                world.touch(&auth.address);
            }
            Ok(vec![self.authorized])
        }
    }

    let authorized = Address::repeat_byte(0xDD);
    let mut world = world_with_sender(100_000_000, 0);
    let mut processor = TransactionProcessor::new(
        GasCalculator::cancun(),
        validator(),
        FeeMarket::London,
        Box::new(ScriptedEvm {
            script: Script::Transfer { gas: 0 },
        }),
        Some(Box::new(RecordingAuthority { authorized })),
        true,
        true,
    );

    let tx = Transaction {
        authorization_list: vec![Authorization {
            chain_id: 1,
            address: authorized,
            nonce: 0,
            signature: SignatureData::default(),
        }],
        ..transfer_tx(60_000, 0, 20, 10, 0)
    };
    let mut set_code_tx = tx;
    set_code_tx.tx_type = TxType::SetCode;

    let result = processor
        .process_transaction(
            &mut world,
            &header_with_base_fee(10),
            &set_code_tx,
            COINBASE,
            &NoAncestors,
            &mut NoTracer,
            &ValidationParams::block_import(),
            None,
        )
        .unwrap();

    // 21000 intrinsic + 25000 per authorization; the scripted call burns
    // nothing beyond that, so the remainder comes back as remaining gas
    match result {
        TransactionResult::Success {
            gas_used,
            gas_refunded,
            ..
        } => {
            assert_eq!(gas_used, 21_000 + 25_000);
            assert_eq!(gas_refunded, 60_000 - 46_000);
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[test]
fn self_destructed_accounts_are_deleted_without_refund() {
    /// Succeeds after marking the recipient for self-destruct.
    struct SelfDestructingEvm;

    impl MessageProcessor for SelfDestructingEvm {
        fn process(
            &mut self,
            stack: &mut FrameStack,
            world: &mut dyn Updater,
            _block_hashes: &dyn BlockHashLookup,
            _tracer: &mut dyn ethexec::exec::Tracer,
        ) -> Result<(), StateError> {
            let frame = stack.top_mut();
            world.get_or_create(&frame.recipient)?.balance = Wei::from_u64(77);
            frame.self_destructs.insert(frame.recipient);
            frame.state = FrameState::CompletedSuccess;
            Ok(())
        }
    }

    let mut world = world_with_sender(10_000_000, 0);
    world.insert_account(RECIPIENT, Account::with_balance(Wei::from_u64(5_000)));

    let mut processor = TransactionProcessor::new(
        GasCalculator::cancun(),
        validator(),
        FeeMarket::London,
        Box::new(SelfDestructingEvm),
        None,
        true,
        true,
    );
    let tx = transfer_tx(30_000, 0, 20, 10, 0);

    let result = processor
        .process_transaction(
            &mut world,
            &header_with_base_fee(10),
            &tx,
            COINBASE,
            &NoAncestors,
            &mut NoTracer,
            &ValidationParams::block_import(),
            None,
        )
        .unwrap();

    match result {
        TransactionResult::Success { gas_refunded, .. } => {
            // Post-London the self-destruct refund is zero
            assert_eq!(gas_refunded, 30_000 - 21_000);
        }
        other => panic!("expected success, got {other:?}"),
    }

    // The account is gone despite the balance written during execution
    assert!(world.account(&RECIPIENT).unwrap().is_none());
}
