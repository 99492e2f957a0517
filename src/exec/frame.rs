//! Message frames and the execution frame stack.

use std::fmt;

use hashbrown::{HashMap, HashSet};
use primitive_types::H256;
use rustc_hash::FxBuildHasher;

use crate::types::{Address, Wei};

type FxHashSet<T> = HashSet<T, FxBuildHasher>;
type FxHashMap<K, V> = HashMap<K, V, FxBuildHasher>;

/// Kind of work a frame performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameType {
    /// Executes code at an existing account.
    MessageCall,
    /// Runs initcode to deploy a new contract.
    ContractCreation,
}

/// Lifecycle of a single frame.
///
/// NOT_STARTED -> CODE_SUSPENDED <-> CODE_EXECUTING ->
/// (COMPLETED_SUCCESS | REVERT | EXCEPTIONAL_HALT).
/// Only terminal states release resources to the parent frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameState {
    NotStarted,
    CodeExecuting,
    CodeSuspended,
    CompletedSuccess,
    Revert,
    ExceptionalHalt,
}

impl FrameState {
    /// Returns true for states that release the frame to its parent.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FrameState::CompletedSuccess | FrameState::Revert | FrameState::ExceptionalHalt
        )
    }
}

/// Why execution halted exceptionally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HaltReason {
    OutOfGas,
    StackOverflow,
    InvalidJump,
    InvalidOperation,
    InsufficientBalance,
    InvalidCode,
    Other(String),
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::OutOfGas => write!(f, "out of gas"),
            HaltReason::StackOverflow => write!(f, "stack overflow"),
            HaltReason::InvalidJump => write!(f, "invalid jump destination"),
            HaltReason::InvalidOperation => write!(f, "invalid operation"),
            HaltReason::InsufficientBalance => write!(f, "insufficient balance"),
            HaltReason::InvalidCode => write!(f, "invalid code"),
            HaltReason::Other(detail) => write!(f, "{detail}"),
        }
    }
}

/// A log emitted during execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
}

/// One execution frame: the unit the injected message processor advances.
///
/// The transaction processor builds the initial frame; nested CALL/CREATE
/// frames are pushed by the interpreter. Warm sets, refunds, logs, and
/// self-destructs live on the frame and are folded upward on completion.
#[derive(Clone, Debug)]
pub struct MessageFrame {
    pub frame_type: FrameType,
    pub state: FrameState,
    pub sender: Address,
    /// Account whose context the code runs in.
    pub recipient: Address,
    /// Account the code was loaded from.
    pub contract: Address,
    pub code: Vec<u8>,
    pub input_data: Vec<u8>,
    pub value: Wei,
    pub gas_price: Wei,
    pub blob_gas_price: Wei,
    pub initial_gas: u64,
    pub remaining_gas: u64,
    pub versioned_hashes: Vec<H256>,
    pub warm_addresses: FxHashSet<Address>,
    pub warm_storage: FxHashMap<Address, FxHashSet<H256>>,
    pub logs: Vec<Log>,
    pub gas_refund: u64,
    pub self_destructs: FxHashSet<Address>,
    pub output_data: Vec<u8>,
    pub revert_reason: Option<Vec<u8>>,
    pub halt_reason: Option<HaltReason>,
}

impl MessageFrame {
    /// Starts a builder for the initial frame of a transaction.
    pub fn builder() -> MessageFrameBuilder {
        MessageFrameBuilder::default()
    }

    /// Gas consumed by this frame so far.
    pub fn gas_used(&self) -> u64 {
        self.initial_gas - self.remaining_gas
    }

    /// Moves the frame to a terminal halt state, consuming all its gas.
    pub fn halt(&mut self, reason: HaltReason) {
        self.state = FrameState::ExceptionalHalt;
        self.halt_reason = Some(reason);
        self.remaining_gas = 0;
    }

    /// Marks an address warm; returns true if it was cold.
    pub fn warm_up_address(&mut self, address: Address) -> bool {
        self.warm_addresses.insert(address)
    }

    /// Marks a storage slot warm; returns true if it was cold.
    pub fn warm_up_storage(&mut self, address: Address, key: H256) -> bool {
        self.warm_storage.entry(address).or_default().insert(key)
    }
}

/// Builder for the initial message frame.
#[derive(Default)]
pub struct MessageFrameBuilder {
    frame_type: Option<FrameType>,
    sender: Option<Address>,
    recipient: Option<Address>,
    contract: Option<Address>,
    code: Vec<u8>,
    input_data: Vec<u8>,
    value: Wei,
    gas_price: Wei,
    blob_gas_price: Wei,
    initial_gas: u64,
    versioned_hashes: Vec<H256>,
    warm_addresses: FxHashSet<Address>,
    warm_storage: FxHashMap<Address, FxHashSet<H256>>,
}

impl MessageFrameBuilder {
    pub fn frame_type(mut self, frame_type: FrameType) -> Self {
        self.frame_type = Some(frame_type);
        self
    }

    pub fn sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn recipient(mut self, recipient: Address) -> Self {
        self.recipient = Some(recipient);
        self
    }

    pub fn contract(mut self, contract: Address) -> Self {
        self.contract = Some(contract);
        self
    }

    pub fn code(mut self, code: Vec<u8>) -> Self {
        self.code = code;
        self
    }

    pub fn input_data(mut self, input_data: Vec<u8>) -> Self {
        self.input_data = input_data;
        self
    }

    pub fn value(mut self, value: Wei) -> Self {
        self.value = value;
        self
    }

    pub fn gas_price(mut self, gas_price: Wei) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn blob_gas_price(mut self, blob_gas_price: Wei) -> Self {
        self.blob_gas_price = blob_gas_price;
        self
    }

    pub fn initial_gas(mut self, initial_gas: u64) -> Self {
        self.initial_gas = initial_gas;
        self
    }

    pub fn versioned_hashes(mut self, versioned_hashes: Vec<H256>) -> Self {
        self.versioned_hashes = versioned_hashes;
        self
    }

    pub fn warm_address(mut self, address: Address) -> Self {
        self.warm_addresses.insert(address);
        self
    }

    pub fn warm_addresses(mut self, addresses: impl IntoIterator<Item = Address>) -> Self {
        self.warm_addresses.extend(addresses);
        self
    }

    pub fn warm_storage(mut self, address: Address, keys: impl IntoIterator<Item = H256>) -> Self {
        self.warm_storage.entry(address).or_default().extend(keys);
        self
    }

    /// Builds the frame in NOT_STARTED state.
    ///
    /// # Panics
    /// Panics if the frame type, sender, or recipient were not set.
    pub fn build(self) -> MessageFrame {
        let recipient = self.recipient.expect("frame recipient not set");
        MessageFrame {
            frame_type: self.frame_type.expect("frame type not set"),
            state: FrameState::NotStarted,
            sender: self.sender.expect("frame sender not set"),
            recipient,
            contract: self.contract.unwrap_or(recipient),
            code: self.code,
            input_data: self.input_data,
            value: self.value,
            gas_price: self.gas_price,
            blob_gas_price: self.blob_gas_price,
            initial_gas: self.initial_gas,
            remaining_gas: self.initial_gas,
            versioned_hashes: self.versioned_hashes,
            warm_addresses: self.warm_addresses,
            warm_storage: self.warm_storage,
            logs: Vec::new(),
            gas_refund: 0,
            self_destructs: FxHashSet::default(),
            output_data: Vec::new(),
            revert_reason: None,
            halt_reason: None,
        }
    }
}

/// The frame stack for one transaction.
///
/// Frames form a stack, not a graph: the initial frame sits at the bottom
/// and nested calls are pushed on top. The stack never pops the initial
/// frame, so the caller can inspect its terminal state afterwards.
#[derive(Debug)]
pub struct FrameStack {
    frames: Vec<MessageFrame>,
}

impl FrameStack {
    /// Creates a stack holding the initial frame.
    pub fn new(initial: MessageFrame) -> Self {
        Self {
            frames: vec![initial],
        }
    }

    /// Number of frames currently on the stack.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The currently executing frame.
    pub fn top(&self) -> &MessageFrame {
        self.frames.last().expect("frame stack never empties")
    }

    /// Mutable access to the currently executing frame.
    pub fn top_mut(&mut self) -> &mut MessageFrame {
        self.frames.last_mut().expect("frame stack never empties")
    }

    /// The initial frame.
    pub fn initial(&self) -> &MessageFrame {
        &self.frames[0]
    }

    /// Pushes a nested frame.
    pub fn push(&mut self, frame: MessageFrame) {
        self.frames.push(frame);
    }

    /// Pops a completed nested frame, returning it to fold into its parent.
    /// The initial frame stays put.
    pub fn pop(&mut self) -> Option<MessageFrame> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    /// True once the initial frame is terminal and no children remain.
    pub fn is_settled(&self) -> bool {
        self.frames.len() == 1 && self.frames[0].state.is_terminal()
    }

    /// Consumes the stack, returning the initial frame.
    pub fn into_initial(mut self) -> MessageFrame {
        self.frames.truncate(1);
        self.frames.remove(0)
    }
}

/// Addresses of the precompiled contracts, warm from the start of every
/// transaction.
pub fn precompile_addresses() -> impl Iterator<Item = Address> {
    (1u8..=10).map(|i| {
        let mut bytes = [0u8; 20];
        bytes[19] = i;
        Address::from(bytes)
    })
}
