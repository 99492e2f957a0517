//! Transaction validation and execution.

mod error;
mod frame;
mod processor;
mod result;
mod tracer;
mod validator;
mod world;

pub use error::{InvalidReason, ProcessorError, StateError};
pub use frame::{
    precompile_addresses, FrameStack, FrameState, FrameType, HaltReason, Log, MessageFrame,
    MessageFrameBuilder,
};
pub use processor::{
    AuthorityProcessor, BlockHashLookup, MessageProcessor, NoAncestors, TransactionProcessor,
};
pub use result::TransactionResult;
pub use tracer::{NoTracer, Tracer};
pub use validator::{TransactionValidator, ValidationParams};
pub use world::{MemoryWorldState, StagedUpdater, Updater, WorldState, WorldView};
