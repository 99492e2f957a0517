//! Execution tracing hooks.

use super::frame::Log;
use crate::types::{Transaction, Wei};

/// Observer of transaction processing.
///
/// All hooks default to no-ops; implementors override what they need.
/// `end_transaction` fires exactly once per processed transaction,
/// including on internal failure (with an empty result).
pub trait Tracer {
    /// Called after validation, before any state mutation.
    fn prepare(&mut self, _transaction: &Transaction) {}

    /// Called when the initial frame is about to execute.
    fn start_transaction(&mut self, _transaction: &Transaction) {}

    /// Called before the coinbase is credited.
    fn before_reward(&mut self, _transaction: &Transaction, _coinbase_delta: Wei) {}

    /// Called when processing finishes, successfully or not.
    fn end_transaction(
        &mut self,
        _transaction: &Transaction,
        _success: bool,
        _output: &[u8],
        _logs: &[Log],
        _gas_used: u64,
    ) {
    }
}

/// Tracer that observes nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTracer;

impl Tracer for NoTracer {}
