//! Consensus gas schedule, parameterized by fork.

/// Base cost charged to every transaction.
const TX_BASE_COST: u64 = 21_000;
/// Cost per non-zero payload byte.
const TX_DATA_NON_ZERO_COST: u64 = 16;
/// Cost per zero payload byte.
const TX_DATA_ZERO_COST: u64 = 4;
/// Surcharge for contract-creating transactions.
const TX_CREATE_COST: u64 = 32_000;
/// Cost per 32-byte initcode word (Shanghai).
const INITCODE_WORD_COST: u64 = 2;
/// Cost per access-list address entry.
const ACCESS_LIST_ADDRESS_COST: u64 = 2_400;
/// Cost per access-list storage key.
const ACCESS_LIST_STORAGE_KEY_COST: u64 = 1_900;
/// Cost per set-code authorization.
const PER_AUTHORIZATION_COST: u64 = 25_000;
/// Gas consumed per blob.
const GAS_PER_BLOB: u64 = 131_072;
/// Maximum blob gas per block (six blobs, Cancun).
const MAX_BLOB_GAS_PER_BLOCK: u64 = 786_432;
/// Maximum initcode size in bytes (Shanghai).
const MAX_INITCODE_SIZE: usize = 49_152;

/// Computes gas amounts charged before and refunded after execution.
///
/// Fork differences are plain parameter substitutions; construct the
/// calculator for the fork in force and inject it everywhere.
#[derive(Clone, Debug)]
pub struct GasCalculator {
    max_refund_quotient: u64,
    self_destruct_refund: u64,
    initcode_word_cost: u64,
    max_initcode_size: Option<usize>,
    blob_gas_limit: u64,
}

impl GasCalculator {
    /// Pre-London schedule: half refunds back, self-destruct refunds.
    pub fn frontier() -> Self {
        Self {
            max_refund_quotient: 2,
            self_destruct_refund: 24_000,
            initcode_word_cost: 0,
            max_initcode_size: None,
            blob_gas_limit: 0,
        }
    }

    /// London (EIP-3529): refunds capped at a fifth, no self-destruct refund.
    pub fn london() -> Self {
        Self {
            max_refund_quotient: 5,
            self_destruct_refund: 0,
            initcode_word_cost: 0,
            max_initcode_size: None,
            blob_gas_limit: 0,
        }
    }

    /// Shanghai (EIP-3860): initcode is metered and size-capped.
    pub fn shanghai() -> Self {
        Self {
            initcode_word_cost: INITCODE_WORD_COST,
            max_initcode_size: Some(MAX_INITCODE_SIZE),
            ..Self::london()
        }
    }

    /// Cancun (EIP-4844): blob gas enters the schedule.
    pub fn cancun() -> Self {
        Self {
            blob_gas_limit: MAX_BLOB_GAS_PER_BLOCK,
            ..Self::shanghai()
        }
    }

    /// Gas consumed before any bytecode runs: the base cost, the payload
    /// byte costs, and for creations the surcharge plus initcode words.
    pub fn transaction_intrinsic_gas_cost(&self, payload: &[u8], is_creation: bool) -> u64 {
        let zero_bytes = payload.iter().filter(|b| **b == 0).count() as u64;
        let non_zero_bytes = payload.len() as u64 - zero_bytes;

        let mut cost = TX_BASE_COST
            + zero_bytes * TX_DATA_ZERO_COST
            + non_zero_bytes * TX_DATA_NON_ZERO_COST;

        if is_creation {
            let words = (payload.len() as u64 + 31) / 32;
            cost += TX_CREATE_COST + words * self.initcode_word_cost;
        }
        cost
    }

    /// Gas charged for warming the access list.
    pub fn access_list_gas_cost(&self, entries: usize, storage_keys: usize) -> u64 {
        entries as u64 * ACCESS_LIST_ADDRESS_COST
            + storage_keys as u64 * ACCESS_LIST_STORAGE_KEY_COST
    }

    /// Gas charged per set-code authorization.
    pub fn set_code_gas_cost(&self, authorizations: usize) -> u64 {
        authorizations as u64 * PER_AUTHORIZATION_COST
    }

    /// Blob gas consumed by a transaction carrying `blob_count` blobs.
    pub fn blob_gas_cost(&self, blob_count: usize) -> u64 {
        blob_count as u64 * GAS_PER_BLOB
    }

    /// Divisor bounding how much of the used gas may come back as refund.
    pub fn max_refund_quotient(&self) -> u64 {
        self.max_refund_quotient
    }

    /// Refund per self-destructed account.
    pub fn self_destruct_refund_amount(&self) -> u64 {
        self.self_destruct_refund
    }

    /// Initcode size cap for creations, if the fork imposes one.
    pub fn max_initcode_size(&self) -> Option<usize> {
        self.max_initcode_size
    }

    /// Blob gas budget of the current block.
    pub fn current_blob_gas_limit(&self) -> u64 {
        self.blob_gas_limit
    }

    /// Gas returned to the sender: the remaining gas plus the refund
    /// counter, capped at the used gas over the refund quotient.
    pub fn refunded(
        &self,
        gas_limit: u64,
        gas_remaining: u64,
        gas_refund: u64,
        self_destruct_count: usize,
    ) -> u64 {
        let refund_counter =
            gas_refund + self.self_destruct_refund * self_destruct_count as u64;
        // Integer division floors the allowance
        let max_allowance = (gas_limit - gas_remaining) / self.max_refund_quotient;
        gas_remaining + refund_counter.min(max_allowance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intrinsic_gas_plain_transfer() {
        let calc = GasCalculator::london();
        assert_eq!(calc.transaction_intrinsic_gas_cost(&[], false), 21_000);
    }

    #[test]
    fn test_intrinsic_gas_counts_byte_kinds() {
        let calc = GasCalculator::london();
        // 2 zero bytes and 3 non-zero bytes
        let payload = [0x00, 0x01, 0x00, 0x02, 0x03];
        assert_eq!(
            calc.transaction_intrinsic_gas_cost(&payload, false),
            21_000 + 2 * 4 + 3 * 16
        );
    }

    #[test]
    fn test_intrinsic_gas_creation_surcharge() {
        let calc = GasCalculator::shanghai();
        let payload = [0x01u8; 33]; // two initcode words
        assert_eq!(
            calc.transaction_intrinsic_gas_cost(&payload, true),
            21_000 + 33 * 16 + 32_000 + 2 * 2
        );

        // Pre-Shanghai the words are free
        let calc = GasCalculator::london();
        assert_eq!(
            calc.transaction_intrinsic_gas_cost(&payload, true),
            21_000 + 33 * 16 + 32_000
        );
    }

    #[test]
    fn test_access_list_gas() {
        let calc = GasCalculator::london();
        assert_eq!(calc.access_list_gas_cost(2, 3), 2 * 2_400 + 3 * 1_900);
    }

    #[test]
    fn test_blob_and_set_code_gas() {
        let calc = GasCalculator::cancun();
        assert_eq!(calc.blob_gas_cost(3), 3 * 131_072);
        assert_eq!(calc.set_code_gas_cost(2), 50_000);
        assert_eq!(calc.current_blob_gas_limit(), 786_432);
    }

    #[test]
    fn test_refund_capped_by_quotient() {
        let calc = GasCalculator::london();
        // 100_000 used, huge refund counter: capped at used / 5
        assert_eq!(calc.refunded(100_000, 0, 1_000_000, 0), 20_000);
        // Small refund passes through
        assert_eq!(calc.refunded(100_000, 0, 1_000, 0), 1_000);
        // Remaining gas always comes back
        assert_eq!(calc.refunded(100_000, 40_000, 0, 0), 40_000);
    }

    #[test]
    fn test_self_destruct_refund_by_fork() {
        let frontier = GasCalculator::frontier();
        // 50_000 used / quotient 2 = 25_000 cap; one self destruct = 24_000
        assert_eq!(frontier.refunded(50_000, 0, 0, 1), 24_000);

        let london = GasCalculator::london();
        assert_eq!(london.refunded(50_000, 0, 0, 1), 0);
    }
}
