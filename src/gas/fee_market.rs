//! Fee market: effective transaction price and coinbase reward.

use crate::types::{Transaction, Wei};

/// Computes the per-gas price a transaction pays and the share of it that
/// reaches the coinbase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeeMarket {
    /// Pre-1559: explicit gas price, all of it to the coinbase.
    Frontier,
    /// EIP-1559: base fee is burnt, the priority portion goes to the
    /// coinbase.
    London,
}

impl FeeMarket {
    /// The per-gas price the sender pays.
    ///
    /// 1559-typed transactions pay min(max_fee, base_fee + priority_fee);
    /// legacy and access-list transactions pay their explicit price.
    pub fn transaction_price(&self, tx: &Transaction, base_fee: Option<Wei>) -> Wei {
        if tx.tx_type.supports_1559_fee_market() {
            let max_fee = tx.max_fee_per_gas.unwrap_or_else(Wei::zero);
            let priority = tx.max_priority_fee_per_gas.unwrap_or_else(Wei::zero);
            match base_fee {
                Some(base) => max_fee.min(base.saturating_add(priority)),
                None => max_fee,
            }
        } else {
            tx.gas_price.unwrap_or_else(Wei::zero)
        }
    }

    /// The coinbase reward for `used_gas` at the given effective price.
    pub fn coinbase_delta(&self, used_gas: u64, price: Wei, base_fee: Option<Wei>) -> Wei {
        match self {
            FeeMarket::Frontier => price.mul_gas(used_gas),
            FeeMarket::London => {
                let base = base_fee.unwrap_or_else(Wei::zero);
                price.saturating_sub(base).mul_gas(used_gas)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TxType;

    fn dynamic_tx(max_fee: u64, priority: u64) -> Transaction {
        Transaction {
            tx_type: TxType::Eip1559,
            max_fee_per_gas: Some(Wei::from_u64(max_fee)),
            max_priority_fee_per_gas: Some(Wei::from_u64(priority)),
            ..Default::default()
        }
    }

    #[test]
    fn test_dynamic_price_takes_min() {
        let market = FeeMarket::London;
        let tx = dynamic_tx(20, 5);

        // base 10 + priority 5 = 15 < max 20
        assert_eq!(
            market.transaction_price(&tx, Some(Wei::from_u64(10))),
            Wei::from_u64(15)
        );
        // base 18 + priority 5 = 23, capped at max 20
        assert_eq!(
            market.transaction_price(&tx, Some(Wei::from_u64(18))),
            Wei::from_u64(20)
        );
    }

    #[test]
    fn test_legacy_price_is_explicit() {
        let market = FeeMarket::London;
        let tx = Transaction {
            gas_price: Some(Wei::from_u64(7)),
            ..Default::default()
        };
        assert_eq!(
            market.transaction_price(&tx, Some(Wei::from_u64(100))),
            Wei::from_u64(7)
        );
    }

    #[test]
    fn test_coinbase_delta_burns_base_fee() {
        let delta = FeeMarket::London.coinbase_delta(
            21_000,
            Wei::from_u64(20),
            Some(Wei::from_u64(10)),
        );
        assert_eq!(delta, Wei::from_u64(210_000));
    }

    #[test]
    fn test_frontier_coinbase_takes_full_price() {
        let delta = FeeMarket::Frontier.coinbase_delta(21_000, Wei::from_u64(20), None);
        assert_eq!(delta, Wei::from_u64(420_000));
    }
}
