//! # ethexec
//!
//! The transaction execution core of an Ethereum execution-layer client.
//!
//! ## Architecture
//!
//! The library is split into two major components:
//!
//! 1. **Trie** - A Merkle Patricia Trie over a byte store, mutated by
//!    structural sharing so old roots stay readable
//! 2. **Processor** - Consensus transaction processing: validation, gas
//!    accounting, frame-stack execution, and atomic fee settlement
//!
//! ## Modules
//!
//! - `types` - Consensus value types (Wei, Account, Transaction, BlockHeader)
//! - `rlp` - Recursive length prefix codec
//! - `trie` - The Merkle Patricia Trie engine
//! - `gas` - Gas schedule and the fee market
//! - `exec` - Transaction validation, frames, and the processor
//! - `crypto` - Hashing helpers and injected cryptographic interfaces

pub mod crypto;
pub mod exec;
pub mod gas;
pub mod rlp;
pub mod trie;
pub mod types;
