//! World-state access: read views, staged updaters, and an in-memory store.
//!
//! All mutation for one transaction goes through a [`StagedUpdater`]:
//! overlay layers over a backing store, published to it only on `commit`.
//! Nested layers support the frame-level commit/revert discipline.

use hashbrown::{HashMap, HashSet};
use primitive_types::{H256, U256};
use rustc_hash::FxBuildHasher;

use super::error::StateError;
use crate::crypto::keccak256;
use crate::types::{Account, Address, Wei, EMPTY_CODE_HASH};

type FxHashMap<K, V> = HashMap<K, V, FxBuildHasher>;
type FxHashSet<T> = HashSet<T, FxBuildHasher>;

/// Read-only access to world state.
pub trait WorldView {
    /// Gets an account by address.
    fn account(&self, address: &Address) -> Result<Option<Account>, StateError>;

    /// Gets code by its hash; empty code for the empty-code hash.
    fn code(&self, code_hash: &H256) -> Result<Vec<u8>, StateError>;

    /// Gets a storage value; absent slots read as zero.
    fn storage(&self, address: &Address, key: &H256) -> Result<U256, StateError>;
}

/// Mutable world state, written on commit.
pub trait WorldState: WorldView {
    /// Sets an account.
    fn set_account(&mut self, address: Address, account: Account);

    /// Sets a storage value.
    fn set_storage(&mut self, address: Address, key: H256, value: U256);

    /// Stores code under its hash.
    fn set_code(&mut self, code_hash: H256, code: Vec<u8>);

    /// Deletes an account and its storage.
    fn delete_account(&mut self, address: &Address);
}

/// Staged mutation surface handed to the execution machinery.
///
/// Object-safe so the injected message and authority processors can hold a
/// `&mut dyn Updater` regardless of the backing store type.
pub trait Updater {
    /// Reads an account through the staged layers.
    fn account(&self, address: &Address) -> Result<Option<Account>, StateError>;

    /// Reads code through the staged layers.
    fn code(&self, code_hash: &H256) -> Result<Vec<u8>, StateError>;

    /// Reads a storage slot through the staged layers.
    fn storage(&self, address: &Address, key: &H256) -> Result<U256, StateError>;

    /// Returns a mutable account in the top layer, creating it if absent.
    fn get_or_create(&mut self, address: &Address) -> Result<&mut Account, StateError>;

    /// Stages a storage write.
    fn set_storage(&mut self, address: Address, key: H256, value: U256);

    /// Stages code, returning its hash.
    fn store_code(&mut self, code: Vec<u8>) -> H256;

    /// Stages deletion of an account.
    fn delete(&mut self, address: &Address);

    /// Marks an account as touched without modifying it.
    fn touch(&mut self, address: &Address);

    /// Opens a nested layer.
    fn begin(&mut self);

    /// Folds the top layer into its parent.
    fn commit_layer(&mut self);

    /// Discards the top layer.
    fn revert_layer(&mut self);

    /// Credits an account.
    fn increment_balance(&mut self, address: &Address, amount: Wei) -> Result<(), StateError> {
        let account = self.get_or_create(address)?;
        account.balance = account.balance.saturating_add(amount);
        Ok(())
    }

    /// Debits an account; underflow is a backend error, validation is
    /// supposed to have ruled it out.
    fn decrement_balance(&mut self, address: &Address, amount: Wei) -> Result<(), StateError> {
        let account = self.get_or_create(address)?;
        account.balance = account
            .balance
            .checked_sub(amount)
            .ok_or_else(|| StateError::Backend(format!("balance underflow debiting {amount}")))?;
        Ok(())
    }

    /// Increments an account nonce, returning the previous value.
    fn increment_nonce(&mut self, address: &Address) -> Result<u64, StateError> {
        let account = self.get_or_create(address)?;
        let previous = account.nonce;
        account.nonce += 1;
        Ok(previous)
    }
}

/// One overlay of staged changes.
#[derive(Debug, Default)]
struct Overlay {
    /// Account changes; `None` marks a deletion.
    accounts: FxHashMap<Address, Option<Account>>,
    /// Storage changes (address -> slot -> value).
    storage: FxHashMap<Address, FxHashMap<H256, U256>>,
    /// Code staged by hash.
    codes: FxHashMap<H256, Vec<u8>>,
    /// Accounts read-modified during execution, for empty-account sweeping.
    touched: FxHashSet<Address>,
}

impl Overlay {
    fn merge_from(&mut self, upper: Overlay) {
        for (address, entry) in upper.accounts {
            if entry.is_none() {
                self.storage.remove(&address);
            }
            self.accounts.insert(address, entry);
        }
        for (address, slots) in upper.storage {
            self.storage.entry(address).or_default().extend(slots);
        }
        self.codes.extend(upper.codes);
        self.touched.extend(upper.touched);
    }
}

/// Layered staging over a backing world state.
///
/// Reads fall through the layers top-down into the backing store; writes
/// land in the top layer. Nothing reaches the store until [`commit`]
/// publishes the folded layers; dropping the updater discards everything.
///
/// [`commit`]: StagedUpdater::commit
pub struct StagedUpdater<'w, W: WorldState> {
    world: &'w mut W,
    layers: Vec<Overlay>,
}

impl<'w, W: WorldState> StagedUpdater<'w, W> {
    /// Creates an updater staged over the given world state.
    pub fn new(world: &'w mut W) -> Self {
        Self {
            world,
            layers: vec![Overlay::default()],
        }
    }

    fn top(&mut self) -> &mut Overlay {
        self.layers.last_mut().expect("updater keeps a root layer")
    }

    /// Publishes all staged changes to the backing world state.
    pub fn commit(mut self) -> Result<(), StateError> {
        let mut folded = Overlay::default();
        for layer in self.layers.drain(..) {
            folded.merge_from(layer);
        }

        for (code_hash, code) in folded.codes {
            self.world.set_code(code_hash, code);
        }
        for (address, entry) in &folded.accounts {
            match entry {
                Some(account) => self.world.set_account(*address, account.clone()),
                None => self.world.delete_account(address),
            }
        }
        for (address, slots) in folded.storage {
            if folded.accounts.get(&address) == Some(&None) {
                continue;
            }
            for (key, value) in slots {
                self.world.set_storage(address, key, value);
            }
        }
        Ok(())
    }

    /// Deletes touched accounts that ended up empty.
    pub fn clear_empty_accounts(&mut self) -> Result<(), StateError> {
        let touched: Vec<Address> = self
            .layers
            .iter()
            .flat_map(|layer| layer.touched.iter().copied())
            .collect();
        for address in touched {
            if let Some(account) = Updater::account(self, &address)? {
                if account.is_empty() {
                    self.delete(&address);
                }
            }
        }
        Ok(())
    }
}

impl<W: WorldState> Updater for StagedUpdater<'_, W> {
    fn account(&self, address: &Address) -> Result<Option<Account>, StateError> {
        for layer in self.layers.iter().rev() {
            if let Some(entry) = layer.accounts.get(address) {
                return Ok(entry.clone());
            }
        }
        self.world.account(address)
    }

    fn code(&self, code_hash: &H256) -> Result<Vec<u8>, StateError> {
        if *code_hash == EMPTY_CODE_HASH {
            return Ok(Vec::new());
        }
        for layer in self.layers.iter().rev() {
            if let Some(code) = layer.codes.get(code_hash) {
                return Ok(code.clone());
            }
        }
        self.world.code(code_hash)
    }

    fn storage(&self, address: &Address, key: &H256) -> Result<U256, StateError> {
        for layer in self.layers.iter().rev() {
            if let Some(value) = layer.storage.get(address).and_then(|slots| slots.get(key)) {
                return Ok(*value);
            }
            // A deletion in this layer shadows everything below
            if let Some(None) = layer.accounts.get(address) {
                return Ok(U256::zero());
            }
        }
        self.world.storage(address, key)
    }

    fn get_or_create(&mut self, address: &Address) -> Result<&mut Account, StateError> {
        let staged_live = matches!(
            self.layers.last().and_then(|l| l.accounts.get(address)),
            Some(Some(_))
        );
        if !staged_live {
            let current = Updater::account(self, address)?.unwrap_or_default();
            self.top().accounts.insert(*address, Some(current));
        }
        let top = self.top();
        top.touched.insert(*address);
        top.accounts
            .get_mut(address)
            .and_then(|entry| entry.as_mut())
            .ok_or_else(|| StateError::Backend("staged account vanished".into()))
    }

    fn set_storage(&mut self, address: Address, key: H256, value: U256) {
        self.top()
            .storage
            .entry(address)
            .or_default()
            .insert(key, value);
    }

    fn store_code(&mut self, code: Vec<u8>) -> H256 {
        let code_hash = H256(keccak256(&code));
        self.top().codes.insert(code_hash, code);
        code_hash
    }

    fn delete(&mut self, address: &Address) {
        let top = self.top();
        top.accounts.insert(*address, None);
        top.storage.remove(address);
    }

    fn touch(&mut self, address: &Address) {
        self.top().touched.insert(*address);
    }

    fn begin(&mut self) {
        self.layers.push(Overlay::default());
    }

    fn commit_layer(&mut self) {
        if self.layers.len() > 1 {
            let upper = self.layers.pop().expect("layer count checked");
            self.top().merge_from(upper);
        }
    }

    fn revert_layer(&mut self) {
        if self.layers.len() > 1 {
            self.layers.pop();
        }
    }
}

/// In-memory world state backed by hash maps.
#[derive(Debug, Default)]
pub struct MemoryWorldState {
    accounts: FxHashMap<Address, Account>,
    storage: FxHashMap<Address, FxHashMap<H256, U256>>,
    codes: FxHashMap<H256, Vec<u8>>,
}

impl MemoryWorldState {
    /// Creates an empty world state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an account, for seeding test fixtures and genesis state.
    pub fn insert_account(&mut self, address: Address, account: Account) {
        self.accounts.insert(address, account);
    }

    /// Inserts code, returning its hash.
    pub fn insert_code(&mut self, code: Vec<u8>) -> H256 {
        let code_hash = H256(keccak256(&code));
        self.codes.insert(code_hash, code);
        code_hash
    }

    /// Number of live accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

impl WorldView for MemoryWorldState {
    fn account(&self, address: &Address) -> Result<Option<Account>, StateError> {
        Ok(self.accounts.get(address).cloned())
    }

    fn code(&self, code_hash: &H256) -> Result<Vec<u8>, StateError> {
        if *code_hash == EMPTY_CODE_HASH {
            return Ok(Vec::new());
        }
        self.codes
            .get(code_hash)
            .cloned()
            .ok_or_else(|| StateError::Backend(format!("unknown code hash {code_hash:?}")))
    }

    fn storage(&self, address: &Address, key: &H256) -> Result<U256, StateError> {
        Ok(self
            .storage
            .get(address)
            .and_then(|slots| slots.get(key))
            .copied()
            .unwrap_or_default())
    }
}

impl WorldState for MemoryWorldState {
    fn set_account(&mut self, address: Address, account: Account) {
        self.accounts.insert(address, account);
    }

    fn set_storage(&mut self, address: Address, key: H256, value: U256) {
        self.storage.entry(address).or_default().insert(key, value);
    }

    fn set_code(&mut self, code_hash: H256, code: Vec<u8>) {
        self.codes.insert(code_hash, code);
    }

    fn delete_account(&mut self, address: &Address) {
        self.accounts.remove(address);
        self.storage.remove(address);
    }
}
