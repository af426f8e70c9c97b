use std::collections::hash_map::Entry;
use std::sync::{Mutex, MutexGuard};

use ahash::AHashMap;

use crate::types::{CashBalance, UserId};

/// CashLedger is the process-wide cash record for every user. It is
/// shared by reference among all asset books, because any user may trade
/// on any book while their cash is one pot.
///
/// A single mutex guards the whole mapping. Every read or write of any
/// field goes through [`CashLedger::lock`]; settlement of one trade
/// (which touches two users) composes its updates inside one critical
/// section.
#[derive(Debug, Default)]
pub struct CashLedger {
    inner: Mutex<AHashMap<UserId, CashBalance>>,
}

impl CashLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the ledger for a sequence of balance operations.
    pub fn lock(&self) -> LedgerGuard<'_> {
        LedgerGuard(self.inner.lock().expect("cash ledger poisoned"))
    }

    /// Inserts a record for `user_id` if absent. Idempotent.
    pub fn ensure_user(&self, user_id: UserId, initial_cash: u32) {
        self.lock().ensure_user(user_id, initial_cash);
    }

    /// Whether a record exists for `user_id`.
    pub fn contains_user(&self, user_id: UserId) -> bool {
        self.lock().contains(user_id)
    }

    /// The user's current record, if any.
    pub fn balance(&self, user_id: UserId) -> Option<CashBalance> {
        self.lock().balance(user_id)
    }

    /// Every user with a record, in no particular order.
    pub fn users(&self) -> Vec<UserId> {
        self.lock().0.keys().copied().collect()
    }

    /// Sum of held cash over all users. Constant under trading.
    pub fn total_held(&self) -> u64 {
        self.lock().0.values().map(|b| u64::from(b.held)).sum()
    }
}

/// LedgerGuard is the locked view of the ledger. The reservation and
/// settlement primitives live here so callers can compose several of
/// them in a single critical section.
pub struct LedgerGuard<'a>(MutexGuard<'a, AHashMap<UserId, CashBalance>>);

impl LedgerGuard<'_> {
    /// Inserts a record for `user_id` if absent. Idempotent.
    pub fn ensure_user(&mut self, user_id: UserId, initial_cash: u32) {
        if let Entry::Vacant(entry) = self.0.entry(user_id) {
            entry.insert(CashBalance::new(initial_cash));
        }
    }

    /// Whether a record exists for `user_id`.
    pub fn contains(&self, user_id: UserId) -> bool {
        self.0.contains_key(&user_id)
    }

    /// The user's current record, if any.
    pub fn balance(&self, user_id: UserId) -> Option<CashBalance> {
        self.0.get(&user_id).copied()
    }

    /// The user's remaining buying power, if a record exists.
    pub fn buying_power(&self, user_id: UserId) -> Option<u32> {
        self.0.get(&user_id).map(|b| b.buying_power)
    }

    /// Reserves `cost` of buying power. The caller has already checked
    /// sufficiency under this same lock.
    pub fn reserve_buy(&mut self, user_id: UserId, cost: u32) {
        let record = self.record(user_id);
        assert!(record.buying_power >= cost, "buy reservation underflow");
        record.buying_power -= cost;
    }

    /// Returns `cost` of reserved buying power.
    pub fn release_buy(&mut self, user_id: UserId, cost: u32) {
        self.record(user_id).buying_power += cost;
    }

    /// Settles the buyer's leg of a trade: `cost` leaves both `held` and
    /// `buying_power`. Any reservation backing the fill must have been
    /// released first, so the two fields move together here.
    pub fn settle_buy(&mut self, user_id: UserId, cost: u32) {
        let record = self.record(user_id);
        assert!(record.held >= cost, "buy settlement underflow");
        assert!(record.buying_power >= cost, "buy settlement exceeds buying power");
        record.held -= cost;
        record.buying_power -= cost;
    }

    /// Settles the seller's leg of a trade: `cost` lands in both `held`
    /// and `buying_power`.
    pub fn settle_sell(&mut self, user_id: UserId, cost: u32) {
        let record = self.record(user_id);
        record.held += cost;
        record.buying_power += cost;
    }

    fn record(&mut self, user_id: UserId) -> &mut CashBalance {
        self.0
            .get_mut(&user_id)
            .expect("ledger record missing for settled user")
    }
}
