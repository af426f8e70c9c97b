use std::sync::Arc;
use std::sync::atomic::AtomicU32;

use serde::Serialize;

use crate::book::AssetBook;
use crate::error::ExchangeError;
use crate::ledger::CashLedger;
use crate::types::{
    Asset, AssetBalance, CashBalance, NUM_ASSETS, Order, SET_BONUS, UserId,
};

/// GameState is the read-side view of one user: their cash record, their
/// asset record on every book, and every order they have resting.
///
/// Reads are advisory: each book is read under its own lock and the
/// ledger under its mutex, so the view is consistent per book but not
/// linearized across books.
#[derive(Clone, Debug, Serialize)]
pub struct GameState {
    pub cash: CashBalance,
    pub assets: [AssetBalance; NUM_ASSETS],
    pub orders: Vec<Order>,
}

/// Game owns one book per asset and the cash ledger they share.
///
/// Write operations go to a book's writer thread (see
/// [`crate::worker`]); snapshot, portfolio, and leaderboard reads may
/// come from any thread.
pub struct Game {
    ledger: Arc<CashLedger>,
    books: [AssetBook; NUM_ASSETS],
}

impl Game {
    /// Creates a game with empty books and an empty ledger.
    pub fn new() -> Self {
        let ledger = Arc::new(CashLedger::new());
        let order_ids = Arc::new(AtomicU32::new(0));
        let books =
            Asset::ALL.map(|asset| AssetBook::new(asset, Arc::clone(&ledger), Arc::clone(&order_ids)));
        Self { ledger, books }
    }

    /// The shared cash ledger.
    pub fn ledger(&self) -> &Arc<CashLedger> {
        &self.ledger
    }

    /// The book trading `asset`.
    #[inline(always)]
    pub fn book(&self, asset: Asset) -> &AssetBook {
        &self.books[asset.index()]
    }

    /// All books in asset order.
    pub fn books(&self) -> &[AssetBook; NUM_ASSETS] {
        &self.books
    }

    /// Registers a user on every book with the same starting balances.
    /// Idempotent, like per-book registration.
    pub fn register(&self, user_id: UserId, cash: u32, assets: u32) {
        for book in &self.books {
            book.register(user_id, cash, assets);
        }
    }

    /// Assembles the user's view across the ledger and every book.
    pub fn snapshot(&self, user_id: UserId) -> Result<GameState, ExchangeError> {
        let cash = self
            .ledger
            .balance(user_id)
            .ok_or(ExchangeError::UserNotFound(user_id))?;
        let mut assets = [AssetBalance::default(); NUM_ASSETS];
        let mut orders = Vec::new();
        for book in &self.books {
            let (balance, resting) = book
                .user_view(user_id)
                .ok_or(ExchangeError::NotRegistered(user_id, book.asset()))?;
            assets[book.asset().index()] = balance;
            orders.extend(resting);
        }
        Ok(GameState {
            cash,
            assets,
            orders,
        })
    }

    /// Values the user's holdings: held cash, plus each asset at its
    /// unit value, plus the set premium for every complete ingredient
    /// set (the minimum held across all assets, if it is at least one).
    pub fn portfolio(&self, user_id: UserId) -> Result<u64, ExchangeError> {
        let cash = self
            .ledger
            .balance(user_id)
            .ok_or(ExchangeError::UserNotFound(user_id))?;
        let mut value = u64::from(cash.held);
        let mut complete_sets = u32::MAX;
        for book in &self.books {
            let held = book.balance_of(user_id).map_or(0, |b| b.held);
            complete_sets = complete_sets.min(held);
            value += u64::from(held) * book.asset().unit_value();
        }
        Ok(value + SET_BONUS * u64::from(complete_sets))
    }

    /// Portfolio value of every user, highest first. Ties break by user
    /// id so the ordering is stable for display.
    pub fn leaderboard(&self) -> Vec<(UserId, u64)> {
        let mut entries: Vec<(UserId, u64)> = self
            .ledger
            .users()
            .into_iter()
            .filter_map(|user_id| self.portfolio(user_id).ok().map(|value| (user_id, value)))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        entries
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}
