use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ahash::AHashMap;

use crate::error::ExchangeError;
use crate::ledger::CashLedger;
use crate::types::{
    Asset, AssetBalance, MAX_PRICE, MAX_VOLUME, MIN_PRICE, MIN_VOLUME, Order, OrderId,
    OrderResult, Price, Side, UserId, Volume,
};

/// LevelKey orders the price levels of one ladder.
///
/// The ordering semantics are:
/// - Buy levels: higher prices first, so the front of the bid ladder is
///   the best bid.
/// - Sell levels: lower prices first, so the front of the ask ladder is
///   the best ask.
///
/// Time priority within a level comes from the level's FIFO queue, not
/// from the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LevelKey {
    pub price: Price,
    pub side: Side,
}

impl Ord for LevelKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.side {
            // Higher price first for buys
            Side::Buy => other.price.cmp(&self.price),
            // Lower price first for sells
            Side::Sell => self.price.cmp(&other.price),
        }
    }
}

impl PartialOrd for LevelKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Ladder is one side of a book: price levels in priority order, with a
/// FIFO queue of resting orders at each level. A level present in the
/// map is never empty.
#[derive(Debug)]
pub(crate) struct Ladder {
    side: Side,
    pub(crate) levels: BTreeMap<LevelKey, VecDeque<Order>>,
}

impl Ladder {
    fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    fn key(&self, price: Price) -> LevelKey {
        LevelKey {
            price,
            side: self.side,
        }
    }

    /// Appends an order behind everything already resting at its price.
    fn push(&mut self, order: Order) {
        self.levels
            .entry(self.key(order.price))
            .or_default()
            .push_back(order);
    }

    /// Removes an order from its level, dropping the level if it empties.
    fn remove(&mut self, price: Price, order_id: OrderId) -> Option<Order> {
        let key = self.key(price);
        let level = self.levels.get_mut(&key)?;
        let position = level.iter().position(|o| o.order_id == order_id)?;
        let order = level.remove(position);
        if level.is_empty() {
            self.levels.remove(&key);
        }
        order
    }

    /// Price of the best level, if the ladder is non-empty.
    fn best_price(&self) -> Option<Price> {
        self.levels.keys().next().map(|key| key.price)
    }

    fn orders(&self) -> impl Iterator<Item = &Order> {
        self.levels.values().flatten()
    }
}

/// Everything a book owns, behind the book's lock as one unit so a
/// reader never observes a half-applied operation.
pub(crate) struct BookState {
    pub(crate) balances: AHashMap<UserId, AssetBalance>,
    pub(crate) bids: Ladder,
    pub(crate) asks: Ladder,
    /// Resting orders by id; the value locates the order's level.
    pub(crate) directory: AHashMap<OrderId, (Side, Price)>,
}

impl BookState {
    pub(crate) fn ladder_mut(&mut self, side: Side) -> &mut Ladder {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }
}

/// AssetBook matches and rests orders for one asset.
///
/// Writes (`register`, `place`, `cancel`) are driven by the book's
/// single writer thread; snapshot and leaderboard readers come from
/// other threads. Both go through the book's `RwLock`, so a reader
/// always sees the book between operations, never inside one.
pub struct AssetBook {
    asset: Asset,
    ledger: Arc<CashLedger>,
    /// Order-id source shared across every book. Relaxed: ids only need
    /// to be unique, not ordered across books.
    order_ids: Arc<AtomicU32>,
    state: RwLock<BookState>,
}

impl AssetBook {
    /// Creates an empty book for `asset`, sharing the given ledger and
    /// order-id source.
    pub fn new(asset: Asset, ledger: Arc<CashLedger>, order_ids: Arc<AtomicU32>) -> Self {
        Self {
            asset,
            ledger,
            order_ids,
            state: RwLock::new(BookState {
                balances: AHashMap::new(),
                bids: Ladder::new(Side::Buy),
                asks: Ladder::new(Side::Sell),
                directory: AHashMap::new(),
            }),
        }
    }

    /// The asset this book trades.
    #[inline(always)]
    pub fn asset(&self) -> Asset {
        self.asset
    }

    pub(crate) fn ledger(&self) -> &CashLedger {
        &self.ledger
    }

    fn read_state(&self) -> RwLockReadGuard<'_, BookState> {
        self.state.read().expect("book lock poisoned")
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, BookState> {
        self.state.write().expect("book lock poisoned")
    }

    /// Registers a user on this book. Creates the user's cash record if
    /// this is their first registration anywhere, and their asset record
    /// if it is their first on this book. Idempotent per book.
    pub fn register(&self, user_id: UserId, cash: u32, assets: u32) {
        let mut state = self.write_state();
        self.ledger.ensure_user(user_id, cash);
        state
            .balances
            .entry(user_id)
            .or_insert_with(|| AssetBalance::new(assets));
    }

    /// Checks whether an order could be placed right now. Never mutates;
    /// placement revalidates under the same locks it reserves with.
    pub fn validate(
        &self,
        side: Side,
        user_id: UserId,
        price: Price,
        volume: Volume,
    ) -> Result<(), ExchangeError> {
        let state = self.read_state();
        let ledger = self.ledger.lock();
        if !ledger.contains(user_id) {
            return Err(ExchangeError::UserNotFound(user_id));
        }
        let Some(balance) = state.balances.get(&user_id) else {
            return Err(ExchangeError::NotRegistered(user_id, self.asset));
        };
        if !(MIN_PRICE..=MAX_PRICE).contains(&price) || !(MIN_VOLUME..=MAX_VOLUME).contains(&volume)
        {
            return Err(ExchangeError::OutOfRange);
        }
        match side {
            Side::Buy => {
                let buying_power = ledger.buying_power(user_id).unwrap_or(0);
                if price * volume > buying_power {
                    return Err(ExchangeError::InsufficientBuyingPower);
                }
            }
            Side::Sell => {
                if volume > balance.selling_power {
                    return Err(ExchangeError::InsufficientAsset(self.asset));
                }
            }
        }
        Ok(())
    }

    /// Places a limit order: validates and reserves, matches against the
    /// opposing ladder in price-time priority, and rests any remainder.
    ///
    /// On error nothing has changed. On success the result carries every
    /// fill (at maker prices) plus the resting remainder, if any.
    pub fn place(
        &self,
        side: Side,
        user_id: UserId,
        price: Price,
        mut volume: Volume,
    ) -> Result<OrderResult, ExchangeError> {
        let mut state = self.write_state();

        // Validation and reservation are one critical section: another
        // book racing this user for the same cash sees the reservation
        // or the rejection, never a window between check and debit.
        {
            let mut ledger = self.ledger.lock();
            if !ledger.contains(user_id) {
                return Err(ExchangeError::UserNotFound(user_id));
            }
            if !state.balances.contains_key(&user_id) {
                return Err(ExchangeError::NotRegistered(user_id, self.asset));
            }
            if !(MIN_PRICE..=MAX_PRICE).contains(&price)
                || !(MIN_VOLUME..=MAX_VOLUME).contains(&volume)
            {
                return Err(ExchangeError::OutOfRange);
            }
            match side {
                Side::Buy => {
                    let cost = price * volume;
                    if cost > ledger.buying_power(user_id).unwrap_or(0) {
                        return Err(ExchangeError::InsufficientBuyingPower);
                    }
                    ledger.reserve_buy(user_id, cost);
                }
                Side::Sell => {
                    let balance = state
                        .balances
                        .get_mut(&user_id)
                        .expect("asset record checked above");
                    if volume > balance.selling_power {
                        return Err(ExchangeError::InsufficientAsset(self.asset));
                    }
                    balance.selling_power -= volume;
                }
            }
        }

        let order_id = self.order_ids.fetch_add(1, Ordering::Relaxed);
        let trades = self.match_incoming(&mut state, side, user_id, price, &mut volume);

        if volume == 0 {
            return Ok(OrderResult {
                trades,
                unmatched: None,
            });
        }

        // The remainder's reservation is the unreleased part of the
        // up-front one; resting it costs nothing further.
        let order = Order {
            asset: self.asset,
            side,
            user_id,
            price,
            volume,
            order_id,
        };
        state.ladder_mut(side).push(order);
        state.directory.insert(order_id, (side, price));
        Ok(OrderResult {
            trades,
            unmatched: Some(order),
        })
    }

    /// Cancels a resting order, returning its reservation to the owner.
    /// The transport authenticates ownership before calling.
    pub fn cancel(&self, order_id: OrderId) -> Result<(), ExchangeError> {
        let mut state = self.write_state();
        let (side, price) = state
            .directory
            .remove(&order_id)
            .ok_or(ExchangeError::OrderNotFound(order_id))?;
        let order = state
            .ladder_mut(side)
            .remove(price, order_id)
            .expect("directory points at a missing order");
        match side {
            Side::Buy => self.ledger.lock().release_buy(order.user_id, order.cost()),
            Side::Sell => {
                state
                    .balances
                    .get_mut(&order.user_id)
                    .expect("resting order for unregistered user")
                    .selling_power += order.volume;
            }
        }
        Ok(())
    }

    /// The user's asset record on this book, if registered.
    pub fn balance_of(&self, user_id: UserId) -> Option<AssetBalance> {
        self.read_state().balances.get(&user_id).copied()
    }

    /// Every order the user has resting on this book.
    pub fn user_orders(&self, user_id: UserId) -> Vec<Order> {
        let state = self.read_state();
        state
            .bids
            .orders()
            .chain(state.asks.orders())
            .filter(|o| o.user_id == user_id)
            .copied()
            .collect()
    }

    /// The user's asset record and resting orders, read together under
    /// one guard so they agree with each other.
    pub fn user_view(&self, user_id: UserId) -> Option<(AssetBalance, Vec<Order>)> {
        let state = self.read_state();
        let balance = *state.balances.get(&user_id)?;
        let orders = state
            .bids
            .orders()
            .chain(state.asks.orders())
            .filter(|o| o.user_id == user_id)
            .copied()
            .collect();
        Some((balance, orders))
    }

    /// Every order resting on this book, bids first.
    pub fn orders(&self) -> Vec<Order> {
        let state = self.read_state();
        state.bids.orders().chain(state.asks.orders()).copied().collect()
    }

    /// Ids of every resting order.
    pub fn resting_ids(&self) -> Vec<OrderId> {
        self.read_state().directory.keys().copied().collect()
    }

    /// Whether `order_id` is resting on this book.
    pub fn contains_order(&self, order_id: OrderId) -> bool {
        self.read_state().directory.contains_key(&order_id)
    }

    /// Number of resting orders.
    pub fn resting_order_count(&self) -> usize {
        self.read_state().directory.len()
    }

    /// Best bid price, if any bid rests.
    pub fn best_bid(&self) -> Option<Price> {
        self.read_state().bids.best_price()
    }

    /// Best ask price, if any ask rests.
    pub fn best_ask(&self) -> Option<Price> {
        self.read_state().asks.best_price()
    }

    /// Sum of held units over all users. Constant under trading.
    pub fn total_held(&self) -> u64 {
        self.read_state()
            .balances
            .values()
            .map(|b| u64::from(b.held))
            .sum()
    }
}
