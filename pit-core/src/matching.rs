use ahash::AHashMap;

use crate::book::{AssetBook, BookState};
use crate::types::{AssetBalance, Price, Side, Trade, UserId, Volume};

impl AssetBook {
    /// Walks the opposing ladder in price order, filling against resting
    /// makers FIFO within each level until the taker's volume is gone,
    /// the ladder is exhausted, or the next level no longer crosses the
    /// taker's limit. Each fill settles before the walk continues.
    ///
    /// Trades come out in ascending price order for a buy taker and
    /// descending for a sell taker, makers in time priority within a
    /// level, and always at the maker's price.
    pub(crate) fn match_incoming(
        &self,
        state: &mut BookState,
        taker_side: Side,
        taker_id: UserId,
        limit: Price,
        volume: &mut Volume,
    ) -> Vec<Trade> {
        let BookState {
            balances,
            bids,
            asks,
            directory,
        } = state;
        let opposing = match taker_side {
            Side::Buy => asks,
            Side::Sell => bids,
        };

        let mut trades = Vec::new();
        while *volume > 0 {
            let Some(mut entry) = opposing.levels.first_entry() else {
                break;
            };
            let level_price = entry.key().price;
            let crosses = match taker_side {
                Side::Buy => level_price <= limit,
                Side::Sell => level_price >= limit,
            };
            if !crosses {
                break;
            }

            let level = entry.get_mut();
            while *volume > 0 {
                let Some(maker) = level.front_mut() else {
                    break;
                };
                let traded = (*volume).min(maker.volume);
                maker.volume -= traded;
                *volume -= traded;

                let (buyer_id, seller_id) = match taker_side {
                    Side::Buy => (taker_id, maker.user_id),
                    Side::Sell => (maker.user_id, taker_id),
                };
                let trade = Trade {
                    buyer_id,
                    seller_id,
                    price: level_price,
                    volume: traded,
                    maker_order_id: maker.order_id,
                };
                let maker_done = maker.volume == 0;
                if maker_done {
                    directory.remove(&trade.maker_order_id);
                    level.pop_front();
                }
                self.settle_trade(balances, taker_side, limit, &trade);
                trades.push(trade);
            }
            if level.is_empty() {
                entry.remove();
            }
        }
        trades
    }

    /// Applies one fill to the ledger and to this book's asset records.
    ///
    /// The maker's power (buying power for a resting buy, selling power
    /// for a resting sell) was reserved when the order rested, so only
    /// its `held` moves here. The taker reserved up front at its own
    /// limit, so the taker leg releases the reservation for the filled
    /// units and settles at the maker's price in the same critical
    /// section.
    fn settle_trade(
        &self,
        balances: &mut AHashMap<UserId, AssetBalance>,
        taker_side: Side,
        taker_limit: Price,
        trade: &Trade,
    ) {
        let cost = trade.price * trade.volume;
        match taker_side {
            Side::Buy => {
                {
                    let mut ledger = self.ledger().lock();
                    ledger.settle_sell(trade.seller_id, cost);
                    ledger.release_buy(trade.buyer_id, taker_limit * trade.volume);
                    ledger.settle_buy(trade.buyer_id, cost);
                }
                let seller = balances
                    .get_mut(&trade.seller_id)
                    .expect("maker without an asset record");
                assert!(seller.held >= trade.volume, "sell settlement underflow");
                seller.held -= trade.volume;
                let buyer = balances
                    .get_mut(&trade.buyer_id)
                    .expect("taker without an asset record");
                buyer.held += trade.volume;
                buyer.selling_power += trade.volume;
            }
            Side::Sell => {
                {
                    let mut ledger = self.ledger().lock();
                    ledger.release_buy(trade.buyer_id, cost);
                    ledger.settle_buy(trade.buyer_id, cost);
                    ledger.settle_sell(trade.seller_id, cost);
                }
                let buyer = balances
                    .get_mut(&trade.buyer_id)
                    .expect("maker without an asset record");
                buyer.held += trade.volume;
                buyer.selling_power += trade.volume;
                let seller = balances
                    .get_mut(&trade.seller_id)
                    .expect("taker without an asset record");
                assert!(seller.held >= trade.volume, "sell settlement underflow");
                seller.held -= trade.volume;
            }
        }
        tracing::trace!(
            asset = %self.asset(),
            buyer = trade.buyer_id,
            seller = trade.seller_id,
            price = trade.price,
            volume = trade.volume,
            "trade settled"
        );
    }
}
