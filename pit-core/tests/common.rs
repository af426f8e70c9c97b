use pit_core::prelude::*;

/// Cash every test user starts with unless a test says otherwise.
pub const CASH: u32 = 1000;
/// Units of each asset every test user starts with.
pub const ASSETS: u32 = 100;

/// A game with users `1..=count` registered on every book.
pub fn game_with_users(count: u32) -> Game {
    let game = Game::new();
    for user_id in 1..=count {
        game.register(user_id, CASH, ASSETS);
    }
    game
}

/// The resting (order_id, volume) pairs on one side of a book, best
/// level first, FIFO within a level.
pub fn side_state(book: &AssetBook, side: Side) -> Vec<(OrderId, Volume)> {
    book.orders()
        .into_iter()
        .filter(|order| order.side == side)
        .map(|order| (order.order_id, order.volume))
        .collect()
}

/// Cash a user's resting buys on this book still have reserved.
pub fn reserved_cash(book: &AssetBook, user_id: UserId) -> u32 {
    book.user_orders(user_id)
        .iter()
        .filter(|order| order.side == Side::Buy)
        .map(Order::cost)
        .sum()
}

/// Volume a user's resting sells on this book still have reserved.
pub fn reserved_volume(book: &AssetBook, user_id: UserId) -> u32 {
    book.user_orders(user_id)
        .iter()
        .filter(|order| order.side == Side::Sell)
        .map(|order| order.volume)
        .sum()
}
