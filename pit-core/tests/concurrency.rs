mod common;

use std::sync::Arc;
use std::thread;

use crate::common::*;
use pit_core::prelude::*;

#[test]
fn racing_buys_on_two_books_reserve_the_same_cash_once() {
    // One user with 100 cash, two books, two 80-cost buys in flight:
    // whichever reservation wins leaves no room for the other.
    let game = Arc::new(Game::new());
    game.register(1, 100, 100);
    let handles = spawn_workers(&game);

    let bread = handles[Asset::Bread.index()].clone();
    let cheese = handles[Asset::Cheese.index()].clone();
    let on_bread = thread::spawn(move || bread.place(Side::Buy, 1, 10, 8));
    let on_cheese = thread::spawn(move || cheese.place(Side::Buy, 1, 10, 8));
    let results = [on_bread.join().unwrap(), on_cheese.join().unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let rejection = results.iter().find(|r| r.is_err()).unwrap();
    assert_eq!(
        *rejection.as_ref().unwrap_err(),
        ExchangeError::InsufficientBuyingPower
    );
    assert_eq!(
        game.ledger().balance(1).unwrap(),
        CashBalance {
            held: 100,
            buying_power: 20
        }
    );
}

#[test]
fn a_book_worker_applies_commands_in_submission_order() {
    let game = Arc::new(game_with_users(3));
    let handles = spawn_workers(&game);
    let bread = &handles[Asset::Bread.index()];

    bread.place(Side::Buy, 1, 10, 3).unwrap();
    bread.place(Side::Buy, 2, 10, 2).unwrap();
    let result = bread.place(Side::Sell, 3, 10, 4).unwrap();

    assert_eq!((result.trades[0].buyer_id, result.trades[0].volume), (1, 3));
    assert_eq!((result.trades[1].buyer_id, result.trades[1].volume), (2, 1));
}

#[test]
fn snapshots_stay_consistent_under_concurrent_trading() {
    let game = Arc::new(game_with_users(4));
    let handles = spawn_workers(&game);
    let cash_total = game.ledger().total_held();

    let writers: Vec<_> = [Asset::Bread, Asset::Cheese]
        .into_iter()
        .map(|asset| {
            let handle = handles[asset.index()].clone();
            thread::spawn(move || {
                for round in 0..500u32 {
                    let user_id = 1 + round % 4;
                    let price = 1 + round % 20;
                    let _ = handle.place(Side::Buy, user_id, price, 1 + round % 3);
                    let _ = handle.place(Side::Sell, user_id, price, 1 + round % 3);
                }
            })
        })
        .collect();

    let reader = {
        let game = Arc::clone(&game);
        thread::spawn(move || {
            for _ in 0..500 {
                for user_id in 1..=4 {
                    let state = game.snapshot(user_id).unwrap();
                    // A record is read whole: power never exceeds held.
                    assert!(state.cash.buying_power <= state.cash.held);
                    for balance in state.assets {
                        assert!(balance.selling_power <= balance.held);
                    }
                }
                let _ = game.leaderboard();
            }
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    reader.join().unwrap();

    // Trading only moves cash between users.
    assert_eq!(game.ledger().total_held(), cash_total);
    for asset in [Asset::Bread, Asset::Cheese] {
        let book = game.book(asset);
        for user_id in 1..=4 {
            let cash = game.ledger().balance(user_id).unwrap();
            let total_reserved: u32 = game
                .books()
                .iter()
                .map(|b| reserved_cash(b, user_id))
                .sum();
            assert_eq!(cash.buying_power, cash.held - total_reserved);
            let assets = book.balance_of(user_id).unwrap();
            assert_eq!(
                assets.selling_power,
                assets.held - reserved_volume(book, user_id)
            );
        }
    }
}
