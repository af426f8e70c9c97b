mod common;

use crate::common::*;
use pit_core::prelude::*;

#[test]
fn cancel_restores_the_full_buy_reservation() {
    let game = game_with_users(1);
    let book = game.book(Asset::Bread);

    let order = book.place(Side::Buy, 1, 10, 5).unwrap().unmatched.unwrap();
    assert_eq!(game.ledger().balance(1).unwrap().buying_power, 950);

    book.cancel(order.order_id).unwrap();

    assert_eq!(
        game.ledger().balance(1).unwrap(),
        CashBalance {
            held: 1000,
            buying_power: 1000
        }
    );
    assert_eq!(book.resting_order_count(), 0);
    assert_eq!(book.best_bid(), None);
}

#[test]
fn cancel_restores_the_full_sell_reservation() {
    let game = game_with_users(1);
    let book = game.book(Asset::Cheese);

    let order = book.place(Side::Sell, 1, 10, 5).unwrap().unmatched.unwrap();
    assert_eq!(book.balance_of(1).unwrap().selling_power, 95);

    book.cancel(order.order_id).unwrap();

    assert_eq!(
        book.balance_of(1).unwrap(),
        AssetBalance {
            held: 100,
            selling_power: 100
        }
    );
    assert_eq!(book.best_ask(), None);
}

#[test]
fn cancelling_twice_fails_the_second_time() {
    let game = game_with_users(1);
    let book = game.book(Asset::Ham);

    let order = book.place(Side::Buy, 1, 10, 5).unwrap().unmatched.unwrap();
    book.cancel(order.order_id).unwrap();

    assert_eq!(
        book.cancel(order.order_id).unwrap_err(),
        ExchangeError::OrderNotFound(order.order_id)
    );
}

#[test]
fn cancelling_an_unknown_order_fails() {
    let game = game_with_users(1);
    let book = game.book(Asset::Ham);

    assert_eq!(book.cancel(42).unwrap_err(), ExchangeError::OrderNotFound(42));
}

#[test]
fn cancel_after_partial_fill_returns_only_the_remainder() {
    let game = game_with_users(2);
    let book = game.book(Asset::Pickle);

    let order = book.place(Side::Buy, 1, 10, 5).unwrap().unmatched.unwrap();
    book.place(Side::Sell, 2, 10, 3).unwrap();

    book.cancel(order.order_id).unwrap();

    // 30 was spent on the fill; the other 20 comes back.
    let cash = game.ledger().balance(1).unwrap();
    assert_eq!(cash.held, 970);
    assert_eq!(cash.buying_power, 970);
    assert_eq!(book.resting_order_count(), 0);
}

#[test]
fn fully_filled_orders_cannot_be_cancelled() {
    let game = game_with_users(2);
    let book = game.book(Asset::Pickle);

    let order = book.place(Side::Buy, 1, 10, 5).unwrap().unmatched.unwrap();
    book.place(Side::Sell, 2, 10, 5).unwrap();

    assert_eq!(
        book.cancel(order.order_id).unwrap_err(),
        ExchangeError::OrderNotFound(order.order_id)
    );
}

#[test]
fn cancel_leaves_other_orders_at_the_level_untouched() {
    let game = game_with_users(3);
    let book = game.book(Asset::Bread);

    book.place(Side::Buy, 1, 10, 5).unwrap();
    let middle = book.place(Side::Buy, 2, 10, 4).unwrap().unmatched.unwrap();
    book.place(Side::Buy, 3, 10, 3).unwrap();

    book.cancel(middle.order_id).unwrap();

    assert_eq!(side_state(book, Side::Buy), vec![(0, 5), (2, 3)]);
    // Arrival order at the level survives the removal.
    let result = book.place(Side::Sell, 2, 10, 6).unwrap();
    assert_eq!((result.trades[0].buyer_id, result.trades[0].volume), (1, 5));
    assert_eq!((result.trades[1].buyer_id, result.trades[1].volume), (3, 1));
}

#[test]
fn placement_then_cancel_is_a_no_op_for_powers() {
    let game = game_with_users(1);
    let book = game.book(Asset::Ham);
    let cash_before = game.ledger().balance(1).unwrap();
    let assets_before = book.balance_of(1).unwrap();

    let buy = book.place(Side::Buy, 1, 17, 9).unwrap().unmatched.unwrap();
    let sell = book.place(Side::Sell, 1, 23, 11).unwrap().unmatched.unwrap();
    book.cancel(buy.order_id).unwrap();
    book.cancel(sell.order_id).unwrap();

    assert_eq!(game.ledger().balance(1).unwrap(), cash_before);
    assert_eq!(book.balance_of(1).unwrap(), assets_before);
}
