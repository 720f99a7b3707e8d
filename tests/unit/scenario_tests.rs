//! End-to-end flows through the depth-aware book with all listener
//! capabilities wired.

use crate::common::{
    add, add_with, limit, market, session_book, stop_market, with_conditions,
};
use matchbook_rs::prelude::*;

#[test]
fn test_simple_cross_completes_both_orders() {
    let (mut book, session) = session_book("AAPL");
    let bid = limit(Side::Buy, 1250, 100);
    let ask = limit(Side::Sell, 1250, 100);

    assert!(!add(&mut book, &bid));
    assert!(add(&mut book, &ask));

    let fills = session.fills();
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].qty, 100);
    assert_eq!(fills[0].cost, 100 * 1250);
    assert_eq!(bid.state(), OrderState::Filled);
    assert_eq!(ask.state(), OrderState::Filled);
    assert_eq!(book.bids().count(), 0);
    assert_eq!(book.asks().count(), 0);
    assert_eq!(book.market_price(), 1250);
    // One trade observed, one book change per add.
    assert_eq!(session.trades.borrow().as_slice(), &[(100, 100 * 1250)]);
    assert_eq!(*session.book_changes.borrow(), 2);
    // Depth is all vacant again.
    assert!(book.depth().bids().iter().all(|level| !level.is_valid()));
    assert!(book.depth().asks().iter().all(|level| !level.is_valid()));
}

#[test]
fn test_multi_level_walk_respects_time_priority() {
    let (mut book, session) = session_book("AAPL");
    let ask0 = limit(Side::Sell, 1251, 300);
    let ask1 = limit(Side::Sell, 1251, 200);
    let ask2 = limit(Side::Sell, 1252, 100);
    add(&mut book, &ask0);
    add(&mut book, &ask1);
    add(&mut book, &ask2);

    let bid = limit(Side::Buy, 1251, 500);
    assert!(add(&mut book, &bid));

    let fills = session.fills();
    assert_eq!(fills.len(), 2);
    assert!(fills.iter().all(|fill| fill.inbound == bid.id()));
    assert_eq!((fills[0].matched, fills[0].qty), (ask0.id(), 300));
    assert_eq!((fills[1].matched, fills[1].qty), (ask1.id(), 200));
    assert_eq!(fills[0].cost, 300 * 1251);
    assert_eq!(bid.state(), OrderState::Filled);
    assert_eq!(ask2.state(), OrderState::Accepted);
    assert_eq!(book.asks().count(), 1);
    assert_eq!(book.depth().asks()[0].price(), 1252);
}

#[test]
fn test_market_against_market_needs_seed_trade() {
    let (mut book, session) = session_book("AAPL");
    let market_bid = market(Side::Buy, 100);
    let market_ask = market(Side::Sell, 100);
    assert!(!add(&mut book, &market_bid));
    assert!(!add(&mut book, &market_ask));
    assert!(session.fills().is_empty());
    assert_eq!(book.market_price(), 0);

    // The limit pair trades against the waiting market orders at 9900.
    let bid = limit(Side::Buy, 9900, 100);
    let ask = limit(Side::Sell, 9900, 100);
    assert!(add(&mut book, &bid));
    assert!(add(&mut book, &ask));
    assert_eq!(book.market_price(), 9900);

    // Market against market now trades at the established price.
    let late_bid = market(Side::Buy, 10);
    let late_ask = market(Side::Sell, 10);
    add(&mut book, &late_bid);
    assert!(add(&mut book, &late_ask));
    let last = session.fills().pop().unwrap();
    assert_eq!((last.qty, last.cost), (10, 10 * 9900));
}

#[test]
fn test_aon_rests_when_reachable_quantity_is_short() {
    let (mut book, session) = session_book("AAPL");
    add(&mut book, &limit(Side::Sell, 1252, 100));
    add(&mut book, &limit(Side::Sell, 1251, 100));

    let bid = with_conditions(Side::Buy, 1251, 300, OrderConditions::ALL_OR_NONE);
    assert!(!add_with(&mut book, &bid, OrderConditions::ALL_OR_NONE));

    assert!(session.fills().is_empty());
    assert_eq!(bid.state(), OrderState::Accepted);
    let (_, tracker) = book.bids().next().unwrap();
    assert_eq!(tracker.open_qty(), 300);
    assert!(tracker.all_or_none());
}

#[test]
fn test_aon_filled_by_two_resting_orders() {
    let (mut book, session) = session_book("AAPL");
    add(&mut book, &limit(Side::Sell, 1251, 200));
    add(&mut book, &limit(Side::Sell, 1251, 200));

    let bid = with_conditions(Side::Buy, 1251, 400, OrderConditions::ALL_OR_NONE);
    assert!(add_with(&mut book, &bid, OrderConditions::ALL_OR_NONE));

    let fills = session.fills();
    assert_eq!(fills.len(), 2);
    assert!(fills.iter().all(|fill| fill.qty == 200));
    assert_eq!(bid.state(), OrderState::Filled);
    assert_eq!(bid.filled_cost(), 400 * 1251);
}

#[test]
fn test_stop_cascade_after_market_moves() {
    let (mut book, _session) = session_book("AAPL");
    // Seed the market price with a trade at 55.
    add(&mut book, &limit(Side::Buy, 55, 10));
    assert!(add(&mut book, &market(Side::Sell, 10)));
    assert_eq!(book.market_price(), 55);

    let buy_stop = stop_market(Side::Buy, 100, 56);
    let sell_stop = stop_market(Side::Sell, 100, 54);
    add(&mut book, &buy_stop);
    add(&mut book, &sell_stop);
    assert_eq!(buy_stop.state(), OrderState::Accepted);
    assert_eq!(book.stop_bids().count(), 1);
    assert_eq!(book.stop_asks().count(), 1);

    // Leave an ask for the triggered stop, then cross at 57.
    let resting_ask = limit(Side::Sell, 58, 100);
    add(&mut book, &resting_ask);
    add(&mut book, &limit(Side::Sell, 57, 100));
    assert!(add(&mut book, &limit(Side::Buy, 57, 100)));

    // Market price moved to 57; the buy stop woke and took the 58 ask.
    assert_eq!(book.stop_bids().count(), 0);
    assert_eq!(book.stop_asks().count(), 1);
    assert_eq!(buy_stop.state(), OrderState::Filled);
    assert_eq!(resting_ask.state(), OrderState::Filled);
    assert_eq!(book.market_price(), 58);
}

#[test]
fn test_ioc_partial_fill_then_residual_cancel() {
    let (mut book, session) = session_book("AAPL");
    add(&mut book, &limit(Side::Sell, 1251, 100));

    let bid = with_conditions(Side::Buy, 1251, 300, OrderConditions::IMMEDIATE_OR_CANCEL);
    assert!(add_with(&mut book, &bid, OrderConditions::IMMEDIATE_OR_CANCEL));

    let fills = session.fills();
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].qty, 100);
    assert_eq!(session.cancels.borrow().as_slice(), &[bid.id()]);
    assert_eq!(bid.state(), OrderState::Cancelled);
    assert_eq!(bid.filled_qty(), 100);
    assert_eq!(book.bids().count(), 0);
}

#[test]
fn test_depth_level_restoration_from_overflow() {
    let (mut book, session) = session_book("AAPL");
    let best = limit(Side::Sell, 1250, 100);
    add(&mut book, &best);
    for price in [1251, 1252, 1253, 1254, 1255] {
        add(&mut book, &limit(Side::Sell, price, 100));
    }
    // Five visible levels, 1255 in overflow.
    let visible: Vec<Price> = book.depth().asks().iter().map(|l| l.price()).collect();
    assert_eq!(visible, vec![1250, 1251, 1252, 1253, 1254]);
    let depth_changes_before = session.depth_change_count();

    // Fully cancel the best ask.
    book.cancel(&best);
    book.perform_callbacks();

    let visible: Vec<Price> = book.depth().asks().iter().map(|l| l.price()).collect();
    assert_eq!(visible, vec![1251, 1252, 1253, 1254, 1255]);

    // One depth publication for the cancel; every shifted slot carries the
    // new stamp, and the best ask moved so the BBO feed fired too.
    assert_eq!(session.depth_change_count(), depth_changes_before + 1);
    assert!(session.bbo_change_count() >= 1);
    let stamp = book.depth().last_change();
    for level in book.depth().asks() {
        assert_eq!(level.last_change(), stamp);
    }
    assert_eq!(best.state(), OrderState::Cancelled);
}
