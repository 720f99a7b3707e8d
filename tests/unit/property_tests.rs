//! Cross-cutting properties of the engine: conservation, depth
//! projection, stamp monotonicity, and the book log.

use crate::common::{add, add_with, limit, session_book, with_conditions};
use matchbook_rs::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Sum of open quantities per price from the live book side.
fn projection(
    entries: impl Iterator<Item = (Price, Quantity)>,
) -> HashMap<Price, (u32, Quantity)> {
    let mut by_price: HashMap<Price, (u32, Quantity)> = HashMap::new();
    for (price, qty) in entries {
        let entry = by_price.entry(price).or_default();
        entry.0 += 1;
        entry.1 += qty;
    }
    by_price
}

fn assert_depth_matches_book(book: &DepthOrderBook<SimpleOrder>) {
    let bid_projection = projection(
        book.bids()
            .map(|(key, tracker)| (key.price().price(), tracker.open_qty())),
    );
    for level in book.depth().bids().iter().filter(|level| level.is_valid()) {
        let (count, qty) = bid_projection
            .get(&level.price())
            .copied()
            .unwrap_or_default();
        assert_eq!(level.order_count(), count, "bid count at {}", level.price());
        assert_eq!(level.aggregate_qty(), qty, "bid qty at {}", level.price());
    }

    let ask_projection = projection(
        book.asks()
            .map(|(key, tracker)| (key.price().price(), tracker.open_qty())),
    );
    for level in book.depth().asks().iter().filter(|level| level.is_valid()) {
        let (count, qty) = ask_projection
            .get(&level.price())
            .copied()
            .unwrap_or_default();
        assert_eq!(level.order_count(), count, "ask count at {}", level.price());
        assert_eq!(level.aggregate_qty(), qty, "ask qty at {}", level.price());
    }
}

#[test]
fn test_filled_plus_open_equals_order_qty() {
    let (mut book, _session) = session_book("AAPL");
    let orders: Vec<Arc<SimpleOrder>> = vec![
        limit(Side::Sell, 1251, 120),
        limit(Side::Sell, 1252, 80),
        limit(Side::Buy, 1252, 150),
        limit(Side::Buy, 1249, 60),
        limit(Side::Sell, 1249, 200),
    ];
    for order in &orders {
        add(&mut book, order);
    }

    for order in &orders {
        assert_eq!(
            order.filled_qty() + order.open_qty(),
            order.order_qty(),
            "conservation for order at {}",
            order.price()
        );
    }
}

#[test]
fn test_terminal_orders_account_for_full_quantity() {
    let (mut book, _session) = session_book("AAPL");
    add(&mut book, &limit(Side::Sell, 1251, 100));

    let ioc = with_conditions(Side::Buy, 1251, 300, OrderConditions::IMMEDIATE_OR_CANCEL);
    add_with(&mut book, &ioc, OrderConditions::IMMEDIATE_OR_CANCEL);
    // Terminal: filled + cancelled covers the order quantity.
    assert_eq!(ioc.state(), OrderState::Cancelled);
    assert_eq!(ioc.filled_qty(), 100);
    assert_eq!(ioc.open_qty(), 200);

    let cancelled = limit(Side::Buy, 1200, 50);
    add(&mut book, &cancelled);
    book.cancel(&cancelled);
    book.perform_callbacks();
    assert_eq!(cancelled.state(), OrderState::Cancelled);
    assert_eq!(cancelled.filled_qty(), 0);
    assert_eq!(cancelled.open_qty(), 50);
}

#[test]
fn test_depth_is_projection_of_resting_orders() {
    let (mut book, _session) = session_book("AAPL");
    let flow = [
        (Side::Sell, 1253, 100),
        (Side::Sell, 1251, 150),
        (Side::Sell, 1251, 50),
        (Side::Buy, 1250, 70),
        (Side::Buy, 1248, 90),
        (Side::Buy, 1252, 120),
        (Side::Sell, 1247, 60),
    ];
    for (side, price, qty) in flow {
        add(&mut book, &limit(side, price, qty));
        assert_depth_matches_book(&book);
    }
}

#[test]
fn test_depth_projection_survives_cancel_and_replace() {
    let (mut book, _session) = session_book("AAPL");
    let bid = limit(Side::Buy, 1250, 100);
    let ask = limit(Side::Sell, 1253, 100);
    add(&mut book, &bid);
    add(&mut book, &ask);
    add(&mut book, &limit(Side::Buy, 1249, 40));
    assert_depth_matches_book(&book);

    book.replace(&bid, -30, PRICE_UNCHANGED);
    book.perform_callbacks();
    assert_depth_matches_book(&book);

    book.replace(&ask, 0, 1252);
    book.perform_callbacks();
    assert_depth_matches_book(&book);

    book.cancel(&bid);
    book.perform_callbacks();
    assert_depth_matches_book(&book);
}

#[test]
fn test_change_stamps_monotonic_and_published_trails() {
    let (mut book, _session) = session_book("AAPL");
    let mut previous = 0;
    for (side, price, qty) in [
        (Side::Sell, 1253, 100),
        (Side::Buy, 1250, 50),
        (Side::Sell, 1250, 50),
        (Side::Buy, 1249, 70),
    ] {
        add(&mut book, &limit(side, price, qty));
        let depth = book.depth();
        assert!(depth.last_change() >= previous);
        assert!(depth.last_published_change() <= depth.last_change());
        previous = depth.last_change();
    }
}

#[test]
fn test_add_then_cancel_round_trips_book_and_depth() {
    let (mut book, _session) = session_book("AAPL");
    add(&mut book, &limit(Side::Buy, 1248, 50));
    add(&mut book, &limit(Side::Sell, 1253, 60));

    let bids_before: Vec<(Price, Quantity)> = book
        .bids()
        .map(|(key, tracker)| (key.price().price(), tracker.open_qty()))
        .collect();
    let depth_bids_before: Vec<(Price, Quantity)> = book
        .depth()
        .bids()
        .iter()
        .map(|level| (level.price(), level.aggregate_qty()))
        .collect();

    let transient = limit(Side::Buy, 1250, 100);
    add(&mut book, &transient);
    book.cancel(&transient);
    book.perform_callbacks();

    let bids_after: Vec<(Price, Quantity)> = book
        .bids()
        .map(|(key, tracker)| (key.price().price(), tracker.open_qty()))
        .collect();
    let depth_bids_after: Vec<(Price, Quantity)> = book
        .depth()
        .bids()
        .iter()
        .map(|level| (level.price(), level.aggregate_qty()))
        .collect();

    assert_eq!(bids_before, bids_after);
    assert_eq!(depth_bids_before, depth_bids_after);
}

#[test]
fn test_transaction_id_counts_public_calls() {
    let (mut book, _session) = session_book("AAPL");
    assert_eq!(book.transaction_id(), 0);
    let bid = limit(Side::Buy, 1250, 100);
    add(&mut book, &bid);
    assert_eq!(book.transaction_id(), 1);
    book.replace(&bid, 10, PRICE_UNCHANGED);
    book.perform_callbacks();
    assert_eq!(book.transaction_id(), 2);
    book.cancel(&bid);
    book.perform_callbacks();
    assert_eq!(book.transaction_id(), 3);
}

#[test]
fn test_log_lists_resting_orders() {
    let (mut book, _session) = session_book("AAPL");
    add(&mut book, &limit(Side::Buy, 1250, 100));
    add(&mut book, &limit(Side::Sell, 1252, 60));
    add(&mut book, &limit(Side::Sell, 1251, 40));

    let mut out = Vec::new();
    book.log(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    // Worst ask first, down through the spread, then bids.
    assert_eq!(lines, vec!["  Ask 60 @ 1252", "  Ask 40 @ 1251", "  Bid 100 @ 1250"]);
}

#[test]
fn test_depth_snapshot_capture_from_live_book() {
    let (mut book, _session) = session_book("AAPL");
    add(&mut book, &limit(Side::Buy, 1250, 100));
    add(&mut book, &limit(Side::Sell, 1252, 60));

    let snapshot = DepthSnapshot::capture("AAPL", book.transaction_id(), book.depth());
    assert_eq!(snapshot.sequence, 2);
    assert_eq!(snapshot.bids.len(), 1);
    assert_eq!(snapshot.asks.len(), 1);

    let package = DepthSnapshotPackage::new(snapshot).unwrap();
    assert!(package.validate().is_ok());
}
