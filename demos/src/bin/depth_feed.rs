//! Incremental depth feed demonstration.
//!
//! Runs a scripted order flow through an exchange and publishes one JSON
//! line per depth change: exactly the levels stamped since the previous
//! publication, sequenced by the engine-local transaction counter. The
//! line sink stands in for whatever transport a real feed would use.

use matchbook_rs::prelude::*;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use tracing::info;

/// Publishes changed levels as JSON lines.
struct JsonLinePublisher {
    published: Cell<ChangeId>,
}

impl DepthListener<DepthOrderBook<SimpleOrder>> for JsonLinePublisher {
    fn on_depth_change(&self, book: &DepthOrderBook<SimpleOrder>, depth: &Depth) {
        let snapshot = DepthSnapshot::capture_changes(
            book.symbol(),
            book.transaction_id(),
            depth,
            self.published.get(),
        );
        self.published.set(depth.last_change());
        match serde_json::to_string(&snapshot) {
            Ok(line) => println!("{line}"),
            Err(error) => info!("failed to serialize snapshot: {error}"),
        }
    }
}

impl BboListener<DepthOrderBook<SimpleOrder>> for JsonLinePublisher {
    fn on_bbo_change(&self, book: &DepthOrderBook<SimpleOrder>, depth: &Depth) {
        let best_bid = &depth.bids()[0];
        let best_ask = &depth.asks()[0];
        info!(
            "BBO {}: {} x {} | {} x {}",
            book.symbol(),
            best_bid.aggregate_qty(),
            best_bid.price(),
            best_ask.price(),
            best_ask.aggregate_qty(),
        );
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let publisher = Rc::new(JsonLinePublisher {
        published: Cell::new(0),
    });
    let mut exchange: Exchange<SimpleOrder> = Exchange::new();
    exchange.set_depth_listener(publisher.clone());
    exchange.set_bbo_listener(publisher);
    exchange
        .add_order_book("AAPL")
        .expect("fresh exchange accepts the first book");

    // Build a small book.
    for (side, price, qty) in [
        (Side::Buy, 1249, 300),
        (Side::Buy, 1250, 100),
        (Side::Buy, 1248, 200),
        (Side::Sell, 1252, 150),
        (Side::Sell, 1251, 250),
        (Side::Sell, 1253, 400),
    ] {
        let order = Arc::new(SimpleOrder::limit(side, price, qty));
        exchange
            .add_order("AAPL", order, OrderConditions::empty())
            .expect("book exists");
    }

    // Trade through the top of the book.
    let aggressor = Arc::new(SimpleOrder::limit(Side::Buy, 1251, 300));
    exchange
        .add_order("AAPL", aggressor, OrderConditions::empty())
        .expect("book exists");

    // Cancel a mid-book order to shift the window.
    let cancelled = Arc::new(SimpleOrder::limit(Side::Sell, 1252, 50));
    exchange
        .add_order("AAPL", Arc::clone(&cancelled), OrderConditions::empty())
        .expect("book exists");
    exchange
        .cancel_order("AAPL", &cancelled)
        .expect("book exists");

    info!("feed complete");
}
