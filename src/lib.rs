//! # Matchbook: a price-time priority matching engine with depth tracking
//!
//! A single-symbol limit order book matching engine written in Rust. Orders
//! match under strict price-time priority, with support for market orders,
//! all-or-none, immediate-or-cancel, fill-or-kill, and stop orders, and the
//! engine maintains an aggregated per-price depth view that publishes
//! incremental updates through change stamps.
//!
//! ## Key Features
//!
//! - **Price-time priority matching**: resting orders are kept in
//!   side-aware liquidity order, with insertion order breaking ties at
//!   equal prices. Market orders sort as the most liquid entries of their
//!   own side, collapsing the market/limit distinction into one total
//!   order per side.
//!
//! - **Advanced order conditions**: all-or-none orders defer their crosses
//!   until enough resting quantity is confirmed to fill them atomically;
//!   immediate-or-cancel orders sweep their residual with a cancel event;
//!   stop orders rest in a separate stop book and are promoted to the
//!   market when the last trade price reaches their stop.
//!
//! - **Aggregated depth with change stamps**: a fixed window of visible
//!   levels per side backed by an unbounded overflow reservoir. Every
//!   visible mutation stamps the touched levels with a monotonic change
//!   id, so depth and BBO feeds can publish exactly the levels that moved
//!   since the last flush.
//!
//! - **Event-buffer dispatch**: mutating calls append tagged events to an
//!   internal buffer in generation order, closed by a single book-update
//!   event. The buffer drains synchronously into five listener
//!   capabilities (orders, trades, book, depth, BBO), or can be moved to
//!   an external worker wholesale.
//!
//! - **Multi-symbol routing**: an exchange façade owns one engine per
//!   symbol, wires listeners at book creation, and forwards trade events
//!   to worker threads over standard library or Tokio channels.
//!
//! ## Design
//!
//! The engine core is deliberately single-threaded: callers serialise all
//! public operations on one book (or shard symbols across threads), and
//! there is no locking anywhere inside the matching path or the depth
//! tracker. Order bodies stay owned by the caller; the engine tracks open
//! quantity and condition snapshots in its own per-order trackers and
//! never mutates or re-reads the bodies it was handed.
//!
//! ## Quick start
//!
//! ```
//! use matchbook_rs::prelude::*;
//! use std::sync::Arc;
//!
//! let mut book: DepthOrderBook<SimpleOrder> = DepthOrderBook::new("AAPL");
//!
//! let bid = Arc::new(SimpleOrder::limit(Side::Buy, 1250, 100));
//! let ask = Arc::new(SimpleOrder::limit(Side::Sell, 1250, 100));
//!
//! book.add(Arc::clone(&bid), OrderConditions::empty());
//! let matched = book.add(Arc::clone(&ask), OrderConditions::empty());
//! book.perform_callbacks();
//!
//! assert!(matched);
//! assert_eq!(book.market_price(), 1250);
//! ```
//!
//! ## Status
//!
//! The matching semantics, depth maintenance, and event contracts are
//! stable; the wire encoding of published depth is left to the embedding
//! application.

pub mod book;
pub mod exchange;
pub mod prelude;
pub mod simple;
mod utils;

pub use book::{
    BboListener, BookError, Callback, Callbacks, ChangeId, ComparablePrice, Cost,
    DEFAULT_DEPTH_LEVELS, Depth, DepthLevel, DepthListener, DepthOrderBook, DepthSnapshot,
    DepthSnapshotPackage, FillFlags, INVALID_LEVEL_PRICE, MARKET_ORDER_ASK_SORT_PRICE,
    MARKET_ORDER_BID_SORT_PRICE, MARKET_ORDER_PRICE, Order, OrderBook, OrderBookListener,
    OrderConditions, OrderKey, OrderListener, OrderTracker, PRICE_UNCHANGED, Price, Quantity,
    SIZE_UNCHANGED, Side, SnapshotLevel, TradeListener,
};
pub use exchange::{Exchange, ExchangeError, StdTradePublisher, TokioTradePublisher, TradeEvent};
pub use utils::current_time_millis;
