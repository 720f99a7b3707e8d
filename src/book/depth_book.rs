//! Order book with aggregated depth tracking: composes the matching engine
//! with a [`Depth`] instance and translates matching events into depth
//! mutations before any listener sees them.

use super::callback::{Callback, Callbacks, FillFlags};
use super::depth::{DEFAULT_DEPTH_LEVELS, Depth};
use super::listener::{BboListener, DepthListener, OrderBookListener, OrderListener, TradeListener};
use super::order::Order;
use super::order_book::OrderBook;
use super::price::OrderKey;
use super::tracker::OrderTracker;
use super::types::{OrderConditions, Price, Quantity};
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::Arc;

/// A matching engine that maintains an aggregated depth view of its book
/// and publishes depth and BBO changes incrementally.
///
/// Depth is updated while the event buffer drains, ahead of the listener
/// dispatch for each event, so depth listeners always observe a view
/// consistent with the events they have been shown.
pub struct DepthOrderBook<O: Order> {
    book: OrderBook<O>,
    depth: Depth,
    bbo_listener: Option<Rc<dyn BboListener<Self>>>,
    depth_listener: Option<Rc<dyn DepthListener<Self>>>,
}

impl<O: Order> DepthOrderBook<O> {
    /// Create a depth-tracking book with the default visible window.
    #[must_use]
    pub fn new(symbol: &str) -> Self {
        Self::with_depth(symbol, DEFAULT_DEPTH_LEVELS)
    }

    /// Create a depth-tracking book with `levels_per_side` visible levels.
    /// One level tracks the BBO only.
    ///
    /// # Panics
    /// Panics when `levels_per_side` is zero.
    #[must_use]
    pub fn with_depth(symbol: &str, levels_per_side: usize) -> Self {
        Self {
            book: OrderBook::new(symbol),
            depth: Depth::new(levels_per_side),
            bbo_listener: None,
            depth_listener: None,
        }
    }

    /// The symbol of the orders in this book.
    #[must_use]
    pub fn symbol(&self) -> &str {
        self.book.symbol()
    }

    /// The aggregated depth tracker.
    #[must_use]
    pub fn depth(&self) -> &Depth {
        &self.depth
    }

    /// The underlying matching engine.
    #[must_use]
    pub fn book(&self) -> &OrderBook<O> {
        &self.book
    }

    /// Register the top-of-book change listener.
    pub fn set_bbo_listener(&mut self, listener: Rc<dyn BboListener<Self>>) {
        self.bbo_listener = Some(listener);
    }

    /// Register the depth change listener.
    pub fn set_depth_listener(&mut self, listener: Rc<dyn DepthListener<Self>>) {
        self.depth_listener = Some(listener);
    }

    /// Register the per-order event listener on the underlying book.
    pub fn set_order_listener(&mut self, listener: Rc<dyn OrderListener<O>>) {
        self.book.set_order_listener(listener);
    }

    /// Register the trade event listener on the underlying book.
    pub fn set_trade_listener(&mut self, listener: Rc<dyn TradeListener<OrderBook<O>>>) {
        self.book.set_trade_listener(listener);
    }

    /// Register the whole-book change listener on the underlying book.
    pub fn set_order_book_listener(&mut self, listener: Rc<dyn OrderBookListener<OrderBook<O>>>) {
        self.book.set_order_book_listener(listener);
    }

    /// Add an order. See [`OrderBook::add`].
    pub fn add(&mut self, order: Arc<O>, conditions: OrderConditions) -> bool {
        self.book.add(order, conditions)
    }

    /// Cancel a resting order. See [`OrderBook::cancel`].
    pub fn cancel(&mut self, order: &Arc<O>) {
        self.book.cancel(order)
    }

    /// Replace a resting order. See [`OrderBook::replace`].
    pub fn replace(&mut self, order: &Arc<O>, size_delta: i64, new_price: Price) -> bool {
        self.book.replace(order, size_delta, new_price)
    }

    /// Establish the market price. See [`OrderBook::set_market_price`].
    pub fn set_market_price(&mut self, price: Price) {
        self.book.set_market_price(price)
    }

    /// The price of the last trade, or zero before the first one.
    #[must_use]
    pub fn market_price(&self) -> Price {
        self.book.market_price()
    }

    /// Resting bids in priority order.
    pub fn bids(&self) -> impl Iterator<Item = (&OrderKey, &OrderTracker<O>)> {
        self.book.bids()
    }

    /// Resting asks in priority order.
    pub fn asks(&self) -> impl Iterator<Item = (&OrderKey, &OrderTracker<O>)> {
        self.book.asks()
    }

    /// Dormant buy stop orders in trigger order.
    pub fn stop_bids(&self) -> impl Iterator<Item = (&OrderKey, &OrderTracker<O>)> {
        self.book.stop_bids()
    }

    /// Dormant sell stop orders in trigger order.
    pub fn stop_asks(&self) -> impl Iterator<Item = (&OrderKey, &OrderTracker<O>)> {
        self.book.stop_asks()
    }

    /// The sequence number of the most recent public mutating call.
    #[must_use]
    pub fn transaction_id(&self) -> u64 {
        self.book.transaction_id()
    }

    /// Events accumulated since the last drain.
    #[must_use]
    pub fn callbacks(&self) -> &Callbacks<O> {
        self.book.callbacks()
    }

    /// Move the accumulated events into `target`. Note that depth tracking
    /// happens during the drain, so a caller stealing the buffer must feed
    /// every event back through [`DepthOrderBook::perform_callback`].
    pub fn move_callbacks(&mut self, target: &mut Callbacks<O>) {
        self.book.move_callbacks(target)
    }

    /// Write the resting orders to `out`. See [`OrderBook::log`].
    pub fn log<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.book.log(out)
    }

    /// Drain the event buffer: update depth for each event, dispatch the
    /// base listeners, and publish depth/BBO changes on the closing
    /// `book_update`.
    pub fn perform_callbacks(&mut self) {
        let callbacks = std::mem::take(&mut self.book.callbacks);
        for cb in &callbacks {
            self.perform_callback(cb);
        }
    }

    /// Handle a single event: depth first, then listeners.
    pub fn perform_callback(&mut self, cb: &Callback<O>) {
        self.update_depth(cb);
        self.book.perform_callback(cb);
        if matches!(cb, Callback::BookUpdate) {
            self.publish_depth();
        }
    }

    /// Translate one matching event into depth mutations.
    fn update_depth(&mut self, cb: &Callback<O>) {
        match cb {
            Callback::Accept { order, match_qty } => {
                if order.is_limit() {
                    if *match_qty == order.order_qty() {
                        // Completely filled on acceptance; the order never
                        // rests. Swallow the coming fills instead of
                        // bouncing a level in and out.
                        self.depth.ignore_fill_qty(*match_qty, order.side());
                    } else {
                        self.depth
                            .add_order(order.price(), order.order_qty(), order.side());
                    }
                }
            }
            Callback::Fill {
                order,
                matched_order,
                fill_qty,
                flags,
                ..
            } => {
                if matched_order.is_limit() {
                    let filled = flags.contains(FillFlags::MATCHED_FILLED);
                    self.depth.fill_order(
                        matched_order.price(),
                        *fill_qty,
                        filled,
                        matched_order.side(),
                    );
                }
                if order.is_limit() {
                    let filled = flags.contains(FillFlags::INBOUND_FILLED);
                    self.depth
                        .fill_order(order.price(), *fill_qty, filled, order.side());
                }
            }
            Callback::Cancel { order, open_qty } => {
                if order.is_limit() {
                    self.depth.close_order(order.price(), *open_qty, order.side());
                }
            }
            Callback::Replace {
                order,
                open_qty,
                size_delta,
                new_price,
            } => {
                if order.is_limit() {
                    let current_qty = *open_qty;
                    let new_qty = (current_qty as i64 + size_delta) as Quantity;
                    self.depth.replace_order(
                        order.price(),
                        *new_price,
                        current_qty,
                        new_qty,
                        order.side(),
                    );
                }
            }
            _ => {}
        }
    }

    /// Fire depth and BBO listeners when visible levels changed since the
    /// last publication, then advance the published high-water mark.
    fn publish_depth(&mut self) {
        if !self.depth.changed() {
            return;
        }
        if let Some(listener) = self.depth_listener.clone() {
            listener.on_depth_change(self, &self.depth);
        }
        if let Some(listener) = self.bbo_listener.clone() {
            let last_published = self.depth.last_published_change();
            // The change may have been in the top level on either side.
            if self.depth.bids()[0].changed_since(last_published)
                || self.depth.asks()[0].changed_since(last_published)
            {
                listener.on_bbo_change(self, &self.depth);
            }
        }
        self.depth.published();
    }
}
