//! The limit order book of one security: price-time priority maps for both
//! sides, a stop book, and the event buffer public calls append to.

use super::callback::{Callback, Callbacks};
use super::listener::{OrderBookListener, OrderListener, TradeListener};
use super::order::Order;
use super::price::{ComparablePrice, OrderKey};
use super::tracker::OrderTracker;
use super::types::{Cost, MARKET_ORDER_PRICE, OrderConditions, PRICE_UNCHANGED, Price, Quantity, Side};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::Arc;
use tracing::trace;

/// One side of the book: liquidity-then-time ordered trackers.
pub type TrackerMap<O> = BTreeMap<OrderKey, OrderTracker<O>>;

/// Price-time priority matching engine for a single symbol.
///
/// The engine is single-threaded: callers serialise all public operations,
/// and there is no internal locking. Mutating calls accumulate events in an
/// internal buffer; [`OrderBook::perform_callbacks`] drains the buffer into
/// the registered listeners, and [`OrderBook::move_callbacks`] hands it to
/// an external worker instead.
pub struct OrderBook<O: Order> {
    symbol: String,
    pub(super) bids: TrackerMap<O>,
    pub(super) asks: TrackerMap<O>,
    pub(super) stop_bids: TrackerMap<O>,
    pub(super) stop_asks: TrackerMap<O>,
    pub(super) pending_orders: Vec<OrderTracker<O>>,
    pub(super) callbacks: Callbacks<O>,
    order_listener: Option<Rc<dyn OrderListener<O>>>,
    trade_listener: Option<Rc<dyn TradeListener<Self>>>,
    order_book_listener: Option<Rc<dyn OrderBookListener<Self>>>,
    pub(super) trans_id: u64,
    pub(super) market_price: Price,
    /// Hands out the insertion sequence that carries time priority.
    next_seq: u64,
}

impl<O: Order> OrderBook<O> {
    /// Create an empty book for `symbol`.
    #[must_use]
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            stop_bids: BTreeMap::new(),
            stop_asks: BTreeMap::new(),
            pending_orders: Vec::new(),
            callbacks: Vec::with_capacity(16),
            order_listener: None,
            trade_listener: None,
            order_book_listener: None,
            trans_id: 0,
            market_price: MARKET_ORDER_PRICE,
            next_seq: 0,
        }
    }

    /// The symbol of the orders in this book.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Change the symbol of the orders in this book.
    pub fn set_symbol(&mut self, symbol: &str) {
        self.symbol = symbol.to_string();
    }

    /// Register the per-order event listener.
    pub fn set_order_listener(&mut self, listener: Rc<dyn OrderListener<O>>) {
        self.order_listener = Some(listener);
    }

    /// Register the trade event listener.
    pub fn set_trade_listener(&mut self, listener: Rc<dyn TradeListener<Self>>) {
        self.trade_listener = Some(listener);
    }

    /// Register the whole-book change listener.
    pub fn set_order_book_listener(&mut self, listener: Rc<dyn OrderBookListener<Self>>) {
        self.order_book_listener = Some(listener);
    }

    /// Establish the market price without a trade.
    ///
    /// Intended for initialization before the book has traded; while the
    /// price is unset (zero) no market-to-market trade can happen. Also the
    /// internal path every cross takes, so a price moving through resting
    /// stop prices promotes those stops to the pending queue.
    pub fn set_market_price(&mut self, price: Price) {
        let old_market_price = self.market_price;
        self.market_price = price;
        if price > old_market_price || old_market_price == MARKET_ORDER_PRICE {
            // Price went up: check buy stops.
            self.check_stop_orders(Side::Buy, price);
        }
        if price < old_market_price || old_market_price == MARKET_ORDER_PRICE {
            // Price went down: check sell stops.
            self.check_stop_orders(Side::Sell, price);
        }
    }

    /// The price of the last trade, or zero before the first one.
    #[must_use]
    pub fn market_price(&self) -> Price {
        self.market_price
    }

    /// Resting bids in priority order.
    pub fn bids(&self) -> impl Iterator<Item = (&OrderKey, &OrderTracker<O>)> {
        self.bids.iter()
    }

    /// Resting asks in priority order.
    pub fn asks(&self) -> impl Iterator<Item = (&OrderKey, &OrderTracker<O>)> {
        self.asks.iter()
    }

    /// Dormant buy stop orders in trigger order.
    pub fn stop_bids(&self) -> impl Iterator<Item = (&OrderKey, &OrderTracker<O>)> {
        self.stop_bids.iter()
    }

    /// Dormant sell stop orders in trigger order.
    pub fn stop_asks(&self) -> impl Iterator<Item = (&OrderKey, &OrderTracker<O>)> {
        self.stop_asks.iter()
    }

    /// Add an order to the book.
    ///
    /// Emits `accept` (or `reject`), any fills the order produced, a
    /// `cancel` for an IOC residual, events of stop orders the trade prices
    /// triggered, and a final `book_update`. Returns `true` when the add
    /// produced at least one fill.
    pub fn add(&mut self, order: Arc<O>, conditions: OrderConditions) -> bool {
        self.trans_id += 1;
        trace!(
            symbol = %self.symbol,
            side = %order.side(),
            price = order.price(),
            qty = order.order_qty(),
            "add order"
        );

        let mut matched = false;
        if self.is_valid(&order) {
            self.callbacks.push(Callback::accept(Arc::clone(&order)));
            let accept_index = self.callbacks.len() - 1;

            let inbound = OrderTracker::new(Arc::clone(&order), conditions);
            let submittable = if order.stop_price() != MARKET_ORDER_PRICE {
                // Parked in the stop book until the market price reaches it.
                self.add_stop_order(inbound)
            } else {
                Some(inbound)
            };

            if let Some(mut inbound) = submittable {
                matched = self.submit_order(&mut inbound);
                // Note the quantity matched in this same transaction.
                if let Callback::Accept { match_qty, .. } = &mut self.callbacks[accept_index] {
                    *match_qty = inbound.filled_qty();
                }
                if inbound.immediate_or_cancel() && !inbound.filled() {
                    self.callbacks
                        .push(Callback::cancel(Arc::clone(&order), inbound.open_qty()));
                }
            }

            // Stops triggered by the trades above may cascade.
            while !self.pending_orders.is_empty() {
                self.submit_pending_orders();
            }

            self.callbacks.push(Callback::book_update());
        }
        matched
    }

    /// Cancel a resting order. Emits `cancel` and `book_update`, or
    /// `cancel_reject` when the order is not on the book.
    pub fn cancel(&mut self, order: &Arc<O>) {
        self.trans_id += 1;
        trace!(symbol = %self.symbol, side = %order.side(), "cancel order");

        match self.find_order(order) {
            Some(key) => {
                let side = self.side_mut(order.side());
                if let Some(tracker) = side.remove(&key) {
                    self.callbacks
                        .push(Callback::cancel(Arc::clone(order), tracker.open_qty()));
                    self.callbacks.push(Callback::book_update());
                }
            }
            None => {
                self.callbacks
                    .push(Callback::cancel_reject(Arc::clone(order), "not found"));
            }
        }
    }

    /// Replace a resting order: apply a signed size delta and/or move it to
    /// `new_price` (`PRICE_UNCHANGED` keeps the price).
    ///
    /// A price-preserving, non-all-or-none size change leaves the order in
    /// place with its time priority. Any price change resubmits the order
    /// for matching, as does any change to an all-or-none order, whose
    /// larger size may unlock a blocked match. Returns `true` when the
    /// replace produced a fill.
    pub fn replace(&mut self, order: &Arc<O>, size_delta: i64, new_price: Price) -> bool {
        self.trans_id += 1;
        trace!(
            symbol = %self.symbol,
            side = %order.side(),
            size_delta,
            new_price,
            "replace order"
        );

        let mut matched = false;
        let Some(key) = self.find_order(order) else {
            self.callbacks
                .push(Callback::replace_reject(Arc::clone(order), "not found"));
            return false;
        };

        let side = order.side();
        let open_qty = match self.side_map(side).get(&key) {
            Some(tracker) => tracker.open_qty(),
            None => return false,
        };
        if !self.is_valid_replace(order, open_qty, size_delta) {
            return false;
        }

        let price_change = new_price != PRICE_UNCHANGED && new_price != order.price();
        let price = if new_price == PRICE_UNCHANGED {
            order.price()
        } else {
            new_price
        };

        self.callbacks.push(Callback::replace(
            Arc::clone(order),
            open_qty,
            size_delta,
            price,
        ));

        let new_open_qty = (open_qty as i64 + size_delta) as Quantity;
        if new_open_qty == 0 {
            // The size change closes the order. Cancel with no open
            // quantity: the replace delta already drained it.
            self.side_mut(side).remove(&key);
            self.callbacks.push(Callback::cancel(Arc::clone(order), 0));
        } else {
            let rematch = price_change
                || self
                    .side_map(side)
                    .get(&key)
                    .is_some_and(|tracker| tracker.all_or_none());
            if !rematch {
                // Size-only change of a regular order: nothing new can
                // cross, so the residual keeps its place in line.
                if let Some(tracker) = self.side_mut(side).get_mut(&key) {
                    tracker.change_qty(size_delta);
                }
            } else if let Some(mut tracker) = self.side_mut(side).remove(&key) {
                tracker.change_qty(size_delta);
                let sort_price = ComparablePrice::new(side, price);
                matched = self.add_order_tracker(&mut tracker, sort_price);
            }
        }

        // A replace-induced cross can trigger stops just like an add.
        while !self.pending_orders.is_empty() {
            self.submit_pending_orders();
        }

        self.callbacks.push(Callback::book_update());
        matched
    }

    /// Move the accumulated events into `target`, leaving the internal
    /// buffer empty. Lets publication run off the matching path.
    pub fn move_callbacks(&mut self, target: &mut Callbacks<O>) {
        if target.is_empty() {
            std::mem::swap(&mut self.callbacks, target);
        } else {
            target.append(&mut self.callbacks);
        }
    }

    /// Drain the event buffer into the registered listeners, in generation
    /// order.
    pub fn perform_callbacks(&mut self) {
        let callbacks = std::mem::take(&mut self.callbacks);
        for cb in &callbacks {
            self.perform_callback(cb);
        }
    }

    /// Dispatch a single event to the registered listeners.
    pub fn perform_callback(&self, cb: &Callback<O>) {
        match cb {
            Callback::Accept { order, .. } => {
                if let Some(listener) = &self.order_listener {
                    listener.on_accept(order);
                }
            }
            Callback::Reject { order, reason } => {
                if let Some(listener) = &self.order_listener {
                    listener.on_reject(order, reason);
                }
            }
            Callback::Fill {
                order,
                matched_order,
                fill_qty,
                fill_price,
                ..
            } => {
                let fill_cost = *fill_price as Cost * *fill_qty as Cost;
                if let Some(listener) = &self.order_listener {
                    listener.on_fill(order, matched_order, *fill_qty, fill_cost);
                }
                if let Some(listener) = &self.trade_listener {
                    listener.on_trade(self, *fill_qty, fill_cost);
                }
            }
            Callback::Cancel { order, .. } => {
                if let Some(listener) = &self.order_listener {
                    listener.on_cancel(order);
                }
            }
            Callback::CancelReject { order, reason } => {
                if let Some(listener) = &self.order_listener {
                    listener.on_cancel_reject(order, reason);
                }
            }
            Callback::Replace {
                order,
                size_delta,
                new_price,
                ..
            } => {
                if let Some(listener) = &self.order_listener {
                    listener.on_replace(order, *size_delta, *new_price);
                }
            }
            Callback::ReplaceReject { order, reason } => {
                if let Some(listener) = &self.order_listener {
                    listener.on_replace_reject(order, reason);
                }
            }
            Callback::BookUpdate => {
                if let Some(listener) = &self.order_book_listener {
                    listener.on_order_book_change(self);
                }
            }
        }
    }

    /// Events accumulated since the last drain.
    #[must_use]
    pub fn callbacks(&self) -> &Callbacks<O> {
        &self.callbacks
    }

    /// The sequence number of the most recent public mutating call.
    /// Engine-local; publishers use it to sequence outgoing updates.
    #[must_use]
    pub fn transaction_id(&self) -> u64 {
        self.trans_id
    }

    /// Write the resting orders, worst ask to worst bid, to `out`.
    pub fn log<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for (key, tracker) in self.asks.iter().rev() {
            writeln!(out, "  Ask {} @ {}", tracker.open_qty(), key.price().price())?;
        }
        for (key, tracker) in self.bids.iter() {
            writeln!(out, "  Bid {} @ {}", tracker.open_qty(), key.price().price())?;
        }
        Ok(())
    }

    pub(super) fn side_map(&self, side: Side) -> &TrackerMap<O> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    pub(super) fn side_mut(&mut self, side: Side) -> &mut TrackerMap<O> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    pub(super) fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}
