//! Matching internals of the order book: submission, the price-time match
//! walk, crossing, stop promotion, and the pending queue.

use super::callback::{Callback, FillFlags};
use super::order::Order;
use super::order_book::OrderBook;
use super::price::{ComparablePrice, OrderKey};
use super::tracker::OrderTracker;
use super::types::{MARKET_ORDER_PRICE, Price, Quantity, Side};
use std::ops::Bound;
use std::sync::Arc;
use tracing::trace;

impl<O: Order> OrderBook<O> {
    /// Validate an inbound order, queueing a reject when it fails.
    pub(super) fn is_valid(&mut self, order: &Arc<O>) -> bool {
        if order.order_qty() == 0 {
            self.callbacks
                .push(Callback::reject(Arc::clone(order), "size must be positive"));
            false
        } else {
            true
        }
    }

    /// Validate a replace request, queueing a reject when it fails.
    pub(super) fn is_valid_replace(
        &mut self,
        order: &Arc<O>,
        open_qty: Quantity,
        size_delta: i64,
    ) -> bool {
        if size_delta < 0 && open_qty < size_delta.unsigned_abs() {
            self.callbacks.push(Callback::replace_reject(
                Arc::clone(order),
                "not enough open qty",
            ));
            false
        } else {
            true
        }
    }

    /// Match the inbound order and rest any residual on its own side.
    pub(super) fn submit_order(&mut self, inbound: &mut OrderTracker<O>) -> bool {
        let sort_price = ComparablePrice::new(inbound.order().side(), inbound.order().price());
        self.add_order_tracker(inbound, sort_price)
    }

    /// Match against the opposite side at `sort_price`, then insert the
    /// residual unless the order is immediate-or-cancel. Returns `true`
    /// when at least one cross happened.
    pub(super) fn add_order_tracker(
        &mut self,
        inbound: &mut OrderTracker<O>,
        sort_price: ComparablePrice,
    ) -> bool {
        let matched = self.match_order(inbound, sort_price);
        if inbound.open_qty() > 0 && !inbound.immediate_or_cancel() {
            let seq = self.next_seq();
            let key = OrderKey::new(sort_price, seq);
            self.side_mut(inbound.order().side()).insert(key, inbound.clone());
        }
        matched
    }

    /// Walk the opposite side in price-time order, crossing as long as the
    /// inbound price matches. An all-or-none inbound defers its crosses
    /// until enough resting quantity is known to fill it completely.
    fn match_order(&mut self, inbound: &mut OrderTracker<O>, inbound_price: ComparablePrice) -> bool {
        let opposite = inbound.order().side().opposite();
        let mut any_crossed = false;
        // Stable handles of known-matchable entries an all-or-none inbound
        // could not trade yet.
        let mut deferred_crosses: Vec<OrderKey> = Vec::new();
        let mut matched_qty: Quantity = 0;
        let inbound_qty = inbound.open_qty();
        let mut cursor: Option<OrderKey> = None;

        loop {
            let next = {
                let start = match cursor {
                    None => Bound::Unbounded,
                    Some(last) => Bound::Excluded(last),
                };
                self.side_map(opposite)
                    .range((start, Bound::Unbounded))
                    .next()
                    .map(|(key, counter)| (*key, counter.open_qty(), counter.all_or_none()))
            };
            let Some((key, counter_open, counter_aon)) = next else {
                break;
            };
            cursor = Some(key);

            if !inbound_price.matches(key.price().price()) {
                // Entries only get less liquid from here; nothing further
                // can match.
                break;
            }

            // A resting all-or-none is skippable: it only trades when the
            // inbound's unmatched quantity can fill it completely.
            if counter_aon && counter_open > inbound.open_qty().saturating_sub(matched_qty) {
                continue;
            }

            if inbound.all_or_none() {
                matched_qty += counter_open;
                if matched_qty < inbound_qty {
                    // Known matchable, but the fill condition is not yet
                    // confirmed; hold the cross.
                    deferred_crosses.push(key);
                    continue;
                }
                // The fill condition just became satisfiable: commit the
                // held crosses before trading the current entry.
                for deferred_key in std::mem::take(&mut deferred_crosses) {
                    any_crossed |= self.cross_at(deferred_key, inbound, opposite);
                }
            }

            any_crossed |= self.cross_at(key, inbound, opposite);
            if inbound.filled() {
                break;
            }
        }
        any_crossed
    }

    /// Cross the inbound order with the resting entry at `key`, removing
    /// the entry when it fills completely. Returns `false` when no trade
    /// price could be established, leaving both orders untouched.
    fn cross_at(&mut self, key: OrderKey, inbound: &mut OrderTracker<O>, opposite: Side) -> bool {
        let Some(mut counter) = self.side_mut(opposite).remove(&key) else {
            return false;
        };
        let crossed = self.cross_orders(inbound, &mut counter);
        if !(crossed && counter.filled()) {
            self.side_mut(opposite).insert(key, counter);
        }
        crossed
    }

    /// Trade `min(open, open)` between the two orders at the resting
    /// order's price, falling back to the inbound limit and then the
    /// market price. Updates the market price (possibly triggering stops)
    /// and queues the fill event.
    fn cross_orders(
        &mut self,
        inbound: &mut OrderTracker<O>,
        current: &mut OrderTracker<O>,
    ) -> bool {
        let fill_qty = inbound.open_qty().min(current.open_qty());
        let mut cross_price = current.order().price();
        if cross_price == MARKET_ORDER_PRICE {
            cross_price = inbound.order().price();
        }
        if cross_price == MARKET_ORDER_PRICE {
            cross_price = self.market_price;
        }
        if cross_price == MARKET_ORDER_PRICE {
            // No price available for this cross.
            return false;
        }

        inbound.fill(fill_qty);
        current.fill(fill_qty);
        self.set_market_price(cross_price);

        let mut flags = FillFlags::empty();
        if inbound.filled() {
            flags |= FillFlags::INBOUND_FILLED;
        }
        if current.filled() {
            flags |= FillFlags::MATCHED_FILLED;
        }
        trace!(
            symbol = %self.symbol(),
            fill_qty,
            cross_price,
            "cross"
        );
        self.callbacks.push(Callback::fill(
            Arc::clone(inbound.order()),
            Arc::clone(current.order()),
            fill_qty,
            cross_price,
            flags,
        ));
        true
    }

    /// Locate a resting order by reference identity: scan the entries at
    /// its sort price in time order.
    pub(super) fn find_order(&self, order: &Arc<O>) -> Option<OrderKey> {
        let search = ComparablePrice::new(order.side(), order.price());
        self.side_map(order.side())
            .range(OrderKey::first_at(search)..)
            .take_while(|(key, _)| key.price() == search)
            .find(|(_, tracker)| Arc::ptr_eq(tracker.order(), order))
            .map(|(key, _)| *key)
    }

    /// Park an inbound stop order in the stop book unless its stop price
    /// has already been reached. Returns the tracker back when the order
    /// should go straight to the market.
    pub(super) fn add_stop_order(&mut self, tracker: OrderTracker<O>) -> Option<OrderTracker<O>> {
        let side = tracker.order().side();
        let stop_key = ComparablePrice::new(side, tracker.order().stop_price());
        let market_key = ComparablePrice::new(side, self.market_price);
        // Dormant until the market price reaches the stop from the
        // indifferent side; with no market price established every stop is
        // dormant.
        let is_stopped = self.market_price == MARKET_ORDER_PRICE || stop_key < market_key;
        if is_stopped {
            let seq = self.next_seq();
            let key = OrderKey::new(stop_key, seq);
            match side {
                Side::Buy => self.stop_bids.insert(key, tracker),
                Side::Sell => self.stop_asks.insert(key, tracker),
            };
            None
        } else {
            Some(tracker)
        }
    }

    /// Move every stop on `side` whose stop price the market price has
    /// reached into the pending queue. All keys at or past the market key
    /// have triggered.
    pub(super) fn check_stop_orders(&mut self, side: Side, price: Price) {
        let until = OrderKey::first_at(ComparablePrice::new(side, price));
        let stops = match side {
            Side::Buy => &mut self.stop_bids,
            Side::Sell => &mut self.stop_asks,
        };
        let triggered = stops.split_off(&until);
        if !triggered.is_empty() {
            trace!(
                symbol = %self.symbol(),
                side = %side,
                price,
                count = triggered.len(),
                "stops triggered"
            );
        }
        self.pending_orders.extend(triggered.into_values());
    }

    /// Submit everything in the pending queue as market entries. A
    /// submission can trigger further stops; callers loop until the queue
    /// stays empty.
    pub(super) fn submit_pending_orders(&mut self) {
        let pending = std::mem::take(&mut self.pending_orders);
        for mut tracker in pending {
            self.submit_order(&mut tracker);
        }
    }
}
