//! A reference implementation of the order contract, with the observable
//! order state machine driven from listener callbacks.
//!
//! The engine never mutates order bodies; state transitions happen when a
//! listener (a session layer, a test harness, the demo market) reacts to
//! the events the engine publishes.

use crate::book::{Cost, MARKET_ORDER_PRICE, Order, OrderConditions, Price, Quantity, Side};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use uuid::Uuid;

/// Observable lifecycle of an order, from the listener's perspective.
/// `Rejected`, `Filled`, and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    /// Sent to the engine, not yet accepted
    Submitted,
    /// On the book (or in the stop book)
    Accepted,
    /// Failed validation
    Rejected,
    /// A modify was requested and is in flight
    ModifyRequested,
    /// The modify request was rejected
    ModifyRejected,
    /// The modify was applied
    Modified,
    /// Partially filled, quantity remains open
    PartialFilled,
    /// Completely filled
    Filled,
    /// A cancel was requested and is in flight
    CancelRequested,
    /// The cancel request was rejected
    CancelRejected,
    /// Cancelled with quantity still open
    Cancelled,
}

/// A self-contained order suitable for tests, demos, and simple sessions.
///
/// Interior mutability keeps the body shareable through `Arc` on the single
/// engine thread while callbacks update its state; the engine itself only
/// ever reads it.
#[derive(Debug)]
pub struct SimpleOrder {
    id: Uuid,
    side: Side,
    price: Cell<Price>,
    stop_price: Price,
    order_qty: Cell<Quantity>,
    conditions: OrderConditions,
    state: Cell<OrderState>,
    filled_qty: Cell<Quantity>,
    filled_cost: Cell<Cost>,
}

impl SimpleOrder {
    /// Create an order. A zero `price` makes it a market order; a non-zero
    /// `stop_price` parks it until the market price reaches the stop.
    #[must_use]
    pub fn new(
        side: Side,
        price: Price,
        qty: Quantity,
        stop_price: Price,
        conditions: OrderConditions,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            side,
            price: Cell::new(price),
            stop_price,
            order_qty: Cell::new(qty),
            conditions,
            state: Cell::new(OrderState::Submitted),
            filled_qty: Cell::new(0),
            filled_cost: Cell::new(0),
        }
    }

    /// A plain limit order.
    #[must_use]
    pub fn limit(side: Side, price: Price, qty: Quantity) -> Self {
        Self::new(side, price, qty, MARKET_ORDER_PRICE, OrderConditions::empty())
    }

    /// A plain market order.
    #[must_use]
    pub fn market(side: Side, qty: Quantity) -> Self {
        Self::new(
            side,
            MARKET_ORDER_PRICE,
            qty,
            MARKET_ORDER_PRICE,
            OrderConditions::empty(),
        )
    }

    /// A limit order with condition flags.
    #[must_use]
    pub fn limit_with_conditions(
        side: Side,
        price: Price,
        qty: Quantity,
        conditions: OrderConditions,
    ) -> Self {
        Self::new(side, price, qty, MARKET_ORDER_PRICE, conditions)
    }

    /// Unique identifier of this order. Session layers index by it; the
    /// engine does not.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> OrderState {
        self.state.get()
    }

    /// Quantity filled so far.
    #[must_use]
    pub fn filled_qty(&self) -> Quantity {
        self.filled_qty.get()
    }

    /// Total cost of the fills so far.
    #[must_use]
    pub fn filled_cost(&self) -> Cost {
        self.filled_cost.get()
    }

    /// Quantity not yet filled.
    #[must_use]
    pub fn open_qty(&self) -> Quantity {
        let qty = self.order_qty.get();
        let filled = self.filled_qty.get();
        qty.saturating_sub(filled)
    }

    /// The engine accepted this order.
    pub fn accept(&self) {
        if self.state.get() == OrderState::Submitted {
            self.state.set(OrderState::Accepted);
        }
    }

    /// The engine rejected this order.
    pub fn reject(&self) {
        self.state.set(OrderState::Rejected);
    }

    /// Record a fill of `qty` costing `cost`.
    pub fn fill(&self, qty: Quantity, cost: Cost) {
        self.filled_qty.set(self.filled_qty.get() + qty);
        self.filled_cost.set(self.filled_cost.get() + cost);
        if self.open_qty() == 0 {
            self.state.set(OrderState::Filled);
        } else {
            self.state.set(OrderState::PartialFilled);
        }
    }

    /// A cancel request is in flight.
    pub fn request_cancel(&self) {
        self.state.set(OrderState::CancelRequested);
    }

    /// The engine cancelled this order.
    pub fn cancel(&self) {
        if self.state.get() != OrderState::Filled {
            self.state.set(OrderState::Cancelled);
        }
    }

    /// The cancel request was rejected.
    pub fn cancel_reject(&self) {
        self.state.set(OrderState::CancelRejected);
    }

    /// A modify request is in flight.
    pub fn request_modify(&self) {
        self.state.set(OrderState::ModifyRequested);
    }

    /// The engine applied a replace: adjust the body to match.
    pub fn replace(&self, size_delta: i64, new_price: Price) {
        let qty = (self.order_qty.get() as i64 + size_delta) as Quantity;
        self.order_qty.set(qty);
        self.price.set(new_price);
        self.state.set(OrderState::Modified);
    }

    /// The modify request was rejected.
    pub fn replace_reject(&self) {
        self.state.set(OrderState::ModifyRejected);
    }
}

impl Order for SimpleOrder {
    fn side(&self) -> Side {
        self.side
    }

    fn price(&self) -> Price {
        self.price.get()
    }

    fn order_qty(&self) -> Quantity {
        self.order_qty.get()
    }

    fn stop_price(&self) -> Price {
        self.stop_price
    }

    fn all_or_none(&self) -> bool {
        self.conditions.contains(OrderConditions::ALL_OR_NONE)
    }

    fn immediate_or_cancel(&self) -> bool {
        self.conditions.contains(OrderConditions::IMMEDIATE_OR_CANCEL)
    }
}
