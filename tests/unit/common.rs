//! Shared fixtures for the integration tests.

use matchbook_rs::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

pub fn limit(side: Side, price: Price, qty: Quantity) -> Arc<SimpleOrder> {
    Arc::new(SimpleOrder::limit(side, price, qty))
}

pub fn market(side: Side, qty: Quantity) -> Arc<SimpleOrder> {
    Arc::new(SimpleOrder::market(side, qty))
}

pub fn with_conditions(
    side: Side,
    price: Price,
    qty: Quantity,
    conditions: OrderConditions,
) -> Arc<SimpleOrder> {
    Arc::new(SimpleOrder::limit_with_conditions(side, price, qty, conditions))
}

pub fn stop_market(side: Side, qty: Quantity, stop_price: Price) -> Arc<SimpleOrder> {
    Arc::new(SimpleOrder::new(
        side,
        MARKET_ORDER_PRICE,
        qty,
        stop_price,
        OrderConditions::empty(),
    ))
}

/// One observed fill, from the inbound order's perspective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedFill {
    pub inbound: Uuid,
    pub matched: Uuid,
    pub qty: Quantity,
    pub cost: Cost,
}

/// Listener realising all five capabilities: drives the order state
/// machines and records what it saw.
#[derive(Debug, Default)]
pub struct Session {
    pub fills: RefCell<Vec<ObservedFill>>,
    pub cancels: RefCell<Vec<Uuid>>,
    pub depth_changes: RefCell<Vec<ChangeId>>,
    pub bbo_changes: RefCell<Vec<ChangeId>>,
    pub book_changes: RefCell<usize>,
    pub trades: RefCell<Vec<(Quantity, Cost)>>,
}

impl Session {
    pub fn fills(&self) -> Vec<ObservedFill> {
        self.fills.borrow().clone()
    }

    pub fn depth_change_count(&self) -> usize {
        self.depth_changes.borrow().len()
    }

    pub fn bbo_change_count(&self) -> usize {
        self.bbo_changes.borrow().len()
    }
}

impl OrderListener<SimpleOrder> for Session {
    fn on_accept(&self, order: &Arc<SimpleOrder>) {
        order.accept();
    }

    fn on_reject(&self, order: &Arc<SimpleOrder>, _reason: &str) {
        order.reject();
    }

    fn on_fill(
        &self,
        order: &Arc<SimpleOrder>,
        matched_order: &Arc<SimpleOrder>,
        fill_qty: Quantity,
        fill_cost: Cost,
    ) {
        order.fill(fill_qty, fill_cost);
        matched_order.fill(fill_qty, fill_cost);
        self.fills.borrow_mut().push(ObservedFill {
            inbound: order.id(),
            matched: matched_order.id(),
            qty: fill_qty,
            cost: fill_cost,
        });
    }

    fn on_cancel(&self, order: &Arc<SimpleOrder>) {
        order.cancel();
        self.cancels.borrow_mut().push(order.id());
    }

    fn on_cancel_reject(&self, order: &Arc<SimpleOrder>, _reason: &str) {
        order.cancel_reject();
    }

    fn on_replace(&self, order: &Arc<SimpleOrder>, size_delta: i64, new_price: Price) {
        order.replace(size_delta, new_price);
    }

    fn on_replace_reject(&self, order: &Arc<SimpleOrder>, _reason: &str) {
        order.replace_reject();
    }
}

impl TradeListener<OrderBook<SimpleOrder>> for Session {
    fn on_trade(&self, _book: &OrderBook<SimpleOrder>, qty: Quantity, cost: Cost) {
        self.trades.borrow_mut().push((qty, cost));
    }
}

impl OrderBookListener<OrderBook<SimpleOrder>> for Session {
    fn on_order_book_change(&self, _book: &OrderBook<SimpleOrder>) {
        *self.book_changes.borrow_mut() += 1;
    }
}

impl DepthListener<DepthOrderBook<SimpleOrder>> for Session {
    fn on_depth_change(&self, _book: &DepthOrderBook<SimpleOrder>, depth: &Depth) {
        self.depth_changes.borrow_mut().push(depth.last_change());
    }
}

impl BboListener<DepthOrderBook<SimpleOrder>> for Session {
    fn on_bbo_change(&self, _book: &DepthOrderBook<SimpleOrder>, depth: &Depth) {
        self.bbo_changes.borrow_mut().push(depth.last_change());
    }
}

/// A depth book wired to a fresh session listener.
pub fn session_book(symbol: &str) -> (DepthOrderBook<SimpleOrder>, Rc<Session>) {
    session_book_with_depth(symbol, 5)
}

pub fn session_book_with_depth(
    symbol: &str,
    levels: usize,
) -> (DepthOrderBook<SimpleOrder>, Rc<Session>) {
    let mut book = DepthOrderBook::with_depth(symbol, levels);
    let session = Rc::new(Session::default());
    book.set_order_listener(session.clone());
    book.set_trade_listener(session.clone());
    book.set_order_book_listener(session.clone());
    book.set_depth_listener(session.clone());
    book.set_bbo_listener(session.clone());
    (book, session)
}

/// Add without conditions and drain.
pub fn add(book: &mut DepthOrderBook<SimpleOrder>, order: &Arc<SimpleOrder>) -> bool {
    let matched = book.add(Arc::clone(order), OrderConditions::empty());
    book.perform_callbacks();
    matched
}

/// Add with conditions and drain.
pub fn add_with(
    book: &mut DepthOrderBook<SimpleOrder>,
    order: &Arc<SimpleOrder>,
    conditions: OrderConditions,
) -> bool {
    let matched = book.add(Arc::clone(order), conditions);
    book.perform_callbacks();
    matched
}
