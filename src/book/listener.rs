//! Listener capabilities the book publishes events to.
//!
//! Each role is its own trait; an implementation realising several roles
//! registers the same shared handle once per capability. The book invokes
//! listeners synchronously on the engine thread while draining its event
//! buffer, so implementations must not retain the borrows they are handed
//! past the callback.

use super::depth::Depth;
use super::order::Order;
use super::types::{Cost, Price, Quantity};
use std::sync::Arc;

/// Listener of per-order events. Implement to build a full order feed.
pub trait OrderListener<O: Order> {
    /// The order passed validation and entered the book.
    fn on_accept(&self, order: &Arc<O>);

    /// The order failed validation.
    fn on_reject(&self, order: &Arc<O>, reason: &str);

    /// One fill between the inbound `order` and a resting `matched_order`.
    /// `fill_cost` is the fill quantity times the trade price.
    fn on_fill(&self, order: &Arc<O>, matched_order: &Arc<O>, fill_qty: Quantity, fill_cost: Cost);

    /// The order was cancelled (explicitly, or as an IOC residual sweep).
    fn on_cancel(&self, order: &Arc<O>);

    /// A cancel request referenced an order not on the book.
    fn on_cancel_reject(&self, order: &Arc<O>, reason: &str);

    /// The order's size and/or price changed.
    fn on_replace(&self, order: &Arc<O>, size_delta: i64, new_price: Price);

    /// A replace request could not be honored.
    fn on_replace_reject(&self, order: &Arc<O>, reason: &str);
}

/// Listener of trade events, fired once per fill for the inbound side of
/// the cross. Implement to build a trade feed.
pub trait TradeListener<B> {
    /// A trade of `qty` at a total cost of `cost` happened in `book`.
    fn on_trade(&self, book: &B, qty: Quantity, cost: Cost);
}

/// Listener of whole-book change events, fired once per mutating call.
pub trait OrderBookListener<B> {
    /// Something in `book` changed.
    fn on_order_book_change(&self, book: &B);
}

/// Listener of aggregated depth changes. Fired when any visible level
/// changed since the last publication.
pub trait DepthListener<B> {
    /// The visible depth of `book` changed; `depth` is the live tracker.
    fn on_depth_change(&self, book: &B, depth: &Depth);
}

/// Listener of top-of-book changes. Fired when either best level changed
/// since the last publication.
pub trait BboListener<B> {
    /// The best bid or best offer of `book` changed.
    fn on_bbo_change(&self, book: &B, depth: &Depth);
}
