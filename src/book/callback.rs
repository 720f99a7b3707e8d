//! Event buffer entries produced by the matching engine.
//!
//! Every mutating public call appends its events to the book's internal
//! buffer in generation order, with a final `BookUpdate` closing the call.
//! The buffer is drained by `perform_callbacks` or handed to another thread
//! with `move_callbacks`.

use super::order::Order;
use super::types::{Price, Quantity};
use bitflags::bitflags;
use std::sync::Arc;

bitflags! {
    /// Which of the two orders in a fill became completely filled.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FillFlags: u8 {
        /// The inbound (aggressing) order is now fully filled.
        const INBOUND_FILLED = 1;
        /// The resting (matched) order is now fully filled.
        const MATCHED_FILLED = 1 << 1;
    }
}

/// A single event emitted by the book.
#[derive(Debug, Clone)]
pub enum Callback<O: Order> {
    /// Order passed validation and entered the book or the stop book.
    /// `match_qty` is the quantity matched in the same transaction, noted
    /// after matching so depth tracking can tell never-rested orders apart.
    Accept {
        /// The accepted order
        order: Arc<O>,
        /// Quantity filled during the accepting transaction
        match_qty: Quantity,
    },

    /// Order failed validation and was not added.
    Reject {
        /// The rejected order
        order: Arc<O>,
        /// Why the order was rejected
        reason: &'static str,
    },

    /// A cross between the inbound order and one resting order.
    Fill {
        /// The inbound (aggressing) order
        order: Arc<O>,
        /// The resting order it traded against
        matched_order: Arc<O>,
        /// Quantity of this fill
        fill_qty: Quantity,
        /// Price the trade executed at
        fill_price: Price,
        /// Which of the two orders completed
        flags: FillFlags,
    },

    /// Order removed from the book, or residual quantity swept after an
    /// immediate-or-cancel match.
    Cancel {
        /// The cancelled order
        order: Arc<O>,
        /// Open quantity remaining at cancellation
        open_qty: Quantity,
    },

    /// A cancel request could not be honored.
    CancelReject {
        /// The order the request referenced
        order: Arc<O>,
        /// Why the cancel was rejected
        reason: &'static str,
    },

    /// Order size and/or price changed.
    Replace {
        /// The replaced order
        order: Arc<O>,
        /// Open quantity before the replace was applied
        open_qty: Quantity,
        /// Signed change to the order size
        size_delta: i64,
        /// Price after the replace (resolved, never `PRICE_UNCHANGED`)
        new_price: Price,
    },

    /// A replace request could not be honored.
    ReplaceReject {
        /// The order the request referenced
        order: Arc<O>,
        /// Why the replace was rejected
        reason: &'static str,
    },

    /// The book finished a mutating call; always the last event of a call.
    BookUpdate,
}

/// The book's event buffer.
pub type Callbacks<O> = Vec<Callback<O>>;

impl<O: Order> Callback<O> {
    /// Accept event with the match quantity still unknown.
    pub fn accept(order: Arc<O>) -> Self {
        Callback::Accept {
            order,
            match_qty: 0,
        }
    }

    /// Reject event carrying a static reason.
    pub fn reject(order: Arc<O>, reason: &'static str) -> Self {
        Callback::Reject { order, reason }
    }

    /// Fill event for one cross.
    pub fn fill(
        order: Arc<O>,
        matched_order: Arc<O>,
        fill_qty: Quantity,
        fill_price: Price,
        flags: FillFlags,
    ) -> Self {
        Callback::Fill {
            order,
            matched_order,
            fill_qty,
            fill_price,
            flags,
        }
    }

    /// Cancel event with the remaining open quantity.
    pub fn cancel(order: Arc<O>, open_qty: Quantity) -> Self {
        Callback::Cancel { order, open_qty }
    }

    /// Cancel-reject event carrying a static reason.
    pub fn cancel_reject(order: Arc<O>, reason: &'static str) -> Self {
        Callback::CancelReject { order, reason }
    }

    /// Replace event carrying the pre-replace open quantity.
    pub fn replace(order: Arc<O>, open_qty: Quantity, size_delta: i64, new_price: Price) -> Self {
        Callback::Replace {
            order,
            open_qty,
            size_delta,
            new_price,
        }
    }

    /// Replace-reject event carrying a static reason.
    pub fn replace_reject(order: Arc<O>, reason: &'static str) -> Self {
        Callback::ReplaceReject { order, reason }
    }

    /// End-of-call marker.
    pub fn book_update() -> Self {
        Callback::BookUpdate
    }
}
