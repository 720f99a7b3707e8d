//! Fundamental types shared across the book: prices, quantities, change
//! stamps, sides, and order condition flags.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Price of an order or trade. Non-negative; `0` is the market-order sentinel.
pub type Price = u64;

/// Quantity of an order, fill, or aggregated level.
pub type Quantity = u64;

/// Cost of a fill: price times quantity. Widened so the product cannot
/// overflow even at the extremes of `Price` and `Quantity`.
pub type Cost = u128;

/// Monotonic stamp assigned to depth levels on every visible mutation.
pub type ChangeId = u64;

/// Sentinel price meaning "market order" (no limit).
pub const MARKET_ORDER_PRICE: Price = 0;

/// Sentinel price of a vacant depth level.
pub const INVALID_LEVEL_PRICE: Price = 0;

/// Sentinel passed to `replace` when the price should not change.
pub const PRICE_UNCHANGED: Price = 0;

/// Sentinel passed to `replace` when the size should not change.
pub const SIZE_UNCHANGED: i64 = 0;

/// Loosest restoration bound on the bid side: any bid price qualifies.
pub const MARKET_ORDER_BID_SORT_PRICE: Price = Price::MAX;

/// Loosest restoration bound on the ask side: any ask price qualifies.
pub const MARKET_ORDER_ASK_SORT_PRICE: Price = 0;

/// Side of the market an order belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Buy side (bids)
    Buy,
    /// Sell side (asks)
    Sell,
}

impl Side {
    /// Returns `true` for the buy side.
    #[inline]
    #[must_use]
    pub fn is_buy(self) -> bool {
        matches!(self, Side::Buy)
    }

    /// The side an inbound order of this side matches against.
    #[inline]
    #[must_use]
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}

bitflags! {
    /// Special handling requested for an order at entry time.
    ///
    /// The matching engine snapshots these flags into the order tracker when
    /// the order is accepted and never re-reads them afterwards.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct OrderConditions: u32 {
        /// Trade the full order quantity in one atomic set of fills, or not
        /// at all.
        const ALL_OR_NONE = 1;

        /// Cancel whatever quantity remains open after initial matching.
        const IMMEDIATE_OR_CANCEL = 1 << 1;

        /// All-or-none and immediate-or-cancel combined.
        const FILL_OR_KILL = Self::ALL_OR_NONE.bits() | Self::IMMEDIATE_OR_CANCEL.bits();

        /// Kept for wire compatibility only. Stop orders are recognized by a
        /// non-zero stop price; this flag is never consulted.
        const STOP = 1 << 2;
    }
}

impl Default for OrderConditions {
    fn default() -> Self {
        OrderConditions::empty()
    }
}
