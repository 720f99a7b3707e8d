//! Side-aware comparable price keys.
//!
//! A [`ComparablePrice`] knows which side of the market it is on and orders
//! entries on that side from most liquid to least liquid: market prices sort
//! first because they match any counter price, bid prices sort highest first,
//! ask prices lowest first. The cross-side trade test lives in
//! [`ComparablePrice::matches`]; the same-side ordering drives the priority
//! maps, the stop books, and the replace/cancel lookups.
//!
//! Comparing two keys from different sides is a logic bug; the ordering
//! asserts against it in debug builds.

use super::types::{MARKET_ORDER_PRICE, Price, Side};
use std::cmp::Ordering;
use std::fmt;

/// A price bound to the side of the book it rests on.
#[derive(Debug, Clone, Copy)]
pub struct ComparablePrice {
    side: Side,
    price: Price,
}

impl ComparablePrice {
    /// Build a key for `price` on `side`. `MARKET_ORDER_PRICE` (zero) marks
    /// a market entry, which sorts before any limit on its own side.
    #[must_use]
    pub fn new(side: Side, price: Price) -> Self {
        Self { side, price }
    }

    /// The raw price, `MARKET_ORDER_PRICE` for market entries.
    #[inline]
    #[must_use]
    pub fn price(&self) -> Price {
        self.price
    }

    /// The side this key belongs to.
    #[inline]
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Is this a market (no limit) entry?
    #[inline]
    #[must_use]
    pub fn is_market(&self) -> bool {
        self.price == MARKET_ORDER_PRICE
    }

    /// Cross-side trade test: can an order at this price legally trade
    /// against a resting `counter` price on the opposite side?
    ///
    /// Market prices on either side match anything. Otherwise a buy matches
    /// counters at or below its limit, a sell matches counters at or above.
    #[must_use]
    pub fn matches(&self, counter: Price) -> bool {
        if self.price == counter {
            return true;
        }
        if self.is_market() || counter == MARKET_ORDER_PRICE {
            return true;
        }
        match self.side {
            Side::Buy => counter < self.price,
            Side::Sell => self.price < counter,
        }
    }
}

impl PartialEq for ComparablePrice {
    fn eq(&self, other: &Self) -> bool {
        self.price == other.price
    }
}

impl Eq for ComparablePrice {}

impl PartialOrd for ComparablePrice {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComparablePrice {
    /// Same-side liquidity ordering: easier to fill sorts first.
    fn cmp(&self, other: &Self) -> Ordering {
        debug_assert_eq!(
            self.side, other.side,
            "comparable prices from different sides must never be ordered"
        );
        match (self.is_market(), other.is_market()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => match self.side {
                Side::Buy => other.price.cmp(&self.price),
                Side::Sell => self.price.cmp(&other.price),
            },
        }
    }
}

impl fmt::Display for ComparablePrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.side {
            Side::Buy => write!(f, "Buy at ")?,
            Side::Sell => write!(f, "Sell at ")?,
        }
        if self.is_market() {
            write!(f, "Market")
        } else {
            write!(f, "{}", self.price)
        }
    }
}

/// Key of the per-side priority maps: liquidity order first, then insertion
/// order among equal prices. The sequence number is handed out by the book
/// and carries the time priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKey {
    price: ComparablePrice,
    seq: u64,
}

impl OrderKey {
    /// Build a key from a side-aware price and an insertion sequence.
    #[must_use]
    pub fn new(price: ComparablePrice, seq: u64) -> Self {
        Self { price, seq }
    }

    /// The lowest key at `price`: a range start that covers every entry
    /// resting at that price.
    #[must_use]
    pub fn first_at(price: ComparablePrice) -> Self {
        Self { price, seq: 0 }
    }

    /// The side-aware price component.
    #[inline]
    #[must_use]
    pub fn price(&self) -> ComparablePrice {
        self.price
    }

    /// The insertion sequence component.
    #[inline]
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.price
            .cmp(&other.price)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}
