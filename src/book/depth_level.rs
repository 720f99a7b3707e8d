//! A single price level of the aggregated depth view.

use super::types::{ChangeId, INVALID_LEVEL_PRICE, Price, Quantity};
use serde::{Deserialize, Serialize};

/// One level of the limit order book aggregated by price.
///
/// Levels are plain copyable values so the visible window can shift them
/// with simple assignments when levels are inserted or erased.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DepthLevel {
    price: Price,
    order_count: u32,
    aggregate_qty: Quantity,
    is_excess: bool,
    last_change: ChangeId,
}

impl Default for DepthLevel {
    fn default() -> Self {
        Self {
            price: INVALID_LEVEL_PRICE,
            order_count: 0,
            aggregate_qty: 0,
            is_excess: false,
            last_change: 0,
        }
    }
}

impl DepthLevel {
    /// The level price, `INVALID_LEVEL_PRICE` when vacant.
    #[inline]
    #[must_use]
    pub fn price(&self) -> Price {
        self.price
    }

    /// Number of orders resting at this price.
    #[inline]
    #[must_use]
    pub fn order_count(&self) -> u32 {
        self.order_count
    }

    /// Total open quantity resting at this price.
    #[inline]
    #[must_use]
    pub fn aggregate_qty(&self) -> Quantity {
        self.aggregate_qty
    }

    /// Does this level live in the overflow reservoir rather than the
    /// visible window?
    #[inline]
    #[must_use]
    pub fn is_excess(&self) -> bool {
        self.is_excess
    }

    /// Is this level populated?
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.price != INVALID_LEVEL_PRICE
    }

    /// Reset the level to an empty state at `price`.
    pub fn init(&mut self, price: Price, is_excess: bool) {
        self.price = price;
        self.order_count = 0;
        self.aggregate_qty = 0;
        self.is_excess = is_excess;
    }

    /// Account for one more order of `qty` at this price.
    pub fn add_order(&mut self, qty: Quantity) {
        self.order_count += 1;
        self.aggregate_qty += qty;
    }

    /// Increase the aggregate quantity of the resting orders.
    pub fn increase_qty(&mut self, qty: Quantity) {
        self.aggregate_qty += qty;
    }

    /// Decrease the aggregate quantity of the resting orders.
    ///
    /// # Panics
    /// Panics when the decrease exceeds the aggregate; fills never remove
    /// more than the level holds.
    pub fn decrease_qty(&mut self, qty: Quantity) {
        if self.aggregate_qty < qty {
            panic!("level quantity too low");
        }
        self.aggregate_qty -= qty;
    }

    /// Overwrite every field of the level.
    pub fn set(&mut self, price: Price, qty: Quantity, order_count: u32, last_change: ChangeId) {
        self.price = price;
        self.aggregate_qty = qty;
        self.order_count = order_count;
        self.last_change = last_change;
    }

    /// Account for an order leaving this price (cancel or final fill),
    /// removing `qty` of open quantity.
    ///
    /// Returns `true` when this was the last order and the level is now
    /// empty. The last departure resets the aggregate regardless of `qty`,
    /// which lets replace-to-zero drain the quantity ahead of the close.
    ///
    /// # Panics
    /// Panics on a close against an empty level, or when `qty` exceeds the
    /// aggregate of a level holding other orders.
    pub fn close_order(&mut self, qty: Quantity) -> bool {
        match self.order_count {
            0 => panic!("close on level with no orders"),
            1 => {
                self.order_count = 0;
                self.aggregate_qty = 0;
                true
            }
            _ => {
                self.order_count -= 1;
                if self.aggregate_qty < qty {
                    panic!("level quantity too low");
                }
                self.aggregate_qty -= qty;
                false
            }
        }
    }

    /// Stamp the level with a new change id.
    #[inline]
    pub fn set_last_change(&mut self, last_change: ChangeId) {
        self.last_change = last_change;
    }

    /// The stamp of the last visible mutation of this level.
    #[inline]
    #[must_use]
    pub fn last_change(&self) -> ChangeId {
        self.last_change
    }

    /// Has the level changed since the given published stamp?
    #[inline]
    #[must_use]
    pub fn changed_since(&self, last_published_change: ChangeId) -> bool {
        self.last_change > last_published_change
    }

    /// Copy the content of `src` into this slot, keeping this slot's
    /// excess flag and taking the stamp only from a populated source.
    pub fn assign(&mut self, src: &DepthLevel) {
        self.price = src.price;
        self.order_count = src.order_count;
        self.aggregate_qty = src.aggregate_qty;
        if src.is_valid() {
            self.last_change = src.last_change;
        }
    }
}
