//! Aggregated depth of one book: a fixed-width window of visible levels per
//! side plus an unbounded overflow reservoir, with monotonic change stamps
//! for incremental publication.

use super::depth_level::DepthLevel;
use super::types::{
    ChangeId, INVALID_LEVEL_PRICE, MARKET_ORDER_ASK_SORT_PRICE, MARKET_ORDER_BID_SORT_PRICE,
    Price, Quantity, Side,
};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Visible levels per side when none are configured explicitly.
pub const DEFAULT_DEPTH_LEVELS: usize = 5;

/// Where a price level was located on one side.
enum Slot {
    /// Index into the visible window.
    Visible(usize),
    /// Somewhere in the overflow reservoir.
    Excess,
}

/// Aggregated order data by price level for both sides of one book.
///
/// Each side keeps `levels_per_side` visible levels ordered from most to
/// least liquid, and spills worse levels into an ordered overflow map.
/// Every mutation that touches a visible level assigns it a fresh value of
/// the depth-wide change counter; overflow mutations never advance the
/// counter. A publisher diffing level stamps against
/// [`Depth::last_published_change`] can reconstruct exactly which levels
/// moved.
#[derive(Debug)]
pub struct Depth {
    bids: Vec<DepthLevel>,
    asks: Vec<DepthLevel>,
    last_change: ChangeId,
    last_published_change: ChangeId,
    ignore_bid_fill_qty: Quantity,
    ignore_ask_fill_qty: Quantity,
    excess_bids: BTreeMap<Reverse<Price>, DepthLevel>,
    excess_asks: BTreeMap<Price, DepthLevel>,
}

impl Depth {
    /// Create a depth tracker with `levels_per_side` visible levels on each
    /// side. A size of one tracks the BBO only.
    ///
    /// # Panics
    /// Panics when `levels_per_side` is zero.
    #[must_use]
    pub fn new(levels_per_side: usize) -> Self {
        assert!(levels_per_side >= 1, "depth size less than one not allowed");
        Self {
            bids: vec![DepthLevel::default(); levels_per_side],
            asks: vec![DepthLevel::default(); levels_per_side],
            last_change: 0,
            last_published_change: 0,
            ignore_bid_fill_qty: 0,
            ignore_ask_fill_qty: 0,
            excess_bids: BTreeMap::new(),
            excess_asks: BTreeMap::new(),
        }
    }

    /// Number of visible levels tracked per side.
    #[must_use]
    pub fn levels_per_side(&self) -> usize {
        self.bids.len()
    }

    /// The visible bid levels, best first.
    #[must_use]
    pub fn bids(&self) -> &[DepthLevel] {
        &self.bids
    }

    /// The visible ask levels, best first.
    #[must_use]
    pub fn asks(&self) -> &[DepthLevel] {
        &self.asks
    }

    /// Overflow bid levels, best first.
    pub fn excess_bids(&self) -> impl Iterator<Item = &DepthLevel> {
        self.excess_bids.values()
    }

    /// Overflow ask levels, best first.
    pub fn excess_asks(&self) -> impl Iterator<Item = &DepthLevel> {
        self.excess_asks.values()
    }

    /// Account for a new order of `qty` resting at `price`.
    ///
    /// Creates the level if necessary, shifting worse visible levels down
    /// and spilling the last one into overflow when the window is full. A
    /// creation plus the add itself consume a single change stamp.
    pub fn add_order(&mut self, price: Price, qty: Quantity, side: Side) {
        let last_change_copy = self.last_change;
        match self.find_level(price, side, true) {
            Some(Slot::Visible(idx)) => {
                let level = &mut self.levels_mut(side)[idx];
                level.add_order(qty);
                level.set_last_change(last_change_copy + 1);
                self.last_change = last_change_copy + 1;
            }
            Some(Slot::Excess) => {
                if let Some(level) = self.excess_get_mut(side, price) {
                    level.add_order(qty);
                }
            }
            None => {}
        }
    }

    /// Reserve `qty` of future fills on `side` to be swallowed without
    /// touching any level. Used for orders that fully match at accept time
    /// and never rest.
    ///
    /// # Panics
    /// Panics when a reservation is already outstanding on that side.
    pub fn ignore_fill_qty(&mut self, qty: Quantity, side: Side) {
        let slot = match side {
            Side::Buy => &mut self.ignore_bid_fill_qty,
            Side::Sell => &mut self.ignore_ask_fill_qty,
        };
        if *slot != 0 {
            panic!("ignore fill quantity already outstanding on {side} side");
        }
        *slot = qty;
    }

    /// Account for a fill of `fill_qty` against the order resting at
    /// `price`. Draws down an outstanding reservation first; otherwise
    /// closes the order when `filled`, or decrements the level quantity.
    pub fn fill_order(&mut self, price: Price, fill_qty: Quantity, filled: bool, side: Side) {
        let reserved = match side {
            Side::Buy => &mut self.ignore_bid_fill_qty,
            Side::Sell => &mut self.ignore_ask_fill_qty,
        };
        if *reserved != 0 {
            if *reserved < fill_qty {
                panic!("fill exceeds reserved quantity on {side} side");
            }
            *reserved -= fill_qty;
        } else if filled {
            self.close_order(price, fill_qty, side);
        } else {
            self.change_qty_order(price, -(fill_qty as i64), side);
        }
    }

    /// Account for an order of `open_qty` leaving the level at `price`
    /// (cancel or final fill). Returns `true` when the departure emptied
    /// and erased the level.
    ///
    /// # Panics
    /// Panics when no level exists at `price`, or on quantity underflow.
    pub fn close_order(&mut self, price: Price, open_qty: Quantity, side: Side) -> bool {
        match self.find_level(price, side, false) {
            Some(Slot::Visible(idx)) => {
                if self.levels_mut(side)[idx].close_order(open_qty) {
                    self.erase_visible_level(idx, side);
                    true
                } else {
                    self.last_change += 1;
                    let stamp = self.last_change;
                    self.levels_mut(side)[idx].set_last_change(stamp);
                    false
                }
            }
            Some(Slot::Excess) => {
                let emptied = match self.excess_get_mut(side, price) {
                    Some(level) => level.close_order(open_qty),
                    None => false,
                };
                if emptied {
                    self.excess_remove(side, price);
                }
                emptied
            }
            None => panic!("close on missing {side} level at price {price}"),
        }
    }

    /// Adjust the aggregate quantity at `price` by a signed delta.
    /// A change against a level that left the book in the same transaction
    /// is ignored.
    pub fn change_qty_order(&mut self, price: Price, qty_delta: i64, side: Side) {
        if qty_delta == 0 {
            return;
        }
        match self.find_level(price, side, false) {
            Some(Slot::Visible(idx)) => {
                self.last_change += 1;
                let stamp = self.last_change;
                let level = &mut self.levels_mut(side)[idx];
                if qty_delta > 0 {
                    level.increase_qty(qty_delta as Quantity);
                } else {
                    level.decrease_qty(qty_delta.unsigned_abs());
                }
                level.set_last_change(stamp);
            }
            Some(Slot::Excess) => {
                if let Some(level) = self.excess_get_mut(side, price) {
                    if qty_delta > 0 {
                        level.increase_qty(qty_delta as Quantity);
                    } else {
                        level.decrease_qty(qty_delta.unsigned_abs());
                    }
                }
            }
            None => {}
        }
    }

    /// Account for a replace. Matching prices apply the net quantity delta
    /// in place; a price change adds the new quantity first and then closes
    /// out the old, so a paired insertion and erasure emit coherent stamps.
    /// Returns `true` when the close erased a visible level.
    pub fn replace_order(
        &mut self,
        current_price: Price,
        new_price: Price,
        current_qty: Quantity,
        new_qty: Quantity,
        side: Side,
    ) -> bool {
        if current_price == new_price {
            let qty_delta = new_qty as i64 - current_qty as i64;
            // Quantity only. If this closes the order, a cancel follows and
            // performs the close itself.
            self.change_qty_order(current_price, qty_delta, side);
            false
        } else {
            self.add_order(new_price, new_qty, side);
            self.close_order(current_price, current_qty, side)
        }
    }

    /// After a bid erasure, the price beyond which the book must be
    /// re-examined to restore the window, or `None` when the window was not
    /// full. A BBO-only depth always restores from the top.
    #[must_use]
    pub fn needs_bid_restoration(&self) -> Option<Price> {
        let size = self.bids.len();
        if size > 1 {
            let price = self.bids[size - 2].price();
            (price != INVALID_LEVEL_PRICE).then_some(price)
        } else {
            Some(MARKET_ORDER_BID_SORT_PRICE)
        }
    }

    /// After an ask erasure, the price beyond which the book must be
    /// re-examined to restore the window, or `None` when the window was not
    /// full. A BBO-only depth always restores from the top.
    #[must_use]
    pub fn needs_ask_restoration(&self) -> Option<Price> {
        let size = self.asks.len();
        if size > 1 {
            let price = self.asks[size - 2].price();
            (price != INVALID_LEVEL_PRICE).then_some(price)
        } else {
            Some(MARKET_ORDER_ASK_SORT_PRICE)
        }
    }

    /// Has any visible level changed since the last publication?
    #[must_use]
    pub fn changed(&self) -> bool {
        self.last_change > self.last_published_change
    }

    /// The stamp of the most recent visible mutation.
    #[must_use]
    pub fn last_change(&self) -> ChangeId {
        self.last_change
    }

    /// The stamp up to which changes have been published.
    #[must_use]
    pub fn last_published_change(&self) -> ChangeId {
        self.last_published_change
    }

    /// Mark everything up to the current stamp as published.
    pub fn published(&mut self) {
        self.last_published_change = self.last_change;
    }

    fn levels(&self, side: Side) -> &[DepthLevel] {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn levels_mut(&mut self, side: Side) -> &mut [DepthLevel] {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    fn excess_get_mut(&mut self, side: Side, price: Price) -> Option<&mut DepthLevel> {
        match side {
            Side::Buy => self.excess_bids.get_mut(&Reverse(price)),
            Side::Sell => self.excess_asks.get_mut(&price),
        }
    }

    fn excess_contains(&self, side: Side, price: Price) -> bool {
        match side {
            Side::Buy => self.excess_bids.contains_key(&Reverse(price)),
            Side::Sell => self.excess_asks.contains_key(&price),
        }
    }

    fn excess_insert(&mut self, side: Side, price: Price, level: DepthLevel) {
        match side {
            Side::Buy => {
                self.excess_bids.insert(Reverse(price), level);
            }
            Side::Sell => {
                self.excess_asks.insert(price, level);
            }
        }
    }

    fn excess_remove(&mut self, side: Side, price: Price) -> Option<DepthLevel> {
        match side {
            Side::Buy => self.excess_bids.remove(&Reverse(price)),
            Side::Sell => self.excess_asks.remove(&price),
        }
    }

    fn excess_pop_best(&mut self, side: Side) -> Option<DepthLevel> {
        match side {
            Side::Buy => self.excess_bids.pop_first().map(|(_, level)| level),
            Side::Sell => self.excess_asks.pop_first().map(|(_, level)| level),
        }
    }

    /// Locate (and optionally create) the level for `price`, preferring the
    /// visible window. Creation inside a full window shifts worse levels
    /// down and spills the last one into overflow.
    fn find_level(&mut self, price: Price, side: Side, should_create: bool) -> Option<Slot> {
        let size = self.levels(side).len();
        for idx in 0..size {
            let level = self.levels(side)[idx];
            if level.price() == price {
                return Some(Slot::Visible(idx));
            }
            if should_create && !level.is_valid() {
                self.levels_mut(side)[idx].init(price, false);
                return Some(Slot::Visible(idx));
            }
            let worse = match side {
                Side::Buy => level.price() < price,
                Side::Sell => level.price() > price,
            };
            if should_create && worse {
                self.insert_level_before(idx, side, price);
                return Some(Slot::Visible(idx));
            }
        }
        if self.excess_contains(side, price) {
            Some(Slot::Excess)
        } else if should_create {
            let mut level = DepthLevel::default();
            level.init(price, true);
            self.excess_insert(side, price, level);
            Some(Slot::Excess)
        } else {
            None
        }
    }

    /// Open the slot at `idx` for a new level at `price`, shifting worse
    /// levels down one and spilling the displaced last level into overflow.
    /// Stamps every level whose content moved; consumes one change tick.
    fn insert_level_before(&mut self, idx: usize, side: Side, price: Price) {
        let size = self.levels(side).len();
        let last = self.levels(side)[size - 1];
        if last.is_valid() {
            let mut spilled = DepthLevel::default();
            spilled.init(INVALID_LEVEL_PRICE, true);
            spilled.assign(&last);
            self.excess_insert(side, last.price(), spilled);
        }
        self.last_change += 1;
        let stamp = self.last_change;
        let levels = self.levels_mut(side);
        let mut i = size - 1;
        while i > idx {
            let src = levels[i - 1];
            levels[i].assign(&src);
            if src.is_valid() {
                levels[i].set_last_change(stamp);
            }
            i -= 1;
        }
        levels[idx].init(price, false);
    }

    /// Erase the emptied visible level at `idx`: shift better levels up,
    /// then restore the freed worst slot from the best overflow entry or
    /// leave it vacant. Stamps every slot whose content shifted and the
    /// freed last slot; consumes one change tick.
    fn erase_visible_level(&mut self, idx: usize, side: Side) {
        self.last_change += 1;
        let stamp = self.last_change;
        let size = self.levels(side).len();
        let last_idx = size - 1;
        {
            let levels = self.levels_mut(side);
            for i in idx..last_idx {
                // A vacant slot past the erasure point means nothing worse
                // is populated; only the erased slot itself is forced.
                if levels[i].is_valid() || i == idx {
                    let src = levels[i + 1];
                    levels[i].assign(&src);
                    levels[i].set_last_change(stamp);
                }
            }
        }
        if idx == last_idx || self.levels(side)[last_idx].is_valid() {
            match self.excess_pop_best(side) {
                Some(best) => {
                    let levels = self.levels_mut(side);
                    levels[last_idx].assign(&best);
                    levels[last_idx].set_last_change(stamp);
                }
                None => {
                    let levels = self.levels_mut(side);
                    levels[last_idx].init(INVALID_LEVEL_PRICE, false);
                    levels[last_idx].set_last_change(stamp);
                }
            }
        }
    }
}

impl Default for Depth {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH_LEVELS)
    }
}
