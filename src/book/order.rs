//! The contract an order must expose to be handled by the matching engine.

use super::types::{MARKET_ORDER_PRICE, Price, Quantity, Side};

/// Interface the matching engine consumes orders through.
///
/// Order bodies are owned by the caller and handed to the engine behind
/// shared handles; the engine never mutates them and never indexes them by
/// id, only by reference identity. Everything mutable about a resting order
/// lives in the engine's own [`super::OrderTracker`].
pub trait Order {
    /// Which side of the market this order belongs to.
    fn side(&self) -> Side;

    /// Limit price of the order, or `MARKET_ORDER_PRICE` for a market order.
    fn price(&self) -> Price;

    /// Total quantity of the order as entered.
    fn order_qty(&self) -> Quantity;

    /// Stop price, or `MARKET_ORDER_PRICE` when this is not a stop order.
    fn stop_price(&self) -> Price {
        MARKET_ORDER_PRICE
    }

    /// Must the order trade its full quantity atomically or not at all?
    fn all_or_none(&self) -> bool {
        false
    }

    /// Should any residual after initial matching be cancelled?
    fn immediate_or_cancel(&self) -> bool {
        false
    }

    /// Is this a limit order (any non-market price)?
    fn is_limit(&self) -> bool {
        self.price() != MARKET_ORDER_PRICE
    }

    /// Convenience side test.
    fn is_buy(&self) -> bool {
        self.side() == Side::Buy
    }
}
