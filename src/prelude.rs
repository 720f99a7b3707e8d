//! Prelude module that re-exports commonly used types and traits.
//!
//! Instead of importing each type individually, you can use:
//!
//! ```rust
//! use matchbook_rs::prelude::*;
//! ```

// Core book types
pub use crate::book::{Depth, DepthLevel, DepthOrderBook, Order, OrderBook, OrderTracker};

// Events and listener capabilities
pub use crate::book::{
    BboListener, Callback, Callbacks, DepthListener, FillFlags, OrderBookListener, OrderListener,
    TradeListener,
};

// Scalar types, sides, conditions, and sentinels
pub use crate::book::{
    ChangeId, Cost, MARKET_ORDER_PRICE, OrderConditions, PRICE_UNCHANGED, Price, Quantity,
    SIZE_UNCHANGED, Side,
};

// Snapshot types
pub use crate::book::{BookError, DepthSnapshot, DepthSnapshotPackage, SnapshotLevel};

// Exchange routing and trade fan-out
pub use crate::exchange::{Exchange, ExchangeError, StdTradePublisher, TradeEvent};

// Reference order implementation
pub use crate::simple::{OrderState, SimpleOrder};
