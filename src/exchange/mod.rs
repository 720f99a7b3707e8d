//! Multi-symbol routing façade with centralized trade event fan-out.
//!
//! The exchange owns one depth-tracking book per symbol, wires the
//! registered listeners into each book at creation, and drains the event
//! buffer after every routed call so listeners observe each operation as a
//! unit. Trade events can additionally be forwarded to a worker thread
//! through standard library or Tokio channels.

use crate::book::{
    BboListener, Cost, DEFAULT_DEPTH_LEVELS, DepthListener, DepthOrderBook, Order, OrderBook,
    OrderBookListener, OrderConditions, OrderListener, Price, Quantity, TradeListener,
};
use crate::utils::current_time_millis;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

/// Errors from routing operations to a symbol's book.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExchangeError {
    /// No book installed for the symbol.
    #[error("unknown symbol: {symbol}")]
    UnknownSymbol {
        /// The symbol that was requested
        symbol: String,
    },

    /// A book already exists for the symbol.
    #[error("order book already exists for symbol: {symbol}")]
    DuplicateBook {
        /// The symbol that was requested
        symbol: String,
    },
}

/// Routes orders to per-symbol matching engines.
///
/// Listeners registered on the exchange are installed into every book
/// created afterwards. Each engine stays single-threaded; the exchange
/// itself must be driven from one thread (or one thread per exchange).
pub struct Exchange<O: Order> {
    books: HashMap<String, DepthOrderBook<O>>,
    depth_levels: usize,
    order_listener: Option<Rc<dyn OrderListener<O>>>,
    trade_listener: Option<Rc<dyn TradeListener<OrderBook<O>>>>,
    order_book_listener: Option<Rc<dyn OrderBookListener<OrderBook<O>>>>,
    depth_listener: Option<Rc<dyn DepthListener<DepthOrderBook<O>>>>,
    bbo_listener: Option<Rc<dyn BboListener<DepthOrderBook<O>>>>,
}

impl<O: Order> Exchange<O> {
    /// Create an exchange whose books track the default depth window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_depth(DEFAULT_DEPTH_LEVELS)
    }

    /// Create an exchange whose books track `depth_levels` visible levels
    /// per side.
    ///
    /// # Panics
    /// Panics when `depth_levels` is zero.
    #[must_use]
    pub fn with_depth(depth_levels: usize) -> Self {
        assert!(depth_levels >= 1, "depth size less than one not allowed");
        Self {
            books: HashMap::new(),
            depth_levels,
            order_listener: None,
            trade_listener: None,
            order_book_listener: None,
            depth_listener: None,
            bbo_listener: None,
        }
    }

    /// Register the per-order listener wired into books created afterwards.
    pub fn set_order_listener(&mut self, listener: Rc<dyn OrderListener<O>>) {
        self.order_listener = Some(listener);
    }

    /// Register the trade listener wired into books created afterwards.
    pub fn set_trade_listener(&mut self, listener: Rc<dyn TradeListener<OrderBook<O>>>) {
        self.trade_listener = Some(listener);
    }

    /// Register the book-change listener wired into books created
    /// afterwards.
    pub fn set_order_book_listener(&mut self, listener: Rc<dyn OrderBookListener<OrderBook<O>>>) {
        self.order_book_listener = Some(listener);
    }

    /// Register the depth listener wired into books created afterwards.
    pub fn set_depth_listener(&mut self, listener: Rc<dyn DepthListener<DepthOrderBook<O>>>) {
        self.depth_listener = Some(listener);
    }

    /// Register the BBO listener wired into books created afterwards.
    pub fn set_bbo_listener(&mut self, listener: Rc<dyn BboListener<DepthOrderBook<O>>>) {
        self.bbo_listener = Some(listener);
    }

    /// Install a book for `symbol` with the exchange's listeners wired in.
    ///
    /// # Errors
    /// Returns [`ExchangeError::DuplicateBook`] when the symbol already has
    /// a book.
    pub fn add_order_book(&mut self, symbol: &str) -> Result<(), ExchangeError> {
        if self.books.contains_key(symbol) {
            return Err(ExchangeError::DuplicateBook {
                symbol: symbol.to_string(),
            });
        }
        let mut book = DepthOrderBook::with_depth(symbol, self.depth_levels);
        if let Some(listener) = &self.order_listener {
            book.set_order_listener(Rc::clone(listener));
        }
        if let Some(listener) = &self.trade_listener {
            book.set_trade_listener(Rc::clone(listener));
        }
        if let Some(listener) = &self.order_book_listener {
            book.set_order_book_listener(Rc::clone(listener));
        }
        if let Some(listener) = &self.depth_listener {
            book.set_depth_listener(Rc::clone(listener));
        }
        if let Some(listener) = &self.bbo_listener {
            book.set_bbo_listener(Rc::clone(listener));
        }
        info!("order book added for {symbol}");
        self.books.insert(symbol.to_string(), book);
        Ok(())
    }

    /// Route an add to the symbol's book and drain its events. Returns
    /// whether the order matched.
    ///
    /// # Errors
    /// Returns [`ExchangeError::UnknownSymbol`] when no book exists.
    pub fn add_order(
        &mut self,
        symbol: &str,
        order: Arc<O>,
        conditions: OrderConditions,
    ) -> Result<bool, ExchangeError> {
        let book = self.book_for(symbol)?;
        let matched = book.add(order, conditions);
        book.perform_callbacks();
        Ok(matched)
    }

    /// Route a cancel to the symbol's book and drain its events.
    ///
    /// # Errors
    /// Returns [`ExchangeError::UnknownSymbol`] when no book exists.
    pub fn cancel_order(&mut self, symbol: &str, order: &Arc<O>) -> Result<(), ExchangeError> {
        let book = self.book_for(symbol)?;
        book.cancel(order);
        book.perform_callbacks();
        Ok(())
    }

    /// Route a replace to the symbol's book and drain its events. Returns
    /// whether the replace matched.
    ///
    /// # Errors
    /// Returns [`ExchangeError::UnknownSymbol`] when no book exists.
    pub fn replace_order(
        &mut self,
        symbol: &str,
        order: &Arc<O>,
        size_delta: i64,
        new_price: Price,
    ) -> Result<bool, ExchangeError> {
        let book = self.book_for(symbol)?;
        let matched = book.replace(order, size_delta, new_price);
        book.perform_callbacks();
        Ok(matched)
    }

    /// Establish the market price of a symbol before its book has traded.
    ///
    /// # Errors
    /// Returns [`ExchangeError::UnknownSymbol`] when no book exists.
    pub fn set_market_price(&mut self, symbol: &str, price: Price) -> Result<(), ExchangeError> {
        let book = self.book_for(symbol)?;
        book.set_market_price(price);
        Ok(())
    }

    /// The book for `symbol`, if one is installed.
    #[must_use]
    pub fn book(&self, symbol: &str) -> Option<&DepthOrderBook<O>> {
        self.books.get(symbol)
    }

    /// Mutable access to the book for `symbol`.
    pub fn book_mut(&mut self, symbol: &str) -> Option<&mut DepthOrderBook<O>> {
        self.books.get_mut(symbol)
    }

    /// All symbols with installed books.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.books.keys().cloned().collect()
    }

    /// Is a book installed for `symbol`?
    #[must_use]
    pub fn has_book(&self, symbol: &str) -> bool {
        self.books.contains_key(symbol)
    }

    /// Remove and return the book for `symbol`.
    pub fn remove_book(&mut self, symbol: &str) -> Option<DepthOrderBook<O>> {
        self.books.remove(symbol)
    }

    /// Number of installed books.
    #[must_use]
    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    fn book_for(&mut self, symbol: &str) -> Result<&mut DepthOrderBook<O>, ExchangeError> {
        self.books
            .get_mut(symbol)
            .ok_or_else(|| ExchangeError::UnknownSymbol {
                symbol: symbol.to_string(),
            })
    }
}

impl<O: Order> Default for Exchange<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// A trade forwarded off the matching path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    /// The symbol the trade happened in
    pub symbol: String,
    /// Unique identifier of the trade
    pub trade_id: Uuid,
    /// Quantity traded
    pub qty: Quantity,
    /// Total cost of the trade (quantity times price)
    pub cost: Cost,
    /// Unix timestamp in milliseconds when the trade was observed
    pub timestamp: u64,
}

impl TradeEvent {
    fn observe(symbol: &str, qty: Quantity, cost: Cost) -> Self {
        Self {
            symbol: symbol.to_string(),
            trade_id: Uuid::new_v4(),
            qty,
            cost,
            timestamp: current_time_millis(),
        }
    }
}

fn log_trade_event(event: &TradeEvent) {
    info!(
        "trade {} on {}: {} units for {} at {}",
        event.trade_id, event.symbol, event.qty, event.cost, event.timestamp
    );
}

/// Trade listener that forwards events to a standard library channel, for
/// processing on a plain worker thread.
pub struct StdTradePublisher {
    sender: std::sync::mpsc::Sender<TradeEvent>,
}

impl StdTradePublisher {
    /// Build a publisher and the receiving end for the worker.
    #[must_use]
    pub fn channel() -> (Self, std::sync::mpsc::Receiver<TradeEvent>) {
        let (sender, receiver) = std::sync::mpsc::channel();
        (Self { sender }, receiver)
    }

    /// Consume trade events on a dedicated thread until every publisher is
    /// dropped.
    pub fn start_trade_processor(
        receiver: std::sync::mpsc::Receiver<TradeEvent>,
    ) -> std::thread::JoinHandle<()> {
        std::thread::spawn(move || {
            info!("trade processor started");
            while let Ok(event) = receiver.recv() {
                log_trade_event(&event);
            }
            info!("trade processor stopped");
        })
    }
}

impl<O: Order> TradeListener<OrderBook<O>> for StdTradePublisher {
    fn on_trade(&self, book: &OrderBook<O>, qty: Quantity, cost: Cost) {
        let event = TradeEvent::observe(book.symbol(), qty, cost);
        if let Err(send_error) = self.sender.send(event) {
            error!("failed to forward trade event: {send_error}");
        }
    }
}

/// Trade listener that forwards events to a Tokio unbounded channel, for
/// processing on an async task.
pub struct TokioTradePublisher {
    sender: tokio::sync::mpsc::UnboundedSender<TradeEvent>,
}

impl TokioTradePublisher {
    /// Build a publisher and the receiving end for the task.
    #[must_use]
    pub fn channel() -> (Self, tokio::sync::mpsc::UnboundedReceiver<TradeEvent>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Consume trade events on a Tokio task until every publisher is
    /// dropped. Must be called from within a runtime.
    pub fn start_trade_processor(
        mut receiver: tokio::sync::mpsc::UnboundedReceiver<TradeEvent>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!("trade processor started");
            while let Some(event) = receiver.recv().await {
                log_trade_event(&event);
            }
            info!("trade processor stopped");
        })
    }
}

impl<O: Order> TradeListener<OrderBook<O>> for TokioTradePublisher {
    fn on_trade(&self, book: &OrderBook<O>, qty: Quantity, cost: Cost) {
        let event = TradeEvent::observe(book.symbol(), qty, cost);
        if let Err(send_error) = self.sender.send(event) {
            error!("failed to forward trade event: {send_error}");
        }
    }
}
