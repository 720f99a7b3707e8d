//! Interactive order entry console.
//!
//! Reads commands from stdin and drives an exchange of depth-tracking
//! books. Command verbs:
//!
//! ```text
//! BUY <qty> <symbol> <price|MARKET> [AON] [IOC] [STOP <price>] ;
//! SELL <qty> <symbol> <price|MARKET> [AON] [IOC] [STOP <price>] ;
//! CANCEL <id> <symbol>
//! MODIFY <id> <symbol> [PRICE <p>] [QUANTITY <delta>]
//! DISPLAY <symbol>
//! HELP
//! QUIT
//! # comment
//! ```

use matchbook_rs::prelude::*;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::sync::Arc;
use tracing::warn;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut market = Market::new();
    println!("Type HELP for a list of commands.");
    let stdin = io::stdin();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(error) => {
                warn!("input error: {error}");
                break;
            }
        }
        let tokens: Vec<String> = line
            .split_whitespace()
            .map(|token| token.to_uppercase())
            .collect();
        if tokens.is_empty() || tokens[0].starts_with('#') {
            continue;
        }
        if tokens[0] == "QUIT" {
            break;
        }
        if !market.apply(&tokens) {
            println!("Cannot process command. Type HELP for syntax.");
        }
    }
}

/// Listener printing every event it observes and keeping the order state
/// machines in step with the engine.
struct Console;

impl OrderListener<SimpleOrder> for Console {
    fn on_accept(&self, order: &Arc<SimpleOrder>) {
        order.accept();
        println!("\taccepted: {} {} @ {}", order.side(), order.order_qty(), price_text(order.price()));
    }

    fn on_reject(&self, order: &Arc<SimpleOrder>, reason: &str) {
        order.reject();
        println!("\trejected: {reason}");
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
        println!("\tfill: {fill_qty} for {fill_cost}");
    }

    fn on_cancel(&self, order: &Arc<SimpleOrder>) {
        order.cancel();
        println!("\tcancelled with {} open", order.open_qty());
    }

    fn on_cancel_reject(&self, order: &Arc<SimpleOrder>, reason: &str) {
        order.cancel_reject();
        println!("\tcancel rejected: {reason}");
    }

    fn on_replace(&self, order: &Arc<SimpleOrder>, size_delta: i64, new_price: Price) {
        order.replace(size_delta, new_price);
        println!("\treplaced: delta {size_delta}, price {}", price_text(new_price));
    }

    fn on_replace_reject(&self, order: &Arc<SimpleOrder>, reason: &str) {
        order.replace_reject();
        println!("\treplace rejected: {reason}");
    }
}

impl TradeListener<OrderBook<SimpleOrder>> for Console {
    fn on_trade(&self, book: &OrderBook<SimpleOrder>, qty: Quantity, cost: Cost) {
        println!("\ttrade on {}: {qty} for {cost}", book.symbol());
    }
}

fn price_text(price: Price) -> String {
    if price == MARKET_ORDER_PRICE {
        "MARKET".to_string()
    } else {
        price.to_string()
    }
}

struct Market {
    exchange: Exchange<SimpleOrder>,
    orders: HashMap<String, Arc<SimpleOrder>>,
    symbols: HashMap<String, String>,
    next_id: u32,
}

impl Market {
    fn new() -> Self {
        let mut exchange = Exchange::new();
        let console = Rc::new(Console);
        exchange.set_order_listener(console.clone());
        exchange.set_trade_listener(console);
        Self {
            exchange,
            orders: HashMap::new(),
            symbols: HashMap::new(),
            next_id: 0,
        }
    }

    fn apply(&mut self, tokens: &[String]) -> bool {
        match tokens[0].as_str() {
            "BUY" => self.do_add(Side::Buy, &tokens[1..]),
            "SELL" => self.do_add(Side::Sell, &tokens[1..]),
            "CANCEL" => self.do_cancel(&tokens[1..]),
            "MODIFY" => self.do_modify(&tokens[1..]),
            "DISPLAY" => self.do_display(&tokens[1..]),
            "HELP" => {
                Self::help();
                true
            }
            _ => false,
        }
    }

    fn help() {
        println!("BUY <qty> <symbol> <price|MARKET> [AON] [IOC] [STOP <price>] ;");
        println!("SELL <qty> <symbol> <price|MARKET> [AON] [IOC] [STOP <price>] ;");
        println!("CANCEL <id> <symbol>");
        println!("MODIFY <id> <symbol> [PRICE <p>] [QUANTITY <delta>]");
        println!("DISPLAY <symbol>");
        println!("HELP | QUIT | #comment");
    }

    fn do_add(&mut self, side: Side, args: &[String]) -> bool {
        if args.len() < 3 {
            return false;
        }
        let Ok(qty) = args[0].parse::<Quantity>() else {
            return false;
        };
        let symbol = args[1].clone();
        let Some(price) = parse_price(&args[2]) else {
            return false;
        };

        let mut conditions = OrderConditions::empty();
        let mut stop_price = MARKET_ORDER_PRICE;
        let mut rest = args[3..].iter();
        while let Some(flag) = rest.next() {
            match flag.as_str() {
                "AON" => conditions |= OrderConditions::ALL_OR_NONE,
                "IOC" => conditions |= OrderConditions::IMMEDIATE_OR_CANCEL,
                "STOP" => match rest.next().and_then(|token| parse_price(token)) {
                    Some(stop) => stop_price = stop,
                    None => return false,
                },
                ";" => break,
                _ => return false,
            }
        }

        if !self.exchange.has_book(&symbol) {
            if self.exchange.add_order_book(&symbol).is_err() {
                return false;
            }
        }

        let order = Arc::new(SimpleOrder::new(side, price, qty, stop_price, conditions));
        self.next_id += 1;
        let id = format!("#{}", self.next_id);
        self.orders.insert(id.clone(), Arc::clone(&order));
        self.symbols.insert(id.clone(), symbol.clone());
        println!("{id}: {side} {qty} {symbol} @ {}", price_text(price));
        self.exchange
            .add_order(&symbol, order, conditions)
            .is_ok()
    }

    fn do_cancel(&mut self, args: &[String]) -> bool {
        let Some((order, symbol)) = self.lookup(args) else {
            return false;
        };
        order.request_cancel();
        self.exchange.cancel_order(&symbol, &order).is_ok()
    }

    fn do_modify(&mut self, args: &[String]) -> bool {
        let Some((order, symbol)) = self.lookup(args) else {
            return false;
        };
        let mut new_price = PRICE_UNCHANGED;
        let mut size_delta = SIZE_UNCHANGED;
        let mut rest = args[2..].iter();
        while let Some(flag) = rest.next() {
            match flag.as_str() {
                "PRICE" => match rest.next().and_then(|token| parse_price(token)) {
                    Some(price) => new_price = price,
                    None => return false,
                },
                "QUANTITY" => match rest.next().and_then(|token| token.parse::<i64>().ok()) {
                    Some(delta) => size_delta = delta,
                    None => return false,
                },
                ";" => break,
                _ => return false,
            }
        }
        order.request_modify();
        self.exchange
            .replace_order(&symbol, &order, size_delta, new_price)
            .is_ok()
    }

    fn do_display(&mut self, args: &[String]) -> bool {
        if args.is_empty() {
            return false;
        }
        let Some(book) = self.exchange.book(&args[0]) else {
            println!("no book for {}", args[0]);
            return true;
        };
        let mut out = Vec::new();
        if book.log(&mut out).is_err() {
            return false;
        }
        print!("{}", String::from_utf8_lossy(&out));
        println!("  market price: {}", price_text(book.market_price()));
        for level in book.depth().bids().iter().filter(|level| level.is_valid()) {
            println!(
                "  depth bid {} x {} ({} orders)",
                level.price(),
                level.aggregate_qty(),
                level.order_count()
            );
        }
        for level in book.depth().asks().iter().filter(|level| level.is_valid()) {
            println!(
                "  depth ask {} x {} ({} orders)",
                level.price(),
                level.aggregate_qty(),
                level.order_count()
            );
        }
        true
    }

    fn lookup(&self, args: &[String]) -> Option<(Arc<SimpleOrder>, String)> {
        if args.len() < 2 {
            return None;
        }
        let order = self.orders.get(&args[0])?;
        let symbol = self.symbols.get(&args[0])?;
        if symbol != &args[1] {
            return None;
        }
        Some((Arc::clone(order), symbol.clone()))
    }
}

fn parse_price(token: &str) -> Option<Price> {
    match token {
        "MARKET" | "MKT" => Some(MARKET_ORDER_PRICE),
        _ => token.parse::<Price>().ok(),
    }
}
