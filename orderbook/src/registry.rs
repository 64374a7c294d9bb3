// Process-wide dispatcher: parses a `|`-delimited input record (§6), routes
// it to the right `OrderBook` by ticker (for adds) or order-id (for
// updates/cancels), and keeps the ticker->book and order-id->ticker maps
// consistent with the books' actual contents.

use std::collections::HashMap;
use std::sync::Arc;

use common::logging::{LogLevel, Logger};
use common::time::now_nanos;
use common::types::{OrderId, Side, Ticker};
use rust_decimal::Decimal;

use crate::book::{DepthRow, OrderBook};
use crate::error::EngineError;

pub struct BookRegistry {
    books: HashMap<Ticker, OrderBook>,
    order_owner: HashMap<OrderId, Ticker>,
    logger: Option<Arc<Logger>>,
}

impl BookRegistry {
    pub fn new() -> Self {
        Self {
            books: HashMap::new(),
            order_owner: HashMap::new(),
            logger: None,
        }
    }

    /// Attaches a logger; subsequent `process` calls report accepted
    /// records at `Debug`, rejected ones at `Warn`, and book lifecycle
    /// transitions at `Info`.
    pub fn with_logger(logger: Arc<Logger>) -> Self {
        Self {
            books: HashMap::new(),
            order_owner: HashMap::new(),
            logger: Some(logger),
        }
    }

    #[inline]
    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    pub fn book(&self, ticker: &str) -> Option<&OrderBook> {
        self.books.get(ticker)
    }

    /// Parses and applies one input record. Field layout is documented in
    /// §6: `timestamp|order_id|action|...`. Returns the error without
    /// mutating any structure when the record is malformed or references
    /// an order-id that does/doesn't already exist as required by the
    /// action.
    pub fn process(&mut self, record: &str) -> Result<(), EngineError> {
        let result = self.process_inner(record);

        if let Some(logger) = &self.logger {
            match &result {
                Ok(()) => logger.log(LogLevel::Debug, "record accepted"),
                Err(_) => logger.log(LogLevel::Warn, "record rejected"),
            }
        }

        result
    }

    fn process_inner(&mut self, record: &str) -> Result<(), EngineError> {
        let fields: Vec<&str> = record.split('|').collect();
        if fields.len() < 3 {
            return Err(EngineError::MalformedRecord(record.to_string()));
        }

        let order_id = fields[1].to_string();
        let action = fields[2];

        match action {
            "a" => self.process_add(&fields, order_id),
            "u" => self.process_update(&fields, &order_id),
            "c" => self.process_cancel(&order_id),
            other => Err(EngineError::MalformedRecord(format!(
                "unknown action {:?} in record {:?}",
                other, record
            ))),
        }
    }

    fn process_add(&mut self, fields: &[&str], order_id: OrderId) -> Result<(), EngineError> {
        if fields.len() < 7 {
            return Err(EngineError::MalformedRecord(format!(
                "add record missing fields: {:?}",
                fields
            )));
        }
        let ticker = fields[3].to_string();
        let side = Side::from_wire(fields[4])
            .ok_or_else(|| EngineError::MalformedRecord(format!("bad side {:?}", fields[4])))?;
        let price: Decimal = fields[5]
            .parse()
            .map_err(|_| EngineError::MalformedRecord(format!("bad price {:?}", fields[5])))?;
        let size: u64 = fields[6]
            .parse()
            .map_err(|_| EngineError::MalformedRecord(format!("bad size {:?}", fields[6])))?;

        if self.order_owner.contains_key(&order_id) {
            return Err(EngineError::DuplicateOrder(order_id));
        }

        let is_new_book = !self.books.contains_key(&ticker);
        let book = self
            .books
            .entry(ticker.clone())
            .or_insert_with(|| OrderBook::new(ticker.clone()));

        book.add(order_id.clone(), side, price, size, now_nanos())?;
        self.order_owner.insert(order_id, ticker);

        if is_new_book {
            if let Some(logger) = &self.logger {
                logger.log(LogLevel::Info, "book opened");
            }
        }
        Ok(())
    }

    fn process_update(&mut self, fields: &[&str], order_id: &str) -> Result<(), EngineError> {
        if fields.len() < 4 {
            return Err(EngineError::MalformedRecord(format!(
                "update record missing fields: {:?}",
                fields
            )));
        }
        let new_size: u64 = fields[3]
            .parse()
            .map_err(|_| EngineError::MalformedRecord(format!("bad size {:?}", fields[3])))?;

        let ticker = self
            .order_owner
            .get(order_id)
            .ok_or_else(|| EngineError::UnknownOrder(order_id.to_string()))?
            .clone();
        let book = self
            .books
            .get_mut(&ticker)
            .ok_or_else(|| EngineError::UnknownOrder(order_id.to_string()))?;

        book.update(order_id, new_size)
    }

    fn process_cancel(&mut self, order_id: &str) -> Result<(), EngineError> {
        let ticker = self
            .order_owner
            .get(order_id)
            .ok_or_else(|| EngineError::UnknownOrder(order_id.to_string()))?
            .clone();
        let book = self
            .books
            .get_mut(&ticker)
            .ok_or_else(|| EngineError::UnknownOrder(order_id.to_string()))?;

        book.remove(order_id)?;
        self.order_owner.remove(order_id);

        if book.is_empty() {
            self.books.remove(&ticker);
            if let Some(logger) = &self.logger {
                logger.log(LogLevel::Info, "book closed");
            }
        }
        Ok(())
    }

    /// Concatenates every book's full depth view, in ticker-sorted (hence
    /// stable) order.
    pub fn snapshot(&self) -> Vec<DepthRow> {
        let mut tickers: Vec<&Ticker> = self.books.keys().collect();
        tickers.sort();

        let mut out = Vec::new();
        for ticker in tickers {
            out.extend(self.books[ticker].depth_view(None));
        }
        out
    }
}

impl Default for BookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_scenario_end_to_end() {
        let mut reg = BookRegistry::new();
        reg.process("1|a1|a|AAPL|B|100.00000|5").unwrap();
        reg.process("1|a2|a|AAPL|S|200.00000|5").unwrap();
        reg.process("1|a3|a|AAPL|B|150.00000|5").unwrap();
        reg.process("1|a4|a|AAPL|B|150.00000|10").unwrap();

        let book = reg.book("AAPL").unwrap();
        assert_eq!(book.best_ask_price().unwrap().to_string(), "200.00000");
        assert_eq!(book.best_bid_price().unwrap().to_string(), "150.00000");
        assert_eq!(book.best_bid_size(), Some(15));

        reg.process("1|a4|u|6").unwrap();
        assert_eq!(reg.book("AAPL").unwrap().best_bid_size(), Some(11));

        reg.process("1|a2|u|9").unwrap();
        assert_eq!(reg.book("AAPL").unwrap().best_ask_size(), Some(9));

        reg.process("1|a3|c").unwrap();
        assert_eq!(reg.book("AAPL").unwrap().best_bid_size(), Some(6));

        reg.process("1|a4|c").unwrap();
        let book = reg.book("AAPL").unwrap();
        assert_eq!(book.best_bid_price().unwrap().to_string(), "100.00000");
        assert_eq!(book.best_bid_size(), Some(5));
    }

    #[test]
    fn book_deregisters_when_both_sides_empty() {
        let mut reg = BookRegistry::new();
        reg.process("1|a1|a|X|B|10|1").unwrap();
        assert_eq!(reg.book_count(), 1);
        reg.process("1|a1|c").unwrap();
        assert_eq!(reg.book_count(), 0);
    }

    #[test]
    fn malformed_records_are_rejected_without_mutation() {
        let mut reg = BookRegistry::new();
        assert!(reg.process("1|a1|z").is_err());
        assert!(reg.process("1|a1|a|X|Q|10|1").is_err()); // bad side
        assert!(reg.process("1|a1|a|X|B|notaprice|1").is_err());
        assert_eq!(reg.book_count(), 0);
    }

    #[test]
    fn unknown_order_update_and_cancel_are_errors() {
        let mut reg = BookRegistry::new();
        assert!(reg.process("1|ghost|u|5").is_err());
        assert!(reg.process("1|ghost|c").is_err());
    }

    #[test]
    fn duplicate_order_id_across_tickers_is_rejected() {
        let mut reg = BookRegistry::new();
        reg.process("1|a1|a|X|B|10|1").unwrap();
        let err = reg.process("1|a1|a|Y|S|20|1").unwrap_err();
        assert_eq!(err, EngineError::DuplicateOrder("a1".to_string()));
    }

    #[test]
    fn snapshot_is_ticker_sorted() {
        let mut reg = BookRegistry::new();
        reg.process("1|a1|a|ZZZ|B|10|1").unwrap();
        reg.process("1|a2|a|AAA|B|10|1").unwrap();
        let rows = reg.snapshot();
        let tickers: Vec<String> = rows.iter().filter_map(|r| r.ticker.clone()).collect();
        assert_eq!(tickers, vec!["AAA".to_string(), "ZZZ".to_string()]);
    }

    #[test]
    fn add_cancel_round_trip_empties_registry() {
        let mut reg = BookRegistry::new();
        let records = [
            "1|a1|a|X|B|10|5",
            "1|a2|a|X|S|12|5",
            "1|a3|a|X|B|9|3",
        ];
        for r in records {
            reg.process(r).unwrap();
        }
        for id in ["a1", "a2", "a3"] {
            reg.process(&format!("1|{}|c", id)).unwrap();
        }
        assert_eq!(reg.book_count(), 0);
    }
}
