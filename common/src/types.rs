// Core type definitions shared by the order book engine and its CLI.

use rust_decimal::Decimal;

/// Unique identity of a resting order, process-wide while it rests.
pub type OrderId = String;

/// Identifier for a tradable instrument.
pub type Ticker = String;

/// Exact decimal price. `rust_decimal::Decimal` gives base-10 fixed-point
/// arithmetic with exact equality and ordering, so price comparisons never
/// suffer binary-float rounding.
pub type Price = Decimal;

/// A non-negative order quantity.
pub type Size = u64;

/// Which side of the book an order rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Returns the opposite side.
    #[inline]
    pub fn opposite(&self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    /// Parses the wire encoding used by add records (`B` / `S`).
    pub fn from_wire(code: &str) -> Option<Side> {
        match code {
            "B" => Some(Side::Bid),
            "S" => Some(Side::Ask),
            _ => None,
        }
    }

    /// Returns `true` for the buy side.
    #[inline]
    pub fn is_bid(&self) -> bool {
        matches!(self, Side::Bid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Bid.opposite(), Side::Ask);
        assert_eq!(Side::Ask.opposite(), Side::Bid);
    }

    #[test]
    fn test_side_from_wire() {
        assert_eq!(Side::from_wire("B"), Some(Side::Bid));
        assert_eq!(Side::from_wire("S"), Some(Side::Ask));
        assert_eq!(Side::from_wire("X"), None);
    }

    #[test]
    fn test_side_is_bid() {
        assert!(Side::Bid.is_bid());
        assert!(!Side::Ask.is_bid());
    }
}
