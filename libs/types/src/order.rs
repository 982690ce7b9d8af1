//! Order lifecycle types
//!
//! The order is the unit of intent: decoded from a NewOrder frame,
//! stamped by the engine, then matched, rested, or rejected.

use crate::ids::OrderId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Wire encoding: 0 = buy, 1 = sell
    pub fn wire_value(&self) -> u8 {
        match self {
            Side::Buy => 0,
            Side::Sell => 1,
        }
    }

    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Side::Buy),
            1 => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// An order to buy or sell at a specified price or better; may rest
    /// on the book until filled.
    Limit,
    /// An instruction to trade immediately at the best available price;
    /// never rests.
    Market,
}

impl OrderType {
    /// Wire encoding: 0 = limit, 1 = market
    pub fn wire_value(&self) -> u16 {
        match self {
            OrderType::Limit => 0,
            OrderType::Market => 1,
        }
    }

    pub fn from_wire(value: u16) -> Option<Self> {
        match value {
            0 => Some(OrderType::Limit),
            1 => Some(OrderType::Market),
            _ => None,
        }
    }
}

/// Asset class an order trades in; each class gets its own book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetType {
    Equities,
}

impl AssetType {
    /// Wire encoding: 0 = equities
    pub fn wire_value(&self) -> u16 {
        match self {
            AssetType::Equities => 0,
        }
    }

    pub fn from_wire(value: u16) -> Option<Self> {
        match value {
            0 => Some(AssetType::Equities),
            _ => None,
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetType::Equities => write!(f, "equities"),
        }
    }
}

/// Ticker symbol, exactly 4 bytes on the wire
///
/// Shorter symbols are right-padded with NULs; readers trim the padding
/// for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticker([u8; 4]);

impl Ticker {
    /// Build a ticker from a symbol string, truncating past 4 bytes and
    /// NUL-padding anything shorter.
    pub fn new(symbol: &str) -> Self {
        let mut bytes = [0u8; 4];
        let src = symbol.as_bytes();
        let n = src.len().min(4);
        bytes[..n].copy_from_slice(&src[..n]);
        Self(bytes)
    }

    /// Reconstruct from the 4 wire bytes
    pub fn from_wire(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// The padded 4-byte wire form
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// The symbol with trailing NUL padding trimmed
    pub fn as_str(&self) -> &str {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(4);
        std::str::from_utf8(&self.0[..end]).unwrap_or("")
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Ticker {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Ticker {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Ticker::new(&s))
    }
}

/// Complete order structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub asset: AssetType,
    pub order_type: OrderType,
    pub ticker: Ticker,
    pub side: Side,
    /// Limiting price as it arrived on the wire. Only meaningful for
    /// limit orders; validated when the order reaches a book.
    pub limit_price: f64,
    /// Remaining quantity
    pub remaining_qty: u64,
    /// Total volume requested
    pub total_qty: u64,
    /// Time of arrival at the session layer (unix ns)
    pub timestamp: i64,
    /// Time of arrival into the book (unix ns), assigned by the engine.
    /// Strictly monotonic per engine, so it totally orders placements.
    pub exch_timestamp: i64,
    /// Who owns this order
    pub owner: String,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: OrderId,
        asset: AssetType,
        order_type: OrderType,
        ticker: Ticker,
        side: Side,
        limit_price: f64,
        quantity: u64,
        timestamp: i64,
        owner: String,
    ) -> Self {
        Self {
            id,
            asset,
            order_type,
            ticker,
            side,
            limit_price,
            remaining_qty: quantity,
            total_qty: quantity,
            timestamp,
            exch_timestamp: 0,
            owner,
        }
    }

    /// Consume quantity from this order
    ///
    /// # Panics
    /// Panics in debug builds if the fill exceeds the remaining quantity.
    pub fn fill(&mut self, quantity: u64) {
        debug_assert!(quantity <= self.remaining_qty, "fill exceeds remaining quantity");
        self.remaining_qty -= quantity;
    }

    /// Check if the order is completely filled
    pub fn is_filled(&self) -> bool {
        self.remaining_qty == 0
    }

    /// Quantity filled so far
    pub fn filled_qty(&self) -> u64 {
        self.total_qty - self.remaining_qty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_order(side: Side, qty: u64) -> Order {
        Order::new(
            OrderId::new(),
            AssetType::Equities,
            OrderType::Limit,
            Ticker::new("AAPL"),
            side,
            100.0,
            qty,
            1,
            "alice".to_string(),
        )
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn test_side_wire_encoding() {
        assert_eq!(Side::from_wire(0), Some(Side::Buy));
        assert_eq!(Side::from_wire(1), Some(Side::Sell));
        assert_eq!(Side::from_wire(2), None);
        assert_eq!(Side::Buy.wire_value(), 0);
        assert_eq!(Side::Sell.wire_value(), 1);
    }

    #[test]
    fn test_order_type_wire_encoding() {
        assert_eq!(OrderType::from_wire(0), Some(OrderType::Limit));
        assert_eq!(OrderType::from_wire(1), Some(OrderType::Market));
        assert_eq!(OrderType::from_wire(9), None);
    }

    #[test]
    fn test_ticker_padding() {
        let ticker = Ticker::new("GE");
        assert_eq!(ticker.as_bytes(), &[b'G', b'E', 0, 0]);
        assert_eq!(ticker.as_str(), "GE");
    }

    #[test]
    fn test_ticker_truncates_long_symbol() {
        let ticker = Ticker::new("GOOGL");
        assert_eq!(ticker.as_str(), "GOOG");
    }

    #[test]
    fn test_order_fill() {
        let mut order = test_order(Side::Buy, 100);
        order.fill(30);
        assert_eq!(order.remaining_qty, 70);
        assert_eq!(order.filled_qty(), 30);
        assert!(!order.is_filled());

        order.fill(70);
        assert!(order.is_filled());
    }

    #[test]
    fn test_order_serialization() {
        let order = test_order(Side::Sell, 50);
        let json = serde_json::to_string(&order).unwrap();
        let deserialized: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, deserialized);
    }
}
