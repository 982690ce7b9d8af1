//! Ask (sell-side) levels
//!
//! Sell levels keyed by price in a `BTreeMap`; the best ask is the
//! lowest key, so `next()` is top of book.

use std::collections::BTreeMap;
use types::ids::OrderId;
use types::numeric::Price;
use types::order::Order;

use super::price_level::PriceLevel;

#[derive(Debug, Clone, Default)]
pub struct AskBook {
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskBook {
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Rest an order at its price level, creating the level if absent
    pub fn insert(&mut self, price: Price, order: Order) {
        self.levels.entry(price).or_default().push(order);
    }

    /// The best (lowest) ask price
    pub fn best_price(&self) -> Option<Price> {
        self.levels.keys().next().copied()
    }

    /// Mutable access to the best ask level
    pub fn best_level_mut(&mut self) -> Option<(Price, &mut PriceLevel)> {
        self.levels.iter_mut().next().map(|(price, level)| (*price, level))
    }

    /// Drop a level outright; used once a level is empty
    pub fn remove_level(&mut self, price: &Price) {
        self.levels.remove(price);
    }

    /// Detach one order, dropping its level if it empties
    pub fn remove_order(&mut self, order_id: &OrderId, price: Price) -> Option<Order> {
        let level = self.levels.get_mut(&price)?;
        let order = level.remove(order_id)?;
        if level.is_empty() {
            self.levels.remove(&price);
        }
        Some(order)
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Levels best-first (price ascending)
    pub fn levels(&self) -> impl Iterator<Item = (Price, &PriceLevel)> {
        self.levels.iter().map(|(price, level)| (*price, level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::order::{AssetType, OrderType, Side, Ticker};

    fn order(qty: u64) -> Order {
        Order::new(
            OrderId::new(),
            AssetType::Equities,
            OrderType::Limit,
            Ticker::new("AAPL"),
            Side::Sell,
            100.0,
            qty,
            1,
            "bob".to_string(),
        )
    }

    #[test]
    fn test_ask_book_best_is_lowest() {
        let mut book = AskBook::new();
        book.insert(Price::from_u64(101), order(10));
        book.insert(Price::from_u64(99), order(20));
        book.insert(Price::from_u64(100), order(30));

        assert_eq!(book.best_price(), Some(Price::from_u64(99)));
        let (price, level) = book.best_level_mut().unwrap();
        assert_eq!(price, Price::from_u64(99));
        assert_eq!(level.resting_quantity(), 20);
    }

    #[test]
    fn test_ask_book_levels_ascending() {
        let mut book = AskBook::new();
        book.insert(Price::from_u64(101), order(10));
        book.insert(Price::from_u64(99), order(20));
        book.insert(Price::from_u64(100), order(30));

        let prices: Vec<Price> = book.levels().map(|(p, _)| p).collect();
        assert_eq!(
            prices,
            vec![Price::from_u64(99), Price::from_u64(100), Price::from_u64(101)]
        );
    }

    #[test]
    fn test_ask_book_remove_order_drops_empty_level() {
        let mut book = AskBook::new();
        let resting = order(10);
        let id = resting.id;
        book.insert(Price::from_u64(101), resting);

        assert!(book.remove_order(&id, Price::from_u64(101)).is_some());
        assert!(book.is_empty());
    }
}
