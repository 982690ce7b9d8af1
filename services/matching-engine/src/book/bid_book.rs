//! Bid (buy-side) levels
//!
//! Buy levels keyed by price in a `BTreeMap`; the best bid is the
//! highest key, so `next_back()` is top of book.

use std::collections::BTreeMap;
use types::ids::OrderId;
use types::numeric::Price;
use types::order::Order;

use super::price_level::PriceLevel;

#[derive(Debug, Clone, Default)]
pub struct BidBook {
    levels: BTreeMap<Price, PriceLevel>,
}

impl BidBook {
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Rest an order at its price level, creating the level if absent
    pub fn insert(&mut self, price: Price, order: Order) {
        self.levels.entry(price).or_default().push(order);
    }

    /// The best (highest) bid price
    pub fn best_price(&self) -> Option<Price> {
        self.levels.keys().next_back().copied()
    }

    /// Mutable access to the best bid level
    pub fn best_level_mut(&mut self) -> Option<(Price, &mut PriceLevel)> {
        self.levels.iter_mut().next_back().map(|(price, level)| (*price, level))
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

    /// Levels best-first (price descending)
    pub fn levels(&self) -> impl Iterator<Item = (Price, &PriceLevel)> {
        self.levels.iter().rev().map(|(price, level)| (*price, level))
    }
}
