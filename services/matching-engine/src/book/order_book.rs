//! Per-asset two-sided order book
//!
//! Placement, matching, cancel, and liquidity bookkeeping. The book
//! exclusively owns its orders and price levels; matching returns the
//! resulting [`Trade`] events for the engine to consume, so the data
//! structure stays free of side effects.

use std::collections::HashMap;
use types::errors::BookError;
use types::ids::OrderId;
use types::numeric::Price;
use types::order::{Order, OrderType, Side};
use types::trade::{Trade, TradeParty};

use super::ask_book::AskBook;
use super::bid_book::BidBook;

/// One asset's order book
#[derive(Debug, Default)]
pub struct OrderBook {
    bids: BidBook,
    asks: AskBook,

    /// Where each resting order sits, for O(log N) cancels
    index: HashMap<OrderId, (Side, Price)>,

    // Liquidity bookkeeping. After any public operation each counter
    // equals the corresponding sum/count over its side's residents.
    n_buy_orders: u64,
    n_sell_orders: u64,
    buy_quantity: u64,
    sell_quantity: u64,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a new order
    ///
    /// The caller must have stamped `exch_timestamp` already. Limit
    /// orders rest at their price and any crossing is matched away;
    /// market orders sweep the opposite side and never rest.
    pub fn place(&mut self, order: Order) -> Result<Vec<Trade>, BookError> {
        match order.order_type {
            OrderType::Limit => self.place_limit(order),
            OrderType::Market => self.sweep_market(order),
        }
    }

    /// Detach a resting order by id
    ///
    /// Counters are adjusted by the order's remaining quantity; the
    /// filled portion already traded and stands.
    pub fn cancel(&mut self, order_id: OrderId) -> Result<Order, BookError> {
        let (side, price) = self
            .index
            .remove(&order_id)
            .ok_or(BookError::UnknownOrder(order_id))?;

        let order = match side {
            Side::Buy => self.bids.remove_order(&order_id, price),
            Side::Sell => self.asks.remove_order(&order_id, price),
        }
        .ok_or(BookError::UnknownOrder(order_id))?;

        match side {
            Side::Buy => {
                self.n_buy_orders -= 1;
                self.buy_quantity -= order.remaining_qty;
            }
            Side::Sell => {
                self.n_sell_orders -= 1;
                self.sell_quantity -= order.remaining_qty;
            }
        }
        Ok(order)
    }

    /// Rest a limit order at its price level, then match away any cross.
    ///
    /// No pre-match against the opposite side: the order is inserted
    /// first, so during matching the aggressor is simply the latest
    /// arrival sitting at a crossing level.
    fn place_limit(&mut self, order: Order) -> Result<Vec<Trade>, BookError> {
        let price =
            Price::from_f64(order.limit_price).ok_or(BookError::InvalidPrice(order.limit_price))?;

        self.index.insert(order.id, (order.side, price));
        match order.side {
            Side::Buy => {
                self.n_buy_orders += 1;
                self.buy_quantity += order.remaining_qty;
                self.bids.insert(price, order);
            }
            Side::Sell => {
                self.n_sell_orders += 1;
                self.sell_quantity += order.remaining_qty;
                self.asks.insert(price, order);
            }
        }

        Ok(self.match_crossing())
    }

    /// Consume top-of-book levels while bid and ask cross
    ///
    /// Within the crossing pair of levels, orders match FIFO. The order
    /// with the later exchange timestamp is the taker, and the match
    /// prints at the maker's resting level price.
    fn match_crossing(&mut self) -> Vec<Trade> {
        let mut trades = Vec::new();

        loop {
            let (bid_price, ask_price) = match (self.bids.best_price(), self.asks.best_price()) {
                (Some(bid), Some(ask)) if bid >= ask => (bid, ask),
                _ => break,
            };

            let Some((_, bid_level)) = self.bids.best_level_mut() else {
                break;
            };
            let Some((_, ask_level)) = self.asks.best_level_mut() else {
                break;
            };

            loop {
                let Some(bid_front) = bid_level.front_mut() else {
                    break;
                };
                let Some(ask_front) = ask_level.front_mut() else {
                    break;
                };

                let quantity = bid_front.remaining_qty.min(ask_front.remaining_qty);
                bid_front.fill(quantity);
                ask_front.fill(quantity);

                // The later arrival aggressed; the earlier order was
                // already resting, so it makes and sets the price.
                let trade = if ask_front.exch_timestamp > bid_front.exch_timestamp {
                    Trade::new(
                        TradeParty::from_order(ask_front),
                        TradeParty::from_order(bid_front),
                        bid_price,
                        quantity,
                        ask_front.exch_timestamp,
                    )
                } else {
                    Trade::new(
                        TradeParty::from_order(bid_front),
                        TradeParty::from_order(ask_front),
                        ask_price,
                        quantity,
                        bid_front.exch_timestamp,
                    )
                };

                let bid_done = bid_front.is_filled();
                let ask_done = ask_front.is_filled();
                trades.push(trade);

                self.buy_quantity -= quantity;
                self.sell_quantity -= quantity;

                if bid_done {
                    if let Some(done) = bid_level.pop_front() {
                        self.index.remove(&done.id);
                        self.n_buy_orders -= 1;
                    }
                }
                if ask_done {
                    if let Some(done) = ask_level.pop_front() {
                        self.index.remove(&done.id);
                        self.n_sell_orders -= 1;
                    }
                }
            }

            let bid_emptied = bid_level.is_empty();
            let ask_emptied = ask_level.is_empty();
            if bid_emptied {
                self.bids.remove_level(&bid_price);
            }
            if ask_emptied {
                self.asks.remove_level(&ask_price);
            }
        }

        trades
    }

    /// Sweep the opposite side with a market order
    ///
    /// Fails up front with `NotEnoughLiquidity` (book untouched) when
    /// the opposite side cannot cover the full quantity; market orders
    /// never partially execute.
    fn sweep_market(&mut self, mut order: Order) -> Result<Vec<Trade>, BookError> {
        let available = match order.side {
            Side::Buy => self.sell_quantity,
            Side::Sell => self.buy_quantity,
        };
        if available < order.total_qty {
            return Err(BookError::NotEnoughLiquidity);
        }

        let mut trades = Vec::new();
        let mut lifted_orders = 0u64;

        while order.remaining_qty > 0 {
            // Best level of the opposite side; exhaustion here would
            // contradict the precondition, but fail closed regardless.
            let (price, level) = match order.side {
                Side::Buy => match self.asks.best_level_mut() {
                    Some(best) => best,
                    None => return Err(BookError::NotEnoughLiquidity),
                },
                Side::Sell => match self.bids.best_level_mut() {
                    Some(best) => best,
                    None => return Err(BookError::NotEnoughLiquidity),
                },
            };

            loop {
                let Some(resting) = level.front_mut() else {
                    break;
                };

                let quantity = order.remaining_qty.min(resting.remaining_qty);
                order.fill(quantity);
                resting.fill(quantity);

                trades.push(Trade::new(
                    TradeParty::from_order(&order),
                    TradeParty::from_order(resting),
                    price,
                    quantity,
                    order.exch_timestamp,
                ));

                if resting.is_filled() {
                    if let Some(done) = level.pop_front() {
                        self.index.remove(&done.id);
                    }
                    lifted_orders += 1;
                }
                if order.remaining_qty == 0 {
                    break;
                }
            }

            let depleted = level.is_empty();
            if depleted {
                match order.side {
                    Side::Buy => self.asks.remove_level(&price),
                    Side::Sell => self.bids.remove_level(&price),
                }
            }
        }

        match order.side {
            Side::Buy => {
                self.sell_quantity -= order.total_qty;
                self.n_sell_orders -= lifted_orders;
            }
            Side::Sell => {
                self.buy_quantity -= order.total_qty;
                self.n_buy_orders -= lifted_orders;
            }
        }

        Ok(trades)
    }

    /// The best (highest) resting bid price
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best_price()
    }

    /// The best (lowest) resting ask price
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best_price()
    }

    pub fn n_buy_orders(&self) -> u64 {
        self.n_buy_orders
    }

    pub fn n_sell_orders(&self) -> u64 {
        self.n_sell_orders
    }

    pub fn buy_quantity(&self) -> u64 {
        self.buy_quantity
    }

    pub fn sell_quantity(&self) -> u64 {
        self.sell_quantity
    }

    /// Bid levels best-first
    pub fn bids(&self) -> impl Iterator<Item = (Price, &super::PriceLevel)> {
        self.bids.levels()
    }

    /// Ask levels best-first
    pub fn asks(&self) -> impl Iterator<Item = (Price, &super::PriceLevel)> {
        self.asks.levels()
    }

    /// Whether an order is currently resting
    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.index.contains_key(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::OrderId;
    use types::order::{AssetType, Ticker};

    fn place_limit_at(book: &mut OrderBook, side: Side, price: f64, qty: u64, ts: i64) -> OrderId {
        let mut order = Order::new(
            OrderId::new(),
            AssetType::Equities,
            OrderType::Limit,
            Ticker::new("AAPL"),
            side,
            price,
            qty,
            ts,
            "test".to_string(),
        );
        order.exch_timestamp = ts;
        let id = order.id;
        book.place(order).unwrap();
        id
    }

    fn market(side: Side, qty: u64, ts: i64) -> Order {
        let mut order = Order::new(
            OrderId::new(),
            AssetType::Equities,
            OrderType::Market,
            Ticker::new("AAPL"),
            side,
            0.0,
            qty,
            ts,
            "test".to_string(),
        );
        order.exch_timestamp = ts;
        order
    }

    fn assert_counters_consistent(book: &OrderBook) {
        let bid_sum: u64 = book.bids().map(|(_, l)| l.resting_quantity()).sum();
        let ask_sum: u64 = book.asks().map(|(_, l)| l.resting_quantity()).sum();
        let bid_count: u64 = book.bids().map(|(_, l)| l.order_count() as u64).sum();
        let ask_count: u64 = book.asks().map(|(_, l)| l.order_count() as u64).sum();

        assert_eq!(book.buy_quantity(), bid_sum);
        assert_eq!(book.sell_quantity(), ask_sum);
        assert_eq!(book.n_buy_orders(), bid_count);
        assert_eq!(book.n_sell_orders(), ask_count);

        for (_, level) in book.bids() {
            assert!(!level.is_empty(), "empty bid level left behind");
        }
        for (_, level) in book.asks() {
            assert!(!level.is_empty(), "empty ask level left behind");
        }
        if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
            assert!(bid < ask, "book left crossed: {bid} >= {ask}");
        }
    }

    #[test]
    fn test_limit_rests_and_counts() {
        let mut book = OrderBook::new();
        place_limit_at(&mut book, Side::Buy, 99.0, 100, 1);
        place_limit_at(&mut book, Side::Sell, 100.0, 50, 2);

        assert_eq!(book.best_bid(), Some(Price::from_u64(99)));
        assert_eq!(book.best_ask(), Some(Price::from_u64(100)));
        assert_eq!(book.buy_quantity(), 100);
        assert_eq!(book.sell_quantity(), 50);
        assert_counters_consistent(&book);
    }

    #[test]
    fn test_invalid_limit_price_rejected() {
        let mut book = OrderBook::new();
        let order = Order::new(
            OrderId::new(),
            AssetType::Equities,
            OrderType::Limit,
            Ticker::new("AAPL"),
            Side::Buy,
            -5.0,
            100,
            1,
            "test".to_string(),
        );
        assert_eq!(book.place(order), Err(BookError::InvalidPrice(-5.0)));
        assert_eq!(book.n_buy_orders(), 0);
    }

    #[test]
    fn test_crossing_limit_matches_at_maker_price() {
        let mut book = OrderBook::new();
        place_limit_at(&mut book, Side::Sell, 100.0, 100, 1);
        let mut taker = Order::new(
            OrderId::new(),
            AssetType::Equities,
            OrderType::Limit,
            Ticker::new("AAPL"),
            Side::Buy,
            101.0,
            60,
            2,
            "buyer".to_string(),
        );
        taker.exch_timestamp = 2;
        let taker_id = taker.id;

        let trades = book.place(taker).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, Price::from_u64(100));
        assert_eq!(trades[0].quantity, 60);
        assert_eq!(trades[0].taker.order_id, taker_id);
        assert_eq!(trades[0].taker.side, Side::Buy);
        assert_eq!(trades[0].maker.side, Side::Sell);

        // Taker fully filled; 40 remain on the resting sell.
        assert_eq!(book.n_buy_orders(), 0);
        assert_eq!(book.sell_quantity(), 40);
        assert!(!book.contains(&taker_id));
        assert_counters_consistent(&book);
    }

    #[test]
    fn test_market_insufficient_liquidity_leaves_book_untouched() {
        let mut book = OrderBook::new();
        place_limit_at(&mut book, Side::Sell, 100.0, 10, 1);

        let err = book.place(market(Side::Buy, 11, 2)).unwrap_err();
        assert_eq!(err, BookError::NotEnoughLiquidity);
        assert_eq!(book.sell_quantity(), 10);
        assert_eq!(book.n_sell_orders(), 1);
        assert_counters_consistent(&book);
    }

    #[test]
    fn test_market_sweep_bookkeeping() {
        let mut book = OrderBook::new();
        place_limit_at(&mut book, Side::Sell, 100.0, 10, 1);
        place_limit_at(&mut book, Side::Sell, 101.0, 10, 2);

        let trades = book.place(market(Side::Buy, 15, 3)).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].price, Price::from_u64(100));
        assert_eq!(trades[1].price, Price::from_u64(101));
        assert_eq!(trades[1].quantity, 5);

        assert_eq!(book.sell_quantity(), 5);
        assert_eq!(book.n_sell_orders(), 1);
        assert_counters_consistent(&book);
    }

    #[test]
    fn test_cancel_unknown_order() {
        let mut book = OrderBook::new();
        let id = OrderId::new();
        assert_eq!(book.cancel(id), Err(BookError::UnknownOrder(id)));
    }

    #[test]
    fn test_cancel_adjusts_counters() {
        let mut book = OrderBook::new();
        let id = place_limit_at(&mut book, Side::Buy, 99.0, 50, 1);
        place_limit_at(&mut book, Side::Buy, 99.0, 30, 2);

        let cancelled = book.cancel(id).unwrap();
        assert_eq!(cancelled.remaining_qty, 50);
        assert_eq!(book.buy_quantity(), 30);
        assert_eq!(book.n_buy_orders(), 1);
        assert_counters_consistent(&book);

        // No post-cancel resurrection.
        assert_eq!(book.cancel(id), Err(BookError::UnknownOrder(id)));
    }

    #[test]
    fn test_cancel_partially_filled_order() {
        let mut book = OrderBook::new();
        let resting = place_limit_at(&mut book, Side::Sell, 100.0, 90, 1);
        place_limit_at(&mut book, Side::Buy, 100.0, 20, 2);

        // 20 traded; cancel detaches the remaining 70.
        let cancelled = book.cancel(resting).unwrap();
        assert_eq!(cancelled.remaining_qty, 70);
        assert_eq!(cancelled.total_qty, 90);
        assert_eq!(book.sell_quantity(), 0);
        assert_counters_consistent(&book);
    }

    #[test]
    fn test_filled_orders_leave_cancel_index() {
        let mut book = OrderBook::new();
        let maker = place_limit_at(&mut book, Side::Sell, 100.0, 50, 1);
        place_limit_at(&mut book, Side::Buy, 100.0, 50, 2);

        assert!(!book.contains(&maker));
        assert_eq!(book.cancel(maker), Err(BookError::UnknownOrder(maker)));
    }
}
