//! Trade types
//!
//! A trade carries owned snapshots of both parties taken at the moment
//! of the match; nothing here references book state after matching
//! returns.

use crate::ids::OrderId;
use crate::numeric::Price;
use crate::order::{AssetType, Order, Side, Ticker};
use serde::{Deserialize, Serialize};

/// Snapshot of one side of a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeParty {
    pub order_id: OrderId,
    pub owner: String,
    pub side: Side,
    pub ticker: Ticker,
    pub asset: AssetType,
}

impl TradeParty {
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id,
            owner: order.owner.clone(),
            side: order.side,
            ticker: order.ticker,
            asset: order.asset,
        }
    }
}

/// A successful match between an aggressing order and resting liquidity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// The order whose arrival triggered the match
    pub taker: TradeParty,
    /// The order that was already resting
    pub maker: TradeParty,
    /// Match price: the maker's resting level price
    pub price: Price,
    pub quantity: u64,
    /// Unix ns; the taker's exchange timestamp
    pub executed_at: i64,
}

impl Trade {
    pub fn new(taker: TradeParty, maker: TradeParty, price: Price, quantity: u64, executed_at: i64) -> Self {
        Self {
            taker,
            maker,
            price,
            quantity,
            executed_at,
        }
    }

    /// The two per-party views of this trade, taker-addressed first.
    ///
    /// Each counterparty receives a structurally identical report with
    /// its own side/ticker/id in the party slot and the other owner in
    /// the counterparty slot.
    pub fn reports(&self) -> (TradeReport, TradeReport) {
        (
            TradeReport::addressed_to(&self.taker, &self.maker, self),
            TradeReport::addressed_to(&self.maker, &self.taker, self),
        )
    }
}

/// One party's view of an executed trade, ready for the reporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeReport {
    /// Who this report is addressed to
    pub owner: String,
    /// The other participant's owner
    pub counterparty: String,
    pub asset: AssetType,
    pub side: Side,
    pub ticker: Ticker,
    pub order_id: OrderId,
    pub price: Price,
    pub quantity: u64,
    /// Unix ns
    pub executed_at: i64,
}

impl TradeReport {
    fn addressed_to(party: &TradeParty, counterparty: &TradeParty, trade: &Trade) -> Self {
        Self {
            owner: party.owner.clone(),
            counterparty: counterparty.owner.clone(),
            asset: counterparty.asset,
            side: party.side,
            ticker: party.ticker,
            order_id: party.order_id,
            price: trade.price,
            quantity: trade.quantity,
            executed_at: trade.executed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderType;

    fn order_for(owner: &str, side: Side) -> Order {
        Order::new(
            OrderId::new(),
            AssetType::Equities,
            OrderType::Limit,
            Ticker::new("AAPL"),
            side,
            100.0,
            10,
            1,
            owner.to_string(),
        )
    }

    #[test]
    fn test_trade_reports_address_both_parties() {
        let taker = order_for("alice", Side::Buy);
        let maker = order_for("bob", Side::Sell);
        let trade = Trade::new(
            TradeParty::from_order(&taker),
            TradeParty::from_order(&maker),
            Price::from_u64(100),
            10,
            42,
        );

        let (to_taker, to_maker) = trade.reports();

        assert_eq!(to_taker.owner, "alice");
        assert_eq!(to_taker.counterparty, "bob");
        assert_eq!(to_taker.side, Side::Buy);
        assert_eq!(to_taker.order_id, taker.id);

        assert_eq!(to_maker.owner, "bob");
        assert_eq!(to_maker.counterparty, "alice");
        assert_eq!(to_maker.side, Side::Sell);
        assert_eq!(to_maker.order_id, maker.id);

        assert_eq!(to_taker.price, to_maker.price);
        assert_eq!(to_taker.quantity, to_maker.quantity);
    }
}
