//! Matching engine core
//!
//! Owns the per-asset books, stamps exchange timestamps, keeps the
//! in-memory trade log, and fans execution reports out through the
//! [`Reporter`]. A single dispatcher drives all mutation, so nothing
//! here needs locking.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use types::errors::{EngineError, ReportError};
use types::ids::OrderId;
use types::order::{AssetType, Order};
use types::trade::Trade;

use crate::book::OrderBook;
use crate::reporter::Reporter;

/// Source of exchange timestamps
///
/// Wall-clock ns, bumped by one whenever the clock fails to advance, so
/// timestamps are strictly monotonic and totally order placements.
#[derive(Debug, Default)]
struct ExchangeClock {
    last: i64,
}

impl ExchangeClock {
    fn now(&mut self) -> i64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0);
        self.last = wall.max(self.last + 1);
        self.last
    }
}

/// Main matching engine
pub struct Engine<R> {
    /// Order books per asset class
    books: HashMap<AssetType, OrderBook>,
    reporter: R,
    /// Every trade this engine has matched, in execution order
    trades: Vec<Trade>,
    clock: ExchangeClock,
}

impl<R: Reporter> Engine<R> {
    /// Create an engine with one book per supported asset
    pub fn new(reporter: R, assets: impl IntoIterator<Item = AssetType>) -> Self {
        Self {
            books: assets.into_iter().map(|asset| (asset, OrderBook::new())).collect(),
            reporter,
            trades: Vec::new(),
            clock: ExchangeClock::default(),
        }
    }

    /// Place an order on the asset's book and report resulting trades
    ///
    /// Report delivery failures do not abort matching: every trade the
    /// book produced is dispatched and logged, and the joined failures
    /// come back as `EngineError::Report`. The placement itself stands.
    pub async fn place_order(&mut self, asset: AssetType, mut order: Order) -> Result<(), EngineError> {
        order.exch_timestamp = self.clock.now();
        debug!(
            order_id = %order.id,
            %asset,
            side = %order.side,
            ticker = %order.ticker,
            quantity = order.total_qty,
            owner = %order.owner,
            "placing order"
        );

        let book = self.books.get_mut(&asset).ok_or(EngineError::BookNotFound(asset))?;
        let trades = book.place(order)?;

        let mut failures = Vec::new();
        for trade in trades {
            if let Err(err) = self.do_trade(trade).await {
                failures.push(err.to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Report(failures.join("; ")))
        }
    }

    /// Cancel a resting order
    pub fn cancel_order(&mut self, asset: AssetType, order_id: OrderId) -> Result<Order, EngineError> {
        let book = self.books.get_mut(&asset).ok_or(EngineError::BookNotFound(asset))?;
        let order = book.cancel(order_id)?;
        info!(%order_id, %asset, remaining = order.remaining_qty, "order cancelled");
        Ok(order)
    }

    /// Record a trade and report it to both counterparties
    async fn do_trade(&mut self, trade: Trade) -> Result<(), ReportError> {
        let (to_taker, to_maker) = trade.reports();
        info!(
            taker = %trade.taker.owner,
            maker = %trade.maker.owner,
            price = %trade.price,
            quantity = trade.quantity,
            "trade executed"
        );

        let taker_result = self.reporter.report_trade(&to_taker).await;
        let maker_result = self.reporter.report_trade(&to_maker).await;
        self.trades.push(trade);

        match (taker_result, maker_result) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(err), Ok(())) | (Ok(()), Err(err)) => Err(err),
            (Err(taker_err), Err(maker_err)) => {
                warn!(%maker_err, "maker report also failed");
                Err(taker_err)
            }
        }
    }

    /// Enumerate both sides of every book for diagnostic output
    pub fn log_book(&self) {
        for (asset, book) in &self.books {
            info!(
                %asset,
                n_buy_orders = book.n_buy_orders(),
                n_sell_orders = book.n_sell_orders(),
                buy_quantity = book.buy_quantity(),
                sell_quantity = book.sell_quantity(),
                "book state"
            );
            for (price, level) in book.bids() {
                for order in level.orders() {
                    info!(
                        side = "bid",
                        %price,
                        order_id = %order.id,
                        remaining = order.remaining_qty,
                        total = order.total_qty,
                        owner = %order.owner,
                        "resting order"
                    );
                }
            }
            for (price, level) in book.asks() {
                for order in level.orders() {
                    info!(
                        side = "ask",
                        %price,
                        order_id = %order.id,
                        remaining = order.remaining_qty,
                        total = order.total_qty,
                        owner = %order.owner,
                        "resting order"
                    );
                }
            }
        }
    }

    /// The book for one asset, if supported
    pub fn book(&self, asset: AssetType) -> Option<&OrderBook> {
        self.books.get(&asset)
    }

    /// Every trade matched so far, in execution order
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use types::errors::BookError;
    use types::order::{OrderType, Side, Ticker};
    use types::trade::TradeReport;

    /// Captures reports instead of writing to sockets
    #[derive(Default)]
    struct RecordingReporter {
        trades: Mutex<Vec<TradeReport>>,
        fail: bool,
    }

    impl Reporter for &RecordingReporter {
        async fn report_trade(&self, report: &TradeReport) -> Result<(), ReportError> {
            self.trades.lock().unwrap().push(report.clone());
            if self.fail {
                Err(ReportError::ClientDoesNotExist(report.owner.clone()))
            } else {
                Ok(())
            }
        }

        async fn report_order_placed(&self, _owner: &str, _order: &Order) -> Result<(), ReportError> {
            Ok(())
        }

        async fn report_error(&self, _owner: &str, _error: &EngineError) -> Result<(), ReportError> {
            Ok(())
        }
    }

    fn limit(owner: &str, side: Side, price: f64, qty: u64) -> Order {
        Order::new(
            OrderId::new(),
            AssetType::Equities,
            OrderType::Limit,
            Ticker::new("AAPL"),
            side,
            price,
            qty,
            1,
            owner.to_string(),
        )
    }

    #[tokio::test]
    async fn test_place_and_match_reports_both_parties() {
        let reporter = RecordingReporter::default();
        let mut engine = Engine::new(&reporter, [AssetType::Equities]);

        engine
            .place_order(AssetType::Equities, limit("maker", Side::Sell, 100.0, 50))
            .await
            .unwrap();
        engine
            .place_order(AssetType::Equities, limit("taker", Side::Buy, 100.0, 50))
            .await
            .unwrap();

        let reports = reporter.trades.lock().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].owner, "taker");
        assert_eq!(reports[0].counterparty, "maker");
        assert_eq!(reports[1].owner, "maker");
        assert_eq!(reports[1].counterparty, "taker");

        assert_eq!(engine.trades().len(), 1);
        assert_eq!(engine.trades()[0].quantity, 50);
    }

    #[tokio::test]
    async fn test_exchange_timestamps_strictly_increase() {
        let reporter = RecordingReporter::default();
        let mut engine = Engine::new(&reporter, [AssetType::Equities]);

        engine
            .place_order(AssetType::Equities, limit("a", Side::Buy, 99.0, 10))
            .await
            .unwrap();
        engine
            .place_order(AssetType::Equities, limit("b", Side::Buy, 99.0, 10))
            .await
            .unwrap();

        let book = engine.book(AssetType::Equities).unwrap();
        let (_, level) = book.bids().next().unwrap();
        let stamps: Vec<i64> = level.orders().map(|o| o.exch_timestamp).collect();
        assert_eq!(stamps.len(), 2);
        assert!(stamps[0] < stamps[1]);
    }

    #[tokio::test]
    async fn test_book_not_found() {
        let reporter = RecordingReporter::default();
        let mut engine = Engine::new(&reporter, []);

        let err = engine
            .place_order(AssetType::Equities, limit("a", Side::Buy, 99.0, 10))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::BookNotFound(AssetType::Equities));

        let err = engine.cancel_order(AssetType::Equities, OrderId::new()).unwrap_err();
        assert_eq!(err, EngineError::BookNotFound(AssetType::Equities));
    }

    #[tokio::test]
    async fn test_cancel_unknown_order() {
        let reporter = RecordingReporter::default();
        let mut engine = Engine::new(&reporter, [AssetType::Equities]);

        let id = OrderId::new();
        let err = engine.cancel_order(AssetType::Equities, id).unwrap_err();
        assert_eq!(err, EngineError::Book(BookError::UnknownOrder(id)));
    }

    #[tokio::test]
    async fn test_report_failures_join_without_aborting() {
        let reporter = RecordingReporter {
            fail: true,
            ..Default::default()
        };
        let mut engine = Engine::new(&reporter, [AssetType::Equities]);

        engine
            .place_order(AssetType::Equities, limit("maker", Side::Sell, 100.0, 50))
            .await
            .unwrap();
        let err = engine
            .place_order(AssetType::Equities, limit("taker", Side::Buy, 100.0, 50))
            .await
            .unwrap_err();

        // Delivery failed, but the trade stands and both parties were tried.
        assert!(matches!(err, EngineError::Report(_)));
        assert_eq!(engine.trades().len(), 1);
        assert_eq!(reporter.trades.lock().unwrap().len(), 2);
    }
}
