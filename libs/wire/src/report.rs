//! Server → client reports
//!
//! Fixed 53-byte header, then the error string, then the counterparty
//! owner. Clients read the header, then exactly
//! `err_str_len + counterparty_len` further bytes.
//!
//! ```text
//! offset size field
//! 0      1    report_type         0=execution, 1=error, 2=order_placed
//! 1      1    asset_type
//! 2      1    side
//! 3      8    timestamp           u64; seconds since epoch (ns for errors)
//! 11     8    quantity            u64
//! 19     8    price               f64 bits
//! 27     2    counterparty_len    u16
//! 29     4    err_str_len         u32
//! 33     4    ticker              NUL right-padded
//! 37     16   order id
//! 53     ..   err string, then counterparty owner
//! ```

use crate::WireError;
use types::ids::OrderId;
use types::order::{AssetType, Order, Side, Ticker};
use types::trade::TradeReport;

/// Length of the fixed report header
pub const REPORT_HEADER_LEN: usize = 1 + 1 + 1 + 8 + 8 + 8 + 2 + 4 + 4 + 16;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Report discriminants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Execution,
    Error,
    OrderPlaced,
}

impl ReportKind {
    pub fn wire_value(&self) -> u8 {
        match self {
            ReportKind::Execution => 0,
            ReportKind::Error => 1,
            ReportKind::OrderPlaced => 2,
        }
    }

    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(ReportKind::Execution),
            1 => Some(ReportKind::Error),
            2 => Some(ReportKind::OrderPlaced),
            _ => None,
        }
    }
}

/// A server → client report frame
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub kind: ReportKind,
    pub asset: AssetType,
    pub side: Side,
    pub timestamp: u64,
    pub quantity: u64,
    pub price: f64,
    pub ticker: Ticker,
    pub order_id: OrderId,
    pub err: String,
    pub counterparty: String,
}

impl Report {
    /// Execution report addressed to one party of a trade
    pub fn execution(trade: &TradeReport) -> Self {
        Self {
            kind: ReportKind::Execution,
            asset: trade.asset,
            side: trade.side,
            timestamp: (trade.executed_at / NANOS_PER_SEC).max(0) as u64,
            quantity: trade.quantity,
            price: trade.price.to_f64(),
            ticker: trade.ticker,
            order_id: trade.order_id,
            err: String::new(),
            counterparty: trade.counterparty.clone(),
        }
    }

    /// Placement acknowledgement carrying the server-assigned order id
    pub fn order_placed(order: &Order, timestamp_secs: u64) -> Self {
        Self {
            kind: ReportKind::OrderPlaced,
            asset: order.asset,
            side: order.side,
            timestamp: timestamp_secs,
            quantity: order.total_qty,
            price: order.limit_price,
            ticker: order.ticker,
            order_id: order.id,
            err: String::new(),
            counterparty: String::new(),
        }
    }

    /// Error report; error reports carry a ns-resolution timestamp
    pub fn rejection(message: &str, timestamp_ns: u64) -> Self {
        Self {
            kind: ReportKind::Error,
            asset: AssetType::Equities,
            side: Side::Buy,
            timestamp: timestamp_ns,
            quantity: 0,
            price: 0.0,
            ticker: Ticker::new(""),
            order_id: OrderId::from_bytes([0u8; 16]),
            err: message.to_string(),
            counterparty: String::new(),
        }
    }

    /// Serialize for the wire
    pub fn serialize(&self) -> Vec<u8> {
        let err = self.err.as_bytes();
        let counterparty = self.counterparty.as_bytes();
        let mut buf = vec![0u8; REPORT_HEADER_LEN + err.len() + counterparty.len()];

        buf[0] = self.kind.wire_value();
        buf[1] = self.asset.wire_value() as u8;
        buf[2] = self.side.wire_value();
        buf[3..11].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[11..19].copy_from_slice(&self.quantity.to_be_bytes());
        buf[19..27].copy_from_slice(&self.price.to_bits().to_be_bytes());
        buf[27..29].copy_from_slice(&(counterparty.len() as u16).to_be_bytes());
        buf[29..33].copy_from_slice(&(err.len() as u32).to_be_bytes());
        buf[33..37].copy_from_slice(self.ticker.as_bytes());
        buf[37..53].copy_from_slice(self.order_id.as_bytes());

        buf[REPORT_HEADER_LEN..REPORT_HEADER_LEN + err.len()].copy_from_slice(err);
        buf[REPORT_HEADER_LEN + err.len()..].copy_from_slice(counterparty);
        buf
    }

    /// Variable-length byte count declared by a report header
    ///
    /// Lets a streaming reader size its second read after pulling the
    /// fixed header off the socket.
    pub fn body_len(header: &[u8]) -> Result<usize, WireError> {
        if header.len() < REPORT_HEADER_LEN {
            return Err(WireError::TooShortForHeader);
        }
        let counterparty_len = u16::from_be_bytes([header[27], header[28]]) as usize;
        let err_len = u32::from_be_bytes([header[29], header[30], header[31], header[32]]) as usize;
        Ok(err_len + counterparty_len)
    }

    /// Decode a full report frame
    pub fn parse(buf: &[u8]) -> Result<Report, WireError> {
        if buf.len() < REPORT_HEADER_LEN {
            return Err(WireError::TooShortForHeader);
        }

        let kind = ReportKind::from_wire(buf[0]).ok_or(WireError::InvalidFieldValue {
            field: "report_type",
            value: buf[0] as u16,
        })?;
        let asset = AssetType::from_wire(buf[1] as u16).ok_or(WireError::InvalidFieldValue {
            field: "asset_type",
            value: buf[1] as u16,
        })?;
        let side = Side::from_wire(buf[2]).ok_or(WireError::InvalidFieldValue {
            field: "side",
            value: buf[2] as u16,
        })?;

        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&buf[3..11]);
        let mut quantity = [0u8; 8];
        quantity.copy_from_slice(&buf[11..19]);
        let mut price_bits = [0u8; 8];
        price_bits.copy_from_slice(&buf[19..27]);

        let counterparty_len = u16::from_be_bytes([buf[27], buf[28]]) as usize;
        let err_len = u32::from_be_bytes([buf[29], buf[30], buf[31], buf[32]]) as usize;

        let mut ticker = [0u8; 4];
        ticker.copy_from_slice(&buf[33..37]);
        let mut id = [0u8; 16];
        id.copy_from_slice(&buf[37..53]);

        if buf.len() < REPORT_HEADER_LEN + err_len + counterparty_len {
            return Err(WireError::TooShortForBody);
        }
        let err = String::from_utf8_lossy(&buf[REPORT_HEADER_LEN..REPORT_HEADER_LEN + err_len]).into_owned();
        let counterparty = String::from_utf8_lossy(
            &buf[REPORT_HEADER_LEN + err_len..REPORT_HEADER_LEN + err_len + counterparty_len],
        )
        .into_owned();

        Ok(Report {
            kind,
            asset,
            side,
            timestamp: u64::from_be_bytes(timestamp),
            quantity: u64::from_be_bytes(quantity),
            price: f64::from_bits(u64::from_be_bytes(price_bits)),
            ticker: Ticker::from_wire(ticker),
            order_id: OrderId::from_bytes(id),
            err,
            counterparty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::numeric::Price;
    use types::order::OrderType;

    fn sample_trade_report(counterparty: &str) -> TradeReport {
        TradeReport {
            owner: "alice".to_string(),
            counterparty: counterparty.to_string(),
            asset: AssetType::Equities,
            side: Side::Buy,
            ticker: Ticker::new("AAPL"),
            order_id: OrderId::new(),
            price: Price::from_u64(100),
            quantity: 25,
            executed_at: 1_700_000_000 * 1_000_000_000,
        }
    }

    #[test]
    fn test_execution_report_round_trip() {
        let report = Report::execution(&sample_trade_report("bob"));
        let parsed = Report::parse(&report.serialize()).unwrap();
        assert_eq!(parsed, report);
        assert_eq!(parsed.timestamp, 1_700_000_000);
        assert_eq!(parsed.counterparty, "bob");
        assert_eq!(parsed.err, "");
    }

    #[test]
    fn test_execution_report_empty_counterparty() {
        let report = Report::execution(&sample_trade_report(""));
        let parsed = Report::parse(&report.serialize()).unwrap();
        assert_eq!(parsed, report);
        assert_eq!(parsed.counterparty, "");
    }

    #[test]
    fn test_error_report_round_trip() {
        let report = Report::rejection("not enough liquidity", 42);
        let bytes = report.serialize();
        assert_eq!(bytes.len(), REPORT_HEADER_LEN + "not enough liquidity".len());

        let parsed = Report::parse(&bytes).unwrap();
        assert_eq!(parsed, report);
        assert_eq!(parsed.kind, ReportKind::Error);
        assert_eq!(parsed.err, "not enough liquidity");
    }

    #[test]
    fn test_order_placed_round_trip() {
        let order = Order::new(
            OrderId::new(),
            AssetType::Equities,
            OrderType::Limit,
            Ticker::new("GE"),
            Side::Sell,
            99.5,
            50,
            1,
            "carol".to_string(),
        );
        let report = Report::order_placed(&order, 1_700_000_123);
        let parsed = Report::parse(&report.serialize()).unwrap();
        assert_eq!(parsed, report);
        assert_eq!(parsed.kind, ReportKind::OrderPlaced);
        assert_eq!(parsed.order_id, order.id);
        assert_eq!(parsed.ticker.as_str(), "GE");
    }

    #[test]
    fn test_body_len_matches_serialized_tail() {
        let report = Report::execution(&sample_trade_report("bob"));
        let bytes = report.serialize();
        let body_len = Report::body_len(&bytes[..REPORT_HEADER_LEN]).unwrap();
        assert_eq!(REPORT_HEADER_LEN + body_len, bytes.len());
    }

    #[test]
    fn test_parse_truncated_header() {
        let report = Report::rejection("oops", 1);
        let bytes = report.serialize();
        assert_eq!(Report::parse(&bytes[..20]), Err(WireError::TooShortForHeader));
    }

    #[test]
    fn test_parse_truncated_strings() {
        let report = Report::execution(&sample_trade_report("bob"));
        let bytes = report.serialize();
        assert_eq!(
            Report::parse(&bytes[..bytes.len() - 1]),
            Err(WireError::TooShortForBody)
        );
    }
}
