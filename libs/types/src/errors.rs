//! Error taxonomy shared across the exchange

use crate::ids::OrderId;
use crate::order::AssetType;
use thiserror::Error;

/// Errors raised by a single order book
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookError {
    /// A market order asked for more volume than the opposite side holds
    #[error("not enough liquidity")]
    NotEnoughLiquidity,

    /// Cancel referenced an id with no resting order
    #[error("unknown order: {0}")]
    UnknownOrder(OrderId),

    /// A limit order arrived with a price that cannot key a level
    #[error("invalid limit price: {0}")]
    InvalidPrice(f64),
}

/// Top-level engine error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("no book for asset: {0}")]
    BookNotFound(AssetType),

    #[error(transparent)]
    Book(#[from] BookError),

    /// One or more execution reports could not be delivered. The trades
    /// themselves stand; callers treat the placement as partially
    /// successful.
    #[error("report delivery failed: {0}")]
    Report(String),
}

/// Errors raised while delivering a report to a client session
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("client does not exist: {0}")]
    ClientDoesNotExist(String),

    #[error("unable to send report: {0}")]
    Write(#[from] std::io::Error),
}
