//! Reporting seam between the engine and the session layer
//!
//! The engine produces addressed reports; delivering them to live
//! client sessions is the session layer's job. The trait keeps the
//! dependency pointing one way.

use std::future::Future;
use types::errors::{EngineError, ReportError};
use types::order::Order;
use types::trade::TradeReport;

/// Delivers reports to the session addressed by owner identity
///
/// Implementations resolve `owner -> session` under their session lock
/// and must evict a session whose socket write fails before returning
/// the error. A lookup miss is `ReportError::ClientDoesNotExist`;
/// callers log it and continue.
pub trait Reporter: Send {
    /// Deliver one party's view of an executed trade
    fn report_trade(
        &self,
        report: &TradeReport,
    ) -> impl Future<Output = Result<(), ReportError>> + Send;

    /// Acknowledge a placement, carrying the server-assigned order id
    fn report_order_placed(
        &self,
        owner: &str,
        order: &Order,
    ) -> impl Future<Output = Result<(), ReportError>> + Send;

    /// Deliver an error report
    fn report_error(
        &self,
        owner: &str,
        error: &EngineError,
    ) -> impl Future<Output = Result<(), ReportError>> + Send;
}
