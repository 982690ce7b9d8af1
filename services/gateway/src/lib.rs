//! TCP session layer
//!
//! Accepts client connections, reads and parses framed messages under a
//! bounded read pool, funnels them through a single-consumer dispatcher
//! into the matching engine, and delivers execution and error reports
//! back to the sessions involved.

pub mod dispatch;
pub mod server;
pub mod session;
