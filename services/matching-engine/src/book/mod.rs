//! Order book infrastructure module
//!
//! Contains price levels, bid book, ask book, and the per-asset
//! two-sided order book.

pub mod ask_book;
pub mod bid_book;
pub mod order_book;
pub mod price_level;

pub use ask_book::AskBook;
pub use bid_book::BidBook;
pub use order_book::OrderBook;
pub use price_level::PriceLevel;
