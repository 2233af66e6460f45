//! Domain layer - Canonical trading model and normalization logic.
//!
//! Pure functions and value types: decimal string algebra, token
//! tables, the order state interpreter, the order book reconstructor
//! and the entity normalizers. Nothing here performs I/O; instrument
//! metadata is reached through the `MarketRegistry` port.

pub mod decimal;
pub mod error;
pub mod normalize;
pub mod order_state;
pub mod orderbook;
pub mod raw;
pub mod tokens;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export core types for convenience
pub use error::{BrokerError, BrokerResult, ErrorKind, TransportError};
pub use order_state::{interpret, TransactionBundle, TransactionKind};
pub use tokens::{LedgerEntryType, OrderStatus, OrderType, PositionStatus, TimeInForce, TransferType};
pub use types::{
    Balance, BookLevel, Candle, LedgerDirection, LedgerEntry, Market, Order, OrderBook, OrderSide,
    Position, PositionSide, Ticker, Trade, Transfer,
};
