//! Canonical trading entities.
//!
//! Exchange-agnostic shapes produced by the normalizers. Numeric
//! fields are decimal strings produced by `domain::decimal`; absent
//! broker data stays `None` rather than being defaulted. Every entity
//! keeps the raw record it came from in `info`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::tokens::{
    LedgerEntryType, OrderStatus, OrderType, PositionStatus, TimeInForce, TransferType,
};

/// Broker instrument identifier, e.g. `EUR_USD`.
pub type InstrumentId = String;

/// Unified symbol, e.g. `EUR/USD`.
pub type Symbol = String;

// ────────────────────────────────────────────
// Markets
// ────────────────────────────────────────────

/// Decimal places for amounts and prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPrecision {
    pub amount: Option<String>,
    pub price: Option<String>,
}

/// Trading limits published for an instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketLimits {
    /// Minimum order size in units.
    pub amount_min: Option<String>,
    /// Minimum leverage (always 1 on this broker).
    pub leverage_min: Option<String>,
}

/// A tradeable instrument.
///
/// Owned by the market registry and shared as `Arc<Market>`;
/// normalizers only borrow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub id: InstrumentId,
    pub symbol: Symbol,
    pub base: String,
    pub quote: String,
    pub base_id: String,
    pub quote_id: String,
    pub precision: MarketPrecision,
    pub limits: MarketLimits,
    pub info: Value,
}

// ────────────────────────────────────────────
// Orders and trades
// ────────────────────────────────────────────

/// Order side, derived from the sign of broker units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Option<String>,
    /// Unix milliseconds.
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    pub status: OrderStatus,
    #[serde(rename = "type")]
    pub order_type: Option<OrderType>,
    pub side: Option<OrderSide>,
    pub symbol: Option<Symbol>,
    pub time_in_force: Option<TimeInForce>,
    pub price: Option<String>,
    pub amount: Option<String>,
    pub filled: Option<String>,
    pub remaining: Option<String>,
    pub info: Value,
}

/// Fee charged on a fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub currency: Option<String>,
    pub cost: String,
}

/// Canonical fill / closed trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: Option<String>,
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    pub symbol: Option<Symbol>,
    /// Originating order (or batch) id.
    pub order: Option<String>,
    #[serde(rename = "type")]
    pub order_type: Option<OrderType>,
    pub side: Option<OrderSide>,
    pub price: Option<String>,
    pub amount: Option<String>,
    pub fee: Option<Fee>,
    pub info: Value,
}

// ────────────────────────────────────────────
// Positions
// ────────────────────────────────────────────

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

/// Canonical position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: Option<String>,
    pub symbol: Option<Symbol>,
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    pub side: Option<PositionSide>,
    pub entry_price: Option<String>,
    pub contracts: Option<String>,
    pub unrealized_pnl: Option<String>,
    pub realized_pnl: Option<String>,
    pub status: Option<PositionStatus>,
    /// Margin currently held against the position.
    pub collateral: Option<String>,
    pub info: Value,
}

// ────────────────────────────────────────────
// Ledger and transfers
// ────────────────────────────────────────────

/// Whether a ledger entry added to or drew from the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerDirection {
    In,
    Out,
}

/// One account ledger movement, one per source transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Option<String>,
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    pub direction: Option<LedgerDirection>,
    pub account: Option<String>,
    pub reference_id: Option<String>,
    #[serde(rename = "type")]
    pub entry_type: Option<LedgerEntryType>,
    pub currency: Option<String>,
    pub symbol: Option<Symbol>,
    pub amount: Option<String>,
    /// Account balance after the movement.
    pub after: Option<String>,
    pub status: String,
    pub info: Value,
}

/// Deposit or withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: Option<String>,
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    pub currency: Option<String>,
    pub amount: Option<String>,
    #[serde(rename = "type")]
    pub transfer_type: Option<TransferType>,
    /// Broker request id.
    pub txid: Option<String>,
    pub info: Value,
}

/// Free funds in the account currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub currency: Option<String>,
    pub free: Option<String>,
    pub used: Option<String>,
    pub total: Option<String>,
    pub info: Value,
}

// ────────────────────────────────────────────
// Market data
// ────────────────────────────────────────────

/// Best bid/ask snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    pub symbol: Option<Symbol>,
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    pub bid: Option<String>,
    pub bid_volume: Option<String>,
    pub ask: Option<String>,
    pub ask_volume: Option<String>,
    pub percentage: Option<String>,
    pub base_volume: Option<String>,
    pub quote_volume: Option<String>,
    pub info: Value,
}

/// A single price level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: String,
    pub volume: String,
}

/// Directional order book. `bids[0]` is the best bid, `asks[0]` the best ask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    pub symbol: Option<Symbol>,
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    /// Descending by price.
    pub bids: Vec<BookLevel>,
    /// Ascending by price.
    pub asks: Vec<BookLevel>,
}

/// OHLCV bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: Option<i64>,
    pub open: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub close: Option<String>,
    pub volume: Option<String>,
}
