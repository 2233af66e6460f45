//! OANDA v20 REST paths and static broker tables.

use crate::ports::transport::Endpoint;

/// Live trading host.
pub const LIVE_URL: &str = "https://api-fxtrade.oanda.com";
/// Practice (demo) host.
pub const PRACTICE_URL: &str = "https://api-fxpractice.oanda.com";

/// Unified timeframe → OANDA candle granularity.
pub const TIMEFRAMES: &[(&str, &str)] = &[
  ("5s", "S5"),
  ("10s", "S10"),
  ("15s", "S15"),
  ("30s", "S30"),
  ("1m", "M1"),
  ("2m", "M2"),
  ("4m", "M4"),
  ("5m", "M5"),
  ("10m", "M10"),
  ("15m", "M15"),
  ("30m", "M30"),
  ("1h", "H1"),
  ("2h", "H2"),
  ("3h", "H3"),
  ("4h", "H4"),
  ("6h", "H6"),
  ("8h", "H8"),
  ("12h", "H12"),
  ("1d", "D"),
  ("1w", "W"),
  ("1M", "M"),
];

/// Symbols the broker publishes order books for. The instruments
/// endpoint does not say which ones have books, so the list is fixed.
pub const ORDER_BOOK_SYMBOLS: &[&str] = &[
  "AUD/JPY", "AUD/USD", "EUR/AUD", "EUR/CHF", "EUR/GBP", "EUR/JPY", "EUR/USD", "GBP/CHF",
  "GBP/JPY", "GBP/USD", "NZD/USD", "USD/CAD", "USD/CHF", "USD/JPY", "XAU/USD", "XAG/USD",
];

/// Candle granularity for a unified timeframe.
pub fn granularity(timeframe: &str) -> Option<&'static str> {
  TIMEFRAMES
    .iter()
    .find(|(unified, _)| *unified == timeframe)
    .map(|(_, native)| *native)
}

/// Whether the broker serves an order book for `symbol`.
pub fn has_order_book(symbol: &str) -> bool {
  ORDER_BOOK_SYMBOLS.contains(&symbol)
}

/// Request path (without host) for an endpoint under `account_id`.
pub fn path(endpoint: &Endpoint, account_id: &str) -> String {
  let account = format!("/v3/accounts/{account_id}");
  match endpoint {
    Endpoint::Instruments => format!("{account}/instruments"),
    Endpoint::Candles { instrument } => format!("/v3/instruments/{instrument}/candles"),
    Endpoint::OrderBook { instrument } => format!("/v3/instruments/{instrument}/orderBook"),
    Endpoint::CreateOrder | Endpoint::Orders => format!("{account}/orders"),
    Endpoint::ReplaceOrder { order_id } | Endpoint::Order { order_id } => {
      format!("{account}/orders/{order_id}")
    }
    Endpoint::CancelOrder { order_id } => format!("{account}/orders/{order_id}/cancel"),
    Endpoint::Trades => format!("{account}/trades"),
    Endpoint::Transactions => format!("{account}/transactions"),
    Endpoint::TransactionsSinceId => format!("{account}/transactions/sinceid"),
    Endpoint::AccountSummary => format!("{account}/summary"),
    Endpoint::Pricing => format!("{account}/pricing"),
    Endpoint::Configuration => format!("{account}/configuration"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_paths() {
    assert_eq!(
      path(&Endpoint::TransactionsSinceId, "001-1"),
      "/v3/accounts/001-1/transactions/sinceid"
    );
    assert_eq!(
      path(&Endpoint::CancelOrder { order_id: "19".into() }, "001-1"),
      "/v3/accounts/001-1/orders/19/cancel"
    );
    assert_eq!(
      path(&Endpoint::Candles { instrument: "EUR_USD".into() }, "001-1"),
      "/v3/instruments/EUR_USD/candles"
    );
  }

  #[test]
  fn test_granularity() {
    assert_eq!(granularity("1m"), Some("M1"));
    assert_eq!(granularity("1M"), Some("M"));
    assert_eq!(granularity("7m"), None);
  }

  #[test]
  fn test_order_book_allow_list() {
    assert!(has_order_book("EUR/USD"));
    assert!(!has_order_book("CN50/USD"));
  }
}
