//! Transport Port - Raw Broker Request Interface
//!
//! The normalization core never builds URLs, signs requests or
//! retries. It names the broker operation it needs (`Endpoint`),
//! hands over parameters, and receives raw JSON or a classified
//! failure.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::error::{ErrorKind, TransportError};

/// Request parameters: query string for reads, JSON body for writes.
pub type Params = Map<String, Value>;

/// HTTP verb of a broker operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
  Get,
  Post,
  Put,
  Patch,
}

/// Broker operations the core relies on.
///
/// Path parameters travel inside the variant; the account id is
/// supplied by the transport from its own configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
  /// Instrument catalogue for the account.
  Instruments,
  /// Candles for one instrument.
  Candles { instrument: String },
  /// Aggregated order-book buckets for one instrument.
  OrderBook { instrument: String },
  /// Submit a new order.
  CreateOrder,
  /// Replace (cancel and recreate) an order.
  ReplaceOrder { order_id: String },
  /// Cancel a pending order.
  CancelOrder { order_id: String },
  /// Single order by id.
  Order { order_id: String },
  /// Order list.
  Orders,
  /// Trade list (the broker's per-fill positions).
  Trades,
  /// Transaction history summary with page links.
  Transactions,
  /// Transactions after a given id.
  TransactionsSinceId,
  /// Account summary.
  AccountSummary,
  /// Current prices.
  Pricing,
  /// Account configuration (margin rate).
  Configuration,
}

impl Endpoint {
  /// HTTP verb for this operation.
  pub fn method(&self) -> HttpMethod {
    match self {
      Self::CreateOrder => HttpMethod::Post,
      Self::ReplaceOrder { .. } | Self::CancelOrder { .. } => HttpMethod::Put,
      Self::Configuration => HttpMethod::Patch,
      _ => HttpMethod::Get,
    }
  }

  /// Short label for logs and metrics.
  pub fn label(&self) -> &'static str {
    match self {
      Self::Instruments => "instruments",
      Self::Candles { .. } => "candles",
      Self::OrderBook { .. } => "order_book",
      Self::CreateOrder => "create_order",
      Self::ReplaceOrder { .. } => "replace_order",
      Self::CancelOrder { .. } => "cancel_order",
      Self::Order { .. } => "order",
      Self::Orders => "orders",
      Self::Trades => "trades",
      Self::Transactions => "transactions",
      Self::TransactionsSinceId => "transactions_since_id",
      Self::AccountSummary => "account_summary",
      Self::Pricing => "pricing",
      Self::Configuration => "configuration",
    }
  }
}

/// Broker error payload after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeFailure {
  /// Category from the classifier tables.
  pub kind: ErrorKind,
  /// Human-readable broker message.
  pub message: String,
}

impl From<ExchangeFailure> for TransportError {
  fn from(failure: ExchangeFailure) -> Self {
    Self::Exchange {
      kind: failure.kind,
      message: failure.message,
    }
  }
}

/// Maps a raw broker error body onto an `ErrorKind`.
pub trait ErrorClassifier: Send + Sync {
  /// Returns `None` when the body carries no broker error.
  fn classify(&self, body: &Value) -> Option<ExchangeFailure>;
}

/// Trait for raw broker request providers.
///
/// Every suspension point of the core goes through `request`; it is
/// the only I/O the core performs.
#[async_trait]
pub trait BrokerTransport: Send + Sync + 'static {
  /// Issue one broker request and return the decoded JSON body.
  ///
  /// # Errors
  /// Returns `TransportError` on network failure or broker error payload.
  async fn request(&self, endpoint: Endpoint, params: &Params) -> Result<Value, TransportError>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_endpoint_methods() {
    assert_eq!(Endpoint::CreateOrder.method(), HttpMethod::Post);
    assert_eq!(
      Endpoint::CancelOrder { order_id: "5".to_string() }.method(),
      HttpMethod::Put
    );
    assert_eq!(Endpoint::Configuration.method(), HttpMethod::Patch);
    assert_eq!(Endpoint::TransactionsSinceId.method(), HttpMethod::Get);
  }

  #[test]
  fn test_failure_into_transport_error() {
    let err: TransportError = ExchangeFailure {
      kind: ErrorKind::BadSymbol,
      message: "bad".to_string(),
    }
    .into();
    assert_eq!(
      err,
      TransportError::Exchange {
        kind: ErrorKind::BadSymbol,
        message: "bad".to_string()
      }
    );
  }
}
