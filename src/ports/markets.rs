//! Market Registry Port - Static Instrument Metadata
//!
//! Normalizers resolve every instrument id through this port. They
//! never derive a symbol by splitting the id themselves.

use std::sync::Arc;

use crate::domain::error::BrokerResult;
use crate::domain::types::Market;

/// Read-only catalogue of loaded markets.
pub trait MarketRegistry: Send + Sync {
  /// Market for a broker instrument id.
  ///
  /// # Errors
  /// `BrokerError::UnknownMarket` when the id is not loaded.
  fn market_by_id(&self, id: &str) -> BrokerResult<Arc<Market>>;

  /// Market for a unified symbol.
  ///
  /// # Errors
  /// `BrokerError::UnknownSymbol` when the symbol is not loaded.
  fn market_by_symbol(&self, symbol: &str) -> BrokerResult<Arc<Market>>;

  /// Unified currency code for a broker currency id.
  fn currency_code(&self, id: &str) -> String;
}

/// Resolve the unified symbol for a raw record.
///
/// The record's instrument id wins; the caller's market hint is used
/// only when the record carries none.
pub fn resolve_symbol(
  registry: &dyn MarketRegistry,
  instrument: Option<&str>,
  market: Option<&Market>,
) -> BrokerResult<Option<String>> {
  match instrument {
    Some(id) => Ok(Some(registry.market_by_id(id)?.symbol.clone())),
    None => Ok(market.map(|m| m.symbol.clone())),
  }
}
