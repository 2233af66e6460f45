//! In-memory market catalogue backed by the instruments endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};

use crate::domain::error::{BrokerError, BrokerResult};
use crate::domain::normalize::market_from_instrument;
use crate::domain::types::Market;
use crate::ports::markets::MarketRegistry;
use crate::ports::transport::{BrokerTransport, Endpoint, Params};

/// Markets indexed by instrument id and by unified symbol.
#[derive(Debug, Clone, Default)]
pub struct MarketCatalog {
  by_id: HashMap<String, Arc<Market>>,
  by_symbol: HashMap<String, Arc<Market>>,
}

impl MarketCatalog {
  /// Build a catalogue from already-normalized markets.
  pub fn from_markets(markets: impl IntoIterator<Item = Market>) -> Self {
    let mut catalog = Self::default();
    for market in markets {
      let market = Arc::new(market);
      catalog.by_symbol.insert(market.symbol.clone(), Arc::clone(&market));
      catalog.by_id.insert(market.id.clone(), market);
    }
    catalog
  }

  /// Build a catalogue from raw instrument records.
  ///
  /// # Errors
  /// `MalformedResponse` for an instrument without a `BASE_QUOTE` name.
  pub fn from_instruments(instruments: &[Value]) -> BrokerResult<Self> {
    let markets = instruments
      .iter()
      .map(|instrument| market_from_instrument(instrument, unified_currency))
      .collect::<BrokerResult<Vec<_>>>()?;
    Ok(Self::from_markets(markets))
  }

  /// Fetch the instrument list and build the catalogue.
  ///
  /// # Errors
  /// Transport failures and malformed instrument records.
  #[instrument(skip_all)]
  pub async fn load(transport: &dyn BrokerTransport, params: &Params) -> BrokerResult<Self> {
    let response = transport.request(Endpoint::Instruments, params).await?;
    let instruments = response
      .get("instruments")
      .and_then(Value::as_array)
      .ok_or_else(|| BrokerError::MalformedResponse("instruments list missing".into()))?;
    let catalog = Self::from_instruments(instruments)?;
    info!(markets = catalog.len(), "Market catalogue loaded");
    Ok(catalog)
  }

  /// All markets, sorted by symbol.
  pub fn markets(&self) -> Vec<Arc<Market>> {
    let mut markets: Vec<_> = self.by_symbol.values().cloned().collect();
    markets.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    markets
  }

  pub fn len(&self) -> usize {
    self.by_id.len()
  }

  pub fn is_empty(&self) -> bool {
    self.by_id.is_empty()
  }
}

impl MarketRegistry for MarketCatalog {
  fn market_by_id(&self, id: &str) -> BrokerResult<Arc<Market>> {
    self
      .by_id
      .get(id)
      .cloned()
      .ok_or_else(|| BrokerError::UnknownMarket(id.to_string()))
  }

  fn market_by_symbol(&self, symbol: &str) -> BrokerResult<Arc<Market>> {
    self
      .by_symbol
      .get(symbol)
      .cloned()
      .ok_or_else(|| BrokerError::UnknownSymbol(symbol.to_string()))
  }

  fn currency_code(&self, id: &str) -> String {
    unified_currency(id)
  }
}

/// OANDA uses ISO codes throughout; no aliases to apply.
fn unified_currency(id: &str) -> String {
  id.to_uppercase()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::error::TransportError;
  use async_trait::async_trait;
  use serde_json::json;

  struct StaticTransport(Value);

  #[async_trait]
  impl BrokerTransport for StaticTransport {
    async fn request(&self, endpoint: Endpoint, _: &Params) -> Result<Value, TransportError> {
      assert_eq!(endpoint, Endpoint::Instruments);
      Ok(self.0.clone())
    }
  }

  #[test]
  fn test_load_from_transport() {
    let transport = StaticTransport(json!({
      "instruments": [{"name": "GBP_CAD", "type": "CURRENCY", "displayPrecision": "5"}],
      "lastTransactionID": "1"
    }));
    let catalog = tokio_test::block_on(MarketCatalog::load(&transport, &Params::new())).unwrap();
    assert_eq!(catalog.market_by_id("GBP_CAD").unwrap().symbol, "GBP/CAD");
  }

  #[test]
  fn test_load_without_instruments_list() {
    let transport = StaticTransport(json!({"errorMessage": ""}));
    let err = tokio_test::block_on(MarketCatalog::load(&transport, &Params::new())).unwrap_err();
    assert!(matches!(err, BrokerError::MalformedResponse(_)));
  }

  #[test]
  fn test_lookup_both_ways() {
    let catalog = MarketCatalog::from_instruments(&[
      json!({"name": "EUR_USD", "displayPrecision": "5"}),
      json!({"name": "XAU_USD", "displayPrecision": "3"}),
    ])
    .unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.market_by_id("XAU_USD").unwrap().symbol, "XAU/USD");
    assert_eq!(catalog.market_by_symbol("EUR/USD").unwrap().id, "EUR_USD");
  }

  #[test]
  fn test_unknown_lookups() {
    let catalog = MarketCatalog::default();
    assert!(catalog.is_empty());
    assert_eq!(
      catalog.market_by_id("XXX_YYY").unwrap_err(),
      BrokerError::UnknownMarket("XXX_YYY".into())
    );
    assert_eq!(
      catalog.market_by_symbol("XXX/YYY").unwrap_err(),
      BrokerError::UnknownSymbol("XXX/YYY".into())
    );
  }

  #[test]
  fn test_markets_sorted() {
    let catalog = MarketCatalog::from_instruments(&[
      json!({"name": "USD_JPY"}),
      json!({"name": "AUD_USD"}),
    ])
    .unwrap();
    let symbols: Vec<_> = catalog.markets().iter().map(|m| m.symbol.clone()).collect();
    assert_eq!(symbols, ["AUD/USD", "USD/JPY"]);
  }
}
