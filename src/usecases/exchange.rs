//! Exchange Facade - Unified Broker Operations
//!
//! Wires the transport, the market catalogue, the transaction pager
//! and the normalizers into the unified operations callers use:
//! - Market data: markets, candles, order book, tickers
//! - Orders: create, edit, cancel, fetch by id / state / ids
//! - Account: positions, fills, ledger, transfers, balance, leverage
//!
//! Every operation returns canonical entities; `since` / `limit`
//! filters are applied after normalization.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::adapters::metrics::MetricsRegistry;
use crate::adapters::oanda::endpoints;
use crate::adapters::oanda::registry::MarketCatalog;
use crate::domain::decimal;
use crate::domain::error::{BrokerError, BrokerResult};
use crate::domain::normalize;
use crate::domain::order_state::interpret;
use crate::domain::orderbook::parse_order_book;
use crate::domain::raw;
use crate::domain::tokens::{OrderType, TimeInForce};
use crate::domain::types::{
  Balance, Candle, LedgerEntry, Market, Order, OrderBook, OrderSide, Position, Ticker, Trade,
  Transfer,
};
use crate::ports::markets::MarketRegistry;
use crate::ports::transport::{BrokerTransport, Endpoint, Params};
use crate::usecases::pager::TransactionPager;

/// Largest candle count the broker serves per request.
const MAX_CANDLES: u32 = 5000;

/// Transaction `type` filter for fills.
const FILL_TRANSACTIONS: &str = "ORDER_FILL";

/// Transaction `type` filter for funding records.
const FUNDING_TRANSACTIONS: &str = "FUNDING,TRANSFER_FUNDS";

/// Parameters of an order to submit or replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
  /// Unified symbol.
  pub symbol: String,
  pub order_type: OrderType,
  pub side: OrderSide,
  /// Unsigned amount; the side sets the sign sent to the broker.
  pub amount: String,
  /// Limit / stop price.
  pub price: Option<String>,
  pub time_in_force: Option<TimeInForce>,
}

/// Unified operations over one broker account.
pub struct Exchange<T: BrokerTransport> {
  /// Transport port.
  transport: Arc<T>,
  /// Transaction history pager.
  pager: TransactionPager<T>,
  /// Market catalogue, loaded on first use.
  markets: RwLock<Option<Arc<MarketCatalog>>>,
}

impl<T: BrokerTransport> Exchange<T> {
  /// Create a facade over a transport.
  pub fn new(transport: Arc<T>, page_size: Option<u32>) -> Self {
    Self {
      pager: TransactionPager::new(Arc::clone(&transport), page_size),
      transport,
      markets: RwLock::new(None),
    }
  }

  /// Attach a metrics registry to the pager.
  #[must_use]
  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.pager = self.pager.with_metrics(metrics);
    self
  }

  /// Use an already-built catalogue instead of loading one.
  #[must_use]
  pub fn with_markets(self, catalog: MarketCatalog) -> Self {
    Self {
      markets: RwLock::new(Some(Arc::new(catalog))),
      ..self
    }
  }

  // ────────────────────────────────────────────
  // Markets
  // ────────────────────────────────────────────

  /// Catalogue of tradable markets, fetched once and cached.
  ///
  /// # Errors
  /// Transport failures and malformed instrument records.
  pub async fn load_markets(&self, reload: bool) -> BrokerResult<Arc<MarketCatalog>> {
    if !reload {
      if let Some(catalog) = self.markets.read().await.as_ref() {
        return Ok(Arc::clone(catalog));
      }
    }
    let catalog = Arc::new(MarketCatalog::load(self.transport.as_ref(), &Params::new()).await?);
    *self.markets.write().await = Some(Arc::clone(&catalog));
    Ok(catalog)
  }

  /// Fetch the instrument list without touching the cache.
  ///
  /// # Errors
  /// Transport failures and malformed instrument records.
  #[instrument(skip(self, params))]
  pub async fn fetch_markets(&self, params: &Params) -> BrokerResult<Vec<Market>> {
    let catalog = MarketCatalog::load(self.transport.as_ref(), params).await?;
    Ok(catalog.markets().iter().map(|m| m.as_ref().clone()).collect())
  }

  /// OHLCV bars for `symbol`.
  ///
  /// Open and close are mid prices, high the ask high and low the bid low.
  ///
  /// # Errors
  /// `UnknownSymbol`, unsupported timeframe, transport failures.
  #[instrument(skip(self))]
  pub async fn fetch_ohlcv(
    &self,
    symbol: &str,
    timeframe: &str,
    since: Option<i64>,
    limit: Option<u32>,
  ) -> BrokerResult<Vec<Candle>> {
    let catalog = self.load_markets(false).await?;
    let market = catalog.market_by_symbol(symbol)?;
    let granularity = endpoints::granularity(timeframe)
      .ok_or_else(|| BrokerError::ArgumentsRequired(format!("unsupported timeframe {timeframe}")))?;

    let mut params = Params::new();
    params.insert("granularity".into(), json!(granularity));
    params.insert("price".into(), json!("BMA"));
    if let Some(ms) = since {
      params.insert("from".into(), json!(ms / 1000));
    }
    if let Some(count) = limit {
      params.insert("count".into(), json!(count.min(MAX_CANDLES)));
    }

    let response = self
      .transport
      .request(
        Endpoint::Candles {
          instrument: market.id.clone(),
        },
        &params,
      )
      .await?;
    let candles: Vec<Candle> = array(&response, "candles")
      .iter()
      .map(normalize::candle)
      .collect();
    Ok(filter_since_limit(candles, since, limit, |c| c.timestamp))
  }

  /// Order book rebuilt from the broker's position-ratio histogram.
  ///
  /// # Errors
  /// `UnknownSymbol` for symbols without a published book, plus
  /// reconstruction and transport failures.
  #[instrument(skip(self))]
  pub async fn fetch_order_book(&self, symbol: &str) -> BrokerResult<OrderBook> {
    if !endpoints::has_order_book(symbol) {
      return Err(BrokerError::UnknownSymbol(format!("{symbol} has no order book")));
    }
    let catalog = self.load_markets(false).await?;
    let market = catalog.market_by_symbol(symbol)?;
    let response = self
      .transport
      .request(
        Endpoint::OrderBook {
          instrument: market.id.clone(),
        },
        &Params::new(),
      )
      .await?;
    let book = response
      .get("orderBook")
      .ok_or_else(|| BrokerError::MalformedResponse("orderBook missing".into()))?;
    parse_order_book(book, Some(market.symbol.clone()))
  }

  // ────────────────────────────────────────────
  // Orders
  // ────────────────────────────────────────────

  /// Submit a new order.
  ///
  /// # Errors
  /// `InvalidOrder` when the broker cancels it in the same batch,
  /// `UnknownSymbol`, transport failures.
  #[instrument(skip(self), fields(symbol = %request.symbol))]
  pub async fn create_order(&self, request: &OrderRequest) -> BrokerResult<Order> {
    let catalog = self.load_markets(false).await?;
    let market = catalog.market_by_symbol(&request.symbol)?;
    let params = order_params(request, &market)?;
    let response = self.transport.request(Endpoint::CreateOrder, &params).await?;
    let order = interpret(&response, Some(market.as_ref()), catalog.as_ref())?;
    info!(order_id = ?order.id, status = ?order.status, "Order submitted");
    Ok(order)
  }

  /// Replace an order (the broker cancels it and creates a new one).
  ///
  /// # Errors
  /// As `create_order`.
  #[instrument(skip(self), fields(symbol = %request.symbol))]
  pub async fn edit_order(&self, order_id: &str, request: &OrderRequest) -> BrokerResult<Order> {
    let catalog = self.load_markets(false).await?;
    let market = catalog.market_by_symbol(&request.symbol)?;
    let params = order_params(request, &market)?;
    let response = self
      .transport
      .request(
        Endpoint::ReplaceOrder {
          order_id: order_id.to_string(),
        },
        &params,
      )
      .await?;
    interpret(&response, Some(market.as_ref()), catalog.as_ref())
  }

  /// Cancel a pending order.
  ///
  /// # Errors
  /// Transport failures (`OrderNotFound` arrives classified).
  #[instrument(skip(self))]
  pub async fn cancel_order(&self, order_id: &str) -> BrokerResult<Order> {
    let catalog = self.load_markets(false).await?;
    let response = self
      .transport
      .request(
        Endpoint::CancelOrder {
          order_id: order_id.to_string(),
        },
        &Params::new(),
      )
      .await?;
    interpret(&response, None, catalog.as_ref())
  }

  /// Single order by id.
  ///
  /// # Errors
  /// Transport failures and unrecognized order records.
  #[instrument(skip(self))]
  pub async fn fetch_order(&self, order_id: &str) -> BrokerResult<Order> {
    let catalog = self.load_markets(false).await?;
    let response = self
      .transport
      .request(
        Endpoint::Order {
          order_id: order_id.to_string(),
        },
        &Params::new(),
      )
      .await?;
    let record = response
      .get("order")
      .ok_or_else(|| BrokerError::MalformedResponse("order missing".into()))?;
    interpret(record, None, catalog.as_ref())
  }

  /// Orders of any state, optionally for one symbol.
  ///
  /// `params` may carry a broker `state` (`ALL` by default) or `ids`.
  ///
  /// # Errors
  /// `UnknownSymbol`, transport failures, unrecognized records.
  #[instrument(skip(self, params))]
  pub async fn fetch_orders(
    &self,
    symbol: Option<&str>,
    since: Option<i64>,
    limit: Option<u32>,
    params: &Params,
  ) -> BrokerResult<Vec<Order>> {
    let catalog = self.load_markets(false).await?;
    let market = symbol.map(|s| catalog.market_by_symbol(s)).transpose()?;

    let mut request = Params::new();
    request.insert("state".into(), json!("ALL"));
    if let Some(market) = &market {
      request.insert("instrument".into(), json!(market.id));
    }
    if let Some(count) = limit {
      request.insert("count".into(), json!(count));
    }
    extend(&mut request, params);

    let response = self.transport.request(Endpoint::Orders, &request).await?;
    let orders = array(&response, "orders")
      .iter()
      .map(|record| interpret(record, market.as_deref(), catalog.as_ref()))
      .collect::<BrokerResult<Vec<_>>>()?;
    Ok(filter_since_limit(orders, since, limit, |o| o.timestamp))
  }

  /// Pending orders.
  ///
  /// # Errors
  /// As `fetch_orders`.
  pub async fn fetch_open_orders(
    &self,
    symbol: Option<&str>,
    since: Option<i64>,
    limit: Option<u32>,
  ) -> BrokerResult<Vec<Order>> {
    self.fetch_orders(symbol, since, limit, &state("PENDING")).await
  }

  /// Triggered (filled) orders.
  ///
  /// # Errors
  /// As `fetch_orders`.
  pub async fn fetch_closed_orders(
    &self,
    symbol: Option<&str>,
    since: Option<i64>,
    limit: Option<u32>,
  ) -> BrokerResult<Vec<Order>> {
    self.fetch_orders(symbol, since, limit, &state("TRIGGERED")).await
  }

  /// Cancelled orders.
  ///
  /// # Errors
  /// As `fetch_orders`.
  pub async fn fetch_canceled_orders(
    &self,
    symbol: Option<&str>,
    since: Option<i64>,
    limit: Option<u32>,
  ) -> BrokerResult<Vec<Order>> {
    self.fetch_orders(symbol, since, limit, &state("CANCELLED")).await
  }

  /// Orders by id, whatever their state.
  ///
  /// # Errors
  /// `ArgumentsRequired` for an empty id list, otherwise as `fetch_orders`.
  pub async fn fetch_orders_by_ids(
    &self,
    ids: &[String],
    since: Option<i64>,
    limit: Option<u32>,
  ) -> BrokerResult<Vec<Order>> {
    if ids.is_empty() {
      return Err(BrokerError::ArgumentsRequired("order ids".into()));
    }
    let mut params = state("ALL");
    params.insert("ids".into(), json!(ids.join(",")));
    self.fetch_orders(None, since, limit, &params).await
  }

  // ────────────────────────────────────────────
  // Account
  // ────────────────────────────────────────────

  /// Open positions (the broker's open trades).
  ///
  /// # Errors
  /// `UnknownSymbol`, transport failures, malformed numbers.
  #[instrument(skip(self))]
  pub async fn fetch_positions(&self, symbols: Option<&[String]>) -> BrokerResult<Vec<Position>> {
    let catalog = self.load_markets(false).await?;
    let mut params = state("OPEN");
    if let Some([only]) = symbols {
      params.insert("instrument".into(), json!(catalog.market_by_symbol(only)?.id));
    }

    let response = self.transport.request(Endpoint::Trades, &params).await?;
    let positions = array(&response, "trades")
      .iter()
      .map(|record| normalize::position(record, None, catalog.as_ref()))
      .collect::<BrokerResult<Vec<_>>>()?;

    Ok(match symbols {
      Some(wanted) => positions
        .into_iter()
        .filter(|p| p.symbol.as_ref().is_some_and(|s| wanted.contains(s)))
        .collect(),
      None => positions,
    })
  }

  /// Account fills, from `ORDER_FILL` transactions.
  ///
  /// # Errors
  /// `UnknownSymbol`, pager failures, malformed numbers.
  #[instrument(skip(self))]
  pub async fn fetch_my_trades(
    &self,
    symbol: Option<&str>,
    since: Option<i64>,
    limit: Option<u32>,
  ) -> BrokerResult<Vec<Trade>> {
    let catalog = self.load_markets(false).await?;
    let market = symbol.map(|s| catalog.market_by_symbol(s)).transpose()?;
    let records = self
      .pager
      .fetch(since, limit, &type_filter(FILL_TRANSACTIONS))
      .await?;

    let trades = records
      .iter()
      .map(|record| normalize::trade(record, None, catalog.as_ref()))
      .collect::<BrokerResult<Vec<_>>>()?;
    let trades = match &market {
      Some(market) => trades
        .into_iter()
        .filter(|t| t.symbol.as_deref() == Some(market.symbol.as_str()))
        .collect(),
      None => trades,
    };
    Ok(filter_since_limit(trades, since, limit, |t| t.timestamp))
  }

  /// Chronological ledger of every account transaction.
  ///
  /// # Errors
  /// Pager failures and malformed numbers.
  #[instrument(skip(self, params))]
  pub async fn fetch_ledger(
    &self,
    code: Option<&str>,
    since: Option<i64>,
    limit: Option<u32>,
    params: &Params,
  ) -> BrokerResult<Vec<LedgerEntry>> {
    let catalog = self.load_markets(false).await?;
    let records = self.pager.fetch(since, limit, params).await?;
    let entries = normalize::ledger(&records, code, catalog.as_ref())?;
    debug!(entries = entries.len(), "Ledger normalized");
    Ok(filter_since_limit(entries, since, limit, |e| e.timestamp))
  }

  /// Deposits, withdrawals and other funding movements.
  ///
  /// # Errors
  /// Pager failures and malformed numbers.
  #[instrument(skip(self))]
  pub async fn fetch_transfers(
    &self,
    code: Option<&str>,
    since: Option<i64>,
    limit: Option<u32>,
  ) -> BrokerResult<Vec<Transfer>> {
    let records = self
      .pager
      .fetch(since, limit, &type_filter(FUNDING_TRANSACTIONS))
      .await?;
    let transfers = records
      .iter()
      .map(|record| normalize::transfer(record, code))
      .collect::<BrokerResult<Vec<_>>>()?;
    Ok(filter_since_limit(transfers, since, limit, |t| t.timestamp))
  }

  /// Account balance in the account's home currency.
  ///
  /// # Errors
  /// Transport failures.
  pub async fn fetch_balance(&self) -> BrokerResult<Balance> {
    let catalog = self.load_markets(false).await?;
    let account = self.account_summary().await?;
    Ok(normalize::balance(&account, catalog.as_ref()))
  }

  /// Account margin rate.
  ///
  /// # Errors
  /// Transport failures.
  pub async fn fetch_leverage(&self) -> BrokerResult<Option<String>> {
    let account = self.account_summary().await?;
    Ok(raw::string(&account, "marginRate"))
  }

  /// Set the account margin rate; returns the configure transaction.
  ///
  /// # Errors
  /// Malformed rate, transport failures (`MARGIN_RATE_INVALID` arrives classified).
  #[instrument(skip(self))]
  pub async fn set_leverage(&self, margin_rate: &str) -> BrokerResult<Value> {
    decimal::parse(margin_rate)?;
    let mut params = Params::new();
    params.insert("marginRate".into(), json!(margin_rate));
    Ok(self.transport.request(Endpoint::Configuration, &params).await?)
  }

  /// Current price for one symbol.
  ///
  /// # Errors
  /// As `fetch_tickers`; `MalformedResponse` when no price comes back.
  pub async fn fetch_ticker(&self, symbol: &str) -> BrokerResult<Ticker> {
    self
      .fetch_tickers(&[symbol.to_string()])
      .await?
      .into_iter()
      .find(|t| t.symbol.as_deref() == Some(symbol))
      .ok_or_else(|| BrokerError::MalformedResponse(format!("no price for {symbol}")))
  }

  /// Current prices for `symbols`.
  ///
  /// # Errors
  /// `ArgumentsRequired` for an empty list, `UnknownSymbol`, transport failures.
  #[instrument(skip(self))]
  pub async fn fetch_tickers(&self, symbols: &[String]) -> BrokerResult<Vec<Ticker>> {
    if symbols.is_empty() {
      return Err(BrokerError::ArgumentsRequired("symbols".into()));
    }
    let catalog = self.load_markets(false).await?;
    let ids = symbols
      .iter()
      .map(|s| catalog.market_by_symbol(s).map(|m| m.id.clone()))
      .collect::<BrokerResult<Vec<_>>>()?;

    let mut params = Params::new();
    params.insert("instruments".into(), json!(ids.join(",")));
    let response = self.transport.request(Endpoint::Pricing, &params).await?;
    array(&response, "prices")
      .iter()
      .map(|record| normalize::ticker(record, None, catalog.as_ref()))
      .collect()
  }

  async fn account_summary(&self) -> BrokerResult<Value> {
    let response = self
      .transport
      .request(Endpoint::AccountSummary, &Params::new())
      .await?;
    response
      .get("account")
      .cloned()
      .ok_or_else(|| BrokerError::MalformedResponse("account missing".into()))
  }
}

/// Request body for a create / replace.
fn order_params(request: &OrderRequest, market: &Market) -> BrokerResult<Params> {
  let units = match request.side {
    OrderSide::Buy => decimal::abs(&request.amount)?,
    OrderSide::Sell => decimal::negate(&decimal::abs(&request.amount)?)?,
  };
  let mut order = Params::new();
  order.insert("instrument".into(), json!(market.id));
  order.insert("type".into(), json!(request.order_type.to_broker_kind()));
  order.insert("units".into(), json!(units));
  if let Some(price) = &request.price {
    decimal::parse(price)?;
    order.insert("price".into(), json!(price));
  }
  if let Some(tif) = &request.time_in_force {
    order.insert("timeInForce".into(), json!(tif.as_str()));
  }
  let mut params = Params::new();
  params.insert("order".into(), Value::Object(order));
  Ok(params)
}

/// Keep items at or after `since`, then the first `limit` of them.
pub fn filter_since_limit<X>(
  items: Vec<X>,
  since: Option<i64>,
  limit: Option<u32>,
  timestamp: impl Fn(&X) -> Option<i64>,
) -> Vec<X> {
  let kept = items
    .into_iter()
    .filter(|item| since.is_none_or(|s| timestamp(item).is_some_and(|t| t >= s)));
  match limit {
    Some(n) => kept.take(n as usize).collect(),
    None => kept.collect(),
  }
}

fn array<'a>(response: &'a Value, key: &str) -> &'a [Value] {
  response
    .get(key)
    .and_then(Value::as_array)
    .map(Vec::as_slice)
    .unwrap_or_default()
}

fn extend(target: &mut Params, extra: &Params) {
  for (key, value) in extra {
    target.insert(key.clone(), value.clone());
  }
}

fn state(value: &str) -> Params {
  let mut params = Params::new();
  params.insert("state".into(), json!(value));
  params
}

fn type_filter(types: &str) -> Params {
  let mut params = Params::new();
  params.insert("type".into(), json!(types));
  params
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_filter_since_limit() {
    let items = vec![Some(1), None, Some(5), Some(9), Some(12)];
    assert_eq!(
      filter_since_limit(items.clone(), Some(5), None, |t| *t),
      vec![Some(5), Some(9), Some(12)]
    );
    assert_eq!(
      filter_since_limit(items.clone(), None, Some(2), |t| *t),
      vec![Some(1), None]
    );
    assert_eq!(
      filter_since_limit(items, Some(5), Some(2), |t| *t),
      vec![Some(5), Some(9)]
    );
  }

  #[test]
  fn test_sell_order_params_are_negative_units() {
    let market = crate::domain::testing::fx_catalog()
      .market_by_symbol("EUR/USD")
      .unwrap();
    let request = OrderRequest {
      symbol: "EUR/USD".into(),
      order_type: OrderType::Limit,
      side: OrderSide::Sell,
      amount: "5".into(),
      price: Some("1.2000".into()),
      time_in_force: Some(TimeInForce::Gtc),
    };
    let params = order_params(&request, &market).unwrap();
    assert_eq!(
      Value::Object(params),
      json!({"order": {
        "instrument": "EUR_USD",
        "type": "LIMIT",
        "units": "-5",
        "price": "1.2000",
        "timeInForce": "GTC"
      }})
    );
  }

  #[test]
  fn test_order_params_reject_bad_price() {
    let market = crate::domain::testing::fx_catalog()
      .market_by_symbol("EUR/USD")
      .unwrap();
    let request = OrderRequest {
      symbol: "EUR/USD".into(),
      order_type: OrderType::Limit,
      side: OrderSide::Buy,
      amount: "1".into(),
      price: Some("1,2".into()),
      time_in_force: None,
    };
    assert!(matches!(
      order_params(&request, &market),
      Err(BrokerError::Decimal(_))
    ));
  }
}
