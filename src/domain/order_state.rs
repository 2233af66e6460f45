//! Order state interpreter.
//!
//! The broker never reports an explicit status when an order is
//! created, replaced or cancelled. It returns a batch of transaction
//! records instead, and the status follows from which record came
//! last. This module makes that sequence explicit and turns it, or a
//! plain order record from the list/get endpoints, into an `Order`.

use serde_json::Value;

use super::decimal;
use super::error::{BrokerError, BrokerResult};
use super::raw;
use super::tokens::{
    BrokerOrderKind, BrokerOrderState, BrokerTransactionType, OrderStatus, OrderType, TimeInForce,
};
use super::types::{Market, Order, OrderSide};
use crate::ports::markets::{resolve_symbol, MarketRegistry};

/// Order-affecting transaction kinds that can appear in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Create,
    Fill,
    Cancel,
}

impl TransactionKind {
    /// Response key carrying this kind of record.
    pub fn response_key(self) -> &'static str {
        match self {
            Self::Create => "orderCreateTransaction",
            Self::Fill => "orderFillTransaction",
            Self::Cancel => "orderCancelTransaction",
        }
    }

    fn from_response_key(key: &str) -> Option<Self> {
        match key {
            "orderCreateTransaction" => Some(Self::Create),
            "orderFillTransaction" => Some(Self::Fill),
            "orderCancelTransaction" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// Transactions returned together for one order action, in
/// chronological order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionBundle {
    entries: Vec<(TransactionKind, Value)>,
}

impl TransactionBundle {
    /// Build a bundle from an explicit sequence.
    pub fn new(entries: Vec<(TransactionKind, Value)>) -> Self {
        Self { entries }
    }

    /// Extract the bundle from a create/edit/cancel response.
    ///
    /// The sequence follows the response's key order; keys that are not
    /// order transactions (`relatedTransactionIDs`, ...) are skipped.
    pub fn from_response(response: &Value) -> Self {
        let entries = response
            .as_object()
            .map(|object| {
                object
                    .iter()
                    .filter_map(|(key, record)| {
                        TransactionKind::from_response_key(key).map(|kind| (kind, record.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First record of the given kind.
    pub fn get(&self, kind: TransactionKind) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, record)| record)
    }

    /// Kind of the chronologically last record.
    pub fn terminal(&self) -> Option<TransactionKind> {
        self.entries.last().map(|(kind, _)| *kind)
    }

    pub fn entries(&self) -> &[(TransactionKind, Value)] {
        &self.entries
    }
}

/// Normalize any order payload: a create/edit/cancel response or an
/// order record from the list/get endpoints.
///
/// # Errors
/// - `InvalidOrder` when a create/edit batch ends in a cancellation
/// - `UnknownMarket` when the instrument is not in the registry
/// - `UnrecognizedOrderPayload` for any other payload shape
pub fn interpret(
    payload: &Value,
    market: Option<&Market>,
    registry: &dyn MarketRegistry,
) -> BrokerResult<Order> {
    let bundle = TransactionBundle::from_response(payload);
    if bundle.get(TransactionKind::Create).is_some() {
        interpret_action(&bundle, payload, market, registry)
    } else if let Some(cancel) = bundle.get(TransactionKind::Cancel) {
        Ok(interpret_cancel(cancel, payload, market))
    } else if payload.get("createTime").is_some() {
        interpret_record(payload, market, registry)
    } else {
        Err(BrokerError::UnrecognizedOrderPayload(payload.to_string()))
    }
}

/// Status of a create/edit batch from its terminal record.
///
/// # Errors
/// `InvalidOrder` carrying the broker's reason when the batch ends in
/// a cancellation: the broker rejected the request outright.
pub fn action_status(bundle: &TransactionBundle) -> BrokerResult<OrderStatus> {
    match bundle.terminal() {
        Some(TransactionKind::Cancel) => {
            let reason = bundle
                .get(TransactionKind::Cancel)
                .and_then(|cancel| raw::string(cancel, "reason"))
                .unwrap_or_else(|| "order cancelled on creation".to_string());
            Err(BrokerError::InvalidOrder(reason))
        }
        Some(TransactionKind::Fill) => Ok(OrderStatus::Closed),
        Some(TransactionKind::Create) => Ok(OrderStatus::Open),
        None => Ok(OrderStatus::Unknown),
    }
}

/// Side and absolute amount from signed broker units.
///
/// # Errors
/// Propagates malformed numeric strings.
pub fn side_and_amount(units: Option<&str>) -> BrokerResult<(Option<OrderSide>, Option<String>)> {
    let Some(units) = units else {
        return Ok((None, None));
    };
    let side = if decimal::is_positive(units)? {
        OrderSide::Buy
    } else {
        OrderSide::Sell
    };
    Ok((Some(side), Some(decimal::abs(units)?)))
}

fn interpret_action(
    bundle: &TransactionBundle,
    payload: &Value,
    market: Option<&Market>,
    registry: &dyn MarketRegistry,
) -> BrokerResult<Order> {
    let status = action_status(bundle)?;
    let create = bundle
        .get(TransactionKind::Create)
        .ok_or_else(|| BrokerError::UnrecognizedOrderPayload(payload.to_string()))?;

    let units = raw::string(create, "units");
    let (side, amount) = side_and_amount(units.as_deref())?;
    let instrument = raw::string(create, "instrument");
    let timestamp = raw::timestamp(create, "time");

    Ok(Order {
        id: raw::string(create, "id"),
        timestamp,
        datetime: timestamp.and_then(raw::iso8601),
        status,
        order_type: raw::string(create, "type")
            .map(|t| OrderType::from(BrokerTransactionType::parse(&t))),
        side,
        symbol: resolve_symbol(registry, instrument.as_deref(), market)?,
        time_in_force: raw::string(create, "timeInForce").map(|t| TimeInForce::parse(&t)),
        price: raw::string(create, "price"),
        amount,
        filled: None,
        remaining: None,
        info: payload.clone(),
    })
}

fn interpret_cancel(cancel: &Value, payload: &Value, market: Option<&Market>) -> Order {
    let timestamp = raw::timestamp(cancel, "time");
    Order {
        id: raw::string(cancel, "orderID"),
        timestamp,
        datetime: timestamp.and_then(raw::iso8601),
        // A standalone cancellation only comes back from a successful cancel request.
        status: OrderStatus::Canceled,
        order_type: None,
        side: None,
        symbol: market.map(|m| m.symbol.clone()),
        time_in_force: None,
        price: None,
        amount: None,
        filled: None,
        remaining: None,
        info: payload.clone(),
    }
}

fn interpret_record(
    record: &Value,
    market: Option<&Market>,
    registry: &dyn MarketRegistry,
) -> BrokerResult<Order> {
    let units = raw::string(record, "units");
    let (side, amount) = side_and_amount(units.as_deref())?;
    let instrument = raw::string(record, "instrument");
    let timestamp = raw::timestamp(record, "createTime");
    let state = raw::string(record, "state").map(|s| BrokerOrderState::parse(&s));

    let (filled, remaining) = match state {
        Some(BrokerOrderState::Filled) => (amount.clone(), None),
        Some(BrokerOrderState::Pending | BrokerOrderState::Triggered) => (None, amount.clone()),
        _ => (None, None),
    };

    Ok(Order {
        id: raw::string(record, "id"),
        timestamp,
        datetime: timestamp.and_then(raw::iso8601),
        status: state.map_or(OrderStatus::Unknown, OrderStatus::from),
        order_type: raw::string(record, "type").map(|t| OrderType::from(BrokerOrderKind::parse(&t))),
        side,
        symbol: resolve_symbol(registry, instrument.as_deref(), market)?,
        time_in_force: raw::string(record, "timeInForce").map(|t| TimeInForce::parse(&t)),
        price: raw::string(record, "price"),
        amount,
        filled,
        remaining,
        info: record.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::fx_catalog;
    use serde_json::json;

    fn create_tx(units: &str) -> Value {
        json!({
            "id": "13",
            "time": "2022-02-03T11:38:15.490811234Z",
            "type": "LIMIT_ORDER",
            "instrument": "USD_JPY",
            "units": units,
            "price": "101.000",
            "timeInForce": "GTC",
            "reason": "CLIENT_ORDER"
        })
    }

    #[test]
    fn test_bare_create_is_open() {
        let registry = fx_catalog();
        let response = json!({
            "orderCreateTransaction": create_tx("-1"),
            "relatedTransactionIDs": ["13"],
            "lastTransactionID": "13"
        });
        let order = interpret(&response, None, &registry).unwrap();
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.id.as_deref(), Some("13"));
        assert_eq!(order.side, Some(OrderSide::Sell));
        assert_eq!(order.amount.as_deref(), Some("1"));
        assert_eq!(order.order_type, Some(OrderType::Limit));
        assert_eq!(order.time_in_force, Some(TimeInForce::Gtc));
        assert_eq!(order.symbol.as_deref(), Some("USD/JPY"));
        assert_eq!(order.price.as_deref(), Some("101.000"));
        assert_eq!(order.timestamp, Some(1_643_888_295_490));
    }

    #[test]
    fn test_create_then_fill_is_closed() {
        let registry = fx_catalog();
        let response = json!({
            "orderCreateTransaction": create_tx("3"),
            "orderFillTransaction": {"id": "14", "type": "ORDER_FILL", "orderID": "13", "units": "3"},
            "lastTransactionID": "14"
        });
        let order = interpret(&response, None, &registry).unwrap();
        assert_eq!(order.status, OrderStatus::Closed);
        assert_eq!(order.side, Some(OrderSide::Buy));
        assert_eq!(order.amount.as_deref(), Some("3"));
    }

    #[test]
    fn test_create_then_cancel_is_rejected_request() {
        let registry = fx_catalog();
        let response = json!({
            "orderCreateTransaction": create_tx("1"),
            "orderCancelTransaction": {"id": "69", "orderID": "68", "reason": "MARKET_HALTED"}
        });
        let err = interpret(&response, None, &registry).unwrap_err();
        assert_eq!(err, BrokerError::InvalidOrder("MARKET_HALTED".to_string()));
    }

    #[test]
    fn test_edit_batch_leading_cancel_is_open() {
        let registry = fx_catalog();
        let response = json!({
            "orderCancelTransaction": {
                "id": "43", "orderID": "42", "replacedByOrderID": "44",
                "reason": "CLIENT_REQUEST_REPLACED"
            },
            "orderCreateTransaction": create_tx("1"),
            "relatedTransactionIDs": ["43", "44"]
        });
        let order = interpret(&response, None, &registry).unwrap();
        assert_eq!(order.status, OrderStatus::Open);
    }

    #[test]
    fn test_explicit_sequence_drives_status() {
        let bundle = TransactionBundle::new(vec![
            (TransactionKind::Fill, json!({})),
            (TransactionKind::Create, create_tx("1")),
        ]);
        assert_eq!(action_status(&bundle).unwrap(), OrderStatus::Open);
        assert_eq!(bundle.terminal(), Some(TransactionKind::Create));
    }

    #[test]
    fn test_cancel_only_response() {
        let registry = fx_catalog();
        let response = json!({
            "orderCancelTransaction": {
                "id": "51",
                "time": "2022-02-04T17:58:18.182828031Z",
                "type": "ORDER_CANCEL",
                "orderID": "50",
                "reason": "CLIENT_REQUEST"
            },
            "relatedTransactionIDs": ["51"]
        });
        let order = interpret(&response, None, &registry).unwrap();
        assert_eq!(order.id.as_deref(), Some("50"));
        assert_eq!(order.status, OrderStatus::Canceled);
        assert!(order.timestamp.is_some());
        assert_eq!(order.symbol, None);
    }

    #[test]
    fn test_direct_record_states() {
        let registry = fx_catalog();
        let pending = json!({
            "id": "7", "createTime": "2022-02-03T07:56:42.515274170Z", "type": "LIMIT",
            "instrument": "USD_JPY", "units": "-2", "price": "101.000",
            "timeInForce": "GTC", "state": "PENDING"
        });
        let order = interpret(&pending, None, &registry).unwrap();
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.remaining.as_deref(), Some("2"));
        assert_eq!(order.filled, None);

        let cancelled = json!({
            "id": "8", "createTime": "2022-02-03T07:56:42Z", "type": "LIMIT",
            "instrument": "USD_JPY", "units": "1", "state": "CANCELLED"
        });
        let order = interpret(&cancelled, None, &registry).unwrap();
        assert_eq!(order.status, OrderStatus::Canceled);
        assert_eq!(order.filled, None);
        assert_eq!(order.remaining, None);
    }

    #[test]
    fn test_filled_market_record() {
        let registry = fx_catalog();
        let record = json!({
            "id": "15", "createTime": "2022-02-03T11:38:15.490811234Z", "type": "MARKET",
            "instrument": "USD_JPY", "units": "1", "timeInForce": "FOK", "state": "FILLED"
        });
        let order = interpret(&record, None, &registry).unwrap();
        assert_eq!(order.status, OrderStatus::Closed);
        assert_eq!(order.side, Some(OrderSide::Buy));
        assert_eq!(order.order_type, Some(OrderType::Market));
        assert_eq!(order.symbol.as_deref(), Some("USD/JPY"));
        assert_eq!(order.amount.as_deref(), Some("1"));
        assert_eq!(order.filled.as_deref(), Some("1"));
        assert_eq!(order.remaining, None);
    }

    #[test]
    fn test_triggered_record_keeps_remaining() {
        let registry = fx_catalog();
        let record = json!({
            "id": "16", "createTime": "2022-02-03T11:40:00Z", "type": "STOP",
            "instrument": "EUR_USD", "units": "-4", "price": "1.14000", "state": "TRIGGERED"
        });
        let order = interpret(&record, None, &registry).unwrap();
        assert_eq!(order.status, OrderStatus::Closed);
        assert_eq!(order.side, Some(OrderSide::Sell));
        assert_eq!(order.filled, None);
        assert_eq!(order.remaining.as_deref(), Some("4"));
    }

    #[test]
    fn test_side_and_amount_from_units() {
        assert_eq!(
            side_and_amount(Some("-5")).unwrap(),
            (Some(OrderSide::Sell), Some("5".to_string()))
        );
        assert_eq!(
            side_and_amount(Some("3")).unwrap(),
            (Some(OrderSide::Buy), Some("3".to_string()))
        );
        assert_eq!(
            side_and_amount(Some("0")).unwrap(),
            (Some(OrderSide::Sell), Some("0".to_string()))
        );
        assert_eq!(side_and_amount(None).unwrap(), (None, None));
        assert!(side_and_amount(Some("five")).is_err());
    }

    #[test]
    fn test_numeric_units_keep_their_text() {
        let registry = fx_catalog();
        let record: Value = serde_json::from_str(
            r#"{"id": "17", "createTime": "2022-02-03T11:40:00Z", "type": "LIMIT",
                "instrument": "USD_JPY", "units": 12345678901234567.25, "price": 101.10,
                "state": "PENDING"}"#,
        )
        .unwrap();
        let order = interpret(&record, None, &registry).unwrap();
        assert_eq!(order.amount.as_deref(), Some("12345678901234567.25"));
        assert_eq!(order.remaining.as_deref(), Some("12345678901234567.25"));
        assert_eq!(order.price.as_deref(), Some("101.10"));
    }

    #[test]
    fn test_unknown_state_and_type_pass_through() {
        let registry = fx_catalog();
        let record = json!({
            "id": "9", "createTime": "2022-02-03T07:56:42Z", "type": "TRAILING_STOP_LOSS",
            "instrument": "USD_JPY", "units": "1", "state": "PARKED", "timeInForce": "GFD"
        });
        let order = interpret(&record, None, &registry).unwrap();
        assert_eq!(order.status.as_str(), "PARKED");
        assert_eq!(order.order_type.unwrap().as_str(), "TRAILING_STOP_LOSS");
        assert_eq!(order.time_in_force.unwrap().as_str(), "GFD");
    }

    #[test]
    fn test_unknown_instrument_propagates() {
        let registry = fx_catalog();
        let record = json!({
            "id": "9", "createTime": "2022-02-03T07:56:42Z", "type": "MARKET",
            "instrument": "XXX_YYY", "units": "1", "state": "FILLED"
        });
        let err = interpret(&record, None, &registry).unwrap_err();
        assert_eq!(err, BrokerError::UnknownMarket("XXX_YYY".to_string()));
    }

    #[test]
    fn test_unrecognized_payload() {
        let registry = fx_catalog();
        let err = interpret(&json!({"lastTransactionID": "3"}), None, &registry).unwrap_err();
        assert!(matches!(err, BrokerError::UnrecognizedOrderPayload(_)));
    }
}
