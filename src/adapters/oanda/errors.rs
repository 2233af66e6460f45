//! Broker error body classification.
//!
//! OANDA reports failures as `{"errorMessage": ..., "errorCode": ...}`,
//! sometimes next to a reject transaction. The code is matched exactly
//! first, then the message by substring in table order; anything else
//! is a generic `ExchangeError`.

use serde_json::Value;

use crate::domain::error::ErrorKind;
use crate::ports::transport::{ErrorClassifier, ExchangeFailure};

/// `errorCode` → kind.
const EXACT: &[(&str, ErrorKind)] = &[
  ("UNITS_INVALID", ErrorKind::BadRequest),
  ("PRICE_INVALID", ErrorKind::BadRequest),
  ("UNITS_LIMIT_EXCEEDED", ErrorKind::BadRequest),
  ("oanda::rest::core::InvalidParameterException", ErrorKind::BadRequest),
  ("ORDER_DOESNT_EXIST", ErrorKind::OrderNotFound),
  ("NO_SUCH_ORDER", ErrorKind::OrderNotFound),
  ("INVALID_PAGESIZE", ErrorKind::BadRequest),
  ("MARGIN_RATE_INVALID", ErrorKind::BadRequest),
];

/// `errorMessage` substring → kind. First match wins, so the
/// instrument-specific entry sits before its generic prefix.
const BROAD: &[(&str, ErrorKind)] = &[
  ("Maximum value for ", ErrorKind::BadRequest),
  ("Invalid value specified for 'instrument'", ErrorKind::BadSymbol),
  ("Invalid value specified for ", ErrorKind::BadRequest),
  (" is not a valid instrument.", ErrorKind::BadSymbol),
  ("Invalid Instrument ", ErrorKind::BadSymbol),
  ("The request was missing required data", ErrorKind::BadRequest),
  ("The provided request was forbidden", ErrorKind::AuthenticationError),
  ("Insufficient authorization to perform request", ErrorKind::AuthenticationError),
  ("The order ID specified does not exist", ErrorKind::OrderNotFound),
  ("The trade ID specified does not exist", ErrorKind::BadRequest),
  ("The transaction ID specified does not exist", ErrorKind::BadRequest),
  ("The units specified exceeds the maximum number of units allowed", ErrorKind::BadRequest),
  ("The Order specified does not exist", ErrorKind::OrderNotFound),
  ("The specified page size is invalid", ErrorKind::BadRequest),
  ("The margin rate provided is invalid", ErrorKind::BadRequest),
];

/// Table-driven classifier for OANDA error bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct OandaErrorClassifier;

impl ErrorClassifier for OandaErrorClassifier {
  fn classify(&self, body: &Value) -> Option<ExchangeFailure> {
    let message = body.get("errorMessage").and_then(Value::as_str)?;
    if message.is_empty() {
      return None;
    }
    let code = body.get("errorCode").and_then(Value::as_str).unwrap_or_default();

    let kind = EXACT
      .iter()
      .find(|(key, _)| *key == code)
      .or_else(|| BROAD.iter().find(|(key, _)| message.contains(key)))
      .map_or(ErrorKind::ExchangeError, |(_, kind)| *kind);

    Some(ExchangeFailure {
      kind,
      message: message.to_string(),
    })
  }
}
