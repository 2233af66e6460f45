//! Error taxonomy shared by the normalizers, the pager and the
//! transport port.

use thiserror::Error;

use super::decimal::DecimalError;

/// Broker-side failure category, mirroring the unified exchange
/// error hierarchy the classifier maps broker codes onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    BadSymbol,
    AuthenticationError,
    OrderNotFound,
    InvalidOrder,
    /// Broker reported an error no table entry matches.
    ExchangeError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::BadRequest => "BadRequest",
            Self::BadSymbol => "BadSymbol",
            Self::AuthenticationError => "AuthenticationError",
            Self::OrderNotFound => "OrderNotFound",
            Self::InvalidOrder => "InvalidOrder",
            Self::ExchangeError => "ExchangeError",
        };
        f.write_str(name)
    }
}

/// Failure surfaced by the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection, TLS or timeout failure.
    #[error("http failure: {0}")]
    Http(String),
    /// Non-success status with no recognizable broker error body.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    /// Response body was not JSON.
    #[error("undecodable response: {0}")]
    Decode(String),
    /// Broker returned an error payload, classified.
    #[error("{kind}: {message}")]
    Exchange { kind: ErrorKind, message: String },
}

/// Everything the normalization core can fail with.
///
/// Normalizers and the interpreter never swallow these; they are
/// propagated to the caller untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// A page link whose cursor id cannot be read.
    #[error("malformed page link: {0}")]
    MalformedPageLink(String),

    /// A create/edit action the broker cancelled in the same batch.
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// An order-book bucket priced exactly at the quoted midpoint.
    #[error("unrecognized order book entry: {0}")]
    UnrecognizedBookEntry(String),

    /// Instrument id the market registry does not know.
    #[error("unknown market: {0}")]
    UnknownMarket(String),

    /// Unified symbol the market registry does not know.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    /// Order payload matching none of the known response shapes.
    #[error("unrecognized order payload: {0}")]
    UnrecognizedOrderPayload(String),

    /// Response missing a structurally required part.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Caller omitted an argument the operation cannot run without.
    #[error("arguments required: {0}")]
    ArgumentsRequired(String),

    #[error(transparent)]
    Decimal(#[from] DecimalError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result alias for core operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_error_converts() {
        let err: BrokerError = DecimalError::Malformed("x".to_string()).into();
        assert!(matches!(err, BrokerError::Decimal(_)));
    }

    #[test]
    fn test_exchange_error_display() {
        let err = TransportError::Exchange {
            kind: ErrorKind::OrderNotFound,
            message: "oanda NO_SUCH_ORDER".to_string(),
        };
        assert_eq!(err.to_string(), "OrderNotFound: oanda NO_SUCH_ORDER");
    }
}
