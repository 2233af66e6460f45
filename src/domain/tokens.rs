//! Enum-like tokens on both sides of the normalization boundary.
//!
//! Broker tokens (`PENDING`, `LIMIT_ORDER`, ...) and canonical tokens
//! (`open`, `limit`, ...) are tagged variants with an `Other` arm that
//! carries any value the tables do not know. Mapping broker → canonical
//! is an explicit partial function; an unknown token passes through
//! verbatim instead of failing, so new broker values never break
//! normalization.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Declares a token enum with a pass-through `Other(String)` arm.
macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $token:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            /// Token outside the known table, kept verbatim.
            Other(String),
        }

        impl $name {
            /// Parse a token, falling back to `Other` for unknown values.
            pub fn parse(token: &str) -> Self {
                match token {
                    $($token => Self::$variant,)+
                    other => Self::Other(other.to_string()),
                }
            }

            /// Wire representation of the token.
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $token,)+
                    Self::Other(token) => token.as_str(),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let token = String::deserialize(deserializer)?;
                Ok(Self::parse(&token))
            }
        }
    };
}

// ────────────────────────────────────────────
// Canonical tokens
// ────────────────────────────────────────────

token_enum! {
    /// Canonical order lifecycle status.
    OrderStatus {
        Open => "open",
        Closed => "closed",
        Canceled => "canceled",
        Rejected => "rejected",
        Unknown => "unknown",
    }
}

token_enum! {
    /// Canonical order type.
    OrderType {
        Market => "market",
        Limit => "limit",
        Stop => "stop",
        /// Cancellation record reported in the type slot.
        Cancel => "cancel",
        /// Fill record reported in the type slot.
        Close => "close",
    }
}

token_enum! {
    /// Time in force. Broker and canonical spellings coincide.
    TimeInForce {
        Gtc => "GTC",
        Ioc => "IOC",
        Fok => "FOK",
        Gtd => "GTD",
    }
}

token_enum! {
    /// Canonical position status.
    PositionStatus {
        Open => "open",
        Closed => "closed",
        Unknown => "unknown",
    }
}

token_enum! {
    /// Canonical ledger entry category.
    LedgerEntryType {
        Trade => "trade",
        Transaction => "transaction",
        Margin => "margin",
    }
}

token_enum! {
    /// Canonical transfer category.
    TransferType {
        Deposit => "deposit",
        Withdrawal => "withdrawal",
    }
}

// ────────────────────────────────────────────
// Broker tokens
// ────────────────────────────────────────────

token_enum! {
    /// `state` of an order record from the orders endpoints.
    BrokerOrderState {
        Pending => "PENDING",
        Filled => "FILLED",
        Triggered => "TRIGGERED",
        Cancelled => "CANCELLED",
        Rejected => "REJECTED",
    }
}

token_enum! {
    /// `type` of an order record from the orders endpoints.
    BrokerOrderKind {
        Market => "MARKET",
        Limit => "LIMIT",
        Stop => "STOP",
    }
}

token_enum! {
    /// `type` of an order-affecting transaction record.
    BrokerTransactionType {
        MarketOrder => "MARKET_ORDER",
        LimitOrder => "LIMIT_ORDER",
        StopOrder => "STOP_ORDER",
        OrderCancel => "ORDER_CANCEL",
        OrderFill => "ORDER_FILL",
    }
}

token_enum! {
    /// `state` of a trade record (the broker's view of a position).
    BrokerTradeState {
        Open => "OPEN",
        Closed => "CLOSED",
        CloseWhenTradeable => "CLOSE_WHEN_TRADEABLE",
    }
}

impl From<BrokerOrderState> for OrderStatus {
    fn from(state: BrokerOrderState) -> Self {
        match state {
            BrokerOrderState::Pending => Self::Open,
            BrokerOrderState::Filled | BrokerOrderState::Triggered => Self::Closed,
            BrokerOrderState::Cancelled => Self::Canceled,
            BrokerOrderState::Rejected => Self::Rejected,
            BrokerOrderState::Other(token) => Self::Other(token),
        }
    }
}

impl From<BrokerOrderKind> for OrderType {
    fn from(kind: BrokerOrderKind) -> Self {
        match kind {
            BrokerOrderKind::Market => Self::Market,
            BrokerOrderKind::Limit => Self::Limit,
            BrokerOrderKind::Stop => Self::Stop,
            BrokerOrderKind::Other(token) => Self::Other(token),
        }
    }
}

impl From<BrokerTransactionType> for OrderType {
    fn from(kind: BrokerTransactionType) -> Self {
        match kind {
            BrokerTransactionType::MarketOrder => Self::Market,
            BrokerTransactionType::LimitOrder => Self::Limit,
            BrokerTransactionType::StopOrder => Self::Stop,
            BrokerTransactionType::OrderCancel => Self::Cancel,
            BrokerTransactionType::OrderFill => Self::Close,
            BrokerTransactionType::Other(token) => Self::Other(token),
        }
    }
}

impl From<BrokerTradeState> for PositionStatus {
    fn from(state: BrokerTradeState) -> Self {
        match state {
            BrokerTradeState::Open => Self::Open,
            BrokerTradeState::Closed => Self::Closed,
            BrokerTradeState::CloseWhenTradeable => Self::Unknown,
            BrokerTradeState::Other(token) => Self::Other(token),
        }
    }
}

impl OrderType {
    /// Broker order-kind token for an outgoing order request.
    ///
    /// Inverse of the order-kind table; unknown canonical types are
    /// sent upper-cased so broker-native kinds can be requested directly.
    pub fn to_broker_kind(&self) -> String {
        match self {
            Self::Market => BrokerOrderKind::Market.as_str().to_string(),
            Self::Limit => BrokerOrderKind::Limit.as_str().to_string(),
            Self::Stop => BrokerOrderKind::Stop.as_str().to_string(),
            other => other.as_str().to_ascii_uppercase(),
        }
    }
}

impl LedgerEntryType {
    /// Ledger category of a transaction `type`.
    pub fn from_transaction_type(token: &str) -> Self {
        match token {
            "FUNDING" | "TRANSFER_FUNDS" | "TRANSFER_FUNDS_REJECT" | "DAILY_FINANCING" => {
                Self::Transaction
            }
            "MARGIN_CALL_ENTER" | "MARGIN_CALL_EXTEND" | "MARGIN_CALL_EXIT"
            | "RESET_RESETTABLE_PL" => Self::Margin,
            "ORDER"
            | "MARKET_ORDER"
            | "MARKET_ORDER_REJECT"
            | "LIMIT_ORDER"
            | "LIMIT_ORDER_REJECT"
            | "STOP_ORDER"
            | "STOP_ORDER_REJECT"
            | "MARKET_IF_TOUCHED_ORDER"
            | "MARKET_IF_TOUCHED_ORDER_REJECT"
            | "TAKE_PROFIT_ORDER"
            | "TAKE_PROFIT_ORDER_REJECT"
            | "STOP_LOSS_ORDER"
            | "STOP_LOSS_ORDER_REJECT"
            | "GUARANTEED_STOP_LOSS_ORDER"
            | "GUARANTEED_STOP_LOSS_ORDER_REJECT"
            | "TRAILING_STOP_LOSS_ORDER"
            | "TRAILING_STOP_LOSS_ORDER_REJECT"
            | "ONE_CANCELS_ALL_ORDER"
            | "ONE_CANCELS_ALL_ORDER_REJECT"
            | "ONE_CANCELS_ALL_ORDER_TRIGGERED"
            | "ORDER_FILL"
            | "ORDER_CANCEL"
            | "ORDER_CANCEL_REJECT"
            | "ORDER_CLIENT_EXTENSIONS_MODIFY"
            | "ORDER_CLIENT_EXTENSIONS_MODIFY_REJECT"
            | "TRADE_CLIENT_EXTENSIONS_MODIFY"
            | "TRADE_CLIENT_EXTENSIONS_MODIFY_REJECT"
            | "DELAYED_TRADE_CLOSURE" => Self::Trade,
            other => Self::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_state_table() {
        let cases = [
            ("PENDING", OrderStatus::Open),
            ("FILLED", OrderStatus::Closed),
            ("TRIGGERED", OrderStatus::Closed),
            ("CANCELLED", OrderStatus::Canceled),
            ("REJECTED", OrderStatus::Rejected),
        ];
        for (token, expected) in cases {
            assert_eq!(OrderStatus::from(BrokerOrderState::parse(token)), expected);
        }
    }

    #[test]
    fn test_unknown_tokens_pass_through() {
        let status = OrderStatus::from(BrokerOrderState::parse("PARKED"));
        assert_eq!(status, OrderStatus::Other("PARKED".to_string()));
        assert_eq!(status.as_str(), "PARKED");

        let kind = OrderType::from(BrokerOrderKind::parse("TAKE_PROFIT"));
        assert_eq!(kind.as_str(), "TAKE_PROFIT");

        assert_eq!(TimeInForce::parse("GFD").as_str(), "GFD");
        assert_eq!(LedgerEntryType::from_transaction_type("CREATE").as_str(), "CREATE");
    }

    #[test]
    fn test_transaction_type_table() {
        assert_eq!(OrderType::from(BrokerTransactionType::parse("LIMIT_ORDER")), OrderType::Limit);
        assert_eq!(OrderType::from(BrokerTransactionType::parse("ORDER_FILL")), OrderType::Close);
        assert_eq!(OrderType::from(BrokerTransactionType::parse("ORDER_CANCEL")), OrderType::Cancel);
    }

    #[test]
    fn test_trade_state_table() {
        assert_eq!(PositionStatus::from(BrokerTradeState::parse("OPEN")), PositionStatus::Open);
        assert_eq!(
            PositionStatus::from(BrokerTradeState::parse("CLOSE_WHEN_TRADEABLE")),
            PositionStatus::Unknown
        );
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&OrderStatus::Canceled).unwrap();
        assert_eq!(json, "\"canceled\"");
        let back: OrderStatus = serde_json::from_str("\"weird\"").unwrap();
        assert_eq!(back, OrderStatus::Other("weird".to_string()));
    }

    #[test]
    fn test_outgoing_order_kind() {
        assert_eq!(OrderType::Limit.to_broker_kind(), "LIMIT");
        assert_eq!(OrderType::parse("market_if_touched").to_broker_kind(), "MARKET_IF_TOUCHED");
    }
}
