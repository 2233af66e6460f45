//! Entity normalizers.
//!
//! Pure mappings from raw broker records to canonical entities. No
//! I/O, no shared state: the same record always yields the same
//! output. Symbols are resolved through the market registry by
//! instrument id; missing raw fields stay `None`.

use serde_json::Value;

use super::decimal;
use super::error::{BrokerError, BrokerResult};
use super::raw;
use super::tokens::{
    BrokerOrderKind, BrokerTradeState, LedgerEntryType, OrderType, PositionStatus, TransferType,
};
use super::types::{
    Balance, Candle, Fee, LedgerDirection, LedgerEntry, Market, MarketLimits, MarketPrecision,
    OrderSide, Position, PositionSide, Ticker, Trade, Transfer,
};
use crate::ports::markets::{resolve_symbol, MarketRegistry};

/// Separator between base and quote in broker instrument ids.
pub const INSTRUMENT_DELIMITER: char = '_';

/// Build a `Market` from one entry of the instruments catalogue.
///
/// This is the only place an instrument id is split into base and
/// quote; everything else resolves symbols through the registry.
///
/// # Errors
/// `MalformedResponse` when the entry has no usable `name`.
pub fn market_from_instrument(
    instrument: &Value,
    currency_code: impl Fn(&str) -> String,
) -> BrokerResult<Market> {
    let id = raw::string(instrument, "name")
        .ok_or_else(|| BrokerError::MalformedResponse("instrument without name".into()))?;
    let (base_id, quote_id) = id
        .split_once(INSTRUMENT_DELIMITER)
        .ok_or_else(|| BrokerError::MalformedResponse(format!("instrument id {id}")))?;
    let base = currency_code(base_id);
    let quote = currency_code(quote_id);

    Ok(Market {
        symbol: format!("{base}/{quote}"),
        base,
        quote,
        base_id: base_id.to_string(),
        quote_id: quote_id.to_string(),
        precision: MarketPrecision {
            amount: raw::string(instrument, "tradeUnitsPrecision"),
            price: raw::string(instrument, "displayPrecision"),
        },
        limits: MarketLimits {
            amount_min: raw::string(instrument, "minimumTradeSize"),
            leverage_min: Some("1".to_string()),
        },
        id,
        info: instrument.clone(),
    })
}

/// Normalize a trade record (the broker's per-fill position).
///
/// # Errors
/// `UnknownMarket` for unloaded instruments; malformed numbers.
pub fn position(
    record: &Value,
    market: Option<&Market>,
    registry: &dyn MarketRegistry,
) -> BrokerResult<Position> {
    let instrument = raw::string(record, "instrument");
    let timestamp = raw::timestamp(record, "openTime");
    let initial_units = raw::string(record, "initialUnits");

    let (side, contracts) = match initial_units.as_deref() {
        Some(units) => {
            let side = if decimal::is_positive(units)? {
                PositionSide::Long
            } else {
                PositionSide::Short
            };
            (Some(side), Some(decimal::abs(units)?))
        }
        None => (None, None),
    };

    Ok(Position {
        id: raw::string(record, "id"),
        symbol: resolve_symbol(registry, instrument.as_deref(), market)?,
        timestamp,
        datetime: timestamp.and_then(raw::iso8601),
        side,
        entry_price: raw::string(record, "price"),
        contracts,
        unrealized_pnl: raw::string(record, "unrealizedPL"),
        realized_pnl: raw::string(record, "realizedPL"),
        status: raw::string(record, "state")
            .map(|s| PositionStatus::from(BrokerTradeState::parse(&s))),
        collateral: raw::string(record, "marginUsed"),
        info: record.clone(),
    })
}

/// Normalize a fill: an `ORDER_FILL` transaction or a closed trade record.
///
/// # Errors
/// `UnknownMarket` for unloaded instruments; malformed numbers.
pub fn trade(
    record: &Value,
    market: Option<&Market>,
    registry: &dyn MarketRegistry,
) -> BrokerResult<Trade> {
    let instrument = raw::string(record, "instrument");
    let timestamp = raw::string_any(record, &["time", "closeTime"]).and_then(|d| raw::parse_date(&d));
    let units = raw::string_any(record, &["units", "initialUnits"]);

    let (side, amount) = match units.as_deref() {
        Some(units) => {
            let side = if decimal::is_positive(units)? {
                OrderSide::Buy
            } else {
                OrderSide::Sell
            };
            (Some(side), Some(decimal::abs(units)?))
        }
        None => (None, None),
    };

    Ok(Trade {
        id: raw::string(record, "id"),
        timestamp,
        datetime: timestamp.and_then(raw::iso8601),
        symbol: resolve_symbol(registry, instrument.as_deref(), market)?,
        order: raw::string_any(record, &["orderID", "batchID"]),
        order_type: raw::string(record, "type").map(|t| OrderType::from(BrokerOrderKind::parse(&t))),
        side,
        price: raw::string_any(record, &["price", "averageClosePrice"]),
        amount,
        fee: raw::string(record, "commission").map(|cost| Fee { currency: None, cost }),
        info: record.clone(),
    })
}

/// Normalize one transaction into a ledger entry.
///
/// Direction and amount come from signed `units`, or from the signed
/// `amount` of funding records that carry no units.
///
/// # Errors
/// `UnknownMarket` for unloaded instruments; malformed numbers.
pub fn ledger_entry(
    record: &Value,
    currency: Option<&str>,
    registry: &dyn MarketRegistry,
) -> BrokerResult<LedgerEntry> {
    let instrument = raw::string(record, "instrument");
    let timestamp = raw::timestamp(record, "time");
    let signed = raw::string_any(record, &["units", "amount"]);

    let (direction, amount) = match signed.as_deref() {
        Some(value) => {
            let direction = if decimal::is_positive(value)? {
                LedgerDirection::In
            } else {
                LedgerDirection::Out
            };
            (Some(direction), Some(decimal::abs(value)?))
        }
        None => (None, None),
    };

    Ok(LedgerEntry {
        id: raw::string(record, "id"),
        timestamp,
        datetime: timestamp.and_then(raw::iso8601),
        direction,
        account: raw::string(record, "accountID"),
        reference_id: raw::string(record, "requestID"),
        entry_type: raw::string(record, "type").map(|t| LedgerEntryType::from_transaction_type(&t)),
        currency: currency.map(str::to_string),
        symbol: resolve_symbol(registry, instrument.as_deref(), None)?,
        amount,
        after: raw::string(record, "accountBalance"),
        status: "ok".to_string(),
        info: record.clone(),
    })
}

/// Normalize a transaction log into a chronologically ordered ledger.
///
/// Sorted ascending by time, ties broken by numeric transaction id.
/// Entries without a readable time go last.
///
/// # Errors
/// First error from `ledger_entry`.
pub fn ledger(
    records: &[Value],
    currency: Option<&str>,
    registry: &dyn MarketRegistry,
) -> BrokerResult<Vec<LedgerEntry>> {
    let mut entries = records
        .iter()
        .map(|record| ledger_entry(record, currency, registry))
        .collect::<BrokerResult<Vec<_>>>()?;
    entries.sort_by_key(|entry| {
        (
            entry.timestamp.is_none(),
            entry.timestamp,
            numeric_id(entry.id.as_deref()),
        )
    });
    Ok(entries)
}

/// Normalize a funding transaction.
///
/// `CLIENT_FUNDING` transfers become deposits or withdrawals by the
/// sign of `amount`; any other funding reason passes through as the type.
///
/// # Errors
/// Malformed numbers.
pub fn transfer(record: &Value, currency: Option<&str>) -> BrokerResult<Transfer> {
    let timestamp = raw::timestamp(record, "time");
    let amount = raw::string(record, "amount");
    let transfer_type = if raw::string(record, "type").as_deref() == Some("TRANSFER_FUNDS") {
        match raw::string(record, "fundingReason").as_deref() {
            Some("CLIENT_FUNDING") => match amount.as_deref() {
                Some(value) if decimal::is_positive(value)? => Some(TransferType::Deposit),
                Some(_) => Some(TransferType::Withdrawal),
                None => None,
            },
            Some(reason) => Some(TransferType::parse(reason)),
            None => None,
        }
    } else {
        None
    };

    Ok(Transfer {
        id: raw::string(record, "id"),
        timestamp,
        datetime: timestamp.and_then(raw::iso8601),
        currency: currency.map(str::to_string),
        amount,
        transfer_type,
        txid: raw::string(record, "requestID"),
        info: record.clone(),
    })
}

/// Normalize a pricing record into a ticker.
///
/// # Errors
/// `UnknownMarket` for unloaded instruments.
pub fn ticker(
    record: &Value,
    market: Option<&Market>,
    registry: &dyn MarketRegistry,
) -> BrokerResult<Ticker> {
    let instrument = raw::string(record, "instrument");
    let timestamp = raw::timestamp(record, "time");
    let best_bid = record.get("bids").and_then(|levels| levels.get(0));
    let best_ask = record.get("asks").and_then(|levels| levels.get(0));

    Ok(Ticker {
        symbol: resolve_symbol(registry, instrument.as_deref(), market)?,
        timestamp,
        datetime: timestamp.and_then(raw::iso8601),
        bid: best_bid.and_then(|level| raw::string(level, "price")),
        bid_volume: best_bid.and_then(|level| raw::string(level, "liquidity")),
        ask: best_ask.and_then(|level| raw::string(level, "price")),
        ask_volume: best_ask.and_then(|level| raw::string(level, "liquidity")),
        percentage: raw::string(record, "percentChange"),
        base_volume: raw::string(record, "baseVolume"),
        quote_volume: raw::string(record, "quoteVolume"),
        info: record.clone(),
    })
}

/// Normalize a candle into an OHLCV bar.
///
/// Open and close come from the mid series, high from the ask series
/// and low from the bid series.
pub fn candle(record: &Value) -> Candle {
    let series = |name: &str, field: &str| record.get(name).and_then(|s| raw::string(s, field));
    Candle {
        timestamp: raw::timestamp(record, "time"),
        open: series("mid", "o"),
        high: series("ask", "h"),
        low: series("bid", "l"),
        close: series("mid", "c"),
        volume: raw::string(record, "volume"),
    }
}

/// Normalize the account summary into a balance.
pub fn balance(account: &Value, registry: &dyn MarketRegistry) -> Balance {
    Balance {
        currency: raw::string(account, "currency").map(|id| registry.currency_code(&id)),
        free: raw::string(account, "balance"),
        used: None,
        total: None,
        info: account.clone(),
    }
}

/// Broker ids are decimal integers; non-numeric ids sort last.
fn numeric_id(id: Option<&str>) -> u64 {
    id.and_then(|s| s.parse().ok()).unwrap_or(u64::MAX)
}
