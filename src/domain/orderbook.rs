//! Order book reconstruction from position-ratio buckets.
//!
//! The broker's order book is a histogram: each bucket reports the
//! share of resting long and short orders at a price, without saying
//! which side of the market it belongs to. The side follows from the
//! bucket's position relative to the quoted price at snapshot time.

use serde::Deserialize;
use serde_json::Value;

use super::decimal;
use super::error::{BrokerError, BrokerResult};
use super::raw;
use super::types::{BookLevel, OrderBook};

/// One raw histogram bucket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub price: String,
    pub long_count_percent: String,
    pub short_count_percent: String,
}

/// Split buckets into `(bids, asks)` around `reference_price`.
///
/// Volume is the exact sum of the long and short percentages. Bids
/// come back descending and asks ascending, so index 0 is always the
/// best level.
///
/// # Errors
/// - `UnrecognizedBookEntry` for a bucket priced exactly at the reference
/// - `Decimal` for malformed numeric strings
pub fn reconstruct(
    buckets: &[Bucket],
    reference_price: &str,
) -> BrokerResult<(Vec<BookLevel>, Vec<BookLevel>)> {
    let reference = decimal::parse(reference_price)?;
    let mut bids = Vec::new();
    let mut asks = Vec::new();

    for bucket in buckets {
        let price = decimal::parse(&bucket.price)?;
        let level = BookLevel {
            price: bucket.price.clone(),
            volume: decimal::add(&bucket.long_count_percent, &bucket.short_count_percent)?,
        };
        if price < reference {
            bids.push((price, level));
        } else if price > reference {
            asks.push((price, level));
        } else {
            return Err(BrokerError::UnrecognizedBookEntry(format!(
                "bucket {} at quoted price {reference_price}",
                bucket.price
            )));
        }
    }

    bids.sort_by(|a, b| b.0.cmp(&a.0));
    asks.sort_by(|a, b| a.0.cmp(&b.0));

    Ok((
        bids.into_iter().map(|(_, level)| level).collect(),
        asks.into_iter().map(|(_, level)| level).collect(),
    ))
}

/// Build an `OrderBook` from the `orderBook` object of the response.
///
/// # Errors
/// `MalformedResponse` when the quoted price or bucket list is
/// unreadable, plus everything `reconstruct` returns.
pub fn parse_order_book(book: &Value, symbol: Option<String>) -> BrokerResult<OrderBook> {
    let reference = raw::string(book, "price")
        .ok_or_else(|| BrokerError::MalformedResponse("order book without quoted price".into()))?;
    let buckets: Vec<Bucket> = match book.get("buckets") {
        Some(list) => serde_json::from_value(list.clone())
            .map_err(|e| BrokerError::MalformedResponse(format!("order book buckets: {e}")))?,
        None => Vec::new(),
    };

    let (bids, asks) = reconstruct(&buckets, &reference)?;
    let timestamp = raw::string(book, "unixTime")
        .and_then(|s| s.parse::<i64>().ok())
        .map(|seconds| seconds * 1000);

    Ok(OrderBook {
        symbol,
        timestamp,
        datetime: timestamp.and_then(raw::iso8601),
        bids,
        asks,
    })
}
