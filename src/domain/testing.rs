//! Shared fixtures for unit tests.

use serde_json::json;

use crate::adapters::oanda::registry::MarketCatalog;

/// A small catalogue of FX and metal instruments.
pub fn fx_catalog() -> MarketCatalog {
    let instruments = [
        json!({"name": "EUR_USD", "displayPrecision": "5", "tradeUnitsPrecision": "0", "minimumTradeSize": "1"}),
        json!({"name": "USD_JPY", "displayPrecision": "3", "tradeUnitsPrecision": "0", "minimumTradeSize": "1"}),
        json!({"name": "GBP_USD", "displayPrecision": "5", "tradeUnitsPrecision": "0", "minimumTradeSize": "1"}),
        json!({"name": "XAU_USD", "displayPrecision": "3", "tradeUnitsPrecision": "0", "minimumTradeSize": "1"}),
    ];
    MarketCatalog::from_instruments(&instruments).expect("fixture instruments are well formed")
}
