//! OANDA v20 REST Adapter
//!
//! Implements the transport and market-registry ports against the
//! OANDA v20 REST API.
//!
//! Sub-modules:
//! - `client`: HTTP transport with pacing, retries and Bearer auth
//! - `endpoints`: request paths, timeframes, order-book allow-list
//! - `errors`: error body classification tables
//! - `registry`: market catalogue loaded from the instruments endpoint

pub mod client;
pub mod endpoints;
pub mod errors;
pub mod registry;

pub use client::{OandaClient, OandaClientConfig};
pub use errors::OandaErrorClassifier;
pub use registry::MarketCatalog;
