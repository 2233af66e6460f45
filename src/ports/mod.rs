//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) the normalization core requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `BrokerTransport` / `ErrorClassifier`: raw requests and error triage
//! - `MarketRegistry`: static instrument metadata

pub mod markets;
pub mod transport;
