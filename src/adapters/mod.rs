//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies.
//!
//! Adapter categories:
//! - `oanda`: OANDA v20 REST transport, error tables and market catalogue
//! - `metrics`: Prometheus request and pager metrics

pub mod metrics;
pub mod oanda;
