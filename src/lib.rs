//! OANDA Bridge - Library Root
//!
//! Normalizes OANDA v20 REST responses into a canonical trading data
//! model. Re-exports all modules for the binary, integration tests
//! and benchmarks.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
