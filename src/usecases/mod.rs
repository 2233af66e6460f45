//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! bridge's workflows.
//!
//! Use cases:
//! - `TransactionPager`: full transaction history behind page links
//! - `Exchange`: unified market, order and account operations
pub mod exchange;
pub mod pager;
