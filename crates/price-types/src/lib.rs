//! Shared types for the price resolution engine.
//!
//! This crate carries the numeric helpers, the [`Quote`] produced by every
//! price source, the [`ChainReader`] capability adapters read through, the
//! error taxonomy, and the schema utilities used to check configuration.

pub mod chain;
pub mod decimal;
pub mod errors;
pub mod quote;
pub mod validation;

pub use alloy_primitives::{address, Address, Bytes, I256, U256};
pub use chain::*;
pub use decimal::Decimal;
pub use errors::*;
pub use quote::*;
pub use validation::*;
