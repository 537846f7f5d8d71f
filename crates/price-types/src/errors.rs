//! Error taxonomy for price resolution.
//!
//! Only [`PriceError::ConfigurationMissing`] is ever returned to callers of the
//! engine. The other variants describe why an adapter produced a reverted
//! quote and are absorbed below the aggregator.

use crate::quote::OracleKind;
use alloy_primitives::Address;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PriceError {
	/// Adapter not deployed, not yet active, or the token is blacklisted.
	#[error("{kind} unavailable: {reason}")]
	SourceUnavailable { kind: OracleKind, reason: String },
	/// The external call reverted or returned unusable data.
	#[error("{kind} reverted: {reason}")]
	SourceReverted { kind: OracleKind, reason: String },
	/// Aggregation collected no quotes at all.
	#[error("No quote found for token {token}")]
	NoQuoteFound { token: Address },
	/// No configuration is registered for the requested network.
	#[error("No configuration registered for network '{0}'")]
	ConfigurationMissing(String),
}

impl PriceError {
	pub fn unavailable(kind: OracleKind, reason: impl fmt::Display) -> Self {
		PriceError::SourceUnavailable {
			kind,
			reason: reason.to_string(),
		}
	}

	pub fn reverted(kind: OracleKind, reason: impl fmt::Display) -> Self {
		PriceError::SourceReverted {
			kind,
			reason: reason.to_string(),
		}
	}

	/// Whether this error is part of routine data unavailability.
	pub fn is_expected(&self) -> bool {
		!matches!(self, PriceError::ConfigurationMissing(_))
	}
}
