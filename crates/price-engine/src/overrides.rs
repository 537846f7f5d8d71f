//! Programmatic per-token strategy overrides.

use price_config::OracleStrategy;
use price_types::{Address, BlockNumber};

/// Supplies a replacement oracle order and count for specific tokens.
///
/// Consulted before the configured `[[overrides]]` rules. Returning `None`
/// defers to the configuration.
pub trait OracleOverride: Send + Sync {
	fn strategy_for(&self, token: &Address, block: Option<BlockNumber>) -> Option<OracleStrategy>;
}

impl<F> OracleOverride for F
where
	F: Fn(&Address, Option<BlockNumber>) -> Option<OracleStrategy> + Send + Sync,
{
	fn strategy_for(&self, token: &Address, block: Option<BlockNumber>) -> Option<OracleStrategy> {
		self(token, block)
	}
}
