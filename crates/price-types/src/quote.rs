//! Quote and oracle kind types shared by every price source.

use crate::decimal::{self, Decimal};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies which price source produced a quote.
///
/// The first eight variants are configurable adapters. `HardcodedStable` and
/// `Averaged` are synthetic tags produced by the aggregator itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleKind {
	YearnLens,
	ChainlinkFeed,
	AaveOracle,
	InchOracle,
	CurveCalculations,
	SushiCalculations,
	UniswapForksRouter,
	CurveRouter,
	HardcodedStable,
	Averaged,
}

/// Broad family an oracle kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleCategory {
	/// Reads a stored price from a feed contract.
	DirectFeed,
	/// Asks a helper contract to derive a USD value.
	Calculation,
	/// Simulates a trade through a routing contract.
	Router,
	/// Produced by the aggregator, not by an adapter.
	Synthetic,
}

impl OracleKind {
	/// Every adapter kind that can appear in a network configuration.
	pub const ADAPTERS: [OracleKind; 8] = [
		OracleKind::YearnLens,
		OracleKind::ChainlinkFeed,
		OracleKind::AaveOracle,
		OracleKind::InchOracle,
		OracleKind::CurveCalculations,
		OracleKind::SushiCalculations,
		OracleKind::UniswapForksRouter,
		OracleKind::CurveRouter,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			OracleKind::YearnLens => "yearn_lens",
			OracleKind::ChainlinkFeed => "chainlink_feed",
			OracleKind::AaveOracle => "aave_oracle",
			OracleKind::InchOracle => "inch_oracle",
			OracleKind::CurveCalculations => "curve_calculations",
			OracleKind::SushiCalculations => "sushi_calculations",
			OracleKind::UniswapForksRouter => "uniswap_forks_router",
			OracleKind::CurveRouter => "curve_router",
			OracleKind::HardcodedStable => "hardcoded_stable",
			OracleKind::Averaged => "averaged",
		}
	}

	pub fn category(&self) -> OracleCategory {
		match self {
			OracleKind::YearnLens | OracleKind::ChainlinkFeed | OracleKind::AaveOracle => {
				OracleCategory::DirectFeed
			}
			OracleKind::InchOracle
			| OracleKind::CurveCalculations
			| OracleKind::SushiCalculations => OracleCategory::Calculation,
			OracleKind::UniswapForksRouter | OracleKind::CurveRouter => OracleCategory::Router,
			OracleKind::HardcodedStable | OracleKind::Averaged => OracleCategory::Synthetic,
		}
	}

	/// Router quotes are backed by a finite pool and may be liquidity bounded.
	pub fn is_liquidity_backed(&self) -> bool {
		self.category() == OracleCategory::Router
	}
}

impl fmt::Display for OracleKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OracleKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		OracleKind::ADAPTERS
			.iter()
			.chain([OracleKind::HardcodedStable, OracleKind::Averaged].iter())
			.find(|kind| kind.as_str() == s)
			.copied()
			.ok_or_else(|| format!("Unknown oracle kind: {}", s))
	}
}

/// A single price observation.
///
/// `usd_price` is reported raw: the USD price of one whole token is
/// `usd_price / 10^implied_decimals`. A zero price marks the quote as
/// reverted. `liquidity_usd` is already expressed in whole USD and stays
/// zero for sources that are not backed by a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
	pub usd_price: Decimal,
	pub implied_decimals: i32,
	pub source: OracleKind,
	pub liquidity_usd: Decimal,
}

impl Quote {
	pub fn new(usd_price: Decimal, implied_decimals: i32, source: OracleKind) -> Self {
		Self {
			usd_price,
			implied_decimals,
			source,
			liquidity_usd: Decimal::ZERO,
		}
	}

	/// The "no usable price" sentinel for `source`.
	pub fn reverted(source: OracleKind) -> Self {
		Self::new(Decimal::ZERO, 0, source)
	}

	pub fn with_liquidity(mut self, liquidity_usd: Decimal) -> Self {
		self.liquidity_usd = liquidity_usd;
		self
	}

	pub fn is_reverted(&self) -> bool {
		self.usd_price.is_zero()
	}

	/// USD price of one whole token, or `None` when the raw value cannot be
	/// rescaled.
	pub fn checked_normalized_price(&self) -> Option<Decimal> {
		decimal::shift(self.usd_price, -self.implied_decimals)
	}

	/// USD price of one whole token.
	///
	/// Returns zero when the raw value cannot be rescaled.
	pub fn normalized_price(&self) -> Decimal {
		self.checked_normalized_price().unwrap_or(Decimal::ZERO)
	}

	/// Whether the quote carries a price the engine can use.
	pub fn is_usable(&self) -> bool {
		self.checked_normalized_price()
			.is_some_and(|price| !price.is_zero())
	}

	pub fn is_liquidity_backed(&self) -> bool {
		self.source.is_liquidity_backed()
	}
}
