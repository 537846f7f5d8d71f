//! Configuration types for a network's price sources.

use price_types::{address, Address, BlockNumber, OracleKind};
use serde::{Deserialize, Serialize};

/// Placeholder address many protocols use for the native asset.
pub const NATIVE_PLACEHOLDER: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");

/// Complete price configuration for one network
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// Network identifier, e.g. `mainnet`
	pub name: String,
	/// EVM chain id
	pub chain_id: u64,
	/// Default adapter priority order
	pub oracle_order: Vec<OracleKind>,
	/// Number of independent quotes to collect before combining
	#[serde(default = "default_oracle_count")]
	pub oracle_count: usize,
	/// Tokens pegged to 1.00 USD by deployment policy
	#[serde(default)]
	pub hardcoded_stables: Vec<Address>,
	/// Base assets used as units of account
	pub assets: BaseAssets,
	/// Adapter settings, at most one entry per kind
	#[serde(default)]
	pub oracles: Vec<OracleSettings>,
	/// Per-token replacements for the default order and count
	#[serde(default)]
	pub overrides: Vec<OverrideRule>,
}

/// Base asset addresses for a network
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BaseAssets {
	/// Native asset placeholder address
	#[serde(default = "default_native")]
	pub native: Address,
	/// Wrapped native asset (WETH on mainnet)
	pub wrapped_native: Address,
	#[serde(default = "default_token_decimals")]
	pub wrapped_native_decimals: u8,
	/// Reference stablecoin all router quotes are denominated in
	pub stablecoin: Address,
	#[serde(default = "default_stablecoin_decimals")]
	pub stablecoin_decimals: u8,
}

/// A single price contract with an activation block and token blacklist
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractSettings {
	pub address: Address,
	/// First block at which the contract may be queried
	#[serde(default)]
	pub start_block: BlockNumber,
	/// Tokens this contract must never be asked about
	#[serde(default)]
	pub blacklist: Vec<Address>,
}

/// A contract reference inside a list, such as a router or registry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractRef {
	pub address: Address,
	#[serde(default)]
	pub start_block: BlockNumber,
}

/// Uniswap V2 style routers, tried in order
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouterSettings {
	pub routers: Vec<ContractRef>,
	/// Trading fee per hop in basis points
	#[serde(default = "default_fee_bps")]
	pub fee_bps: u32,
	#[serde(default)]
	pub blacklist: Vec<Address>,
}

/// Curve registries, tried in order
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CurveRouterSettings {
	pub registries: Vec<ContractRef>,
	#[serde(default)]
	pub blacklist: Vec<Address>,
}

/// Settings for one adapter, tagged by its kind.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OracleSettings {
	YearnLens(ContractSettings),
	ChainlinkFeed(ContractSettings),
	AaveOracle(ContractSettings),
	InchOracle(ContractSettings),
	CurveCalculations(ContractSettings),
	SushiCalculations(ContractSettings),
	UniswapForksRouter(RouterSettings),
	CurveRouter(CurveRouterSettings),
}

/// Replacement order and count for a set of tokens.
///
/// When `after_block` or `before_block` is set the rule only matches an
/// explicit block strictly inside the window; a latest-block request never
/// matches a windowed rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OverrideRule {
	pub tokens: Vec<Address>,
	pub oracle_order: Vec<OracleKind>,
	#[serde(default = "default_oracle_count")]
	pub oracle_count: usize,
	#[serde(default)]
	pub after_block: Option<BlockNumber>,
	#[serde(default)]
	pub before_block: Option<BlockNumber>,
}

/// The effective order and count for one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleStrategy {
	pub order: Vec<OracleKind>,
	pub count: usize,
}

fn default_oracle_count() -> usize {
	1
}

fn default_native() -> Address {
	NATIVE_PLACEHOLDER
}

fn default_token_decimals() -> u8 {
	18
}

fn default_stablecoin_decimals() -> u8 {
	6
}

fn default_fee_bps() -> u32 {
	30
}

impl ContractSettings {
	pub fn is_active_at(&self, block: Option<BlockNumber>) -> bool {
		block.map_or(true, |number| number >= self.start_block)
	}

	pub fn is_blacklisted(&self, token: &Address) -> bool {
		self.blacklist.contains(token)
	}
}

impl ContractRef {
	pub fn is_active_at(&self, block: Option<BlockNumber>) -> bool {
		block.map_or(true, |number| number >= self.start_block)
	}
}

impl OracleSettings {
	pub fn kind(&self) -> OracleKind {
		match self {
			OracleSettings::YearnLens(_) => OracleKind::YearnLens,
			OracleSettings::ChainlinkFeed(_) => OracleKind::ChainlinkFeed,
			OracleSettings::AaveOracle(_) => OracleKind::AaveOracle,
			OracleSettings::InchOracle(_) => OracleKind::InchOracle,
			OracleSettings::CurveCalculations(_) => OracleKind::CurveCalculations,
			OracleSettings::SushiCalculations(_) => OracleKind::SushiCalculations,
			OracleSettings::UniswapForksRouter(_) => OracleKind::UniswapForksRouter,
			OracleSettings::CurveRouter(_) => OracleKind::CurveRouter,
		}
	}

	pub fn blacklist(&self) -> &[Address] {
		match self {
			OracleSettings::YearnLens(c)
			| OracleSettings::ChainlinkFeed(c)
			| OracleSettings::AaveOracle(c)
			| OracleSettings::InchOracle(c)
			| OracleSettings::CurveCalculations(c)
			| OracleSettings::SushiCalculations(c) => &c.blacklist,
			OracleSettings::UniswapForksRouter(r) => &r.blacklist,
			OracleSettings::CurveRouter(r) => &r.blacklist,
		}
	}
}

impl OverrideRule {
	pub fn matches(&self, token: &Address, block: Option<BlockNumber>) -> bool {
		if !self.tokens.contains(token) {
			return false;
		}
		if self.after_block.is_none() && self.before_block.is_none() {
			return true;
		}
		let Some(number) = block else {
			return false;
		};
		self.after_block.map_or(true, |after| number > after)
			&& self.before_block.map_or(true, |before| number < before)
	}

	pub fn strategy(&self) -> OracleStrategy {
		OracleStrategy {
			order: self.oracle_order.clone(),
			count: self.oracle_count,
		}
	}
}

impl NetworkConfig {
	pub fn default_strategy(&self) -> OracleStrategy {
		OracleStrategy {
			order: self.oracle_order.clone(),
			count: self.oracle_count,
		}
	}

	/// First declarative override matching `token` at `block`, if any.
	pub fn override_for(&self, token: &Address, block: Option<BlockNumber>) -> Option<OracleStrategy> {
		self.overrides
			.iter()
			.find(|rule| rule.matches(token, block))
			.map(OverrideRule::strategy)
	}

	pub fn oracle(&self, kind: OracleKind) -> Option<&OracleSettings> {
		self.oracles.iter().find(|settings| settings.kind() == kind)
	}

	pub fn is_hardcoded_stable(&self, token: &Address) -> bool {
		self.hardcoded_stables.contains(token)
	}
}
