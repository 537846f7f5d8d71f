//! Price sources for the resolution engine.
//!
//! Every source implements [`OracleInterface`]. Implementations report
//! failures as [`PriceError`]s from `fetch_quote`; the provided `quote` method
//! turns any failure into a reverted [`Quote`] so nothing above an adapter
//! ever sees an error.

use async_trait::async_trait;
use price_config::{BaseAssets, NetworkConfig, OracleSettings};
use price_types::{Address, BlockNumber, ChainReader, OracleKind, PriceError, Quote};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub mod contract;
pub mod reader;

/// Re-export implementations
pub mod implementations {
	pub mod feeds {
		pub mod aave;
		pub mod chainlink;
		pub mod yearn_lens;
	}
	pub mod calculations {
		pub mod curve;
		pub mod inch;
		pub mod sushi;
	}
	pub mod routers {
		pub mod curve;
		pub mod uniswap_forks;
	}
}

#[cfg(test)]
pub(crate) mod testing;

pub use reader::RpcReader;

/// Errors that can occur while setting up price sources.
#[derive(Debug, Error)]
pub enum OracleError {
	#[error("Invalid RPC URL: {0}")]
	InvalidUrl(String),
}

/// Resolves the USD price of another token through the full engine.
///
/// Adapters that price a token from its constituents (LP tokens, for
/// example) use this to price each constituent.
#[async_trait]
pub trait PriceLookup: Send + Sync {
	async fn usd_price(&self, token: Address, block: Option<BlockNumber>, depth: usize) -> Quote;
}

/// A single quote request as seen by an adapter.
pub struct QuoteRequest<'a> {
	pub token: Address,
	pub block: Option<BlockNumber>,
	/// Nesting depth of this request; zero for a caller's request.
	pub depth: usize,
	pub lookup: &'a dyn PriceLookup,
}

impl<'a> QuoteRequest<'a> {
	pub fn new(token: Address, block: Option<BlockNumber>, lookup: &'a dyn PriceLookup) -> Self {
		Self {
			token,
			block,
			depth: 0,
			lookup,
		}
	}

	/// Prices `token` at the same block, one level deeper.
	pub async fn nested_price(&self, token: Address) -> Quote {
		self.lookup.usd_price(token, self.block, self.depth + 1).await
	}
}

/// Trait implemented by every price source.
#[async_trait]
pub trait OracleInterface: Send + Sync {
	fn kind(&self) -> OracleKind;

	/// Fetches a quote, reporting why none is available.
	async fn fetch_quote(&self, request: &QuoteRequest<'_>) -> Result<Quote, PriceError>;

	/// Fetches a quote. Never fails: any error becomes a reverted quote.
	async fn quote(&self, request: &QuoteRequest<'_>) -> Quote {
		let kind = self.kind();
		match self.fetch_quote(request).await {
			Ok(quote) if quote.is_usable() => quote,
			Ok(quote) => {
				debug!(
					"[{}] unusable price {} (scale {}) for {}",
					kind, quote.usd_price, quote.implied_decimals, request.token
				);
				Quote::reverted(kind)
			}
			Err(e) => {
				debug!("[{}] no quote for {}: {}", kind, request.token, e);
				Quote::reverted(kind)
			}
		}
	}
}

/// Builds the adapter described by `settings`.
pub fn create_oracle(
	settings: &OracleSettings,
	assets: &BaseAssets,
	reader: Arc<dyn ChainReader>,
) -> Box<dyn OracleInterface> {
	use implementations::{calculations, feeds, routers};

	match settings {
		OracleSettings::YearnLens(c) => Box::new(feeds::yearn_lens::YearnLensOracle::new(c.clone(), reader)),
		OracleSettings::ChainlinkFeed(c) => Box::new(feeds::chainlink::ChainlinkFeed::new(c.clone(), reader)),
		OracleSettings::AaveOracle(c) => Box::new(feeds::aave::AaveOracle::new(c.clone(), reader)),
		OracleSettings::InchOracle(c) => Box::new(calculations::inch::InchOracle::new(
			c.clone(),
			assets.clone(),
			reader,
		)),
		OracleSettings::CurveCalculations(c) => {
			Box::new(calculations::curve::CurveCalculations::new(c.clone(), reader))
		}
		OracleSettings::SushiCalculations(c) => {
			Box::new(calculations::sushi::SushiCalculations::new(c.clone(), reader))
		}
		OracleSettings::UniswapForksRouter(r) => Box::new(routers::uniswap_forks::UniswapForksRouter::new(
			r.clone(),
			assets.clone(),
			reader,
		)),
		OracleSettings::CurveRouter(r) => Box::new(routers::curve::CurveRouter::new(r.clone(), reader)),
	}
}

/// The adapters configured for one network, keyed by kind.
pub struct OracleService {
	oracles: HashMap<OracleKind, Box<dyn OracleInterface>>,
}

impl OracleService {
	pub fn new() -> Self {
		Self {
			oracles: HashMap::new(),
		}
	}

	/// Builds every adapter listed in `config`.
	pub fn from_config(config: &NetworkConfig, reader: Arc<dyn ChainReader>) -> Self {
		config
			.oracles
			.iter()
			.fold(Self::new(), |service, settings| {
				service.with_oracle(create_oracle(settings, &config.assets, reader.clone()))
			})
	}

	/// Adds an adapter, replacing any previous adapter of the same kind.
	pub fn with_oracle(mut self, oracle: Box<dyn OracleInterface>) -> Self {
		self.oracles.insert(oracle.kind(), oracle);
		self
	}

	pub fn contains(&self, kind: OracleKind) -> bool {
		self.oracles.contains_key(&kind)
	}

	/// Kinds of all registered adapters.
	pub fn kinds(&self) -> Vec<OracleKind> {
		OracleKind::ADAPTERS
			.into_iter()
			.filter(|kind| self.contains(*kind))
			.collect()
	}

	/// Quotes `request` from the adapter of the given kind.
	///
	/// A kind with no registered adapter yields a reverted quote.
	pub async fn quote(&self, kind: OracleKind, request: &QuoteRequest<'_>) -> Quote {
		match self.oracles.get(&kind) {
			Some(oracle) => oracle.quote(request).await,
			None => {
				debug!("{}", PriceError::unavailable(kind, "not deployed on this network"));
				Quote::reverted(kind)
			}
		}
	}
}

impl Default for OracleService {
	fn default() -> Self {
		Self::new()
	}
}
